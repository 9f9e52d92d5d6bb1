//! Serde proxies for glam types used in replicated snapshots.

use glam::{Quat, Vec3};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Serde proxy for Vec3
#[derive(Serialize, Deserialize)]
struct Vec3Def {
    x: f32,
    y: f32,
    z: f32,
}

/// Serde proxy for Quat
#[derive(Serialize, Deserialize)]
struct QuatDef {
    x: f32,
    y: f32,
    z: f32,
    w: f32,
}

pub mod vec3 {
    use super::*;

    pub fn serialize<S>(v: &Vec3, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        Vec3Def {
            x: v.x,
            y: v.y,
            z: v.z,
        }
        .serialize(s)
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Vec3, D::Error>
    where
        D: Deserializer<'de>,
    {
        let def = Vec3Def::deserialize(d)?;
        Ok(Vec3::new(def.x, def.y, def.z))
    }
}

pub mod quat {
    use super::*;

    pub fn serialize<S>(q: &Quat, s: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        QuatDef {
            x: q.x,
            y: q.y,
            z: q.z,
            w: q.w,
        }
        .serialize(s)
    }

    pub fn deserialize<'de, D>(d: D) -> Result<Quat, D::Error>
    where
        D: Deserializer<'de>,
    {
        let def = QuatDef::deserialize(d)?;
        Ok(Quat::from_xyzw(def.x, def.y, def.z, def.w))
    }
}
