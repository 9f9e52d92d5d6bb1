//! Client-side replication reconciliation for networked clusters.
//!
//! The server owns the simulation; clients run it locally and drift. Each
//! received snapshot batch carries a monotonic version, one-off fracture
//! activations, and per-cluster kinematics. The reconciler either
//! hard-snaps (copies the snapshot verbatim, discarding local drift) or
//! soft-matches (nudges local velocities toward a position/rotation error
//! correction). Desync — missed versions, rollback, rollover — always
//! self-heals through a hard snap and is never surfaced as an error.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::collection::ObjectState;
use crate::serde_utils;

/// Tuning knobs for the reconciler, threaded through the constructor
/// instead of living in process-wide mutable globals.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ReplicationTuning {
    /// Gain converting positional error (m) into a linear velocity
    /// correction (m/s per second of tick).
    pub linear_match_strength: f32,
    /// Window (s) over which a rotational error should close.
    pub angular_match_time: f32,
    /// Snapshots older than this (s) are stale; the object reverts to
    /// purely local simulation until fresh data arrives.
    pub max_extrapolation_time: f32,
    /// Hard-snap when more versions than this were missed.
    pub hard_missing_updates_threshold: u32,
    /// Without continuous velocity matching, hard-snap at least this
    /// often (s) regardless of version gap, bounding drift under
    /// sustained small errors.
    pub hardsnap_interval: f32,
    /// When true, velocity matching runs every tick and the periodic
    /// hard-snap interval is disabled.
    pub continuous_velocity_matching: bool,
    /// Corrections below this magnitude neither wake sleepers nor count
    /// as activity for idle tracking.
    pub correction_epsilon: f32,
}

impl Default for ReplicationTuning {
    fn default() -> Self {
        Self {
            linear_match_strength: 50.0,
            angular_match_time: 0.5,
            max_extrapolation_time: 3.0,
            hard_missing_updates_threshold: 20,
            hardsnap_interval: 0.1,
            continuous_velocity_matching: true,
            correction_epsilon: 1e-3,
        }
    }
}

/// Replicated kinematic state of one cluster.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct ClusterSnapshot {
    #[serde(with = "serde_utils::vec3")]
    pub position: Vec3,
    #[serde(with = "serde_utils::quat")]
    pub rotation: Quat,
    #[serde(with = "serde_utils::vec3")]
    pub linear_velocity: Vec3,
    #[serde(with = "serde_utils::vec3")]
    pub angular_velocity: Vec3,
    pub cluster_index: i32,
    pub object_state: ObjectState,
}

/// A fracture event the server observed that the client must reproduce
/// even if its local simulation never predicted it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct OneOffActivation {
    pub transform_index: usize,
    #[serde(with = "serde_utils::vec3")]
    pub linear_velocity: Vec3,
    #[serde(with = "serde_utils::vec3")]
    pub angular_velocity: Vec3,
}

/// One versioned replication batch, already deserialized by the host's
/// property-replication channel. `one_offs` is cumulative: entries are
/// appended server-side and never reordered.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RepData {
    pub version: u32,
    pub server_frame: u32,
    pub one_offs: Vec<OneOffActivation>,
    pub clusters: Vec<ClusterSnapshot>,
}

/// Local kinematics of one cluster as the reconciler sees them.
#[derive(Clone, Copy, Debug)]
pub struct ClusterKinematics {
    pub position: Vec3,
    pub rotation: Quat,
    pub linear_velocity: Vec3,
    pub angular_velocity: Vec3,
    pub sleeping: bool,
}

/// The local simulation surface the reconciler corrects.
///
/// A cluster the target no longer knows (locally decayed, already
/// disabled) answers `None` and is silently skipped.
pub trait ReplicationTarget {
    fn cluster_kinematics(&self, cluster_index: i32) -> Option<ClusterKinematics>;

    /// Copy the snapshot state verbatim, discarding local drift.
    fn hard_snap_cluster(&mut self, cluster_index: i32, snap: &ClusterSnapshot);

    /// Overwrite local velocities (soft matching never touches position
    /// or rotation directly).
    fn set_cluster_velocities(&mut self, cluster_index: i32, linear: Vec3, angular: Vec3);

    /// Wake a sleeping cluster so a correction can take effect.
    fn wake_cluster(&mut self, cluster_index: i32);

    /// Force-release a child particle from its parent cluster,
    /// reproducing a server-observed break. `initial_velocities` seeds
    /// the released piece when the reconciler is not about to hard-snap.
    fn release_cluster_particle(
        &mut self,
        transform_index: usize,
        initial_velocities: Option<(Vec3, Vec3)>,
    );
}

/// Ticks without a meaningful correction before the reconciler parks
/// itself until new data arrives.
const IDLE_TICKS_TO_PARK: u32 = 30;

/// Client-side state machine reconciling local cluster simulation against
/// replicated snapshots.
#[derive(Debug)]
pub struct ClusterReplicationReconciler {
    tuning: ReplicationTuning,
    version_processed: Option<u32>,
    one_offs_processed: usize,
    last_hardsnap_time: f64,
    idle_ticks: u32,
    active: bool,
}

impl ClusterReplicationReconciler {
    pub fn new(tuning: ReplicationTuning) -> Self {
        Self {
            tuning,
            version_processed: None,
            one_offs_processed: 0,
            last_hardsnap_time: f64::NEG_INFINITY,
            idle_ticks: 0,
            active: true,
        }
    }

    pub fn tuning(&self) -> &ReplicationTuning {
        &self.tuning
    }

    /// Version watermark of the last processed snapshot.
    pub fn version_processed(&self) -> Option<u32> {
        self.version_processed
    }

    /// Whether the per-tick invocation is currently wanted. The host may
    /// skip calling `tick` while false; this is a scheduling optimization,
    /// not a correctness requirement.
    pub fn needs_tick(&self) -> bool {
        self.active
    }

    /// Tell the reconciler fresh data arrived, re-arming `needs_tick`.
    pub fn notify_new_data(&mut self) {
        self.active = true;
        self.idle_ticks = 0;
    }

    /// Run one reconciliation pass against the current snapshot.
    ///
    /// `now` is the client clock; `received_at` is when `data` arrived on
    /// that same clock.
    pub fn tick(
        &mut self,
        now: f64,
        dt: f32,
        data: &RepData,
        received_at: f64,
        target: &mut dyn ReplicationTarget,
    ) {
        // Stale data: stop extrapolating against it and let the local
        // simulation run free until something fresh arrives.
        let extrapolation = now - received_at;
        if extrapolation > self.tuning.max_extrapolation_time as f64 {
            log::debug!(
                "replicated data {}s old exceeds extrapolation bound, reverting to local sim",
                extrapolation
            );
            return;
        }

        let hard_snap = self.decide_hard_snap(now, data.version);

        // Replay unprocessed one-off activations in received order. A
        // version rollback means a new server episode: the cumulative
        // list restarted, so the watermark does too.
        if let Some(processed) = self.version_processed {
            if data.version < processed {
                self.one_offs_processed = 0;
            }
        }
        if data.one_offs.len() < self.one_offs_processed {
            self.one_offs_processed = 0;
        }
        for one_off in &data.one_offs[self.one_offs_processed..] {
            let seed = (!hard_snap)
                .then_some((one_off.linear_velocity, one_off.angular_velocity));
            target.release_cluster_particle(one_off.transform_index, seed);
        }
        self.one_offs_processed = data.one_offs.len();

        let mut any_correction = false;
        for snap in &data.clusters {
            // A cluster the local side already removed is not an error.
            let Some(local) = target.cluster_kinematics(snap.cluster_index) else {
                continue;
            };

            if hard_snap {
                target.hard_snap_cluster(snap.cluster_index, snap);
                any_correction = true;
                continue;
            }

            let linear_correction =
                (snap.position - local.position) * self.tuning.linear_match_strength * dt;
            let angular_correction = self.angular_correction(local.rotation, snap.rotation);

            let magnitude = linear_correction.length() + angular_correction.length();
            target.set_cluster_velocities(
                snap.cluster_index,
                snap.linear_velocity + linear_correction,
                snap.angular_velocity + angular_correction,
            );
            if magnitude > self.tuning.correction_epsilon {
                any_correction = true;
                if local.sleeping {
                    target.wake_cluster(snap.cluster_index);
                }
            }
        }

        if hard_snap {
            log::debug!(
                "hard snap at version {} (previous watermark {:?})",
                data.version,
                self.version_processed
            );
            self.last_hardsnap_time = now;
        }
        self.version_processed = Some(data.version);

        if any_correction {
            self.idle_ticks = 0;
        } else {
            self.idle_ticks += 1;
            if self.idle_ticks >= IDLE_TICKS_TO_PARK {
                self.active = false;
            }
        }
    }

    /// Hard snap on: first snapshot ever, a missed-version gap beyond the
    /// threshold, version rollback/rollover, or (without continuous
    /// matching) the periodic wall-clock interval.
    fn decide_hard_snap(&self, now: f64, version: u32) -> bool {
        let Some(processed) = self.version_processed else {
            return true;
        };
        if version < processed {
            return true;
        }
        let missed = (version - processed).saturating_sub(1);
        if missed > self.tuning.hard_missing_updates_threshold {
            return true;
        }
        if !self.tuning.continuous_velocity_matching
            && now - self.last_hardsnap_time >= self.tuning.hardsnap_interval as f64
        {
            return true;
        }
        false
    }

    /// Angular velocity that closes the local-to-replicated rotation error
    /// over the configured match window.
    fn angular_correction(&self, local: Quat, replicated: Quat) -> Vec3 {
        if self.tuning.angular_match_time <= 0.0 {
            return Vec3::ZERO;
        }
        let mut error = replicated * local.inverse();
        // Take the short way around.
        if error.w < 0.0 {
            error = -error;
        }
        let (axis, angle) = error.to_axis_angle();
        if angle.abs() < 1e-6 {
            Vec3::ZERO
        } else {
            axis * (angle / self.tuning.angular_match_time)
        }
    }
}
