//! Removal timer facades: remove-on-break and remove-on-sleep.
//!
//! Each facade owns per-transform authored settings and maps an elapsed
//! timer through a configurable curve to a decay fraction in [0, 1]. The
//! timers only advance while the triggering condition holds (broken off,
//! or sleeping/slow-moving); decay itself never regresses within an
//! episode — that invariant is enforced downstream in `update_decay`.

use serde::{Deserialize, Serialize};

use crate::collection::{DynamicCollection, ObjectState};

/// Shape of the elapsed-time to decay mapping.
///
/// The curve is asset-configurable rather than hardcoded linear.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum DecayCurve {
    #[default]
    Linear,
    /// Hermite smoothstep: slow start, slow finish.
    SmoothStep,
    /// Power curve; exponent > 1 delays, < 1 front-loads.
    Pow(f32),
}

impl DecayCurve {
    /// Map a normalized time `t` to a decay fraction, clamped to [0, 1].
    pub fn evaluate(&self, t: f32) -> f32 {
        let t = t.clamp(0.0, 1.0);
        match self {
            DecayCurve::Linear => t,
            DecayCurve::SmoothStep => t * t * (3.0 - 2.0 * t),
            DecayCurve::Pow(exp) => t.powf(*exp),
        }
    }
}

/// Authored remove-on-break settings for one transform.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct BreakRemovalSettings {
    pub enabled: bool,
    /// Seconds after break-off before decay starts.
    pub break_delay: f32,
    /// Seconds from decay start to full decay.
    pub removal_duration: f32,
    /// Full decay crumbles the cluster instead of disabling the particle.
    pub cluster_crumbling: bool,
    pub curve: DecayCurve,
}

impl Default for BreakRemovalSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            break_delay: 0.0,
            removal_duration: 1.0,
            cluster_crumbling: false,
            curve: DecayCurve::Linear,
        }
    }
}

/// Authored remove-on-sleep settings for one transform.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct SleepRemovalSettings {
    pub enabled: bool,
    /// Seconds asleep before decay starts.
    pub max_sleep_time: f32,
    /// Seconds from decay start to full decay.
    pub removal_duration: f32,
    /// Linear speed at or below which a particle counts as slow-moving.
    pub slow_moving_threshold: f32,
    pub cluster_crumbling: bool,
    pub curve: DecayCurve,
}

impl Default for SleepRemovalSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            max_sleep_time: 5.0,
            removal_duration: 1.0,
            slow_moving_threshold: 1.0,
            cluster_crumbling: false,
            curve: DecayCurve::Linear,
        }
    }
}

fn decay_from_timer(timer: f32, delay: f32, duration: f32, curve: DecayCurve) -> f32 {
    let elapsed = timer - delay;
    if elapsed <= 0.0 {
        0.0
    } else if duration <= 0.0 {
        1.0
    } else {
        curve.evaluate(elapsed / duration)
    }
}

/// Remove-on-break facade: decay driven by time since break-off.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RemoveOnBreak {
    settings: Vec<BreakRemovalSettings>,
}

impl RemoveOnBreak {
    pub fn new(settings: Vec<BreakRemovalSettings>) -> Self {
        Self { settings }
    }

    /// Whether the transform participates in remove-on-break at all.
    pub fn is_removal_active(&self, transform: usize) -> bool {
        self.settings[transform].enabled
    }

    /// Whether full decay should crumble the cluster rather than disable
    /// the single particle.
    pub fn use_cluster_crumbling(&self, transform: usize) -> bool {
        self.settings[transform].cluster_crumbling
    }

    /// Advance the break timer of `transform` (while broken off) and
    /// compute its decay using the settings of `policy_transform` — for a
    /// child under a runtime internal cluster that is its original parent,
    /// not the child itself.
    pub fn update_break_timer_and_compute_decay(
        &self,
        collection: &mut DynamicCollection,
        transform: usize,
        policy_transform: usize,
        dt: f32,
    ) -> f32 {
        if !collection.broken[transform] {
            return collection.decay[transform];
        }
        collection.break_timer[transform] += dt;

        let s = &self.settings[policy_transform];
        decay_from_timer(
            collection.break_timer[transform],
            s.break_delay,
            s.removal_duration,
            s.curve,
        )
    }
}

/// Remove-on-sleep facade: decay driven by time spent asleep or
/// slow-moving.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RemoveOnSleep {
    settings: Vec<SleepRemovalSettings>,
}

impl RemoveOnSleep {
    pub fn new(settings: Vec<SleepRemovalSettings>) -> Self {
        Self { settings }
    }

    pub fn is_removal_active(&self, transform: usize) -> bool {
        self.settings[transform].enabled
    }

    pub fn use_cluster_crumbling(&self, transform: usize) -> bool {
        self.settings[transform].cluster_crumbling
    }

    /// Advance the sleep timer of `transform` and compute its decay using
    /// the settings of `policy_transform`.
    ///
    /// While decay has not begun the timer only advances when the particle
    /// is sleeping or slow-moving, and resets when it wakes. Once decay
    /// has begun the checks are skipped and the timer always advances — a
    /// velocity spike from a nearby cluster break must not pause an
    /// in-progress removal.
    pub fn update_sleep_timer(
        &self,
        collection: &mut DynamicCollection,
        transform: usize,
        policy_transform: usize,
        dt: f32,
    ) -> f32 {
        let s = &self.settings[policy_transform];
        let decay_begun = collection.decay[transform] > 0.0;

        if decay_begun {
            collection.sleep_timer[transform] += dt;
        } else {
            let sleeping = collection.state[transform] == ObjectState::Sleeping;
            let slow = collection.linear_velocity[transform].length_squared()
                <= s.slow_moving_threshold * s.slow_moving_threshold;
            if sleeping || slow {
                collection.sleep_timer[transform] += dt;
            } else {
                collection.sleep_timer[transform] = 0.0;
            }
        }

        decay_from_timer(
            collection.sleep_timer[transform],
            s.max_sleep_time,
            s.removal_duration,
            s.curve,
        )
    }
}
