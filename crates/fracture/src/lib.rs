//! Fracture-cluster decay bookkeeping and replication reconciliation.
//!
//! Two engines for destructible geometry collections:
//!
//! - The **decay engine** advances per-transform removal timers once per
//!   simulation tick, maps them through configurable curves to a [0, 1]
//!   decay scalar, and batches the resulting disable/crumble commands into
//!   a per-tick context that flushes to the owning physics proxy exactly
//!   once.
//! - The **replication reconciler** runs on network clients, comparing
//!   local cluster kinematics against versioned server snapshots and
//!   either hard-snapping or velocity-matching them back into agreement.
//!
//! The particle simulation itself lives behind the [`PhysicsProxy`] and
//! [`ReplicationTarget`] traits; this crate only computes decisions.
//!
//! # Example
//!
//! ```
//! use fracture::{
//!     increment_break_timer, BreakRemovalSettings, DecayContext, DecayCurve,
//!     DynamicCollection, RemoveOnBreak,
//! };
//! # use fracture::{ClusterItemIndex, PhysicsProxy};
//! # struct NullProxy;
//! # impl PhysicsProxy for NullProxy {
//! #     fn break_clusters(&mut self, _: &[ClusterItemIndex]) {}
//! #     fn disable_particles(&mut self, _: &[usize]) {}
//! #     fn set_anchored(&mut self, _: &[usize], _: bool) {}
//! #     fn apply_external_strain(&mut self, _: ClusterItemIndex, _: f32) {}
//! #     fn cluster_item_index(&self, t: usize) -> Option<ClusterItemIndex> { Some(t as i32) }
//! #     fn internal_cluster_parent_item_index(&self, _: usize) -> Option<ClusterItemIndex> { None }
//! # }
//!
//! let mut collection = DynamicCollection::with_transforms(2);
//! collection.set_parent(1, 0);
//! collection.mark_broken(1);
//!
//! let remove_on_break = RemoveOnBreak::new(vec![
//!     BreakRemovalSettings::default(),
//!     BreakRemovalSettings {
//!         enabled: true,
//!         removal_duration: 2.0,
//!         curve: DecayCurve::Linear,
//!         ..Default::default()
//!     },
//! ]);
//!
//! let mut proxy = NullProxy;
//! let mut context = DecayContext::new();
//! increment_break_timer(&mut collection, &remove_on_break, &proxy, 1.0, &mut context);
//! context.process(&mut collection, &mut proxy);
//! assert!(collection.decay[1] > 0.0);
//! ```

pub mod collection;
pub mod context;
pub mod decay;
pub mod proxy;
pub mod removal;
pub mod replication;
pub mod serde_utils;

pub use collection::{DynamicCollection, ObjectState};
pub use context::DecayContext;
pub use decay::{increment_break_timer, increment_sleep_timer, update_decay};
pub use proxy::{ClusterItemIndex, PhysicsProxy};
pub use removal::{
    BreakRemovalSettings, DecayCurve, RemoveOnBreak, RemoveOnSleep, SleepRemovalSettings,
};
pub use replication::{
    ClusterKinematics, ClusterReplicationReconciler, ClusterSnapshot, OneOffActivation, RepData,
    ReplicationTarget, ReplicationTuning,
};
