//! Arena-backed dynamic state for a fractured geometry collection.
//!
//! All transforms live in contiguous per-attribute arrays; parent/child
//! links are plain indices into the same arena, never owning references,
//! so the bidirectional cluster hierarchy cannot form ownership cycles.

use glam::Vec3;
use serde::{Deserialize, Serialize};

/// Simulation state of one transform's particle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ObjectState {
    #[default]
    Dynamic,
    Sleeping,
    Kinematic,
    Static,
}

/// Per-transform dynamic attributes of a fractured collection.
///
/// The decay attribute is a [0, 1] scalar per transform, monotonically
/// non-decreasing within one removal episode; the timers back the
/// remove-on-break / remove-on-sleep facades and are mutated only by the
/// decay engine.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct DynamicCollection {
    /// Authored (pre-fracture) parent per transform; `None` marks a root.
    parent: Vec<Option<usize>>,
    /// Authored children per transform, indices into this arena.
    children: Vec<Vec<usize>>,

    /// Removal progress per transform, in [0, 1].
    pub decay: Vec<f32>,
    /// Elapsed time spent sleeping (or slow-moving) per transform.
    pub sleep_timer: Vec<f32>,
    /// Elapsed time since break-off per transform.
    pub break_timer: Vec<f32>,
    /// Current object state per transform.
    pub state: Vec<ObjectState>,
    /// Whether the transform has broken off its authored parent.
    pub broken: Vec<bool>,
    /// Whether the particle has been disabled (removed from simulation).
    pub disabled: Vec<bool>,
    /// Latest known linear velocity per transform (for the slow-moving
    /// heuristic).
    #[serde(skip)]
    pub linear_velocity: Vec<Vec3>,

    /// Whether the transform currently hangs under a runtime internal
    /// cluster (a synthetic parent created when pieces broke together,
    /// which has no transform index of its own).
    internal_cluster_parent: Vec<bool>,

    dirty: bool,
}

impl DynamicCollection {
    /// Create a collection of `num_transforms` root transforms with all
    /// attributes at rest.
    pub fn with_transforms(num_transforms: usize) -> Self {
        Self {
            parent: vec![None; num_transforms],
            children: vec![Vec::new(); num_transforms],
            decay: vec![0.0; num_transforms],
            sleep_timer: vec![0.0; num_transforms],
            break_timer: vec![0.0; num_transforms],
            state: vec![ObjectState::Dynamic; num_transforms],
            broken: vec![false; num_transforms],
            disabled: vec![false; num_transforms],
            linear_velocity: vec![Vec3::ZERO; num_transforms],
            internal_cluster_parent: vec![false; num_transforms],
            dirty: false,
        }
    }

    pub fn num_transforms(&self) -> usize {
        self.parent.len()
    }

    /// Attach `child` under `parent` in the authored hierarchy.
    pub fn set_parent(&mut self, child: usize, parent: usize) {
        assert_ne!(child, parent, "transform {} cannot parent itself", child);
        if let Some(old) = self.parent[child] {
            self.children[old].retain(|&c| c != child);
        }
        self.parent[child] = Some(parent);
        self.children[parent].push(child);
    }

    pub fn parent(&self, transform: usize) -> Option<usize> {
        self.parent[transform]
    }

    pub fn children(&self, transform: usize) -> &[usize] {
        &self.children[transform]
    }

    pub fn is_root(&self, transform: usize) -> bool {
        self.parent[transform].is_none()
    }

    /// Mark/unmark the transform as hanging under a runtime internal
    /// cluster parent.
    pub fn set_internal_cluster_parent(&mut self, transform: usize, value: bool) {
        self.internal_cluster_parent[transform] = value;
    }

    pub fn has_internal_cluster_parent(&self, transform: usize) -> bool {
        self.internal_cluster_parent[transform]
    }

    /// Record a break-off: the transform leaves its authored parent's
    /// cluster and starts a fresh removal episode.
    pub fn mark_broken(&mut self, transform: usize) {
        if !self.broken[transform] {
            self.broken[transform] = true;
            self.break_timer[transform] = 0.0;
            self.decay[transform] = 0.0;
            self.dirty = true;
        }
    }

    pub fn make_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn clear_dirty(&mut self) {
        self.dirty = false;
    }
}
