//! Per-tick decay command batch.
//!
//! Decay decisions for one simulation tick accumulate here and flush to
//! the physics proxy in a single `break_clusters` call and a single
//! `disable_particles` call. The batching is a correctness requirement:
//! per-transform disable calls could interleave with simulation state and
//! break the atomicity of the per-tick snapshot.

use rustc_hash::FxHashSet;

use crate::collection::DynamicCollection;
use crate::proxy::{ClusterItemIndex, PhysicsProxy};

/// Transient per-tick batch of disable/crumble commands.
///
/// Created fresh each tick, consumed by [`DecayContext::process`].
#[derive(Debug, Default)]
pub struct DecayContext {
    to_disable: Vec<usize>,
    to_crumble: Vec<ClusterItemIndex>,
    seen_disable: FxHashSet<usize>,
    seen_crumble: FxHashSet<ClusterItemIndex>,
    dirty: bool,
}

impl DecayContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a transform for disable. Duplicates within the tick collapse
    /// to one entry, preserving first-seen order.
    pub fn queue_disable(&mut self, transform_index: usize) {
        if self.seen_disable.insert(transform_index) {
            self.to_disable.push(transform_index);
        }
    }

    /// Queue a cluster for crumbling. Duplicates within the tick collapse
    /// to one entry, preserving first-seen order.
    pub fn queue_crumble(&mut self, item_index: ClusterItemIndex) {
        if self.seen_crumble.insert(item_index) {
            self.to_crumble.push(item_index);
        }
    }

    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    pub fn pending_disable(&self) -> &[usize] {
        &self.to_disable
    }

    pub fn pending_crumble(&self) -> &[ClusterItemIndex] {
        &self.to_crumble
    }

    pub fn is_empty(&self) -> bool {
        self.to_disable.is_empty() && self.to_crumble.is_empty() && !self.dirty
    }

    /// Apply the whole batch atomically: one crumble call, one disable
    /// call, then the collection's bookkeeping. Consumes the context.
    pub fn process(self, collection: &mut DynamicCollection, proxy: &mut dyn PhysicsProxy) {
        if !self.to_crumble.is_empty() {
            log::debug!("crumbling {} cluster(s)", self.to_crumble.len());
            proxy.break_clusters(&self.to_crumble);
        }
        if !self.to_disable.is_empty() {
            log::debug!("disabling {} particle(s)", self.to_disable.len());
            proxy.disable_particles(&self.to_disable);
            for &t in &self.to_disable {
                collection.disabled[t] = true;
            }
        }
        if self.dirty {
            collection.make_dirty();
        }
    }
}
