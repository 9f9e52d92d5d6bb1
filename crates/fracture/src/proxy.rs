//! The physics-proxy boundary.
//!
//! The decay engine never mutates particles directly: it computes
//! decisions and issues batch commands to the proxy that owns the actual
//! particle simulation. Commands are fire-and-forget and queued for the
//! next solver advance; targets that are already removed or disabled are
//! silent no-ops — expected under concurrent decay/replication
//! interaction, never an error.

/// Opaque solver-side identifier of a cluster (authored or internal).
/// Internal clusters have no transform index, only an item index.
pub type ClusterItemIndex = i32;

/// Batch command interface onto the owning particle simulation.
pub trait PhysicsProxy {
    /// Break every listed cluster into its immediate children in one step.
    /// Called at most once per tick with the full deduplicated batch.
    fn break_clusters(&mut self, item_indices: &[ClusterItemIndex]);

    /// Disable the listed particles. Called at most once per tick with the
    /// full deduplicated batch.
    fn disable_particles(&mut self, transform_indices: &[usize]);

    /// Anchor or release the listed particles in place.
    fn set_anchored(&mut self, transform_indices: &[usize], anchored: bool);

    /// Queue external strain against a cluster, feeding its break model.
    fn apply_external_strain(&mut self, item_index: ClusterItemIndex, strain: f32);

    /// Item index of the transform's own cluster, if it still exists.
    fn cluster_item_index(&self, transform_index: usize) -> Option<ClusterItemIndex>;

    /// Item index of the runtime internal cluster currently parenting the
    /// transform, if any.
    fn internal_cluster_parent_item_index(
        &self,
        transform_index: usize,
    ) -> Option<ClusterItemIndex>;
}
