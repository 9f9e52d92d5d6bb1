//! The decay state machine and its per-tick drivers.
//!
//! `update_decay` is the single write path for the decay attribute: it
//! enforces monotonicity, routes full decay to either a disable or a
//! crumble command, and resets stored decay when a crumble is queued (the
//! real state change happens through the proxy's break batch, after which
//! the children start their own episodes).

use crate::collection::DynamicCollection;
use crate::context::DecayContext;
use crate::proxy::PhysicsProxy;
use crate::removal::{RemoveOnBreak, RemoveOnSleep};

/// Apply a newly computed decay value to one transform.
///
/// `new_decay <= current` is a no-op: decay never regresses within an
/// episode. Commands land in the context for the end-of-tick flush, never
/// directly on the proxy.
pub fn update_decay(
    collection: &mut DynamicCollection,
    transform: usize,
    new_decay: f32,
    use_crumbling: bool,
    has_dynamic_internal_cluster_parent: bool,
    proxy: &dyn PhysicsProxy,
    context: &mut DecayContext,
) {
    if new_decay <= collection.decay[transform] {
        return;
    }
    context.mark_dirty();

    let mut decay = new_decay.min(1.0);
    if use_crumbling {
        let item = if has_dynamic_internal_cluster_parent {
            proxy.internal_cluster_parent_item_index(transform)
        } else {
            proxy.cluster_item_index(transform)
        };
        if let Some(item) = item {
            context.queue_crumble(item);
        }
        // Crumbling resets stored decay; the children restart episodes.
        decay = 0.0;
    } else if decay >= 1.0 {
        decay = 1.0;
        context.queue_disable(transform);
    }

    collection.decay[transform] = decay;
}

/// Per-tick remove-on-sleep driver.
///
/// Walks every transform once, advancing sleep timers and pushing decay
/// updates into the context. Root transforms are exempt (the intact
/// collection must not evaporate while idle), as are disabled particles.
/// Children under a runtime internal cluster use their original parent's
/// removal policy, and crumbling then targets the internal cluster itself.
pub fn increment_sleep_timer(
    collection: &mut DynamicCollection,
    facade: &RemoveOnSleep,
    proxy: &dyn PhysicsProxy,
    dt: f32,
    context: &mut DecayContext,
) {
    for transform in 0..collection.num_transforms() {
        if collection.is_root(transform) || collection.disabled[transform] {
            continue;
        }

        let has_internal_parent = collection.has_internal_cluster_parent(transform);
        let policy = policy_transform(collection, transform, has_internal_parent);
        if !facade.is_removal_active(policy) {
            continue;
        }

        let new_decay = facade.update_sleep_timer(collection, transform, policy, dt);
        update_decay(
            collection,
            transform,
            new_decay,
            facade.use_cluster_crumbling(policy),
            has_internal_parent,
            proxy,
            context,
        );
    }
}

/// Per-tick remove-on-break driver. Same traversal and attribution rules
/// as the sleep driver, but timers run from break-off instead of sleep
/// onset, and roots participate (a root can break off the world).
pub fn increment_break_timer(
    collection: &mut DynamicCollection,
    facade: &RemoveOnBreak,
    proxy: &dyn PhysicsProxy,
    dt: f32,
    context: &mut DecayContext,
) {
    for transform in 0..collection.num_transforms() {
        if collection.disabled[transform] {
            continue;
        }

        let has_internal_parent = collection.has_internal_cluster_parent(transform);
        let policy = policy_transform(collection, transform, has_internal_parent);
        if !facade.is_removal_active(policy) {
            continue;
        }

        let new_decay =
            facade.update_break_timer_and_compute_decay(collection, transform, policy, dt);
        update_decay(
            collection,
            transform,
            new_decay,
            facade.use_cluster_crumbling(policy),
            has_internal_parent,
            proxy,
            context,
        );
    }
}

/// Decay policy attribution: a child under a dynamic internal cluster
/// inherits the removal policy of its original (pre-fracture) parent.
fn policy_transform(
    collection: &DynamicCollection,
    transform: usize,
    has_internal_parent: bool,
) -> usize {
    if has_internal_parent {
        collection.parent(transform).unwrap_or(transform)
    } else {
        transform
    }
}
