//! Decay engine properties: monotonicity, clamping, crumble dedup, and
//! once-per-tick command batching.

use fracture::{
    increment_break_timer, increment_sleep_timer, update_decay, BreakRemovalSettings,
    ClusterItemIndex, DecayContext, DynamicCollection, ObjectState, PhysicsProxy, RemoveOnBreak,
    RemoveOnSleep, SleepRemovalSettings,
};
use proptest::prelude::*;

/// Records every proxy call so tests can assert batch shape and count.
#[derive(Default)]
struct RecordingProxy {
    break_calls: Vec<Vec<ClusterItemIndex>>,
    disable_calls: Vec<Vec<usize>>,
    /// Transforms that currently hang under a runtime internal cluster,
    /// mapped to that cluster's item index.
    internal_parents: Vec<Option<ClusterItemIndex>>,
}

impl RecordingProxy {
    fn with_transforms(n: usize) -> Self {
        Self {
            internal_parents: vec![None; n],
            ..Default::default()
        }
    }
}

impl PhysicsProxy for RecordingProxy {
    fn break_clusters(&mut self, item_indices: &[ClusterItemIndex]) {
        self.break_calls.push(item_indices.to_vec());
    }

    fn disable_particles(&mut self, transform_indices: &[usize]) {
        self.disable_calls.push(transform_indices.to_vec());
    }

    fn set_anchored(&mut self, _transform_indices: &[usize], _anchored: bool) {}

    fn apply_external_strain(&mut self, _item_index: ClusterItemIndex, _strain: f32) {}

    fn cluster_item_index(&self, transform_index: usize) -> Option<ClusterItemIndex> {
        Some(transform_index as ClusterItemIndex)
    }

    fn internal_cluster_parent_item_index(
        &self,
        transform_index: usize,
    ) -> Option<ClusterItemIndex> {
        self.internal_parents[transform_index]
    }
}

fn break_settings(duration: f32, crumbling: bool) -> BreakRemovalSettings {
    BreakRemovalSettings {
        enabled: true,
        break_delay: 0.0,
        removal_duration: duration,
        cluster_crumbling: crumbling,
        ..Default::default()
    }
}

/// Decay never regresses and clamps to exactly 1.0.
#[test]
fn test_decay_is_monotone_and_clamped() {
    let mut c = DynamicCollection::with_transforms(1);
    let proxy = RecordingProxy::with_transforms(1);
    let mut ctx = DecayContext::new();

    update_decay(&mut c, 0, 0.4, false, false, &proxy, &mut ctx);
    assert_eq!(c.decay[0], 0.4);

    // Lower value is a no-op.
    update_decay(&mut c, 0, 0.1, false, false, &proxy, &mut ctx);
    assert_eq!(c.decay[0], 0.4);

    // Equal value is a no-op.
    update_decay(&mut c, 0, 0.4, false, false, &proxy, &mut ctx);
    assert_eq!(c.decay[0], 0.4);

    // Overshoot clamps to exactly 1.0 and queues a disable.
    update_decay(&mut c, 0, 1.7, false, false, &proxy, &mut ctx);
    assert_eq!(c.decay[0], 1.0);
    assert_eq!(ctx.pending_disable(), &[0]);

    // Once at 1.0 it stays there.
    update_decay(&mut c, 0, 2.0, false, false, &proxy, &mut ctx);
    assert_eq!(c.decay[0], 1.0);
}

/// Requesting a crumble twice for the same cluster in one tick reaches the
/// proxy exactly once.
#[test]
fn test_crumble_requests_dedup_within_tick() {
    let mut c = DynamicCollection::with_transforms(3);
    c.set_parent(1, 0);
    c.set_parent(2, 0);
    let mut proxy = RecordingProxy::with_transforms(3);
    // Both children hang under the same internal cluster, item index 42.
    proxy.internal_parents[1] = Some(42);
    proxy.internal_parents[2] = Some(42);
    c.set_internal_cluster_parent(1, true);
    c.set_internal_cluster_parent(2, true);

    let mut ctx = DecayContext::new();
    update_decay(&mut c, 1, 1.0, true, true, &proxy, &mut ctx);
    update_decay(&mut c, 2, 1.0, true, true, &proxy, &mut ctx);
    assert_eq!(ctx.pending_crumble(), &[42]);

    ctx.process(&mut c, &mut proxy);
    assert_eq!(proxy.break_calls, vec![vec![42]], "one call, one index");
}

/// Crumbling resets the stored decay to zero; the state change rides the
/// proxy's break batch instead.
#[test]
fn test_crumble_resets_stored_decay() {
    let mut c = DynamicCollection::with_transforms(1);
    let proxy = RecordingProxy::with_transforms(1);
    let mut ctx = DecayContext::new();

    update_decay(&mut c, 0, 0.9, true, false, &proxy, &mut ctx);
    assert_eq!(c.decay[0], 0.0);
    assert_eq!(ctx.pending_crumble(), &[0]);
    assert!(ctx.pending_disable().is_empty());
}

/// A full tick issues at most one break_clusters and one disable_particles
/// call no matter how many transforms decayed.
#[test]
fn test_tick_flush_batches_proxy_calls() {
    let n = 8;
    let mut c = DynamicCollection::with_transforms(n);
    for i in 1..n {
        c.set_parent(i, 0);
        c.mark_broken(i);
    }
    let settings: Vec<_> = (0..n).map(|_| break_settings(0.0, false)).collect();
    let facade = RemoveOnBreak::new(settings);
    let mut proxy = RecordingProxy::with_transforms(n);

    let mut ctx = DecayContext::new();
    increment_break_timer(&mut c, &facade, &proxy, 0.1, &mut ctx);
    ctx.process(&mut c, &mut proxy);

    assert_eq!(proxy.disable_calls.len(), 1, "one disable batch per tick");
    let mut disabled = proxy.disable_calls[0].clone();
    disabled.sort_unstable();
    assert_eq!(disabled, (1..n).collect::<Vec<_>>());
    for i in 1..n {
        assert!(c.disabled[i]);
        assert_eq!(c.decay[i], 1.0);
    }
}

/// Root transforms never decay from sleep; children do.
#[test]
fn test_sleep_driver_exempts_root() {
    let mut c = DynamicCollection::with_transforms(3);
    c.set_parent(1, 0);
    c.set_parent(2, 0);
    for i in 0..3 {
        c.state[i] = ObjectState::Sleeping;
    }
    let settings: Vec<_> = (0..3)
        .map(|_| SleepRemovalSettings {
            enabled: true,
            max_sleep_time: 0.0,
            removal_duration: 1.0,
            ..Default::default()
        })
        .collect();
    let facade = RemoveOnSleep::new(settings);
    let proxy = RecordingProxy::with_transforms(3);

    let mut ctx = DecayContext::new();
    increment_sleep_timer(&mut c, &facade, &proxy, 0.5, &mut ctx);

    assert_eq!(c.decay[0], 0.0, "root is exempt from remove-on-sleep");
    assert!(c.decay[1] > 0.0);
    assert!(c.decay[2] > 0.0);
}

/// A child under a runtime internal cluster uses its original parent's
/// policy, and full decay crumbles the internal cluster.
#[test]
fn test_internal_cluster_attribution() {
    let mut c = DynamicCollection::with_transforms(2);
    c.set_parent(1, 0);
    c.mark_broken(1);
    c.set_internal_cluster_parent(1, true);

    // Policy lives on the parent (index 0); the child's own slot is
    // disabled and would skip removal entirely if consulted.
    let facade = RemoveOnBreak::new(vec![
        break_settings(0.0, true),
        BreakRemovalSettings::default(),
    ]);
    let mut proxy = RecordingProxy::with_transforms(2);
    proxy.internal_parents[1] = Some(-7);

    let mut ctx = DecayContext::new();
    increment_break_timer(&mut c, &facade, &proxy, 0.1, &mut ctx);
    assert_eq!(ctx.pending_crumble(), &[-7], "crumble targets the internal cluster");
    assert_eq!(c.decay[1], 0.0, "crumbling resets stored decay");

    ctx.process(&mut c, &mut proxy);
    assert_eq!(proxy.break_calls, vec![vec![-7]]);
}

/// Disabled particles are skipped by both drivers.
#[test]
fn test_drivers_skip_disabled_particles() {
    let mut c = DynamicCollection::with_transforms(2);
    c.set_parent(1, 0);
    c.mark_broken(1);
    c.disabled[1] = true;

    let facade = RemoveOnBreak::new(vec![break_settings(1.0, false); 2]);
    let proxy = RecordingProxy::with_transforms(2);
    let mut ctx = DecayContext::new();
    increment_break_timer(&mut c, &facade, &proxy, 0.5, &mut ctx);
    assert!(ctx.is_empty());
    assert_eq!(c.break_timer[1], 0.0);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Monotonicity holds under arbitrary decay update sequences.
    #[test]
    fn prop_decay_never_regresses(updates in prop::collection::vec(0.0f32..2.0, 1..40)) {
        let mut c = DynamicCollection::with_transforms(1);
        let proxy = RecordingProxy::with_transforms(1);
        let mut ctx = DecayContext::new();

        let mut previous = 0.0f32;
        for u in updates {
            update_decay(&mut c, 0, u, false, false, &proxy, &mut ctx);
            prop_assert!(c.decay[0] >= previous, "decay regressed: {} -> {}", previous, c.decay[0]);
            prop_assert!(c.decay[0] <= 1.0);
            previous = c.decay[0];
        }
    }
}
