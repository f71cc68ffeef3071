use tether_binding::{BindingTier, WorkerId};

use super::common::{Harness, RELEASE_DELAY};

#[test]
fn worker_42_lifecycle_strong_then_moderate_then_deregistered() {
    let mut harness = Harness::normal();
    harness.coordinator.enable_moderate_pool(4).expect("pool");
    let id = WorkerId(42);
    let worker = harness.register(42);

    harness.coordinator.set_foreground(id, true);
    assert!(worker.has(BindingTier::Strong));
    assert!(!harness.coordinator.is_in_moderate_pool(id));

    harness.coordinator.set_foreground(id, false);
    assert!(
        worker.has(BindingTier::Strong),
        "strong binding must survive until the release delay elapses"
    );
    assert_eq!(
        harness.coordinator.next_deadline(),
        Some(harness.clock_now() + RELEASE_DELAY)
    );

    assert_eq!(harness.advance(RELEASE_DELAY), 1);
    assert!(!worker.has(BindingTier::Strong));
    assert!(worker.has(BindingTier::Moderate));
    assert!(harness.coordinator.is_in_moderate_pool(id));

    harness.coordinator.deregister_worker(id);
    assert!(harness.coordinator.is_deregistered(id));
    assert!(!harness.coordinator.is_in_moderate_pool(id));
    assert_eq!(harness.coordinator.moderate_pool_len(), Some(0));
    assert!(!worker.has(BindingTier::Moderate));
    assert!(harness.coordinator.snapshot().worker(id).is_none());
}

#[test]
fn never_registered_ids_are_deregistered() {
    let harness = Harness::normal();
    assert!(harness.coordinator.is_deregistered(WorkerId(7)));
}

#[test]
fn operations_on_unknown_ids_are_no_ops() {
    let mut harness = Harness::normal();
    harness.coordinator.enable_moderate_pool(4).expect("pool");
    let bystander = harness.register(1);

    harness.coordinator.set_foreground(WorkerId(7), true);
    harness.coordinator.set_foreground(WorkerId(7), false);
    harness.coordinator.on_visibility_determined(WorkerId(7));
    harness.coordinator.deregister_worker(WorkerId(7));

    assert!(harness.coordinator.is_deregistered(WorkerId(7)));
    assert!(bystander.events().is_empty());
    assert_eq!(harness.coordinator.next_deadline(), None);
}

#[test]
fn visibility_determined_swaps_initial_for_moderate() {
    let mut harness = Harness::normal();
    harness.coordinator.enable_moderate_pool(4).expect("pool");
    let worker = harness.register(3);
    assert!(worker.has(BindingTier::Initial));

    harness.coordinator.on_visibility_determined(WorkerId(3));
    assert_eq!(worker.held(), vec![BindingTier::Moderate]);
    assert!(harness.coordinator.is_in_moderate_pool(WorkerId(3)));

    // A second signal finds no initial binding and changes nothing.
    let before = worker.events();
    harness.coordinator.on_visibility_determined(WorkerId(3));
    assert_eq!(worker.events(), before);
}

#[test]
fn visibility_without_pool_only_drops_initial_binding() {
    let mut harness = Harness::normal();
    let worker = harness.register(3);

    harness.coordinator.on_visibility_determined(WorkerId(3));

    assert!(worker.held().is_empty());
    assert_eq!(harness.coordinator.moderate_pool_len(), None);
}

#[test]
fn reregistering_an_id_clears_the_stale_connection() {
    let mut harness = Harness::normal();
    harness.coordinator.enable_moderate_pool(4).expect("pool");
    let stale = harness.register_pooled(5);
    assert!(stale.has(BindingTier::Moderate));

    let fresh = harness.host.worker(50);
    harness
        .coordinator
        .register_worker(WorkerId(5), fresh.clone());

    assert!(!stale.has(BindingTier::Moderate));
    assert_eq!(harness.coordinator.moderate_pool_len(), Some(0));
    assert!(!harness.coordinator.is_deregistered(WorkerId(5)));
    assert_eq!(fresh.held(), vec![BindingTier::Initial]);
    assert!(fresh.events().is_empty());
}

#[test]
fn pending_release_for_a_reused_id_does_not_touch_the_new_worker() {
    let mut harness = Harness::normal();
    let stale = harness.register(9);
    harness.coordinator.set_foreground(WorkerId(9), true);
    harness.coordinator.set_foreground(WorkerId(9), false);

    let fresh = harness.host.unsandboxed_worker(90);
    harness
        .coordinator
        .register_worker(WorkerId(9), fresh.clone());
    harness.coordinator.set_foreground(WorkerId(9), true);

    assert_eq!(harness.advance(RELEASE_DELAY), 1);
    assert!(fresh.has(BindingTier::Strong));
    assert_eq!(fresh.grant_count(BindingTier::Strong), 1);
    assert!(stale.has(BindingTier::Strong));
}

#[test]
fn snapshot_reports_workers_sorted_by_id() {
    let mut harness = Harness::normal();
    harness.coordinator.enable_moderate_pool(2).expect("pool");
    harness.register(30);
    harness.register_pooled(10);
    harness.register(20);
    harness.coordinator.set_foreground(WorkerId(20), true);

    let snapshot = harness.coordinator.snapshot();
    let ids: Vec<u32> = snapshot.workers.iter().map(|worker| worker.id.0).collect();
    assert_eq!(ids, vec![10, 20, 30]);

    let foreground = snapshot.worker(WorkerId(20)).expect("worker 20");
    assert!(foreground.in_foreground && foreground.strong && foreground.initial);
    let pooled = snapshot.worker(WorkerId(10)).expect("worker 10");
    assert!(pooled.in_moderate_pool && pooled.moderate && !pooled.initial);

    let pool = snapshot.moderate_pool.as_ref().expect("pool snapshot");
    assert_eq!(pool.capacity, 2);
    assert!(!pool.delayed_clear_pending);
    assert!(!snapshot.low_memory_device);
    assert!(!snapshot.in_background);

    let json = serde_json::to_value(&snapshot).expect("serialize");
    assert_eq!(json["workers"][0]["id"], 10);
    assert_eq!(json["moderate_pool"]["slots"], serde_json::json!([10]));
}
