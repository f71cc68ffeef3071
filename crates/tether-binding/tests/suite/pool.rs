use std::sync::Arc;

use tether_binding::{
    BindingError, BindingSettings, BindingTier, FixedDeviceClass, MemoryPressureLevel,
    MemorySignal, WorkerId,
};
use tether_test_utils::FakeWorker;

use super::common::{Harness, RELEASE_DELAY};

/// Eight pooled workers, slot `n` for worker `n`, admitted in id order (1 is least recent).
fn pool_of_eight(settings: BindingSettings) -> (Harness, Vec<Arc<FakeWorker>>) {
    let mut harness = Harness::with_settings(settings, FixedDeviceClass::NORMAL);
    harness.coordinator.enable_moderate_pool(16).expect("pool");
    let workers = (1..=8).map(|id| harness.register_pooled(id)).collect();
    (harness, workers)
}

fn moderate_holders(workers: &[Arc<FakeWorker>]) -> Vec<u32> {
    workers
        .iter()
        .enumerate()
        .filter(|(_, worker)| worker.has(BindingTier::Moderate))
        .map(|(index, _)| index as u32 + 1)
        .collect()
}

#[test]
fn moderate_pressure_evicts_a_quarter_least_recent_first() {
    let (mut harness, workers) = pool_of_eight(BindingSettings::default());

    harness
        .coordinator
        .handle_memory_signal(MemorySignal::Pressure(MemoryPressureLevel::Moderate));

    assert_eq!(harness.pool_slots(), vec![3, 4, 5, 6, 7, 8]);
    assert_eq!(moderate_holders(&workers), vec![3, 4, 5, 6, 7, 8]);
    harness.assert_pool_consistent();
}

#[test]
fn low_pressure_evicts_half() {
    let (mut harness, workers) = pool_of_eight(BindingSettings::default());

    harness
        .coordinator
        .handle_memory_signal(MemorySignal::Pressure(MemoryPressureLevel::Low));

    assert_eq!(harness.pool_slots(), vec![5, 6, 7, 8]);
    assert_eq!(moderate_holders(&workers), vec![5, 6, 7, 8]);
}

#[test]
fn ratio_reaching_zero_size_evicts_everything() {
    let settings = BindingSettings {
        moderate_reduce_ratio: 1.0,
        ..BindingSettings::default()
    };
    let (mut harness, workers) = pool_of_eight(settings);

    harness
        .coordinator
        .handle_memory_signal(MemorySignal::Pressure(MemoryPressureLevel::Moderate));

    assert_eq!(harness.coordinator.moderate_pool_len(), Some(0));
    assert!(moderate_holders(&workers).is_empty());
}

#[test]
fn small_pools_round_down_to_empty() {
    let mut harness = Harness::normal();
    harness.coordinator.enable_moderate_pool(4).expect("pool");
    let worker = harness.register_pooled(1);

    // floor(1 * 0.5) == 0
    harness
        .coordinator
        .handle_memory_signal(MemorySignal::Pressure(MemoryPressureLevel::Low));

    assert_eq!(harness.coordinator.moderate_pool_len(), Some(0));
    assert!(!worker.has(BindingTier::Moderate));
}

#[test]
fn critical_pressure_and_system_low_memory_evict_everything() {
    for signal in [
        MemorySignal::Pressure(MemoryPressureLevel::Critical),
        MemorySignal::SystemLowMemory,
    ] {
        let (mut harness, workers) = pool_of_eight(BindingSettings::default());

        harness.coordinator.handle_memory_signal(signal);

        assert_eq!(harness.coordinator.moderate_pool_len(), Some(0), "{signal:?}");
        assert!(moderate_holders(&workers).is_empty(), "{signal:?}");
    }
}

#[test]
fn ui_hidden_and_configuration_changes_are_ignored() {
    for signal in [
        MemorySignal::Pressure(MemoryPressureLevel::UiHidden),
        MemorySignal::ConfigurationChanged,
    ] {
        let (mut harness, workers) = pool_of_eight(BindingSettings::default());

        harness.coordinator.handle_memory_signal(signal);

        assert_eq!(harness.coordinator.moderate_pool_len(), Some(8), "{signal:?}");
        assert_eq!(moderate_holders(&workers).len(), 8, "{signal:?}");
    }
}

#[test]
fn signals_without_a_pool_are_ignored() {
    let mut harness = Harness::normal();
    let worker = harness.register(1);

    harness
        .coordinator
        .handle_memory_signal(MemorySignal::Pressure(MemoryPressureLevel::Critical));

    assert!(worker.events().is_empty());
}

#[test]
fn capacity_overflow_revokes_the_least_recent_entry() {
    let mut harness = Harness::normal();
    harness.coordinator.enable_moderate_pool(2).expect("pool");
    let first = harness.register_pooled(1);
    let second = harness.register_pooled(2);
    let third = harness.register_pooled(3);

    assert_eq!(harness.pool_slots(), vec![2, 3]);
    assert!(!first.has(BindingTier::Moderate));
    assert!(second.has(BindingTier::Moderate));
    assert!(third.has(BindingTier::Moderate));
    harness.assert_pool_consistent();
}

#[test]
fn readmission_makes_a_worker_most_recent() {
    let mut harness = Harness::normal();
    harness.coordinator.enable_moderate_pool(4).expect("pool");
    for id in 1..=3 {
        harness.register_pooled(id);
    }

    harness.coordinator.set_foreground(WorkerId(1), true);
    assert_eq!(harness.pool_slots(), vec![2, 3]);
    harness.coordinator.set_foreground(WorkerId(1), false);
    harness.advance(RELEASE_DELAY);
    assert_eq!(harness.pool_slots(), vec![2, 3, 1]);

    // floor(3 * 0.75) == 2, so only the least recent entry goes.
    harness
        .coordinator
        .handle_memory_signal(MemorySignal::Pressure(MemoryPressureLevel::Moderate));
    assert_eq!(harness.pool_slots(), vec![3, 1]);
}

#[test]
fn release_all_moderate_bindings_empties_the_pool() {
    let (mut harness, workers) = pool_of_eight(BindingSettings::default());

    harness.coordinator.release_all_moderate_bindings();

    assert_eq!(harness.coordinator.moderate_pool_len(), Some(0));
    assert!(moderate_holders(&workers).is_empty());
    assert!(workers
        .iter()
        .all(|worker| worker.grant_count(BindingTier::Moderate) == 1));
}

#[test]
fn zero_capacity_is_rejected() {
    let mut harness = Harness::normal();

    assert_eq!(
        harness.coordinator.enable_moderate_pool(0),
        Err(BindingError::ZeroPoolCapacity)
    );
    assert_eq!(harness.coordinator.moderate_pool_len(), None);
}

#[test]
fn enabling_twice_keeps_the_first_pool() {
    let mut harness = Harness::normal();
    harness.coordinator.enable_moderate_pool(2).expect("pool");
    harness.register_pooled(1);

    harness.coordinator.enable_moderate_pool(8).expect("pool");

    let pool = harness.coordinator.snapshot().moderate_pool.expect("pool");
    assert_eq!(pool.capacity, 2);
    assert_eq!(harness.coordinator.moderate_pool_len(), Some(1));
}
