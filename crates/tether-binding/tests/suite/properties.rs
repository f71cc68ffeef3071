use std::collections::HashSet;
use std::time::Duration;

use proptest::prelude::*;
use tether_binding::{MemoryPressureLevel, MemorySignal, WorkerId};

use super::common::Harness;

const PROPTEST_CASES: u32 = 256;
const MAX_WORKER_ID: u32 = 5;

#[derive(Clone, Debug)]
enum Op {
    Register(u32),
    Deregister(u32),
    SetForeground(u32, bool),
    VisibilityDetermined(u32),
    SentToBackground,
    BroughtToForeground,
    Signal(MemorySignal),
    ReleaseAll,
    Advance(u64),
}

fn arb_id() -> impl Strategy<Value = u32> {
    1..=MAX_WORKER_ID
}

fn arb_signal() -> impl Strategy<Value = MemorySignal> {
    prop_oneof![
        Just(MemorySignal::Pressure(MemoryPressureLevel::Moderate)),
        Just(MemorySignal::Pressure(MemoryPressureLevel::Low)),
        Just(MemorySignal::Pressure(MemoryPressureLevel::Critical)),
        Just(MemorySignal::Pressure(MemoryPressureLevel::UiHidden)),
        Just(MemorySignal::SystemLowMemory),
        Just(MemorySignal::ConfigurationChanged),
    ]
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => arb_id().prop_map(Op::Register),
        2 => arb_id().prop_map(Op::Deregister),
        6 => (arb_id(), any::<bool>()).prop_map(|(id, on)| Op::SetForeground(id, on)),
        3 => arb_id().prop_map(Op::VisibilityDetermined),
        1 => Just(Op::SentToBackground),
        1 => Just(Op::BroughtToForeground),
        2 => arb_signal().prop_map(Op::Signal),
        1 => Just(Op::ReleaseAll),
        4 => (0u64..=12_000).prop_map(Op::Advance),
    ]
}

fn run(harness: &mut Harness, ops: &[Op], capacity: usize) -> Result<(), TestCaseError> {
    harness
        .coordinator
        .enable_moderate_pool(capacity)
        .map_err(|err| TestCaseError::fail(err.to_string()))?;
    let mut live = HashSet::new();
    let mut in_background = false;

    for op in ops {
        match *op {
            Op::Register(id) => {
                harness.register(id);
                live.insert(id);
            }
            Op::Deregister(id) => {
                harness.coordinator.deregister_worker(WorkerId(id));
                live.remove(&id);
            }
            Op::SetForeground(id, on) => harness.coordinator.set_foreground(WorkerId(id), on),
            Op::VisibilityDetermined(id) => {
                harness.coordinator.on_visibility_determined(WorkerId(id))
            }
            Op::SentToBackground => {
                if !in_background {
                    prop_assert!(harness.coordinator.on_sent_to_background().is_ok());
                    in_background = true;
                }
            }
            Op::BroughtToForeground => {
                harness.coordinator.on_brought_to_foreground();
                in_background = false;
            }
            Op::Signal(signal) => harness.coordinator.handle_memory_signal(signal),
            Op::ReleaseAll => harness.coordinator.release_all_moderate_bindings(),
            Op::Advance(ms) => {
                harness.advance(Duration::from_millis(ms));
            }
        }

        let snapshot = harness.coordinator.snapshot();
        for worker in &snapshot.workers {
            prop_assert!(
                worker.pool_membership_consistent(),
                "after {op:?}: {worker:?}"
            );
            if worker.in_foreground {
                prop_assert!(worker.strong, "after {op:?}: {worker:?}");
            }
        }
        let pool = snapshot.moderate_pool.as_ref().expect("pool enabled");
        prop_assert!(pool.slots.len() <= capacity);
        prop_assert_eq!(snapshot.in_background, in_background);

        for id in 1..=MAX_WORKER_ID {
            prop_assert_eq!(
                harness.coordinator.is_deregistered(WorkerId(id)),
                !live.contains(&id),
                "after {:?}: worker {}",
                op,
                id
            );
        }
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: PROPTEST_CASES,
        .. ProptestConfig::default()
    })]

    #[test]
    fn pool_tracks_moderate_not_strong_workers(
        ops in prop::collection::vec(arb_op(), 1..64),
        capacity in 1usize..=4,
    ) {
        let mut harness = Harness::normal();
        run(&mut harness, &ops, capacity)?;
    }

    #[test]
    fn moderate_bindings_only_exist_inside_the_pool(
        ops in prop::collection::vec(arb_op(), 1..64),
    ) {
        let mut harness = Harness::normal();
        run(&mut harness, &ops, 3)?;

        let snapshot = harness.coordinator.snapshot();
        let pooled = snapshot
            .workers
            .iter()
            .filter(|worker| worker.moderate)
            .count();
        prop_assert_eq!(pooled, harness.coordinator.moderate_pool_len().unwrap_or_default());
        for worker in &snapshot.workers {
            if worker.moderate {
                prop_assert!(harness.coordinator.is_in_moderate_pool(worker.id));
                prop_assert!(!worker.strong);
            }
        }
    }
}
