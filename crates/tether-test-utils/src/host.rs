use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use tether_binding::{BindingTier, SlotNumber, WorkerHandle};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostEventKind {
    Added(BindingTier),
    Removed(BindingTier),
    /// An add the host refused.
    Denied(BindingTier),
    DroppedAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostEvent {
    pub slot: SlotNumber,
    pub kind: HostEventKind,
}

/// Stand-in for the process-launch layer.
#[derive(Debug, Clone, Default)]
pub struct FakeHost {
    log: Arc<Mutex<Vec<HostEvent>>>,
}

impl FakeHost {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sandboxed worker that starts out holding its initial binding.
    pub fn worker(&self, slot: u32) -> Arc<FakeWorker> {
        Arc::new(FakeWorker::new(SlotNumber(slot), true, Arc::clone(&self.log)))
    }

    pub fn unsandboxed_worker(&self, slot: u32) -> Arc<FakeWorker> {
        Arc::new(FakeWorker::new(SlotNumber(slot), false, Arc::clone(&self.log)))
    }

    pub fn events(&self) -> Vec<HostEvent> {
        self.log.lock().clone()
    }

    pub fn clear_events(&self) {
        self.log.lock().clear();
    }
}

#[derive(Debug, Default)]
struct BindingState {
    held: HashSet<BindingTier>,
    denied: HashSet<BindingTier>,
    grants: Vec<BindingTier>,
}

/// In-memory [`WorkerHandle`].
#[derive(Debug)]
pub struct FakeWorker {
    slot: SlotNumber,
    sandboxed: bool,
    state: Mutex<BindingState>,
    log: Arc<Mutex<Vec<HostEvent>>>,
}

impl FakeWorker {
    fn new(slot: SlotNumber, sandboxed: bool, log: Arc<Mutex<Vec<HostEvent>>>) -> Self {
        let mut state = BindingState::default();
        state.held.insert(BindingTier::Initial);
        Self {
            slot,
            sandboxed,
            state: Mutex::new(state),
            log,
        }
    }

    /// Makes the host refuse future adds of `tier`.
    pub fn deny(&self, tier: BindingTier) {
        self.state.lock().denied.insert(tier);
    }

    pub fn allow(&self, tier: BindingTier) {
        self.state.lock().denied.remove(&tier);
    }

    pub fn has(&self, tier: BindingTier) -> bool {
        self.state.lock().held.contains(&tier)
    }

    /// Bindings currently held, strongest first.
    pub fn held(&self) -> Vec<BindingTier> {
        let state = self.state.lock();
        BindingTier::all()
            .into_iter()
            .filter(|tier| state.held.contains(tier))
            .collect()
    }

    /// How many times an add of `tier` was granted.
    pub fn grant_count(&self, tier: BindingTier) -> usize {
        self.state
            .lock()
            .grants
            .iter()
            .filter(|granted| **granted == tier)
            .count()
    }

    /// This worker's slice of the shared event log.
    pub fn events(&self) -> Vec<HostEventKind> {
        self.log
            .lock()
            .iter()
            .filter(|event| event.slot == self.slot)
            .map(|event| event.kind)
            .collect()
    }

    fn record(&self, kind: HostEventKind) {
        tracing::trace!(slot = %self.slot, ?kind, "fake worker binding event");
        self.log.lock().push(HostEvent {
            slot: self.slot,
            kind,
        });
    }
}

impl WorkerHandle for FakeWorker {
    fn slot_number(&self) -> SlotNumber {
        self.slot
    }

    fn is_sandboxed(&self) -> bool {
        self.sandboxed
    }

    fn add_binding(&self, tier: BindingTier) {
        let granted = {
            let mut state = self.state.lock();
            if state.denied.contains(&tier) {
                false
            } else {
                state.held.insert(tier);
                state.grants.push(tier);
                true
            }
        };
        self.record(if granted {
            HostEventKind::Added(tier)
        } else {
            HostEventKind::Denied(tier)
        });
    }

    fn remove_binding(&self, tier: BindingTier) {
        self.state.lock().held.remove(&tier);
        self.record(HostEventKind::Removed(tier));
    }

    fn has_binding(&self, tier: BindingTier) -> bool {
        self.has(tier)
    }

    fn drop_all_bindings(&self) {
        self.state.lock().held.clear();
        self.record(HostEventKind::DroppedAll);
    }
}
