use std::collections::HashMap;
use std::sync::Arc;

use crate::timer::TimerHandle;
use crate::worker::{BindingTier, WorkerHandle, WorkerId};

/// Names one registration of a worker.
///
/// Worker ids are process ids and the host may reuse them, so every registration gets a fresh
/// serial. A reference whose serial no longer matches the registry entry is stale and resolves to
/// nothing, which makes every operation through it a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ConnectionRef {
    pub(crate) id: WorkerId,
    pub(crate) serial: u64,
}

/// Strong binding work produced by a reason flag flipping.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum StrongBindingChange {
    Acquire,
    Release { keep_as_moderate: bool },
}

/// One registered worker plus the reasons it currently deserves a strong binding.
///
/// The foreground and background-period reasons are tracked separately so that one being
/// withdrawn never releases a binding the other still needs.
pub(crate) struct ManagedConnection {
    reference: ConnectionRef,
    worker: Arc<dyn WorkerHandle>,
    in_foreground: bool,
    bound_for_background_period: bool,
    pending_release: Option<TimerHandle>,
}

impl ManagedConnection {
    pub(crate) fn new(reference: ConnectionRef, worker: Arc<dyn WorkerHandle>) -> Self {
        Self {
            reference,
            worker,
            in_foreground: false,
            bound_for_background_period: false,
            pending_release: None,
        }
    }

    pub(crate) fn reference(&self) -> ConnectionRef {
        self.reference
    }

    pub(crate) fn id(&self) -> WorkerId {
        self.reference.id
    }

    pub(crate) fn worker(&self) -> &dyn WorkerHandle {
        self.worker.as_ref()
    }

    pub(crate) fn in_foreground(&self) -> bool {
        self.in_foreground
    }

    pub(crate) fn bound_for_background_period(&self) -> bool {
        self.bound_for_background_period
    }

    pub(crate) fn holds_strong_reason(&self) -> bool {
        self.in_foreground || self.bound_for_background_period
    }

    pub(crate) fn set_in_foreground(&mut self, next: bool) -> Option<StrongBindingChange> {
        let change = match (self.in_foreground, next) {
            (false, true) => Some(StrongBindingChange::Acquire),
            (true, false) => Some(StrongBindingChange::Release {
                keep_as_moderate: true,
            }),
            _ => None,
        };
        self.in_foreground = next;
        change
    }

    /// Background-period releases never fall back to the moderate pool: that binding is an
    /// exception for the backgrounded process, not a signal of recent use.
    pub(crate) fn set_bound_for_background_period(
        &mut self,
        next: bool,
    ) -> Option<StrongBindingChange> {
        let change = match (self.bound_for_background_period, next) {
            (false, true) => Some(StrongBindingChange::Acquire),
            (true, false) => Some(StrongBindingChange::Release {
                keep_as_moderate: false,
            }),
            _ => None,
        };
        self.bound_for_background_period = next;
        change
    }

    pub(crate) fn take_pending_release(&mut self) -> Option<TimerHandle> {
        self.pending_release.take()
    }

    pub(crate) fn set_pending_release(&mut self, handle: TimerHandle) {
        self.pending_release = Some(handle);
    }

    /// Forgets `handle` if it is the release this connection is waiting on.
    pub(crate) fn release_fired(&mut self, handle: TimerHandle) {
        if self.pending_release == Some(handle) {
            self.pending_release = None;
        }
    }

    pub(crate) fn has_binding(&self, tier: BindingTier) -> bool {
        self.worker.has_binding(tier)
    }

    /// Returns `true` if an initial binding was present and has been removed.
    pub(crate) fn remove_initial_binding(&self) -> bool {
        if !self.worker.has_binding(BindingTier::Initial) {
            return false;
        }
        self.worker.remove_binding(BindingTier::Initial);
        true
    }

    pub(crate) fn add_strong_binding(&self) {
        if !self.worker.has_binding(BindingTier::Strong) {
            self.worker.add_binding(BindingTier::Strong);
        }
    }

    pub(crate) fn remove_strong_binding(&self) {
        self.worker.remove_binding(BindingTier::Strong);
    }

    pub(crate) fn add_moderate_binding(&self) {
        self.worker.add_binding(BindingTier::Moderate);
    }

    pub(crate) fn remove_moderate_binding(&self) {
        if self.worker.has_binding(BindingTier::Moderate) {
            self.worker.remove_binding(BindingTier::Moderate);
        }
    }

    /// Low-memory devices only: strips every tier so a newly foregrounded worker is the single
    /// protected one.
    pub(crate) fn drop_bindings(&self) {
        self.worker.drop_all_bindings();
    }
}

/// Live connections keyed by worker id.
#[derive(Default)]
pub(crate) struct Registry {
    connections: HashMap<WorkerId, ManagedConnection>,
}

impl Registry {
    pub(crate) fn get(&self, id: WorkerId) -> Option<&ManagedConnection> {
        self.connections.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: WorkerId) -> Option<&mut ManagedConnection> {
        self.connections.get_mut(&id)
    }

    pub(crate) fn resolve(&self, reference: ConnectionRef) -> Option<&ManagedConnection> {
        self.connections
            .get(&reference.id)
            .filter(|connection| connection.reference == reference)
    }

    pub(crate) fn resolve_mut(&mut self, reference: ConnectionRef) -> Option<&mut ManagedConnection> {
        self.connections
            .get_mut(&reference.id)
            .filter(|connection| connection.reference == reference)
    }

    pub(crate) fn contains(&self, id: WorkerId) -> bool {
        self.connections.contains_key(&id)
    }

    pub(crate) fn insert(&mut self, connection: ManagedConnection) -> Option<ManagedConnection> {
        self.connections.insert(connection.id(), connection)
    }

    pub(crate) fn remove(&mut self, id: WorkerId) -> Option<ManagedConnection> {
        self.connections.remove(&id)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &ManagedConnection> {
        self.connections.values()
    }

    /// Revokes the moderate binding of the worker currently registered under `id`, if any.
    pub(crate) fn revoke_moderate(&self, id: WorkerId) {
        if let Some(connection) = self.get(id) {
            connection.remove_moderate_binding();
        }
    }
}
