use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Instant;

use crate::clock::{Clock, SystemClock};
use crate::connection::{ConnectionRef, ManagedConnection, Registry, StrongBindingChange};
use crate::device::DeviceClassifier;
use crate::error::BindingError;
use crate::metrics::{MetricsSink, NoopMetrics};
use crate::pool::ModerateBindingPool;
use crate::settings::BindingSettings;
use crate::signal::MemorySignal;
use crate::snapshot::{BindingSnapshot, PoolSnapshot, WorkerSnapshot};
use crate::thread::ThreadChecker;
use crate::timer::TimerQueue;
use crate::worker::{BindingTier, WorkerHandle, WorkerId};

/// Work the coordinator schedules for later instead of doing inline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum DeferredTask {
    /// Drop a strong binding once its grace period ends, unless a reason re-acquired it.
    ReleaseStrongBinding {
        connection: ConnectionRef,
        keep_as_moderate: bool,
    },
    /// Release every pooled moderate binding after a long enough background period.
    ClearModeratePool,
}

/// Assigns and revokes OOM binding strength for registered workers.
///
/// The coordinator is single-threaded: every method must be called from the thread that first
/// used it (checked in debug builds). Deferred work is queued internally and runs when the owner
/// calls [`BindingCoordinator::run_due_tasks`]; [`BindingCoordinator::next_deadline`] says when.
pub struct BindingCoordinator {
    settings: BindingSettings,
    low_memory_device: bool,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn MetricsSink>,
    registry: Registry,
    pool: Option<ModerateBindingPool>,
    timers: TimerQueue<DeferredTask>,
    // Most recently foregrounded worker. Gets the background-period binding, and on low-memory
    // devices is the one whose bindings are dropped when another worker takes the foreground.
    last_in_foreground: Option<ConnectionRef>,
    bound_for_background_period: Option<ConnectionRef>,
    in_background: bool,
    next_serial: u64,
    thread_checker: ThreadChecker,
}

impl BindingCoordinator {
    /// Builds a coordinator; `classifier` is consulted once, here.
    pub fn new(settings: BindingSettings, classifier: &dyn DeviceClassifier) -> Self {
        let low_memory_device = classifier.is_low_memory_device();
        tracing::info!(
            target = "tether.binding",
            low_memory_device,
            "binding coordinator created"
        );
        Self {
            settings,
            low_memory_device,
            clock: Arc::new(SystemClock),
            metrics: Arc::new(NoopMetrics),
            registry: Registry::default(),
            pool: None,
            timers: TimerQueue::new(),
            last_in_foreground: None,
            bound_for_background_period: None,
            in_background: false,
            next_serial: 1,
            thread_checker: ThreadChecker::default(),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Ignored when [`BindingSettings::record_metrics`] is off.
    pub fn with_metrics(mut self, metrics: Arc<dyn MetricsSink>) -> Self {
        if self.settings.record_metrics {
            self.metrics = metrics;
        }
        self
    }

    pub fn settings(&self) -> &BindingSettings {
        &self.settings
    }

    pub fn is_low_memory_device(&self) -> bool {
        self.low_memory_device
    }

    /// Starts tracking `worker` under `id`, replacing any stale entry left by a reused pid.
    pub fn register_worker(&mut self, id: WorkerId, worker: Arc<dyn WorkerHandle>) {
        self.assert_on_owner_thread();
        if self.registry.contains(id) {
            tracing::debug!(
                target = "tether.binding",
                worker = %id,
                "replacing stale registration for reused worker id"
            );
            self.clear_connection(id);
        }

        let reference = ConnectionRef {
            id,
            serial: self.next_serial,
        };
        self.next_serial += 1;
        self.registry
            .insert(ManagedConnection::new(reference, worker));
    }

    pub fn set_foreground(&mut self, id: WorkerId, in_foreground: bool) {
        self.assert_on_owner_thread();
        let Some(connection) = self.registry.get(id) else {
            tracing::warn!(
                target = "tether.binding",
                worker = %id,
                "cannot set foreground state: worker was never registered"
            );
            return;
        };
        let reference = connection.reference();

        if in_foreground && self.low_memory_device {
            let previous = self
                .last_in_foreground
                .filter(|previous| *previous != reference)
                .and_then(|previous| self.registry.resolve(previous));
            if let Some(previous) = previous {
                tracing::debug!(
                    target = "tether.binding",
                    worker = %previous.id(),
                    "dropping bindings of previous foreground worker"
                );
                previous.drop_bindings();
            }
        }

        let change = self
            .registry
            .get_mut(id)
            .and_then(|connection| connection.set_in_foreground(in_foreground));
        if let Some(change) = change {
            self.apply_strong_change(reference, change);
        }
        if in_foreground {
            self.last_in_foreground = Some(reference);
        }
    }

    /// Called once the worker's visibility is known and its bring-up binding can go.
    pub fn on_visibility_determined(&mut self, id: WorkerId) {
        self.assert_on_owner_thread();
        let Some(connection) = self.registry.get(id) else {
            tracing::warn!(
                target = "tether.binding",
                worker = %id,
                "cannot determine visibility: worker was never registered"
            );
            return;
        };
        if !connection.remove_initial_binding() {
            return;
        }
        // Seed recency right away so a fresh background worker is not the first eviction
        // candidate.
        let reference = connection.reference();
        self.add_to_moderate_pool(reference);
    }

    /// The hosting process went to the background.
    pub fn on_sent_to_background(&mut self) -> Result<(), BindingError> {
        self.assert_on_owner_thread();
        if self.in_background {
            tracing::error!(
                target = "tether.binding",
                "on_sent_to_background called while already in the background"
            );
            debug_assert!(
                false,
                "on_sent_to_background called while already in the background"
            );
            return Err(BindingError::AlreadyInBackground);
        }
        self.in_background = true;

        // Nothing may have been foregrounded yet: the embedder can run without any worker.
        if let Some(reference) = self.last_in_foreground {
            let change = self
                .registry
                .resolve_mut(reference)
                .and_then(|connection| connection.set_bound_for_background_period(true));
            if let Some(change) = change {
                self.apply_strong_change(reference, change);
            }
            self.bound_for_background_period = Some(reference);
        }

        if let Some(pool) = self.pool.as_mut() {
            let deadline = self.clock.now() + self.settings.moderate_pool_clear_delay;
            pool.schedule_delayed_clear(&mut self.timers, deadline);
        }
        Ok(())
    }

    /// The hosting process returned to the foreground.
    pub fn on_brought_to_foreground(&mut self) {
        self.assert_on_owner_thread();
        self.in_background = false;

        if let Some(reference) = self.bound_for_background_period.take() {
            let change = self
                .registry
                .resolve_mut(reference)
                .and_then(|connection| connection.set_bound_for_background_period(false));
            if let Some(change) = change {
                self.apply_strong_change(reference, change);
            }
        }

        if let Some(pool) = self.pool.as_mut() {
            pool.cancel_delayed_clear(&mut self.timers);
        }
    }

    /// Stops tracking `id`. Unknown ids are ignored.
    pub fn deregister_worker(&mut self, id: WorkerId) {
        self.assert_on_owner_thread();
        if self.registry.contains(id) {
            self.clear_connection(id);
        }
    }

    /// True iff no live registration exists for `id`.
    pub fn is_deregistered(&self, id: WorkerId) -> bool {
        self.assert_on_owner_thread();
        !self.registry.contains(id)
    }

    /// Creates the moderate binding pool. No-op on low-memory devices and when already enabled.
    pub fn enable_moderate_pool(&mut self, capacity: usize) -> Result<(), BindingError> {
        self.assert_on_owner_thread();
        if self.low_memory_device || self.pool.is_some() {
            return Ok(());
        }
        let capacity = NonZeroUsize::new(capacity).ok_or(BindingError::ZeroPoolCapacity)?;
        tracing::info!(
            target = "tether.binding",
            capacity = capacity.get(),
            "moderate binding pool enabled"
        );
        self.pool = Some(ModerateBindingPool::new(capacity));
        Ok(())
    }

    /// Revokes every pooled moderate binding immediately.
    pub fn release_all_moderate_bindings(&mut self) {
        self.assert_on_owner_thread();
        if let Some(pool) = self.pool.as_mut() {
            tracing::info!(
                target = "tether.binding",
                size = pool.len(),
                "releasing all moderate bindings"
            );
            pool.evict_all(&self.registry);
        }
    }

    /// Single entry point for host memory callbacks.
    pub fn handle_memory_signal(&mut self, signal: MemorySignal) {
        self.assert_on_owner_thread();
        if let Some(pool) = self.pool.as_mut() {
            pool.handle_signal(signal, &self.settings, &self.registry);
        }
    }

    /// Earliest instant at which [`BindingCoordinator::run_due_tasks`] has work.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.timers.next_deadline()
    }

    /// Runs every deferred task that is due. Returns how many ran.
    pub fn run_due_tasks(&mut self) -> usize {
        self.assert_on_owner_thread();
        let now = self.clock.now();
        let mut ran = 0;
        while let Some((handle, task)) = self.timers.pop_due(now) {
            ran += 1;
            match task {
                DeferredTask::ReleaseStrongBinding {
                    connection,
                    keep_as_moderate,
                } => {
                    if let Some(managed) = self.registry.resolve_mut(connection) {
                        managed.release_fired(handle);
                    }
                    self.release_strong_binding(connection, keep_as_moderate);
                }
                DeferredTask::ClearModeratePool => {
                    if let Some(pool) = self.pool.as_mut() {
                        pool.run_delayed_clear(handle, &self.registry, self.metrics.as_ref());
                    }
                }
            }
        }
        ran
    }

    pub fn moderate_pool_len(&self) -> Option<usize> {
        self.pool.as_ref().map(ModerateBindingPool::len)
    }

    pub fn is_in_moderate_pool(&self, id: WorkerId) -> bool {
        self.pool
            .as_ref()
            .is_some_and(|pool| pool.contains_worker(id))
    }

    pub fn snapshot(&self) -> BindingSnapshot {
        self.assert_on_owner_thread();
        let mut workers: Vec<WorkerSnapshot> = self
            .registry
            .iter()
            .map(|connection| {
                let worker = connection.worker();
                WorkerSnapshot {
                    id: connection.id(),
                    slot: worker.slot_number(),
                    sandboxed: worker.is_sandboxed(),
                    in_foreground: connection.in_foreground(),
                    bound_for_background_period: connection.bound_for_background_period(),
                    initial: worker.has_binding(BindingTier::Initial),
                    strong: worker.has_binding(BindingTier::Strong),
                    moderate: worker.has_binding(BindingTier::Moderate),
                    in_moderate_pool: self.is_in_moderate_pool(connection.id()),
                }
            })
            .collect();
        workers.sort_by_key(|worker| worker.id);

        BindingSnapshot {
            low_memory_device: self.low_memory_device,
            in_background: self.in_background,
            workers,
            moderate_pool: self.pool.as_ref().map(|pool| PoolSnapshot {
                capacity: pool.capacity(),
                slots: pool.slots(),
                delayed_clear_pending: pool.delayed_clear_pending(),
            }),
            pending_tasks: self.timers.len(),
        }
    }

    fn apply_strong_change(&mut self, reference: ConnectionRef, change: StrongBindingChange) {
        match change {
            StrongBindingChange::Acquire => self.add_strong_binding(reference),
            StrongBindingChange::Release { keep_as_moderate } => {
                self.remove_strong_binding(reference, keep_as_moderate)
            }
        }
    }

    fn add_strong_binding(&mut self, reference: ConnectionRef) {
        let Some(connection) = self.registry.resolve(reference) else {
            return;
        };
        connection.add_strong_binding();
        // Strong supersedes moderate.
        if let Some(pool) = self.pool.as_mut() {
            pool.remove(connection, &self.registry);
        }
    }

    fn remove_strong_binding(&mut self, reference: ConnectionRef, keep_as_moderate: bool) {
        let Some(connection) = self.registry.resolve_mut(reference) else {
            return;
        };
        // The binding may already be gone, e.g. dropped on a low-memory device when another
        // worker took the foreground.
        if !connection.has_binding(BindingTier::Strong) {
            return;
        }

        if self.low_memory_device {
            self.release_strong_binding(reference, keep_as_moderate);
            return;
        }

        // The newest release decides whether the worker falls back to the pool.
        if let Some(previous) = connection.take_pending_release() {
            self.timers.cancel(previous);
        }

        let deadline = self.clock.now() + self.settings.strong_release_delay;
        let handle = self.timers.schedule(
            deadline,
            DeferredTask::ReleaseStrongBinding {
                connection: reference,
                keep_as_moderate,
            },
        );
        connection.set_pending_release(handle);
        tracing::debug!(
            target = "tether.binding",
            worker = %reference.id,
            delay_ms = self.settings.strong_release_delay.as_millis() as u64,
            "strong binding release scheduled"
        );
    }

    fn release_strong_binding(&mut self, reference: ConnectionRef, keep_as_moderate: bool) {
        let Some(connection) = self.registry.resolve(reference) else {
            return;
        };
        if !connection.has_binding(BindingTier::Strong) || connection.holds_strong_reason() {
            return;
        }
        connection.remove_strong_binding();
        tracing::debug!(
            target = "tether.binding",
            worker = %reference.id,
            keep_as_moderate,
            "strong binding released"
        );
        if keep_as_moderate {
            self.add_to_moderate_pool(reference);
        }
    }

    fn add_to_moderate_pool(&mut self, reference: ConnectionRef) {
        let Some(pool) = self.pool.as_mut() else {
            return;
        };
        let Some(connection) = self.registry.resolve(reference) else {
            return;
        };
        if connection.has_binding(BindingTier::Strong) {
            return;
        }
        pool.add(connection, &self.registry, self.metrics.as_ref());
    }

    fn clear_connection(&mut self, id: WorkerId) {
        if let (Some(pool), Some(connection)) = (self.pool.as_mut(), self.registry.get(id)) {
            pool.remove(connection, &self.registry);
        }
        if self.registry.remove(id).is_some() {
            tracing::debug!(
                target = "tether.binding",
                worker = %id,
                "worker connection cleared"
            );
        }
    }

    fn assert_on_owner_thread(&self) {
        if !self.thread_checker.called_on_valid_thread() {
            tracing::error!(
                target = "tether.binding",
                "binding coordinator used off its coordination thread"
            );
            debug_assert!(false, "binding coordinator used off its coordination thread");
        }
    }
}
