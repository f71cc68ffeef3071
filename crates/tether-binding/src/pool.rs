use std::num::NonZeroUsize;
use std::time::Instant;

use lru::LruCache;

use crate::connection::{ManagedConnection, Registry};
use crate::coordinator::DeferredTask;
use crate::metrics::{MetricsSink, MODERATE_BINDING_GRANTED, MODERATE_POOL_CLEARED_COUNT};
use crate::settings::BindingSettings;
use crate::signal::{MemorySignal, PoolResponse};
use crate::timer::{TimerHandle, TimerQueue};
use crate::worker::{BindingTier, SlotNumber, WorkerId};

/// Bounded, recency-ordered set of workers holding a moderate binding.
///
/// Entries store worker ids, never connections; every eviction looks the id up in the
/// [`Registry`] and revokes that worker's moderate binding. An entry is present iff its worker
/// holds a moderate binding and no strong binding.
pub(crate) struct ModerateBindingPool {
    entries: LruCache<SlotNumber, WorkerId>,
    delayed_clear: Option<TimerHandle>,
}

impl ModerateBindingPool {
    pub(crate) fn new(capacity: NonZeroUsize) -> Self {
        Self {
            entries: LruCache::new(capacity),
            delayed_clear: None,
        }
    }

    pub(crate) fn capacity(&self) -> usize {
        self.entries.cap().get()
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn contains_worker(&self, id: WorkerId) -> bool {
        self.entries.iter().any(|(_, worker)| *worker == id)
    }

    /// Slots ordered least-recently-touched first.
    pub(crate) fn slots(&self) -> Vec<SlotNumber> {
        self.entries.iter().rev().map(|(slot, _)| *slot).collect()
    }

    pub(crate) fn delayed_clear_pending(&self) -> bool {
        self.delayed_clear.is_some()
    }

    /// Grants `connection` a moderate binding and marks it most recently touched.
    ///
    /// Unsandboxed workers are never pooled. If the host refuses the binding, any stale entry for
    /// the slot is dropped instead.
    pub(crate) fn add(
        &mut self,
        connection: &ManagedConnection,
        registry: &Registry,
        metrics: &dyn MetricsSink,
    ) {
        let worker = connection.worker();
        if !worker.is_sandboxed() {
            return;
        }

        let slot = worker.slot_number();
        connection.add_moderate_binding();
        let granted = connection.has_binding(BindingTier::Moderate);
        metrics.record_boolean(MODERATE_BINDING_GRANTED, granted);

        if !granted {
            self.remove_slot(slot, registry);
            return;
        }

        let id = connection.id();
        if let Some((displaced_slot, displaced)) = self.entries.push(slot, id) {
            if (displaced_slot, displaced) != (slot, id) {
                tracing::debug!(
                    target = "tether.binding",
                    worker = %displaced,
                    slot = %displaced_slot,
                    "moderate binding displaced from pool"
                );
                registry.revoke_moderate(displaced);
            }
        }
    }

    pub(crate) fn remove(&mut self, connection: &ManagedConnection, registry: &Registry) {
        let worker = connection.worker();
        if !worker.is_sandboxed() {
            return;
        }
        self.remove_slot(worker.slot_number(), registry);
    }

    fn remove_slot(&mut self, slot: SlotNumber, registry: &Registry) {
        if let Some(id) = self.entries.pop(&slot) {
            registry.revoke_moderate(id);
        }
    }

    /// Shrinks the pool to `floor(len * (1 - ratio))` entries, least recently touched first.
    pub(crate) fn reduce(&mut self, ratio: f64, registry: &Registry) -> usize {
        let old_size = self.entries.len();
        let keep = (old_size as f64) * (1.0 - ratio.clamp(0.0, 1.0));
        let new_size = keep.floor() as usize;
        tracing::info!(
            target = "tether.binding",
            old_size,
            new_size,
            "reducing moderate binding pool"
        );
        if new_size == 0 {
            return self.evict_all(registry);
        }

        let mut evicted = 0;
        while self.entries.len() > new_size {
            let Some((_slot, id)) = self.entries.pop_lru() else {
                break;
            };
            registry.revoke_moderate(id);
            evicted += 1;
        }
        evicted
    }

    pub(crate) fn evict_all(&mut self, registry: &Registry) -> usize {
        let mut evicted = 0;
        while let Some((_slot, id)) = self.entries.pop_lru() {
            registry.revoke_moderate(id);
            evicted += 1;
        }
        evicted
    }

    pub(crate) fn handle_signal(
        &mut self,
        signal: MemorySignal,
        settings: &BindingSettings,
        registry: &Registry,
    ) -> usize {
        tracing::info!(
            target = "tether.binding",
            ?signal,
            size = self.entries.len(),
            "memory signal"
        );
        if self.entries.is_empty() {
            return 0;
        }
        match signal.pool_response(settings) {
            PoolResponse::Reduce(ratio) => self.reduce(ratio, registry),
            PoolResponse::EvictAll => self.evict_all(registry),
            PoolResponse::Ignore => 0,
        }
    }

    /// Arms the one-shot clear that runs if the process stays in the background.
    pub(crate) fn schedule_delayed_clear(
        &mut self,
        timers: &mut TimerQueue<DeferredTask>,
        deadline: Instant,
    ) {
        if self.entries.is_empty() {
            return;
        }
        if let Some(previous) = self.delayed_clear.take() {
            timers.cancel(previous);
        }
        self.delayed_clear = Some(timers.schedule(deadline, DeferredTask::ClearModeratePool));
    }

    pub(crate) fn cancel_delayed_clear(&mut self, timers: &mut TimerQueue<DeferredTask>) {
        if let Some(handle) = self.delayed_clear.take() {
            timers.cancel(handle);
        }
    }

    pub(crate) fn run_delayed_clear(
        &mut self,
        handle: TimerHandle,
        registry: &Registry,
        metrics: &dyn MetricsSink,
    ) -> usize {
        if self.delayed_clear != Some(handle) {
            return 0;
        }
        self.delayed_clear = None;

        let size = self.entries.len();
        tracing::info!(
            target = "tether.binding",
            size,
            "releasing moderate bindings after background delay"
        );
        metrics.record_count(MODERATE_POOL_CLEARED_COUNT, size as u64);
        self.evict_all(registry)
    }
}
