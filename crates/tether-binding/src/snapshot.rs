use serde::{Deserialize, Serialize};

use crate::worker::{SlotNumber, WorkerId};

/// Point-in-time view of the coordinator, intended for logs and debug endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BindingSnapshot {
    pub low_memory_device: bool,
    pub in_background: bool,
    /// Registered workers, sorted by id.
    pub workers: Vec<WorkerSnapshot>,
    pub moderate_pool: Option<PoolSnapshot>,
    pub pending_tasks: usize,
}

impl BindingSnapshot {
    pub fn worker(&self, id: WorkerId) -> Option<&WorkerSnapshot> {
        self.workers.iter().find(|worker| worker.id == id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerSnapshot {
    pub id: WorkerId,
    pub slot: SlotNumber,
    pub sandboxed: bool,
    pub in_foreground: bool,
    pub bound_for_background_period: bool,
    pub initial: bool,
    pub strong: bool,
    pub moderate: bool,
    pub in_moderate_pool: bool,
}

impl WorkerSnapshot {
    /// Pool membership must match "moderate and not strong".
    pub fn pool_membership_consistent(&self) -> bool {
        self.in_moderate_pool == (self.moderate && !self.strong)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub capacity: usize,
    /// Least recently touched first.
    pub slots: Vec<SlotNumber>,
    pub delayed_clear_pending: bool,
}
