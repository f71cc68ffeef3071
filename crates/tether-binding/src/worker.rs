use serde::{Deserialize, Serialize};
use std::fmt;

/// Host process id of a registered worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkerId(pub u32);

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for WorkerId {
    fn from(pid: u32) -> Self {
        Self(pid)
    }
}

/// Stable slot assigned to a worker by the launch layer. Keys the moderate binding pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SlotNumber(pub u32);

impl fmt::Display for SlotNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Strength of the hint asking the host not to kill a worker, strongest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BindingTier {
    /// Held while the worker is being brought up, before its visibility is known.
    Initial,
    /// Held while the worker backs foreground work.
    Strong,
    /// The weakest non-zero guarantee; bounded by the moderate binding pool.
    Moderate,
}

impl BindingTier {
    pub fn all() -> [BindingTier; 3] {
        [BindingTier::Initial, BindingTier::Strong, BindingTier::Moderate]
    }
}

/// Binding primitives the process-launch layer exposes for one worker.
///
/// The host may refuse any request (for example when the OS denies the bind). Callers never
/// assume a mutation took effect; they re-query with [`WorkerHandle::has_binding`].
pub trait WorkerHandle: Send + Sync {
    fn slot_number(&self) -> SlotNumber;

    fn is_sandboxed(&self) -> bool;

    fn add_binding(&self, tier: BindingTier);

    fn remove_binding(&self, tier: BindingTier);

    fn has_binding(&self, tier: BindingTier) -> bool;

    /// Strips every binding tier at once.
    fn drop_all_bindings(&self);
}
