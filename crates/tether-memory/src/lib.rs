//! Host memory probes for the binding coordinator.
//!
//! - [`SystemDeviceClassifier`] decides whether the low-memory binding policy applies, from the
//!   machine's total memory capped by the process's cgroup limit.
//! - [`PressureSampler`] polls cgroup (or whole-system) usage and emits a
//!   [`tether_binding::MemorySignal`] whenever pressure escalates.
//!
//! Everything here is best-effort: unreadable `/proc` or cgroup files degrade to "unknown", never
//! to an error.

mod cgroup;
mod classifier;
mod pressure;

pub use cgroup::{parse_limit_bytes, CgroupMemory};
pub use classifier::{
    effective_memory_bytes, SystemDeviceClassifier, DEFAULT_LOW_MEMORY_THRESHOLD_BYTES, MB,
};
pub use pressure::{PressureSampler, PressureThresholds};
