//! OOM binding policy for externally hosted worker processes.
//!
//! A [`BindingCoordinator`] decides how strongly the host should be discouraged from killing each
//! registered worker:
//! - workers backing foreground work hold a strong binding, released after a short grace period;
//! - recently used workers fall back to a moderate binding held in a bounded, recency-ordered pool;
//! - memory pressure and long background periods shrink or clear that pool.
//!
//! Low-memory devices use a stricter policy: a single protected worker and synchronous releases.
//!
//! The coordinator is single-threaded and never sleeps. Delayed work sits in an internal timer
//! queue; the owner waits until [`BindingCoordinator::next_deadline`] and then calls
//! [`BindingCoordinator::run_due_tasks`].

mod clock;
mod connection;
mod coordinator;
mod device;
mod error;
mod metrics;
mod pool;
mod settings;
mod signal;
mod snapshot;
mod thread;
mod timer;
mod worker;

pub use clock::{Clock, SystemClock};
pub use coordinator::BindingCoordinator;
pub use device::{DeviceClassifier, FixedDeviceClass};
pub use error::BindingError;
pub use metrics::{MetricsSink, NoopMetrics, MODERATE_BINDING_GRANTED, MODERATE_POOL_CLEARED_COUNT};
pub use settings::BindingSettings;
pub use signal::{MemoryPressureLevel, MemorySignal};
pub use snapshot::{BindingSnapshot, PoolSnapshot, WorkerSnapshot};
pub use worker::{BindingTier, SlotNumber, WorkerHandle, WorkerId};
