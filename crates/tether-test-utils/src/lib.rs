//! Fakes shared by tether tests.
//!
//! - [`FakeHost`] hands out [`FakeWorker`]s that record every binding request into one shared,
//!   ordered event log, so tests can assert on cross-worker ordering.
//! - [`RecordingMetrics`] keeps every sample it is given.
//! - [`ManualClock`] moves only when a test advances it.

mod clock;
mod host;
mod metrics;

pub use clock::ManualClock;
pub use host::{FakeHost, FakeWorker, HostEvent, HostEventKind};
pub use metrics::{RecordedSample, RecordingMetrics};
