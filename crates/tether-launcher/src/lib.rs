//! Runs a [`tether_binding::BindingCoordinator`] on a dedicated thread.
//!
//! The coordinator is single-threaded by contract. [`Launcher`] gives it a thread with a
//! current-thread tokio runtime that serves commands, fires the coordinator's deferred tasks on
//! time, and optionally polls memory pressure. Callers talk to it through a cloneable
//! [`LauncherHandle`].

mod clock;
mod command;
mod error;
mod launcher;
mod service;

pub use clock::TokioClock;
pub use command::LauncherHandle;
pub use error::LauncherError;
pub use launcher::{classifier_for, Launcher};
pub use service::CoordinationLoop;
