use tether_binding::BindingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LauncherError {
    /// The coordination thread has stopped; the command was not delivered.
    #[error("coordination thread is no longer running")]
    Closed,
    #[error("failed to spawn coordination thread: {0}")]
    Spawn(#[source] std::io::Error),
    #[error("coordination thread panicked")]
    Panicked,
    #[error(transparent)]
    Binding(#[from] BindingError),
}
