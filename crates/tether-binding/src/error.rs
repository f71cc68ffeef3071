use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BindingError {
    #[error("on_sent_to_background called while already in the background")]
    AlreadyInBackground,
    #[error("moderate binding pool capacity must be at least 1")]
    ZeroPoolCapacity,
}
