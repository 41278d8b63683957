use thiserror::Error;

/// Errors raised while constructing or validating an [`crate::block::SSKBlock`].
#[derive(Debug, Error, PartialEq, Eq, Clone)]
pub enum BlockError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("verification failed: {0}")]
    VerifyFailed(String),
    #[error("unsupported")]
    Unsupported,
}

/// Errors surfaced by the [`crate::checker`] subsystem's public API.
///
/// The dispatch loop itself never propagates these: faults inside the
/// worker are logged and swallowed so the service thread cannot wedge the
/// node. `CheckerError` is for the synchronous entry points
/// (`queue_transient_request`, `queue_persistent_request`) where a caller
/// can reasonably react to a failure.
#[derive(Debug, Error, PartialEq, Eq, Clone, Copy)]
pub enum CheckerError {
    #[error("priority {0} out of range (expected < {1})")]
    PriorityOutOfRange(u8, u8),
}
