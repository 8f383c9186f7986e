//! Error types for the sessions crate.

use conswol_models::SessionId;
use thiserror::Error;

/// Errors that can occur in the session multiplexer.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Runner-level error (spawn failure, closed input).
    #[error(transparent)]
    Runner(#[from] conswol_runner::RunnerError),

    /// No session with the given ID.
    #[error("session not found: {0}")]
    NotFound(SessionId),

    /// The session is still active and cannot be removed.
    #[error("session '{0}' is still active")]
    StillActive(SessionId),

    /// Maximum concurrent sessions reached.
    #[error("maximum sessions reached: {0}")]
    MaxSessionsReached(usize),
}

/// Result type alias for session operations.
pub type Result<T> = std::result::Result<T, SessionError>;
