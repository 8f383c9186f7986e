//! Error types for the runner crate.

use conswol_models::SessionId;
use thiserror::Error;

/// Errors that can occur while running a process.
#[derive(Debug, Error)]
pub enum RunnerError {
    /// The program could not be located or executed.
    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        /// Program that failed to start.
        program: String,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Input was sent to a process that already terminated.
    #[error("session '{0}': input closed, process already terminated")]
    Closed(SessionId),

    /// Writing to the process's stdin failed.
    #[error("session '{session_id}': input write failed: {message}")]
    InputFailed {
        /// Session the write targeted.
        session_id: SessionId,
        /// Underlying error text.
        message: String,
    },
}

/// Result type alias for runner operations.
pub type Result<T> = std::result::Result<T, RunnerError>;
