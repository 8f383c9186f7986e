//! Error types for the debug crate.

use conswol_models::BreakpointId;
use thiserror::Error;

use crate::state::BridgeState;

/// Errors that can occur during bridge operations.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Operation invoked in a state that does not allow it.
    #[error("'{operation}' is invalid in state '{state}'")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// State the bridge was in.
        state: BridgeState,
    },

    /// The debugger did not acknowledge the command in time.
    #[error("debugger did not acknowledge '{operation}' in time")]
    Timeout {
        /// The unacknowledged operation.
        operation: &'static str,
    },

    /// The debugger channel closed.
    #[error("debugger disconnected")]
    Disconnected,

    /// The handshake with the debugger failed.
    #[error("debugger handshake failed: {0}")]
    HandshakeFailed(String),

    /// The debugger replied with something other than the expected ack.
    #[error("unexpected debugger reply to '{operation}'")]
    Protocol {
        /// The operation awaiting an ack.
        operation: &'static str,
    },

    /// No breakpoint with the given ID in the local cache.
    #[error("unknown breakpoint: {0}")]
    UnknownBreakpoint(BreakpointId),
}

/// Result type alias for bridge operations.
pub type Result<T> = std::result::Result<T, BridgeError>;
