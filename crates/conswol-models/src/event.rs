//! Session events.
//!
//! Events flow from the process runner through the session multiplexer onto
//! the event bus. Sequence numbers are per-session, strictly increasing and
//! gapless from 1; there is no ordering guarantee across sessions.

use serde::{Deserialize, Serialize};

use crate::debug::DebuggerEvent;
use crate::ids::SessionId;
use crate::session::SessionState;

/// Which stream of the session an output payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamTag {
    /// Child's standard output.
    Stdout,
    /// Child's standard error.
    Stderr,
    /// Engine-generated annotation (launch/termination notices).
    Meta,
}

impl StreamTag {
    /// Short display label.
    pub fn as_str(&self) -> &'static str {
        match self {
            StreamTag::Stdout => "stdout",
            StreamTag::Stderr => "stderr",
            StreamTag::Meta => "meta",
        }
    }
}

/// One line of output from a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputEvent {
    /// Session this output belongs to.
    pub session_id: SessionId,
    /// Stream the payload came from.
    pub tag: StreamTag,
    /// Text payload (one line, without the trailing newline).
    pub payload: String,
    /// Per-session sequence number, strictly increasing from 1.
    pub seq: u64,
}

/// Events published on the session event bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionEvent {
    /// A line of output was produced.
    Output(OutputEvent),
    /// A session changed lifecycle state.
    StateChanged {
        /// Session that changed.
        session_id: SessionId,
        /// New state.
        state: SessionState,
    },
    /// A decoded debugger event for a debugger-class session.
    Debugger {
        /// The debugger session.
        session_id: SessionId,
        /// Decoded event.
        event: DebuggerEvent,
    },
}

impl SessionEvent {
    /// Returns the session ID this event belongs to.
    pub fn session_id(&self) -> &SessionId {
        match self {
            SessionEvent::Output(output) => &output.session_id,
            SessionEvent::StateChanged { session_id, .. } => session_id,
            SessionEvent::Debugger { session_id, .. } => session_id,
        }
    }

    /// Returns true if this event marks a terminal session state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionEvent::StateChanged { state, .. } if state.is_terminal())
    }
}
