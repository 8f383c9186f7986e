//! Session lifecycle types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::ids::SessionId;

/// Lifecycle state of a managed session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    /// Session record created, process not yet confirmed running.
    #[default]
    Pending,
    /// Process is running.
    Running,
    /// Process exited on its own with the given code.
    Exited(i32),
    /// Session failed outside normal process exit (runner crash, I/O error).
    Failed(String),
    /// Process was terminated by a kill request.
    Killed,
}

impl SessionState {
    /// Returns true for states in which the process no longer runs.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SessionState::Exited(_) | SessionState::Failed(_) | SessionState::Killed
        )
    }

    /// Short label for display, e.g. `exited(0)`.
    pub fn label(&self) -> String {
        match self {
            SessionState::Pending => "pending".to_string(),
            SessionState::Running => "running".to_string(),
            SessionState::Exited(code) => format!("exited({})", code),
            SessionState::Failed(reason) => format!("failed({})", reason),
            SessionState::Killed => "killed".to_string(),
        }
    }
}

/// Summary of one session, as returned by `list`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    /// Session identifier.
    pub id: SessionId,
    /// Display line of the command the session runs.
    pub command: String,
    /// Current lifecycle state.
    pub state: SessionState,
    /// When the session was launched.
    pub created_at: DateTime<Utc>,
    /// Sequence number of the last output event observed (0 if none).
    pub last_seq: u64,
}
