//! Bridge state machine.

use std::fmt;

/// State of one attached debugger session.
///
/// ```text
/// Detached -> Attaching -> Ready <-> Running <-> Paused
///                |            \________|____________/
///                v                     v
///            Detached (handshake    Exited (debuggee gone)
///             failure)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BridgeState {
    /// No debugger attached.
    #[default]
    Detached,
    /// Handshake in flight.
    Attaching,
    /// Attached, debuggee not running.
    Ready,
    /// Debuggee executing.
    Running,
    /// Debuggee stopped at a breakpoint.
    Paused,
    /// Debuggee exited; the bridge is detached for good.
    Exited,
}

impl BridgeState {
    /// True in states where breakpoint mutations and stepping are valid.
    pub fn accepts_operations(&self) -> bool {
        matches!(self, BridgeState::Ready | BridgeState::Paused)
    }
}

impl fmt::Display for BridgeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BridgeState::Detached => "detached",
            BridgeState::Attaching => "attaching",
            BridgeState::Ready => "ready",
            BridgeState::Running => "running",
            BridgeState::Paused => "paused",
            BridgeState::Exited => "exited",
        };
        write!(f, "{}", label)
    }
}
