//! Core data models for Conswol.
//!
//! This crate provides the fundamental data types used throughout the
//! Conswol engine: session identifiers, command specifications, session
//! lifecycle states, output events, and debugger-side types.

pub mod command;
pub mod debug;
pub mod event;
pub mod ids;
pub mod session;

// Re-export main types
pub use command::{CommandSpec, StdinMode};
pub use debug::{Breakpoint, DebuggerEvent, SourceLocation};
pub use ids::{BreakpointId, SessionId};
pub use event::{OutputEvent, SessionEvent, StreamTag};
pub use session::{SessionState, SessionSummary};
