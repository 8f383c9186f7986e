//! Typed identifiers.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a managed session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Creates a new random session ID.
    pub fn new() -> Self {
        Self(format!("sess-{}", Uuid::new_v4()))
    }

    /// Creates a session ID from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Returns the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SessionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// Identifier for a breakpoint.
///
/// Assigned by the attached debugger when it acknowledges a set operation,
/// then mirrored locally. Small integers, unique per debugger session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BreakpointId(u32);

impl BreakpointId {
    /// Creates a breakpoint ID from a raw number.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the raw numeric ID.
    pub fn as_u32(&self) -> u32 {
        self.0
    }
}

impl fmt::Display for BreakpointId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for BreakpointId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_prefix() {
        let id = SessionId::new();
        assert!(id.as_str().starts_with("sess-"));
    }

    #[test]
    fn test_session_id_unique() {
        let a = SessionId::new();
        let b = SessionId::new();
        assert_ne!(a, b);
    }

    #[test]
    fn test_session_id_from_string() {
        let id = SessionId::from_string("sess-fixed");
        assert_eq!(id.as_str(), "sess-fixed");
        assert_eq!(id.to_string(), "sess-fixed");
    }

    #[test]
    fn test_session_id_serde_transparent() {
        let id = SessionId::from_string("sess-1");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"sess-1\"");

        let back: SessionId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn test_breakpoint_id_display() {
        let id = BreakpointId::new(3);
        assert_eq!(id.to_string(), "3");
        assert_eq!(id.as_u32(), 3);
    }

    #[test]
    fn test_breakpoint_id_serde() {
        let id = BreakpointId::new(7);
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "7");
    }
}
