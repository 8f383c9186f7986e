//! Debugger-side types: source locations, breakpoints, decoded events.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::ids::BreakpointId;

/// A source location, file plus 1-based line.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source file path.
    pub file: String,
    /// 1-based line number.
    pub line: u32,
}

impl SourceLocation {
    /// Creates a source location.
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

impl FromStr for SourceLocation {
    type Err = String;

    /// Parses `file:line`. The line is the text after the last colon, so
    /// Windows-style paths with a drive letter still parse.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (file, line) = s
            .rsplit_once(':')
            .ok_or_else(|| format!("invalid location '{}', expected file:line", s))?;
        if file.is_empty() {
            return Err(format!("invalid location '{}', empty file", s));
        }
        let line: u32 = line
            .parse()
            .map_err(|_| format!("invalid line number in '{}'", s))?;
        Ok(Self::new(file, line))
    }
}

/// A breakpoint mirrored from the attached debugger.
///
/// The local entry is the authoritative cache between bridge round-trips;
/// it is only created or mutated after the debugger acknowledges the
/// corresponding command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    /// Debugger-assigned identifier.
    pub id: BreakpointId,
    /// Where the breakpoint is set.
    pub location: SourceLocation,
    /// Whether the breakpoint is currently enabled.
    pub enabled: bool,
    /// How many times the breakpoint has been hit.
    pub hit_count: u32,
}

impl Breakpoint {
    /// Creates an enabled breakpoint with zero hits.
    pub fn new(id: BreakpointId, location: SourceLocation) -> Self {
        Self {
            id,
            location,
            enabled: true,
            hit_count: 0,
        }
    }
}

/// Events decoded from the attached debugger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DebuggerEvent {
    /// Execution stopped at a breakpoint.
    BreakpointHit {
        /// Which breakpoint was hit.
        id: BreakpointId,
        /// Debugger-supplied frame description.
        frame: String,
    },
    /// The debuggee exited.
    ProcessExited {
        /// Exit code.
        code: i32,
    },
    /// The debugger reported an error.
    Error {
        /// Error message.
        message: String,
    },
}
