//! Debugger protocol translators.
//!
//! A [`DebuggerTranslator`] adapts the bridge's abstract command/event set
//! to one concrete debugger's wire protocol. The bridge itself only ever
//! sees [`DebugCommand`]s going out and [`DebuggerReply`]s coming in; the
//! grammar on the wire is the translator's business.

use std::sync::OnceLock;

use regex::Regex;

use conswol_models::{BreakpointId, DebuggerEvent, SourceLocation};

/// Abstract commands the bridge can issue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebugCommand {
    /// Handshake with the debugger.
    Attach,
    /// Set a breakpoint at a source location.
    SetBreakpoint(SourceLocation),
    /// Clear a breakpoint by ID.
    ClearBreakpoint(BreakpointId),
    /// Resume execution.
    Continue,
    /// Execute one step.
    Step,
}

/// Acknowledgments for issued commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ack {
    /// Handshake completed.
    Attached,
    /// Breakpoint set; the debugger assigned this ID.
    BreakpointSet(BreakpointId),
    /// Breakpoint cleared.
    BreakpointCleared(BreakpointId),
    /// Execution resumed.
    Continued,
    /// Step started.
    Stepped,
}

/// A decoded line from the debugger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebuggerReply {
    /// Acknowledgment of a command.
    Ack(Ack),
    /// Asynchronous debugger event.
    Event(DebuggerEvent),
}

/// Translates between the abstract command set and one debugger's protocol.
pub trait DebuggerTranslator: Send + Sync {
    /// Encodes a command as one protocol line (without trailing newline).
    fn encode(&self, command: &DebugCommand) -> String;

    /// Decodes one protocol line. Returns `None` for lines that are neither
    /// acks nor events (debugger chatter), which the bridge skips.
    fn decode(&self, line: &str) -> Option<DebuggerReply>;
}

/// Reference translator for the line-oriented text protocol.
///
/// Requests: `attach`, `break FILE:LINE`, `delete ID`, `continue`, `step`.
/// Replies: `ok attach`, `ok break ID`, `ok delete ID`, `ok continue`,
/// `ok step`, `event hit ID FRAME`, `event exit CODE`, `event error MSG`.
#[derive(Debug, Default)]
pub struct TextTranslator;

impl TextTranslator {
    /// Creates the translator.
    pub fn new() -> Self {
        Self
    }
}

fn hit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^event hit (\d+) (.+)$").unwrap())
}

fn exit_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^event exit (-?\d+)$").unwrap())
}

fn ok_break_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^ok (break|delete) (\d+)$").unwrap())
}

impl DebuggerTranslator for TextTranslator {
    fn encode(&self, command: &DebugCommand) -> String {
        match command {
            DebugCommand::Attach => "attach".to_string(),
            DebugCommand::SetBreakpoint(location) => format!("break {}", location),
            DebugCommand::ClearBreakpoint(id) => format!("delete {}", id),
            DebugCommand::Continue => "continue".to_string(),
            DebugCommand::Step => "step".to_string(),
        }
    }

    fn decode(&self, line: &str) -> Option<DebuggerReply> {
        let line = line.trim_end();

        match line {
            "ok attach" => return Some(DebuggerReply::Ack(Ack::Attached)),
            "ok continue" => return Some(DebuggerReply::Ack(Ack::Continued)),
            "ok step" => return Some(DebuggerReply::Ack(Ack::Stepped)),
            _ => {}
        }

        if let Some(caps) = ok_break_re().captures(line) {
            let id = BreakpointId::new(caps[2].parse().ok()?);
            let ack = match &caps[1] {
                "break" => Ack::BreakpointSet(id),
                _ => Ack::BreakpointCleared(id),
            };
            return Some(DebuggerReply::Ack(ack));
        }

        if let Some(caps) = hit_re().captures(line) {
            return Some(DebuggerReply::Event(DebuggerEvent::BreakpointHit {
                id: BreakpointId::new(caps[1].parse().ok()?),
                frame: caps[2].to_string(),
            }));
        }

        if let Some(caps) = exit_re().captures(line) {
            return Some(DebuggerReply::Event(DebuggerEvent::ProcessExited {
                code: caps[1].parse().ok()?,
            }));
        }

        if let Some(message) = line.strip_prefix("event error ") {
            return Some(DebuggerReply::Event(DebuggerEvent::Error {
                message: message.to_string(),
            }));
        }

        None
    }
}
