//! Breakpoint bridge for Conswol.
//!
//! Translates abstract breakpoint operations (set/clear, continue, step)
//! into the protocol of an attached debugger process and decodes debugger
//! events (breakpoint hit, debuggee exit) back into abstract events.
//!
//! The protocol is pluggable: implement [`DebuggerTranslator`] per
//! debugger; [`TextTranslator`] is the reference line-oriented protocol.
//!
//! # Example
//!
//! ```no_run
//! use conswol_debug::{BreakpointBridge, BridgeConfig, TextTranslator};
//! use conswol_events::EventBus;
//! use conswol_models::SessionId;
//! use tokio::sync::mpsc;
//!
//! # async fn demo() -> conswol_debug::Result<()> {
//! let (commands_tx, _to_debugger) = mpsc::unbounded_channel();
//! let (_from_debugger, reply_rx) = mpsc::unbounded_channel::<String>();
//!
//! let bridge = BreakpointBridge::new(
//!     SessionId::new(),
//!     Box::new(TextTranslator::new()),
//!     commands_tx,
//!     reply_rx,
//!     EventBus::new(),
//!     BridgeConfig::default(),
//! );
//!
//! bridge.attach().await?;
//! let id = bridge.set_breakpoint("src/main.rs:42".parse().unwrap()).await?;
//! bridge.continue_execution().await?;
//! # let _ = id;
//! # Ok(())
//! # }
//! ```

pub mod bridge;
pub mod error;
pub mod state;
pub mod translator;

pub use bridge::{BreakpointBridge, BridgeConfig};
pub use error::{BridgeError, Result};
pub use state::BridgeState;
pub use translator::{Ack, DebugCommand, DebuggerReply, DebuggerTranslator, TextTranslator};
