//! Session multiplexer for Conswol.
//!
//! The [`SessionMultiplexer`] owns a set of concurrently running process
//! runners (an interactive shell, a build, a debugger bridge), routes input
//! to the right runner, and merges their events into the shared event bus
//! tagged by session.
//!
//! # Example
//!
//! ```no_run
//! use conswol_events::EventBus;
//! use conswol_models::CommandSpec;
//! use conswol_sessions::{MultiplexerConfig, SessionMultiplexer};
//!
//! # async fn demo() -> conswol_sessions::Result<()> {
//! let bus = EventBus::new();
//! let mux = SessionMultiplexer::new(MultiplexerConfig::default(), bus.clone());
//!
//! let mut events = bus.subscribe();
//! let id = mux.launch(CommandSpec::new("make").with_args(["-j4"])).await?;
//!
//! while let Some(event) = events.recv().await {
//!     if event.session_id() == &id && event.is_terminal() {
//!         break;
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod multiplexer;

pub use config::MultiplexerConfig;
pub use error::{Result, SessionError};
pub use multiplexer::SessionMultiplexer;
