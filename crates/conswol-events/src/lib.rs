//! In-process pub/sub event bus for Conswol.
//!
//! The [`EventBus`] is the single distribution point for session events:
//! the session multiplexer publishes into it, and any number of consumers
//! (CLI output loop, breakpoint bridge, logger) subscribe.
//!
//! # Example
//!
//! ```no_run
//! use conswol_events::EventBus;
//! use conswol_models::{SessionEvent, SessionId, SessionState};
//!
//! # async fn demo() {
//! let bus = EventBus::new();
//! let mut rx = bus.subscribe();
//!
//! bus.publish(SessionEvent::StateChanged {
//!     session_id: SessionId::from_string("sess-1"),
//!     state: SessionState::Running,
//! });
//!
//! let event = rx.recv().await.unwrap();
//! println!("got {:?}", event);
//! # }
//! ```

mod bus;

pub use bus::{EventBus, Subscription};
