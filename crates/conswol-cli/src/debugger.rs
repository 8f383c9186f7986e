//! Wiring between the breakpoint bridge and a multiplexer session.
//!
//! The bridge itself only speaks line channels. This module launches the
//! debugger command under the multiplexer and pumps:
//! - bridge command lines into the session's stdin
//! - the session's stdout lines back into the bridge as replies

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::debug;

use conswol_debug::{BreakpointBridge, BridgeConfig, TextTranslator};
use conswol_models::{SessionEvent, SessionId, StreamTag};

use crate::context::{Engine, Result};

/// A debugger session attached through the multiplexer.
pub struct DebugSession {
    /// The multiplexer session running the debugger process.
    pub session_id: SessionId,
    /// The attached bridge.
    pub bridge: Arc<BreakpointBridge>,
}

impl DebugSession {
    /// Resolves `alias` to the debugger command, launches it as a session,
    /// wires the bridge and performs the handshake.
    pub async fn start(engine: &Engine, alias: &str) -> Result<Self> {
        let spec = engine.registry.resolve(alias, &[])?;
        let session_id = engine.mux.launch(spec).await?;
        debug!(session_id = %session_id, alias = %alias, "debugger session launched");

        let (commands_tx, mut commands_rx) = mpsc::unbounded_channel::<String>();
        let (reply_tx, reply_rx) = mpsc::unbounded_channel::<String>();

        // Pump bridge commands into the debugger's stdin.
        {
            let mux = Arc::clone(&engine.mux);
            let id = session_id.clone();
            tokio::spawn(async move {
                while let Some(line) = commands_rx.recv().await {
                    let mut bytes = line.into_bytes();
                    bytes.push(b'\n');
                    if mux.attach_input(&id, bytes).await.is_err() {
                        break;
                    }
                }
            });
        }

        // Pump the debugger's stdout lines back as replies.
        {
            let mut events = engine.bus.subscribe();
            let id = session_id.clone();
            tokio::spawn(async move {
                while let Some(event) = events.recv().await {
                    match event {
                        SessionEvent::Output(output)
                            if output.session_id == id && output.tag == StreamTag::Stdout =>
                        {
                            if reply_tx.send(output.payload).is_err() {
                                break;
                            }
                        }
                        SessionEvent::StateChanged { session_id, state }
                            if session_id == id && state.is_terminal() =>
                        {
                            break;
                        }
                        _ => {}
                    }
                }
            });
        }

        let bridge = BreakpointBridge::new(
            session_id.clone(),
            Box::new(TextTranslator::new()),
            commands_tx,
            reply_rx,
            engine.bus.clone(),
            BridgeConfig::default(),
        );
        bridge.attach().await?;

        Ok(Self {
            session_id,
            bridge: Arc::new(bridge),
        })
    }

    /// Kills the underlying debugger session.
    pub async fn stop(&self, engine: &Engine) -> Result<()> {
        engine.mux.kill(&self.session_id, false).await?;
        Ok(())
    }
}
