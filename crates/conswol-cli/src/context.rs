//! Engine context: bus, multiplexer and registry wired together.

use std::path::Path;
use std::sync::Arc;

use tracing::debug;

use conswol_events::EventBus;
use conswol_models::{CommandSpec, SessionEvent, SessionState, StreamTag};
use conswol_registry::CommandRegistry;
use conswol_sessions::{MultiplexerConfig, SessionMultiplexer};

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// The assembled engine: one event bus, one session multiplexer, and the
/// alias registry loaded from the state directory.
///
/// Constructed explicitly in `main` and passed down; torn down with
/// [`shutdown`](Engine::shutdown).
pub struct Engine {
    /// Shared event bus.
    pub bus: EventBus,
    /// Session multiplexer publishing into the bus.
    pub mux: Arc<SessionMultiplexer>,
    /// Alias registry backed by `aliases.toml` in the state directory.
    pub registry: CommandRegistry,
}

impl Engine {
    /// Assembles an engine with state under `state_dir`.
    pub fn new(state_dir: &Path) -> Result<Self> {
        let bus = EventBus::new();
        let mux = Arc::new(SessionMultiplexer::new(
            MultiplexerConfig::default(),
            bus.clone(),
        ));
        let registry = CommandRegistry::load(state_dir.join("aliases.toml"))?;

        debug!(state_dir = %state_dir.display(), aliases = registry.len(), "engine assembled");
        Ok(Self { bus, mux, registry })
    }

    /// Kills all active sessions and waits for their terminal events.
    pub async fn shutdown(&self) {
        self.mux.shutdown().await;
    }

    /// Launches `spec` and streams its output to the terminal until the
    /// session terminates, returning an exit code for the process: the
    /// child's own code for a normal exit, 130 for a killed session, 1 for
    /// a failed one.
    ///
    /// Ctrl-C forwards a graceful kill to the session instead of tearing
    /// the engine down around it.
    pub async fn run_to_completion(&self, spec: CommandSpec) -> Result<i32> {
        let mut events = self.bus.subscribe();
        let id = self.mux.launch(spec).await?;

        loop {
            tokio::select! {
                event = events.recv() => {
                    let Some(event) = event else {
                        return Ok(1);
                    };
                    if event.session_id() != &id {
                        continue;
                    }
                    match event {
                        SessionEvent::Output(output) => match output.tag {
                            StreamTag::Stdout => println!("{}", output.payload),
                            StreamTag::Stderr => eprintln!("{}", output.payload),
                            StreamTag::Meta => debug!(session_id = %id, "{}", output.payload),
                        },
                        SessionEvent::StateChanged { state, .. } if state.is_terminal() => {
                            return Ok(exit_code_for(&state));
                        }
                        _ => {}
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    eprintln!("interrupt: killing session {}", id);
                    self.mux.kill(&id, false).await?;
                }
            }
        }
    }
}

/// Maps a terminal session state to a process exit code.
pub fn exit_code_for(state: &SessionState) -> i32 {
    match state {
        SessionState::Exited(code) => *code,
        SessionState::Killed => 130,
        _ => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_exit_code_mapping() {
        assert_eq!(exit_code_for(&SessionState::Exited(0)), 0);
        assert_eq!(exit_code_for(&SessionState::Exited(3)), 3);
        assert_eq!(exit_code_for(&SessionState::Killed), 130);
        assert_eq!(exit_code_for(&SessionState::Failed("x".to_string())), 1);
    }

    #[tokio::test]
    async fn test_engine_assembles_with_empty_state_dir() {
        let dir = tempdir().unwrap();
        let engine = Engine::new(dir.path()).unwrap();

        assert!(engine.registry.is_empty());
        assert_eq!(engine.mux.session_count().await, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_run_to_completion_exit_code() {
        let dir = tempdir().unwrap();
        let engine = Engine::new(dir.path()).unwrap();

        let spec = CommandSpec::new("sh").with_args(["-c", "exit 4"]);
        let code = engine.run_to_completion(spec).await.unwrap();
        assert_eq!(code, 4);

        engine.shutdown().await;
    }
}
