//! SessionMultiplexer - concurrent managed sessions over one event stream.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use conswol_events::EventBus;
use conswol_models::{CommandSpec, SessionEvent, SessionId, SessionState, SessionSummary};
use conswol_runner::{ProcessRunner, RunnerEvent, RunnerHandle, TerminateMode};

use crate::config::MultiplexerConfig;
use crate::error::{Result, SessionError};

/// One managed session: its spec, lifecycle state, and runner handle.
struct Session {
    spec: CommandSpec,
    state: SessionState,
    created_at: DateTime<Utc>,
    last_seq: u64,
    /// Cleared once the session reaches a terminal state.
    handle: Option<RunnerHandle>,
}

impl Session {
    fn summary(&self, id: &SessionId) -> SessionSummary {
        SessionSummary {
            id: id.clone(),
            command: self.spec.display_line(),
            state: self.state.clone(),
            created_at: self.created_at,
            last_seq: self.last_seq,
        }
    }
}

type SessionMap = Arc<RwLock<HashMap<SessionId, Session>>>;

/// Owns the set of concurrently running sessions.
///
/// Routes input to the right runner and merges per-session runner events
/// into the shared [`EventBus`], tagged by session. Events within one
/// session are never reordered; across sessions ordering is by arrival.
///
/// # Concurrency
///
/// The session map sits behind `Arc<RwLock<HashMap>>`: reads (`list`,
/// `get`) are concurrent, mutations go through a single writer at a time.
/// Public operations never await a session's process I/O while holding the
/// lock, so a hung session cannot stall `launch`, `list`, or operations on
/// other sessions.
pub struct SessionMultiplexer {
    config: MultiplexerConfig,
    bus: EventBus,
    sessions: SessionMap,
}

impl SessionMultiplexer {
    /// Creates a multiplexer publishing into the given bus.
    pub fn new(config: MultiplexerConfig, bus: EventBus) -> Self {
        Self {
            config,
            bus,
            sessions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Returns the event bus this multiplexer publishes into.
    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    /// Returns the configuration.
    pub fn config(&self) -> &MultiplexerConfig {
        &self.config
    }

    /// Launches a new session for the given command.
    ///
    /// On success the session is registered and `Running`; its output and
    /// state changes flow to the bus. On spawn failure no session is
    /// created.
    ///
    /// # Errors
    ///
    /// [`SessionError::MaxSessionsReached`] when too many sessions are
    /// active, [`SessionError::Runner`] when the spawn fails.
    pub async fn launch(&self, spec: CommandSpec) -> Result<SessionId> {
        {
            let sessions = self.sessions.read().await;
            let active = sessions.values().filter(|s| !s.state.is_terminal()).count();
            if active >= self.config.max_sessions {
                return Err(SessionError::MaxSessionsReached(self.config.max_sessions));
            }
        }

        let id = SessionId::new();
        let (events_tx, events_rx) = mpsc::unbounded_channel();

        let handle = ProcessRunner::spawn(id.clone(), &spec, events_tx, self.config.runner_config())?;

        debug!(session_id = %id, command = %spec.display_line(), "session launched");

        {
            let mut sessions = self.sessions.write().await;
            sessions.insert(
                id.clone(),
                Session {
                    spec,
                    state: SessionState::Pending,
                    created_at: Utc::now(),
                    last_seq: 0,
                    handle: Some(handle),
                },
            );
        }

        set_state(&self.sessions, &self.bus, &id, SessionState::Running).await;

        tokio::spawn(forward_events(
            id.clone(),
            events_rx,
            Arc::clone(&self.sessions),
            self.bus.clone(),
        ));

        Ok(id)
    }

    /// Forwards bytes to a session's stdin.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] for an unknown session; a runner
    /// `Closed` error if the process already terminated.
    pub async fn attach_input(&self, id: &SessionId, bytes: impl Into<Vec<u8>>) -> Result<()> {
        let handle = {
            let sessions = self.sessions.read().await;
            let session = sessions.get(id).ok_or_else(|| SessionError::NotFound(id.clone()))?;
            session
                .handle
                .clone()
                .ok_or_else(|| conswol_runner::RunnerError::Closed(id.clone()))?
        };

        // Awaited outside the lock.
        handle.send_input(bytes.into()).await?;
        Ok(())
    }

    /// Requests termination of a session.
    ///
    /// Killing a session whose process already exited is an Ok no-op.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] for an unknown session.
    pub async fn kill(&self, id: &SessionId, force: bool) -> Result<()> {
        let sessions = self.sessions.read().await;
        let session = sessions.get(id).ok_or_else(|| SessionError::NotFound(id.clone()))?;

        if session.state.is_terminal() {
            debug!(session_id = %id, "kill on terminal session is a no-op");
            return Ok(());
        }

        if let Some(handle) = &session.handle {
            let mode = if force {
                TerminateMode::Immediate
            } else {
                TerminateMode::Graceful
            };
            info!(session_id = %id, force = force, "killing session");
            handle.terminate(mode);
        }

        Ok(())
    }

    /// Lists all sessions, oldest first.
    pub async fn list(&self) -> Vec<SessionSummary> {
        let sessions = self.sessions.read().await;
        let mut summaries: Vec<SessionSummary> = sessions
            .iter()
            .map(|(id, session)| session.summary(id))
            .collect();
        summaries.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        summaries
    }

    /// Returns the summary for one session.
    pub async fn get(&self, id: &SessionId) -> Option<SessionSummary> {
        let sessions = self.sessions.read().await;
        sessions.get(id).map(|session| session.summary(id))
    }

    /// Releases a terminal session's record.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotFound`] for an unknown session,
    /// [`SessionError::StillActive`] if the session has not terminated.
    pub async fn remove(&self, id: &SessionId) -> Result<()> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get(id).ok_or_else(|| SessionError::NotFound(id.clone()))?;

        if !session.state.is_terminal() {
            return Err(SessionError::StillActive(id.clone()));
        }

        sessions.remove(id);
        debug!(session_id = %id, "session removed");
        Ok(())
    }

    /// Number of sessions currently tracked (terminal included).
    pub async fn session_count(&self) -> usize {
        self.sessions.read().await.len()
    }

    /// Number of sessions not yet terminal.
    pub async fn active_count(&self) -> usize {
        self.sessions
            .read()
            .await
            .values()
            .filter(|s| !s.state.is_terminal())
            .count()
    }

    /// Force-kills all active sessions and waits for their terminal events,
    /// bounded by the grace period.
    pub async fn shutdown(&self) {
        let ids: Vec<SessionId> = {
            let sessions = self.sessions.read().await;
            sessions
                .iter()
                .filter(|(_, s)| !s.state.is_terminal())
                .map(|(id, _)| id.clone())
                .collect()
        };

        if ids.is_empty() {
            return;
        }

        info!(count = ids.len(), "shutting down active sessions");
        for id in &ids {
            if let Err(e) = self.kill(id, true).await {
                warn!(session_id = %id, error = %e, "failed to kill session during shutdown");
            }
        }

        let deadline = tokio::time::Instant::now() + self.config.grace_period;
        while self.active_count().await > 0 {
            if tokio::time::Instant::now() >= deadline {
                warn!("shutdown deadline reached with sessions still active");
                break;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
    }
}

/// Updates a session's state and publishes the change.
async fn set_state(sessions: &SessionMap, bus: &EventBus, id: &SessionId, state: SessionState) {
    let changed = {
        let mut sessions = sessions.write().await;
        match sessions.get_mut(id) {
            Some(session) if session.state != state => {
                session.state = state.clone();
                if state.is_terminal() {
                    // Drop the runner handle with the process gone.
                    session.handle = None;
                }
                true
            }
            _ => false,
        }
    };

    if changed {
        bus.publish(SessionEvent::StateChanged {
            session_id: id.clone(),
            state,
        });
    }
}

/// Per-session forwarder: republishes runner events onto the bus.
///
/// A runner channel that closes without a terminal event means the runner
/// crashed; the session is surfaced as `Failed` rather than propagating the
/// fault.
async fn forward_events(
    id: SessionId,
    mut events_rx: mpsc::UnboundedReceiver<RunnerEvent>,
    sessions: SessionMap,
    bus: EventBus,
) {
    let mut terminated = false;

    while let Some(event) = events_rx.recv().await {
        match event {
            RunnerEvent::Output(output) => {
                {
                    let mut sessions = sessions.write().await;
                    if let Some(session) = sessions.get_mut(&id) {
                        session.last_seq = output.seq;
                    }
                }
                bus.publish(SessionEvent::Output(output));
            }
            RunnerEvent::Terminated(state) => {
                set_state(&sessions, &bus, &id, state).await;
                terminated = true;
            }
        }
    }

    if !terminated {
        warn!(session_id = %id, "runner channel closed without terminal event");
        set_state(
            &sessions,
            &bus,
            &id,
            SessionState::Failed("runner crashed".to_string()),
        )
        .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use conswol_models::{OutputEvent, StdinMode, StreamTag};

    fn mux() -> SessionMultiplexer {
        SessionMultiplexer::new(
            MultiplexerConfig::new().with_grace_period(Duration::from_millis(500)),
            EventBus::new(),
        )
    }

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh")
            .with_args(["-c", script])
            .with_stdin(StdinMode::Null)
    }

    /// Collects bus events for one session until its terminal state.
    async fn collect_session(
        rx: &mut conswol_events::Subscription,
        id: &SessionId,
    ) -> (Vec<OutputEvent>, SessionState) {
        let mut outputs = Vec::new();
        loop {
            let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("timed out waiting for session events")
                .expect("bus closed");
            if event.session_id() != id {
                continue;
            }
            match event {
                SessionEvent::Output(output) => outputs.push(output),
                SessionEvent::StateChanged { state, .. } if state.is_terminal() => {
                    return (outputs, state)
                }
                _ => {}
            }
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_launch_streams_output_to_bus() {
        let mux = mux();
        let mut rx = mux.bus().subscribe();

        let id = mux.launch(sh("echo alpha; echo beta")).await.unwrap();
        let (outputs, state) = collect_session(&mut rx, &id).await;

        assert_eq!(state, SessionState::Exited(0));
        for (i, event) in outputs.iter().enumerate() {
            assert_eq!(event.seq, i as u64 + 1);
        }
        let stdout: Vec<&str> = outputs
            .iter()
            .filter(|e| e.tag == StreamTag::Stdout)
            .map(|e| e.payload.as_str())
            .collect();
        assert_eq!(stdout, vec!["alpha", "beta"]);
    }

    #[tokio::test]
    async fn test_launch_missing_program_creates_no_session() {
        let mux = mux();

        let result = mux.launch(CommandSpec::new("definitely-not-a-real-program-xyz")).await;

        assert!(matches!(
            result,
            Err(SessionError::Runner(conswol_runner::RunnerError::Spawn { .. }))
        ));
        assert_eq!(mux.session_count().await, 0);
        assert!(mux.list().await.is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_kill_exited_session_is_noop() {
        let mux = mux();
        let mut rx = mux.bus().subscribe();

        let id = mux.launch(sh("exit 0")).await.unwrap();
        let (_, state) = collect_session(&mut rx, &id).await;
        assert_eq!(state, SessionState::Exited(0));

        // Already exited: both graceful and forced kill are Ok no-ops.
        mux.kill(&id, false).await.unwrap();
        mux.kill(&id, true).await.unwrap();

        let summary = mux.get(&id).await.unwrap();
        assert_eq!(summary.state, SessionState::Exited(0));
    }

    #[tokio::test]
    async fn test_kill_unknown_session() {
        let mux = mux();
        let id = SessionId::from_string("sess-nope");

        let result = mux.kill(&id, false).await;
        assert!(matches!(result, Err(SessionError::NotFound(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_kill_running_session() {
        let mux = mux();
        let mut rx = mux.bus().subscribe();

        let id = mux.launch(sh("sleep 30")).await.unwrap();
        mux.kill(&id, true).await.unwrap();

        let (_, state) = collect_session(&mut rx, &id).await;
        assert_eq!(state, SessionState::Killed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_concurrent_sessions_independent_sequences() {
        let mux = mux();
        let mut rx = mux.bus().subscribe();

        let a = mux
            .launch(sh("for i in 1 2 3 4 5; do echo a$i; done"))
            .await
            .unwrap();
        let b = mux
            .launch(sh("for i in 1 2 3 4 5; do echo b$i; done"))
            .await
            .unwrap();

        let mut seqs: HashMap<SessionId, Vec<u64>> = HashMap::new();
        let mut terminal = 0;
        while terminal < 2 {
            let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("timed out")
                .expect("bus closed");
            match event {
                SessionEvent::Output(output) => {
                    seqs.entry(output.session_id.clone()).or_default().push(output.seq);
                }
                SessionEvent::StateChanged { state, .. } if state.is_terminal() => {
                    assert_eq!(state, SessionState::Exited(0));
                    terminal += 1;
                }
                _ => {}
            }
        }

        // Each session's sequence is gapless from 1 even though both
        // published to the bus concurrently.
        for id in [&a, &b] {
            let seqs = seqs.get(id).unwrap();
            for (i, seq) in seqs.iter().enumerate() {
                assert_eq!(*seq, i as u64 + 1);
            }
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_attach_input() {
        let mux = mux();
        let mut rx = mux.bus().subscribe();

        let id = mux
            .launch(CommandSpec::new("cat"))
            .await
            .unwrap();

        mux.attach_input(&id, b"ping\n".to_vec()).await.unwrap();

        // Wait for the echoed line.
        loop {
            let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
                .await
                .expect("timed out")
                .expect("bus closed");
            if let SessionEvent::Output(output) = event {
                if output.tag == StreamTag::Stdout && output.payload == "ping" {
                    break;
                }
            }
        }

        mux.kill(&id, true).await.unwrap();
        let (_, state) = collect_session(&mut rx, &id).await;
        assert_eq!(state, SessionState::Killed);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_attach_input_after_exit_fails() {
        let mux = mux();
        let mut rx = mux.bus().subscribe();

        let id = mux.launch(sh("exit 0")).await.unwrap();
        let (_, state) = collect_session(&mut rx, &id).await;
        assert_eq!(state, SessionState::Exited(0));

        let result = mux.attach_input(&id, b"late\n".to_vec()).await;
        assert!(matches!(
            result,
            Err(SessionError::Runner(conswol_runner::RunnerError::Closed(_)))
        ));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_remove_requires_terminal() {
        let mux = mux();
        let mut rx = mux.bus().subscribe();

        let id = mux.launch(sh("sleep 30")).await.unwrap();
        let result = mux.remove(&id).await;
        assert!(matches!(result, Err(SessionError::StillActive(_))));

        mux.kill(&id, true).await.unwrap();
        let (_, state) = collect_session(&mut rx, &id).await;
        assert_eq!(state, SessionState::Killed);

        mux.remove(&id).await.unwrap();
        assert_eq!(mux.session_count().await, 0);
        assert!(mux.get(&id).await.is_none());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_max_sessions_enforced() {
        let mux = SessionMultiplexer::new(
            MultiplexerConfig::new().with_max_sessions(1),
            EventBus::new(),
        );
        let mut rx = mux.bus().subscribe();

        let id = mux.launch(sh("sleep 30")).await.unwrap();

        let result = mux.launch(sh("echo surplus")).await;
        assert!(matches!(result, Err(SessionError::MaxSessionsReached(1))));

        // A terminal session frees its slot.
        mux.kill(&id, true).await.unwrap();
        let (_, _) = collect_session(&mut rx, &id).await;
        mux.launch(sh("echo ok")).await.unwrap();
    }

    #[tokio::test]
    async fn test_runner_crash_surfaces_failed() {
        let mux = mux();
        let mut rx = mux.bus().subscribe();
        let id = SessionId::from_string("sess-crash");

        {
            let mut sessions = mux.sessions.write().await;
            sessions.insert(
                id.clone(),
                Session {
                    spec: CommandSpec::new("fake"),
                    state: SessionState::Running,
                    created_at: Utc::now(),
                    last_seq: 0,
                    handle: None,
                },
            );
        }

        // Channel closed without a terminal event: the runner crashed.
        let (events_tx, events_rx) = mpsc::unbounded_channel::<RunnerEvent>();
        drop(events_tx);
        forward_events(id.clone(), events_rx, Arc::clone(&mux.sessions), mux.bus.clone()).await;

        let summary = mux.get(&id).await.unwrap();
        assert_eq!(summary.state, SessionState::Failed("runner crashed".to_string()));

        let event = rx.recv().await.unwrap();
        assert!(event.is_terminal());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_shutdown_kills_all_active() {
        let mux = mux();

        mux.launch(sh("sleep 30")).await.unwrap();
        mux.launch(sh("sleep 30")).await.unwrap();
        assert_eq!(mux.active_count().await, 2);

        mux.shutdown().await;
        assert_eq!(mux.active_count().await, 0);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_list_sorted_by_launch_time() {
        let mux = mux();
        let mut rx = mux.bus().subscribe();

        let first = mux.launch(sh("echo 1")).await.unwrap();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = mux.launch(sh("echo 2")).await.unwrap();

        let list = mux.list().await;
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, first);
        assert_eq!(list[1].id, second);

        // Drain so the tasks finish before the runtime shuts down.
        let _ = collect_session(&mut rx, &first).await;
    }
}
