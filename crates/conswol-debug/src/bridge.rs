//! BreakpointBridge - abstract debug operations over a translator.

use std::collections::HashMap;
use std::time::Duration;

use tokio::sync::mpsc::{UnboundedReceiver, UnboundedSender};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use conswol_events::EventBus;
use conswol_models::{Breakpoint, BreakpointId, DebuggerEvent, SessionEvent, SessionId, SourceLocation};

use crate::error::{BridgeError, Result};
use crate::state::BridgeState;
use crate::translator::{Ack, DebugCommand, DebuggerReply, DebuggerTranslator};

/// Configuration for the breakpoint bridge.
#[derive(Debug, Clone)]
pub struct BridgeConfig {
    /// How long to wait for a debugger acknowledgment.
    pub ack_timeout: Duration,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            ack_timeout: Duration::from_secs(2),
        }
    }
}

impl BridgeConfig {
    /// Creates a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the acknowledgment timeout.
    pub fn with_ack_timeout(mut self, timeout: Duration) -> Self {
        self.ack_timeout = timeout;
        self
    }
}

/// State guarded by the in-flight-operation lock.
struct BridgeInner {
    state: BridgeState,
    breakpoints: HashMap<BreakpointId, Breakpoint>,
    reply_rx: UnboundedReceiver<String>,
}

/// Adapter between abstract breakpoint operations and an attached debugger.
///
/// The bridge talks to the debugger through a pair of line channels:
/// commands go out on `commands_tx` (one protocol line each), replies come
/// in on `reply_rx`. How those lines reach the debugger process (session
/// multiplexer stdin/stdout, a test harness) is the caller's wiring.
///
/// Every mutating operation sends the translated command and awaits the
/// debugger's acknowledgment before touching the local breakpoint cache;
/// an acknowledgment timeout leaves local state unchanged. Operations are
/// serialized by an internal lock, so two concurrent mutations on the same
/// session cannot race.
///
/// Decoded debugger events are applied to the state machine and forwarded
/// to the event bus as [`SessionEvent::Debugger`].
pub struct BreakpointBridge {
    session_id: SessionId,
    translator: Box<dyn DebuggerTranslator>,
    commands_tx: UnboundedSender<String>,
    bus: EventBus,
    config: BridgeConfig,
    inner: Mutex<BridgeInner>,
}

impl BreakpointBridge {
    /// Creates a bridge for the given debugger session.
    pub fn new(
        session_id: SessionId,
        translator: Box<dyn DebuggerTranslator>,
        commands_tx: UnboundedSender<String>,
        reply_rx: UnboundedReceiver<String>,
        bus: EventBus,
        config: BridgeConfig,
    ) -> Self {
        Self {
            session_id,
            translator,
            commands_tx,
            bus,
            config,
            inner: Mutex::new(BridgeInner {
                state: BridgeState::Detached,
                breakpoints: HashMap::new(),
                reply_rx,
            }),
        }
    }

    /// Returns the session this bridge drives.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Returns the current bridge state.
    pub async fn state(&self) -> BridgeState {
        self.inner.lock().await.state
    }

    /// Returns the locally cached breakpoints, sorted by ID.
    pub async fn breakpoints(&self) -> Vec<Breakpoint> {
        let inner = self.inner.lock().await;
        let mut breakpoints: Vec<Breakpoint> = inner.breakpoints.values().cloned().collect();
        breakpoints.sort_by_key(|bp| bp.id);
        breakpoints
    }

    /// Performs the handshake with the debugger.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidState`] unless detached;
    /// [`BridgeError::HandshakeFailed`] if the debugger does not confirm,
    /// in which case the bridge is back in `Detached`.
    pub async fn attach(&self) -> Result<()> {
        let mut inner = self.inner.lock().await;
        if inner.state != BridgeState::Detached {
            return Err(BridgeError::InvalidState {
                operation: "attach",
                state: inner.state,
            });
        }

        inner.state = BridgeState::Attaching;
        if let Err(e) = self.send(&DebugCommand::Attach) {
            inner.state = BridgeState::Detached;
            return Err(e);
        }

        match self.await_ack(&mut inner, "attach").await {
            Ok(Ack::Attached) => {
                inner.state = BridgeState::Ready;
                debug!(session_id = %self.session_id, "debugger attached");
                Ok(())
            }
            Ok(_) => {
                inner.state = BridgeState::Detached;
                Err(BridgeError::Protocol { operation: "attach" })
            }
            Err(e) => {
                inner.state = BridgeState::Detached;
                Err(BridgeError::HandshakeFailed(e.to_string()))
            }
        }
    }

    /// Sets a breakpoint, returning the debugger-assigned ID.
    ///
    /// The breakpoint enters the local cache only after the debugger's
    /// acknowledgment.
    ///
    /// # Errors
    ///
    /// [`BridgeError::InvalidState`] outside `Ready`/`Paused`;
    /// [`BridgeError::Timeout`] on a missing acknowledgment (no local
    /// state change).
    pub async fn set_breakpoint(&self, location: SourceLocation) -> Result<BreakpointId> {
        let mut inner = self.inner.lock().await;
        self.drain_buffered(&mut inner);
        self.check_operational(&inner, "set_breakpoint")?;

        self.send(&DebugCommand::SetBreakpoint(location.clone()))?;
        match self.await_ack(&mut inner, "set_breakpoint").await? {
            Ack::BreakpointSet(id) => {
                inner.breakpoints.insert(id, Breakpoint::new(id, location));
                debug!(session_id = %self.session_id, breakpoint = %id, "breakpoint set");
                Ok(id)
            }
            _ => Err(BridgeError::Protocol {
                operation: "set_breakpoint",
            }),
        }
    }

    /// Clears a breakpoint.
    ///
    /// # Errors
    ///
    /// [`BridgeError::UnknownBreakpoint`] if not in the local cache;
    /// otherwise like [`set_breakpoint`](Self::set_breakpoint).
    pub async fn clear_breakpoint(&self, id: BreakpointId) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.drain_buffered(&mut inner);
        self.check_operational(&inner, "clear_breakpoint")?;

        if !inner.breakpoints.contains_key(&id) {
            return Err(BridgeError::UnknownBreakpoint(id));
        }

        self.send(&DebugCommand::ClearBreakpoint(id))?;
        match self.await_ack(&mut inner, "clear_breakpoint").await? {
            Ack::BreakpointCleared(acked) if acked == id => {
                inner.breakpoints.remove(&id);
                debug!(session_id = %self.session_id, breakpoint = %id, "breakpoint cleared");
                Ok(())
            }
            _ => Err(BridgeError::Protocol {
                operation: "clear_breakpoint",
            }),
        }
    }

    /// Resumes execution.
    pub async fn continue_execution(&self) -> Result<()> {
        self.resume(DebugCommand::Continue, "continue").await
    }

    /// Executes one step.
    pub async fn step(&self) -> Result<()> {
        self.resume(DebugCommand::Step, "step").await
    }

    /// Applies any buffered debugger events, returning them.
    pub async fn poll_events(&self) -> Vec<DebuggerEvent> {
        let mut inner = self.inner.lock().await;
        self.drain_buffered(&mut inner)
    }

    async fn resume(&self, command: DebugCommand, operation: &'static str) -> Result<()> {
        let mut inner = self.inner.lock().await;
        self.drain_buffered(&mut inner);
        self.check_operational(&inner, operation)?;

        self.send(&command)?;
        match self.await_ack(&mut inner, operation).await? {
            Ack::Continued | Ack::Stepped => {
                inner.state = BridgeState::Running;
                debug!(session_id = %self.session_id, operation = operation, "debuggee running");
                Ok(())
            }
            _ => Err(BridgeError::Protocol { operation }),
        }
    }

    fn check_operational(&self, inner: &BridgeInner, operation: &'static str) -> Result<()> {
        if inner.state.accepts_operations() {
            Ok(())
        } else {
            Err(BridgeError::InvalidState {
                operation,
                state: inner.state,
            })
        }
    }

    fn send(&self, command: &DebugCommand) -> Result<()> {
        let line = self.translator.encode(command);
        self.commands_tx
            .send(line)
            .map_err(|_| BridgeError::Disconnected)
    }

    /// Waits for the next acknowledgment, applying any events that arrive
    /// in the meantime so they are not lost.
    async fn await_ack(&self, inner: &mut BridgeInner, operation: &'static str) -> Result<Ack> {
        let deadline = tokio::time::Instant::now() + self.config.ack_timeout;

        loop {
            let now = tokio::time::Instant::now();
            if now >= deadline {
                return Err(BridgeError::Timeout { operation });
            }

            match tokio::time::timeout(deadline - now, inner.reply_rx.recv()).await {
                Err(_) => return Err(BridgeError::Timeout { operation }),
                Ok(None) => return Err(BridgeError::Disconnected),
                Ok(Some(line)) => match self.translator.decode(&line) {
                    None => continue,
                    Some(DebuggerReply::Event(event)) => self.apply_event(inner, event),
                    Some(DebuggerReply::Ack(ack)) => return Ok(ack),
                },
            }
        }
    }

    /// Applies buffered replies without waiting. Stray acks outside an
    /// in-flight operation are dropped.
    fn drain_buffered(&self, inner: &mut BridgeInner) -> Vec<DebuggerEvent> {
        let mut events = Vec::new();
        while let Ok(line) = inner.reply_rx.try_recv() {
            match self.translator.decode(&line) {
                None => {}
                Some(DebuggerReply::Event(event)) => {
                    self.apply_event(inner, event.clone());
                    events.push(event);
                }
                Some(DebuggerReply::Ack(_)) => {
                    warn!(session_id = %self.session_id, line = %line, "stray debugger ack");
                }
            }
        }
        events
    }

    fn apply_event(&self, inner: &mut BridgeInner, event: DebuggerEvent) {
        match &event {
            DebuggerEvent::BreakpointHit { id, frame } => {
                if let Some(bp) = inner.breakpoints.get_mut(id) {
                    bp.hit_count += 1;
                }
                if inner.state == BridgeState::Running {
                    inner.state = BridgeState::Paused;
                }
                debug!(session_id = %self.session_id, breakpoint = %id, frame = %frame, "breakpoint hit");
            }
            DebuggerEvent::ProcessExited { code } => {
                inner.state = BridgeState::Exited;
                debug!(session_id = %self.session_id, code = code, "debuggee exited");
            }
            DebuggerEvent::Error { message } => {
                warn!(session_id = %self.session_id, message = %message, "debugger error");
            }
        }

        self.bus.publish(SessionEvent::Debugger {
            session_id: self.session_id.clone(),
            event,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use crate::translator::TextTranslator;

    struct Harness {
        bridge: Arc<BreakpointBridge>,
        commands: UnboundedReceiver<String>,
        replies: UnboundedSender<String>,
        bus: EventBus,
    }

    fn harness() -> Harness {
        let (commands_tx, commands) = mpsc::unbounded_channel();
        let (replies, reply_rx) = mpsc::unbounded_channel();
        let bus = EventBus::new();
        let bridge = BreakpointBridge::new(
            SessionId::from_string("sess-dbg"),
            Box::new(TextTranslator::new()),
            commands_tx,
            reply_rx,
            bus.clone(),
            BridgeConfig::new().with_ack_timeout(Duration::from_millis(300)),
        );
        Harness {
            bridge: Arc::new(bridge),
            commands,
            replies,
            bus,
        }
    }

    /// Runs `op` while responding to the expected command with `reply`.
    async fn exchange<F, Fut, T>(h: &mut Harness, expected: &str, reply: &str, op: F) -> T
    where
        F: FnOnce(Arc<BreakpointBridge>) -> Fut,
        Fut: std::future::Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let task = tokio::spawn(op(h.bridge.clone()));
        let line = h.commands.recv().await.expect("no command sent");
        assert_eq!(line, expected);
        h.replies.send(reply.to_string()).unwrap();
        task.await.unwrap()
    }

    async fn attach(h: &mut Harness) {
        exchange(h, "attach", "ok attach", |b| async move { b.attach().await })
            .await
            .unwrap();
        assert_eq!(h.bridge.state().await, BridgeState::Ready);
    }

    #[tokio::test]
    async fn test_attach_handshake() {
        let mut h = harness();
        assert_eq!(h.bridge.state().await, BridgeState::Detached);
        attach(&mut h).await;
    }

    #[tokio::test]
    async fn test_attach_timeout_returns_to_detached() {
        let h = harness();

        // No reply ever arrives.
        let result = h.bridge.attach().await;
        assert!(matches!(result, Err(BridgeError::HandshakeFailed(_))));
        assert_eq!(h.bridge.state().await, BridgeState::Detached);
    }

    #[tokio::test]
    async fn test_attach_twice_invalid() {
        let mut h = harness();
        attach(&mut h).await;

        let result = h.bridge.attach().await;
        assert!(matches!(result, Err(BridgeError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_set_breakpoint_acked() {
        let mut h = harness();
        attach(&mut h).await;

        let id = exchange(&mut h, "break src/main.rs:42", "ok break 1", |b| async move {
            b.set_breakpoint(SourceLocation::new("src/main.rs", 42)).await
        })
        .await
        .unwrap();

        assert_eq!(id, BreakpointId::new(1));
        let breakpoints = h.bridge.breakpoints().await;
        assert_eq!(breakpoints.len(), 1);
        assert_eq!(breakpoints[0].location, SourceLocation::new("src/main.rs", 42));
        assert!(breakpoints[0].enabled);
        assert_eq!(breakpoints[0].hit_count, 0);
    }

    #[tokio::test]
    async fn test_set_breakpoint_timeout_leaves_state_unchanged() {
        let mut h = harness();
        attach(&mut h).await;

        // Command goes out but the debugger never acknowledges.
        let result = h
            .bridge
            .set_breakpoint(SourceLocation::new("src/main.rs", 42))
            .await;

        assert!(matches!(
            result,
            Err(BridgeError::Timeout {
                operation: "set_breakpoint"
            })
        ));
        assert!(h.bridge.breakpoints().await.is_empty());
        assert_eq!(h.bridge.state().await, BridgeState::Ready);
    }

    #[tokio::test]
    async fn test_set_breakpoint_while_running_invalid() {
        let mut h = harness();
        attach(&mut h).await;

        exchange(&mut h, "continue", "ok continue", |b| async move {
            b.continue_execution().await
        })
        .await
        .unwrap();
        assert_eq!(h.bridge.state().await, BridgeState::Running);

        let result = h
            .bridge
            .set_breakpoint(SourceLocation::new("src/main.rs", 42))
            .await;
        assert!(matches!(
            result,
            Err(BridgeError::InvalidState {
                state: BridgeState::Running,
                ..
            })
        ));
        assert!(h.bridge.breakpoints().await.is_empty());
    }

    #[tokio::test]
    async fn test_breakpoint_hit_pauses_and_counts() {
        let mut h = harness();
        let mut bus_rx = h.bus.subscribe();
        attach(&mut h).await;

        exchange(&mut h, "break a.c:3", "ok break 1", |b| async move {
            b.set_breakpoint(SourceLocation::new("a.c", 3)).await
        })
        .await
        .unwrap();

        exchange(&mut h, "continue", "ok continue", |b| async move {
            b.continue_execution().await
        })
        .await
        .unwrap();

        h.replies.send("event hit 1 main at a.c:3".to_string()).unwrap();
        let events = h.bridge.poll_events().await;
        assert_eq!(events.len(), 1);

        assert_eq!(h.bridge.state().await, BridgeState::Paused);
        let breakpoints = h.bridge.breakpoints().await;
        assert_eq!(breakpoints[0].hit_count, 1);

        // The hit was forwarded to the bus.
        let forwarded = loop {
            match bus_rx.recv().await.unwrap() {
                SessionEvent::Debugger { event, .. } => break event,
                _ => continue,
            }
        };
        assert!(matches!(forwarded, DebuggerEvent::BreakpointHit { .. }));
    }

    #[tokio::test]
    async fn test_step_from_paused() {
        let mut h = harness();
        attach(&mut h).await;

        exchange(&mut h, "continue", "ok continue", |b| async move {
            b.continue_execution().await
        })
        .await
        .unwrap();
        h.replies.send("event hit 1 frame".to_string()).unwrap();
        h.bridge.poll_events().await;
        assert_eq!(h.bridge.state().await, BridgeState::Paused);

        exchange(&mut h, "step", "ok step", |b| async move { b.step().await })
            .await
            .unwrap();
        assert_eq!(h.bridge.state().await, BridgeState::Running);
    }

    #[tokio::test]
    async fn test_clear_breakpoint() {
        let mut h = harness();
        attach(&mut h).await;

        let id = exchange(&mut h, "break a.c:3", "ok break 4", |b| async move {
            b.set_breakpoint(SourceLocation::new("a.c", 3)).await
        })
        .await
        .unwrap();

        exchange(&mut h, "delete 4", "ok delete 4", move |b| async move {
            b.clear_breakpoint(id).await
        })
        .await
        .unwrap();

        assert!(h.bridge.breakpoints().await.is_empty());
    }

    #[tokio::test]
    async fn test_clear_unknown_breakpoint() {
        let mut h = harness();
        attach(&mut h).await;

        let result = h.bridge.clear_breakpoint(BreakpointId::new(9)).await;
        assert!(matches!(result, Err(BridgeError::UnknownBreakpoint(_))));
    }

    #[tokio::test]
    async fn test_process_exit_detaches() {
        let mut h = harness();
        attach(&mut h).await;

        exchange(&mut h, "continue", "ok continue", |b| async move {
            b.continue_execution().await
        })
        .await
        .unwrap();

        h.replies.send("event exit 0".to_string()).unwrap();
        h.bridge.poll_events().await;
        assert_eq!(h.bridge.state().await, BridgeState::Exited);

        // No further operations are accepted.
        let result = h.bridge.continue_execution().await;
        assert!(matches!(result, Err(BridgeError::InvalidState { .. })));
    }

    #[tokio::test]
    async fn test_event_during_ack_wait_not_lost() {
        let mut h = harness();
        let mut bus_rx = h.bus.subscribe();
        attach(&mut h).await;

        let task = {
            let bridge = h.bridge.clone();
            tokio::spawn(async move { bridge.set_breakpoint(SourceLocation::new("a.c", 3)).await })
        };
        assert_eq!(h.commands.recv().await.unwrap(), "break a.c:3");

        // An unrelated event slips in ahead of the ack.
        h.replies.send("event error symbols missing".to_string()).unwrap();
        h.replies.send("ok break 1".to_string()).unwrap();

        let id = task.await.unwrap().unwrap();
        assert_eq!(id, BreakpointId::new(1));

        let forwarded = loop {
            match bus_rx.recv().await.unwrap() {
                SessionEvent::Debugger { event, .. } => break event,
                _ => continue,
            }
        };
        assert!(matches!(forwarded, DebuggerEvent::Error { .. }));
    }

    #[tokio::test]
    async fn test_chatter_ignored_while_awaiting_ack() {
        let mut h = harness();
        attach(&mut h).await;

        let task = {
            let bridge = h.bridge.clone();
            tokio::spawn(async move { bridge.set_breakpoint(SourceLocation::new("a.c", 3)).await })
        };
        assert_eq!(h.commands.recv().await.unwrap(), "break a.c:3");

        h.replies.send("Reading symbols from ./a.out".to_string()).unwrap();
        h.replies.send("ok break 2".to_string()).unwrap();

        let id = task.await.unwrap().unwrap();
        assert_eq!(id, BreakpointId::new(2));
    }

    #[tokio::test]
    async fn test_disconnect_surfaces() {
        let mut h = harness();
        attach(&mut h).await;

        let task = {
            let bridge = h.bridge.clone();
            tokio::spawn(async move { bridge.set_breakpoint(SourceLocation::new("a.c", 3)).await })
        };
        assert_eq!(h.commands.recv().await.unwrap(), "break a.c:3");

        // Debugger goes away mid-operation.
        let replies = std::mem::replace(&mut h.replies, mpsc::unbounded_channel().0);
        drop(replies);

        let result = task.await.unwrap();
        assert!(matches!(result, Err(BridgeError::Disconnected)));
        assert!(h.bridge.breakpoints().await.is_empty());
    }
}
