//! Process runner: owns one external command from spawn to reap.
//!
//! Each spawned command is serviced by a dedicated supervisor task that
//! reads stdout/stderr line by line, stamps per-session sequence numbers,
//! services input and termination requests, and emits exactly one terminal
//! event after the child has been reaped. Sequence numbers are assigned at a
//! single point, so the order observed on the event channel is the sequence
//! order.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep, Instant};
use tracing::{debug, info, warn};

use conswol_models::{CommandSpec, OutputEvent, SessionId, SessionState, StdinMode, StreamTag};

use crate::config::RunnerConfig;
use crate::error::{Result, RunnerError};

/// How a termination request should be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminateMode {
    /// SIGTERM first, forced kill after the configured grace period.
    Graceful,
    /// Forced kill right away.
    Immediate,
}

/// Events emitted by a runner for one session.
///
/// A runner produces a finite sequence of `Output` events followed by
/// exactly one `Terminated` event, after which the channel closes.
#[derive(Debug, Clone)]
pub enum RunnerEvent {
    /// A line of output.
    Output(OutputEvent),
    /// The process reached a terminal state and was reaped.
    Terminated(SessionState),
}

/// Control messages from the handle to the supervisor task.
enum Control {
    /// Write bytes to the child's stdin, acknowledge the result.
    Input(Vec<u8>, oneshot::Sender<Result<()>>),
    /// Request termination.
    Terminate(TerminateMode),
}

/// Handle to a running process.
///
/// Dropping the handle does not terminate the process; the supervisor task
/// keeps servicing it until it exits or is killed.
#[derive(Debug, Clone)]
pub struct RunnerHandle {
    session_id: SessionId,
    ctrl: mpsc::UnboundedSender<Control>,
}

impl RunnerHandle {
    /// Returns the session this handle belongs to.
    pub fn session_id(&self) -> &SessionId {
        &self.session_id
    }

    /// Forwards bytes to the process's stdin.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Closed`] if the process has already terminated
    /// or its stdin is not piped, and [`RunnerError::InputFailed`] if the
    /// write itself fails.
    pub async fn send_input(&self, bytes: impl Into<Vec<u8>>) -> Result<()> {
        let (ack_tx, ack_rx) = oneshot::channel();
        self.ctrl
            .send(Control::Input(bytes.into(), ack_tx))
            .map_err(|_| RunnerError::Closed(self.session_id.clone()))?;
        ack_rx
            .await
            .map_err(|_| RunnerError::Closed(self.session_id.clone()))?
    }

    /// Requests termination of the process.
    ///
    /// Effective even for an unresponsive process: the graceful path falls
    /// back to a forced kill after the grace period. Terminating a process
    /// that already exited is a no-op.
    pub fn terminate(&self, mode: TerminateMode) {
        // A closed channel means the supervisor already finished.
        let _ = self.ctrl.send(Control::Terminate(mode));
    }
}

/// Spawns managed processes.
pub struct ProcessRunner;

impl ProcessRunner {
    /// Spawns the command described by `spec` for session `session_id`.
    ///
    /// Output and the final status are delivered on `events`; the returned
    /// handle accepts input and termination requests.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::Spawn`] when the program cannot be located or
    /// executed. No supervisor task is started in that case.
    pub fn spawn(
        session_id: SessionId,
        spec: &CommandSpec,
        events: mpsc::UnboundedSender<RunnerEvent>,
        config: RunnerConfig,
    ) -> Result<RunnerHandle> {
        let mut cmd = Command::new(&spec.program);
        cmd.args(&spec.args)
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .stdin(match spec.stdin {
                StdinMode::Piped => Stdio::piped(),
                StdinMode::Null => Stdio::null(),
            })
            // Backstop: the child is killed if the supervisor task is ever
            // dropped without reaping it.
            .kill_on_drop(true);

        if let Some(dir) = &spec.working_dir {
            cmd.current_dir(dir);
        }
        for (key, value) in &spec.env {
            cmd.env(key, value);
        }

        let mut child = cmd.spawn().map_err(|source| RunnerError::Spawn {
            program: spec.program.clone(),
            source,
        })?;

        debug!(
            session_id = %session_id,
            program = %spec.program,
            pid = ?child.id(),
            "process spawned"
        );

        let stdin = child.stdin.take();
        let (ctrl_tx, ctrl_rx) = mpsc::unbounded_channel();

        let id = session_id.clone();
        let program = spec.program.clone();
        let grace = config.grace_period;
        tokio::spawn(async move {
            supervise(id, program, child, stdin, ctrl_rx, events, grace).await;
        });

        Ok(RunnerHandle {
            session_id,
            ctrl: ctrl_tx,
        })
    }
}

/// Reads the next line, treating an absent stream as immediate EOF.
async fn read_line<R>(lines: &mut Option<Lines<BufReader<R>>>) -> std::io::Result<Option<String>>
where
    R: tokio::io::AsyncRead + Unpin,
{
    match lines {
        Some(lines) => lines.next_line().await,
        None => Ok(None),
    }
}

fn emit_output(
    events: &mpsc::UnboundedSender<RunnerEvent>,
    session_id: &SessionId,
    seq: &mut u64,
    tag: StreamTag,
    payload: String,
) {
    *seq += 1;
    let _ = events.send(RunnerEvent::Output(OutputEvent {
        session_id: session_id.clone(),
        tag,
        payload,
        seq: *seq,
    }));
}

#[cfg(unix)]
fn send_sigterm(pid: u32) -> bool {
    // Safety: plain kill(2) on a pid we spawned and have not yet reaped.
    unsafe { libc::kill(pid as libc::pid_t, libc::SIGTERM) == 0 }
}

/// Supervisor loop for one child process.
///
/// Runs until stdout and stderr hit EOF and the child has been reaped, then
/// emits the single terminal event. All exit paths reap the child.
async fn supervise(
    session_id: SessionId,
    program: String,
    mut child: Child,
    mut stdin: Option<ChildStdin>,
    mut ctrl_rx: mpsc::UnboundedReceiver<Control>,
    events: mpsc::UnboundedSender<RunnerEvent>,
    grace_period: Duration,
) {
    let mut stdout_lines = child.stdout.take().map(|s| BufReader::new(s).lines());
    let mut stderr_lines = child.stderr.take().map(|s| BufReader::new(s).lines());
    let mut stdout_done = stdout_lines.is_none();
    let mut stderr_done = stderr_lines.is_none();

    let mut seq: u64 = 0;
    let mut exit_status: Option<std::process::ExitStatus> = None;
    let mut reaped = false;
    let mut kill_requested = false;
    let mut failure: Option<String> = None;
    let mut ctrl_open = true;
    // Forced-kill requests are recorded here and applied at the top of the
    // loop: `child` must not be touched from a branch handler while another
    // branch's `wait()` future borrows it.
    let mut kill_now = false;

    let pid = child.id();
    emit_output(
        &events,
        &session_id,
        &mut seq,
        StreamTag::Meta,
        match pid {
            Some(pid) => format!("spawned {} (pid {})", program, pid),
            None => format!("spawned {}", program),
        },
    );

    let grace_timer = sleep(Duration::ZERO);
    tokio::pin!(grace_timer);
    let mut grace_armed = false;

    while !(stdout_done && stderr_done && reaped) {
        if kill_now {
            kill_now = false;
            if !reaped {
                debug!(session_id = %session_id, "forced kill");
                let _ = child.start_kill();
            }
        }

        tokio::select! {
            line = read_line(&mut stdout_lines), if !stdout_done => match line {
                Ok(Some(payload)) => {
                    emit_output(&events, &session_id, &mut seq, StreamTag::Stdout, payload);
                }
                Ok(None) => stdout_done = true,
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "stdout read failed");
                    stdout_done = true;
                    failure.get_or_insert_with(|| format!("stdout read failed: {}", e));
                    kill_now = true;
                }
            },
            line = read_line(&mut stderr_lines), if !stderr_done => match line {
                Ok(Some(payload)) => {
                    emit_output(&events, &session_id, &mut seq, StreamTag::Stderr, payload);
                }
                Ok(None) => stderr_done = true,
                Err(e) => {
                    warn!(session_id = %session_id, error = %e, "stderr read failed");
                    stderr_done = true;
                    failure.get_or_insert_with(|| format!("stderr read failed: {}", e));
                    kill_now = true;
                }
            },
            status = child.wait(), if !reaped => {
                reaped = true;
                match status {
                    Ok(status) => exit_status = Some(status),
                    Err(e) => {
                        warn!(session_id = %session_id, error = %e, "wait failed");
                        failure.get_or_insert_with(|| format!("wait failed: {}", e));
                    }
                }
            },
            ctrl = ctrl_rx.recv(), if ctrl_open => match ctrl {
                Some(Control::Input(bytes, ack)) => {
                    let result = handle_input(&session_id, &mut stdin, reaped, bytes).await;
                    let _ = ack.send(result);
                }
                Some(Control::Terminate(mode)) => {
                    if !reaped {
                        kill_requested = true;
                        match mode {
                            TerminateMode::Immediate => kill_now = true,
                            TerminateMode::Graceful => {
                                debug!(
                                    session_id = %session_id,
                                    grace_ms = grace_period.as_millis() as u64,
                                    "graceful termination requested"
                                );
                                let termed = match pid {
                                    #[cfg(unix)]
                                    Some(pid) => send_sigterm(pid),
                                    _ => false,
                                };
                                if termed {
                                    grace_timer.as_mut().reset(Instant::now() + grace_period);
                                    grace_armed = true;
                                } else {
                                    kill_now = true;
                                }
                            }
                        }
                    }
                }
                None => ctrl_open = false,
            },
            _ = &mut grace_timer, if grace_armed => {
                grace_armed = false;
                if !reaped {
                    debug!(session_id = %session_id, "grace period elapsed, forcing kill");
                    kill_now = true;
                }
            },
        }
    }

    let state = final_state(failure, kill_requested, exit_status);
    info!(session_id = %session_id, state = %state.label(), "process terminated");
    let _ = events.send(RunnerEvent::Terminated(state));
}

async fn handle_input(
    session_id: &SessionId,
    stdin: &mut Option<ChildStdin>,
    reaped: bool,
    bytes: Vec<u8>,
) -> Result<()> {
    if reaped {
        return Err(RunnerError::Closed(session_id.clone()));
    }
    let Some(stdin) = stdin.as_mut() else {
        return Err(RunnerError::Closed(session_id.clone()));
    };
    let write = async {
        stdin.write_all(&bytes).await?;
        stdin.flush().await
    };
    write.await.map_err(|e| RunnerError::InputFailed {
        session_id: session_id.clone(),
        message: e.to_string(),
    })
}

fn final_state(
    failure: Option<String>,
    kill_requested: bool,
    exit_status: Option<std::process::ExitStatus>,
) -> SessionState {
    if let Some(reason) = failure {
        return SessionState::Failed(reason);
    }
    match exit_status {
        Some(_) if kill_requested => SessionState::Killed,
        Some(status) => match status.code() {
            Some(code) => SessionState::Exited(code),
            // Terminated by an external signal.
            None => SessionState::Killed,
        },
        None => SessionState::Failed("process was not reaped".to_string()),
    }
}
