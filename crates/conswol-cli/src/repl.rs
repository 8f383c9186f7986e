//! Interactive REPL (Read-Eval-Print Loop) for Conswol.
//!
//! Unlike the one-shot subcommands, the REPL keeps the engine alive, so
//! multiple sessions can run in the background while their merged event
//! stream prints above the prompt.

use std::path::{Path, PathBuf};

use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::history::DefaultHistory;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use tracing::debug;

use conswol_events::Subscription;
use conswol_models::{SessionEvent, SessionId, StreamTag};

use crate::context::{Engine, Result};
use crate::debugger::DebugSession;

/// Tab completion for slash commands.
pub struct CommandCompleter;

impl CommandCompleter {
    const COMMANDS: &'static [&'static str] = &[
        "/aliases", "/bp", "/help", "/kill", "/quit", "/run", "/send", "/sessions",
    ];
}

impl Completer for CommandCompleter {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        if !line.starts_with('/') {
            return Ok((0, vec![]));
        }

        let prefix = &line[..pos];
        let matches: Vec<Pair> = Self::COMMANDS
            .iter()
            .filter(|cmd| cmd.starts_with(prefix))
            .map(|cmd| Pair {
                display: cmd.to_string(),
                replacement: cmd.to_string(),
            })
            .collect();

        Ok((0, matches))
    }
}

impl Hinter for CommandCompleter {
    type Hint = String;
}

impl Highlighter for CommandCompleter {}
impl Validator for CommandCompleter {}
impl Helper for CommandCompleter {}

/// Breakpoint subcommands available in the REPL.
#[derive(Debug, Clone, PartialEq)]
pub enum BpRepl {
    /// Attach a debugger session (default alias: `debugger`).
    Attach(Option<String>),
    /// Set a breakpoint at file:line.
    Set(String),
    /// Clear a breakpoint by ID.
    Clear(u32),
    /// Resume execution.
    Continue,
    /// Execute one step.
    Step,
    /// List local breakpoints.
    List,
}

/// Slash commands available in the REPL.
#[derive(Debug, Clone, PartialEq)]
pub enum ReplCommand {
    /// Launch a session from an alias.
    Run { alias: String, args: Vec<String> },
    /// Send a line of input to a session.
    Send { id: String, text: String },
    /// List sessions.
    Sessions,
    /// Kill a session.
    Kill { id: String, force: bool },
    /// Breakpoint operations.
    Bp(BpRepl),
    /// List aliases.
    Aliases,
    /// Show help.
    Help,
    /// Quit the REPL.
    Quit,
    /// Unrecognized command.
    Unknown(String),
    /// Blank line or plain text.
    Empty,
}

impl ReplCommand {
    /// Parses one input line into a REPL command.
    pub fn parse(input: &str) -> Self {
        let input = input.trim();
        if input.is_empty() || !input.starts_with('/') {
            return ReplCommand::Empty;
        }

        let mut parts = input.split_whitespace();
        let command = parts.next().unwrap_or("");
        let rest: Vec<&str> = parts.collect();

        match command {
            "/run" | "/r" => match rest.split_first() {
                Some((alias, args)) => ReplCommand::Run {
                    alias: alias.to_string(),
                    args: args.iter().map(|s| s.to_string()).collect(),
                },
                None => ReplCommand::Unknown("usage: /run <alias> [args...]".to_string()),
            },
            "/send" => match rest.split_first() {
                Some((id, text)) if !text.is_empty() => ReplCommand::Send {
                    id: id.to_string(),
                    text: text.join(" "),
                },
                _ => ReplCommand::Unknown("usage: /send <session> <text...>".to_string()),
            },
            "/sessions" | "/ls" => ReplCommand::Sessions,
            "/kill" | "/k" => {
                let force = rest.iter().any(|a| *a == "-f" || *a == "--force");
                match rest.iter().find(|a| !a.starts_with('-')) {
                    Some(id) => ReplCommand::Kill {
                        id: id.to_string(),
                        force,
                    },
                    None => ReplCommand::Unknown("usage: /kill <session> [-f]".to_string()),
                }
            }
            "/bp" | "/b" => Self::parse_bp(&rest),
            "/aliases" | "/a" => ReplCommand::Aliases,
            "/help" | "/h" | "/?" => ReplCommand::Help,
            "/quit" | "/q" | "/exit" => ReplCommand::Quit,
            other => ReplCommand::Unknown(format!("unknown command '{}'", other)),
        }
    }

    fn parse_bp(rest: &[&str]) -> Self {
        match rest.split_first() {
            Some((&"attach", args)) => {
                ReplCommand::Bp(BpRepl::Attach(args.first().map(|s| s.to_string())))
            }
            Some((&"set", [location])) => ReplCommand::Bp(BpRepl::Set(location.to_string())),
            Some((&"clear", [id])) => match id.parse() {
                Ok(id) => ReplCommand::Bp(BpRepl::Clear(id)),
                Err(_) => ReplCommand::Unknown(format!("invalid breakpoint id '{}'", id)),
            },
            Some((&"continue", [])) | Some((&"c", [])) => ReplCommand::Bp(BpRepl::Continue),
            Some((&"step", [])) | Some((&"s", [])) => ReplCommand::Bp(BpRepl::Step),
            Some((&"list", [])) => ReplCommand::Bp(BpRepl::List),
            _ => ReplCommand::Unknown(
                "usage: /bp attach [alias] | set <file:line> | clear <id> | continue | step | list"
                    .to_string(),
            ),
        }
    }
}

/// The interactive loop.
pub struct Repl {
    engine: Engine,
    editor: Option<Editor<CommandCompleter, DefaultHistory>>,
    history_path: PathBuf,
    debug: Option<DebugSession>,
}

impl Repl {
    /// Builds a REPL with state under `state_dir`.
    pub fn new(state_dir: &Path) -> Result<Self> {
        let engine = Engine::new(state_dir)?;

        let mut editor = Editor::new()?;
        editor.set_helper(Some(CommandCompleter));
        let history_path = state_dir.join("history.txt");
        let _ = editor.load_history(&history_path);

        Ok(Self {
            engine,
            editor: Some(editor),
            history_path,
            debug: None,
        })
    }

    /// Runs the loop until `/quit` or EOF, returning the exit code.
    pub async fn run(&mut self) -> Result<i32> {
        println!("conswol - type /help for commands, /quit to exit");

        // Background printer for the merged session event stream.
        let printer = tokio::spawn(print_events(self.engine.bus.subscribe()));

        loop {
            let line = match self.readline().await {
                Ok(line) => line,
                Err(ReadlineError::Interrupted) => continue,
                Err(ReadlineError::Eof) => break,
                Err(e) => {
                    eprintln!("input error: {}", e);
                    break;
                }
            };

            if let Some(editor) = self.editor.as_mut() {
                let _ = editor.add_history_entry(line.as_str());
            }

            match ReplCommand::parse(&line) {
                ReplCommand::Quit => break,
                ReplCommand::Empty => {}
                command => {
                    if let Err(e) = self.dispatch(command).await {
                        eprintln!("error: {}", e);
                    }
                }
            }
        }

        if let Some(editor) = self.editor.as_mut() {
            let _ = editor.save_history(&self.history_path);
        }
        self.engine.shutdown().await;
        printer.abort();

        Ok(0)
    }

    /// Reads one line without blocking the runtime workers.
    async fn readline(&mut self) -> std::result::Result<String, ReadlineError> {
        let mut editor = match self.editor.take() {
            Some(editor) => editor,
            None => return Err(ReadlineError::Eof),
        };

        let (editor, result) = tokio::task::spawn_blocking(move || {
            let result = editor.readline("conswol> ");
            (editor, result)
        })
        .await
        .map_err(|e| ReadlineError::Io(std::io::Error::other(e)))?;

        self.editor = Some(editor);
        result
    }

    async fn dispatch(&mut self, command: ReplCommand) -> Result<()> {
        match command {
            ReplCommand::Run { alias, args } => {
                let spec = self.engine.registry.resolve(&alias, &args)?;
                let id = self.engine.mux.launch(spec).await?;
                println!("launched {} ({})", short_id(&id), alias);
            }
            ReplCommand::Send { id, text } => {
                let id = self.resolve_session(&id).await?;
                let mut bytes = text.into_bytes();
                bytes.push(b'\n');
                self.engine.mux.attach_input(&id, bytes).await?;
            }
            ReplCommand::Sessions => {
                crate::commands::print_sessions(
                    &self.engine.mux.list().await,
                    crate::cli::OutputFormat::Table,
                )?;
            }
            ReplCommand::Kill { id, force } => {
                let id = self.resolve_session(&id).await?;
                self.engine.mux.kill(&id, force).await?;
                println!("kill requested for {}", short_id(&id));
            }
            ReplCommand::Bp(bp) => self.dispatch_bp(bp).await?,
            ReplCommand::Aliases => {
                for entry in self.engine.registry.list() {
                    println!(
                        "{:<16} {}",
                        entry.name,
                        entry.template.resolve(&[]).display_line()
                    );
                }
            }
            ReplCommand::Help => print_help(),
            ReplCommand::Unknown(message) => println!("{}", message),
            ReplCommand::Quit | ReplCommand::Empty => {}
        }
        Ok(())
    }

    async fn dispatch_bp(&mut self, command: BpRepl) -> Result<()> {
        if let BpRepl::Attach(alias) = command {
            let alias = alias.as_deref().unwrap_or("debugger");
            let debug = DebugSession::start(&self.engine, alias).await?;
            println!("debugger attached ({})", short_id(&debug.session_id));
            self.debug = Some(debug);
            return Ok(());
        }

        let Some(debug) = &self.debug else {
            println!("no debugger attached; use /bp attach [alias]");
            return Ok(());
        };

        match command {
            BpRepl::Set(location) => {
                let id = debug.bridge.set_breakpoint(location.parse()?).await?;
                println!("breakpoint {} set", id);
            }
            BpRepl::Clear(id) => {
                debug.bridge.clear_breakpoint(id.into()).await?;
                println!("breakpoint {} cleared", id);
            }
            BpRepl::Continue => {
                debug.bridge.continue_execution().await?;
                println!("continuing");
            }
            BpRepl::Step => {
                debug.bridge.step().await?;
                println!("stepped");
            }
            BpRepl::List => {
                for bp in debug.bridge.breakpoints().await {
                    println!(
                        "{:<4} {:<30} {} hit(s){}",
                        bp.id.to_string(),
                        bp.location.to_string(),
                        bp.hit_count,
                        if bp.enabled { "" } else { " [disabled]" }
                    );
                }
            }
            BpRepl::Attach(_) => {}
        }
        Ok(())
    }

    /// Resolves a session ID or unique prefix.
    async fn resolve_session(&self, prefix: &str) -> Result<SessionId> {
        let sessions = self.engine.mux.list().await;
        let matches: Vec<&SessionId> = sessions
            .iter()
            .map(|s| &s.id)
            .filter(|id| id.as_str().starts_with(prefix) || id.as_str() == prefix)
            .collect();

        match matches.as_slice() {
            [id] => Ok((*id).clone()),
            [] => Err(format!("no session matches '{}'", prefix).into()),
            _ => Err(format!("ambiguous session prefix '{}'", prefix).into()),
        }
    }
}

/// Prints the merged event stream, tagged by session.
async fn print_events(mut events: Subscription) {
    while let Some(event) = events.recv().await {
        match event {
            SessionEvent::Output(output) => match output.tag {
                StreamTag::Stdout => {
                    println!("[{} out] {}", short_id(&output.session_id), output.payload)
                }
                StreamTag::Stderr => {
                    println!("[{} err] {}", short_id(&output.session_id), output.payload)
                }
                StreamTag::Meta => {
                    debug!(session_id = %output.session_id, "{}", output.payload)
                }
            },
            SessionEvent::StateChanged { session_id, state } if state.is_terminal() => {
                println!("[{}] {}", short_id(&session_id), state.label());
            }
            SessionEvent::Debugger { session_id, event } => {
                println!("[{} dbg] {:?}", short_id(&session_id), event);
            }
            _ => {}
        }
    }
}

/// First 8 characters of the uuid part, enough to address a session.
fn short_id(id: &SessionId) -> &str {
    id.as_str().get(..13).unwrap_or(id.as_str())
}

fn print_help() {
    println!("Commands:");
    println!("  /run <alias> [args...]   launch a session from an alias");
    println!("  /send <session> <text>   send a line to a session's stdin");
    println!("  /sessions                list sessions");
    println!("  /kill <session> [-f]     kill a session (graceful, -f forces)");
    println!("  /bp attach [alias]       attach a debugger session");
    println!("  /bp set <file:line>      set a breakpoint");
    println!("  /bp clear <id>           clear a breakpoint");
    println!("  /bp continue | step      resume or step the debuggee");
    println!("  /bp list                 list breakpoints");
    println!("  /aliases                 list registered aliases");
    println!("  /quit                    exit");
    println!();
    println!("Session arguments accept unique ID prefixes.");
}

/// Entry point used by `main` for REPL mode.
pub async fn run(state_dir: &Path) -> Result<i32> {
    let mut repl = Repl::new(state_dir)?;
    repl.run().await
}
