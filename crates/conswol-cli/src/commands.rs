//! Command handlers for CLI subcommands.

use std::path::Path;

use tracing::info;

use conswol_models::{SessionId, SessionSummary};
use conswol_registry::{AliasEntry, CommandTemplate};

use crate::cli::{AliasCommand, BpCommand, Commands, OutputFormat, SessionCommand, SessionsCommand};
use crate::context::{Engine, Result};
use crate::debugger::DebugSession;

/// Execute a CLI command, returning the process exit code.
pub async fn execute(command: Commands, state_dir: &Path) -> Result<i32> {
    let mut engine = Engine::new(state_dir)?;

    let result = match command {
        Commands::Run { alias, args } => cmd_run(&engine, &alias, &args).await,
        Commands::Sessions { command } => match command {
            SessionsCommand::List { format } => {
                print_sessions(&engine.mux.list().await, format).map(|_| 0)
            }
        },
        Commands::Session { command } => match command {
            SessionCommand::Kill { id, force } => cmd_session_kill(&engine, &id, force).await,
        },
        Commands::Bp { debugger, command } => cmd_bp(&engine, &debugger, command).await,
        Commands::Alias { command } => cmd_alias(&mut engine, command),
        Commands::Repl => {
            // REPL is handled separately in main
            Ok(0)
        }
    };

    // Tear down even when the command failed, so no child is left behind.
    engine.shutdown().await;
    result
}

async fn cmd_run(engine: &Engine, alias: &str, args: &[String]) -> Result<i32> {
    let spec = engine.registry.resolve(alias, args)?;
    info!(alias = %alias, command = %spec.display_line(), "running");

    let code = engine.run_to_completion(spec).await?;
    Ok(code)
}

async fn cmd_session_kill(engine: &Engine, id: &str, force: bool) -> Result<i32> {
    let id = SessionId::from_string(id);
    engine.mux.kill(&id, force).await?;
    println!("Killed session {}", id);
    Ok(0)
}

async fn cmd_bp(engine: &Engine, debugger_alias: &str, command: BpCommand) -> Result<i32> {
    let debug = DebugSession::start(engine, debugger_alias).await?;

    let result = run_bp_command(&debug, command).await;

    // Tear the debugger session down regardless of the operation outcome.
    let _ = debug.stop(engine).await;
    result?;
    Ok(0)
}

async fn run_bp_command(debug: &DebugSession, command: BpCommand) -> Result<()> {
    match command {
        BpCommand::Set { location } => {
            let location = location.parse()?;
            let id = debug.bridge.set_breakpoint(location).await?;
            let breakpoints = debug.bridge.breakpoints().await;
            let set = breakpoints.iter().find(|bp| bp.id == id);
            match set {
                Some(bp) => println!("Breakpoint {} at {}", bp.id, bp.location),
                None => println!("Breakpoint {}", id),
            }
        }
        BpCommand::Clear { id } => {
            debug.bridge.clear_breakpoint(id.into()).await?;
            println!("Cleared breakpoint {}", id);
        }
        BpCommand::Continue => {
            debug.bridge.continue_execution().await?;
            println!("Continuing");
        }
        BpCommand::Step => {
            debug.bridge.step().await?;
            println!("Stepped");
        }
    }
    Ok(())
}

fn cmd_alias(engine: &mut Engine, command: AliasCommand) -> Result<i32> {
    match command {
        AliasCommand::Add {
            name,
            program,
            args,
            cwd,
            env,
            description,
            overwrite,
        } => {
            let mut template = CommandTemplate::new(program).with_args(args);
            if let Some(cwd) = cwd {
                template = template.with_working_dir(cwd);
            }
            for pair in env {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("invalid --env '{}', expected KEY=VALUE", pair))?;
                template = template.with_env_var(key, value);
            }

            let mut entry = AliasEntry::new(name.clone(), template);
            if let Some(description) = description {
                entry = entry.with_description(description);
            }

            engine.registry.register(entry, overwrite)?;
            println!("Registered alias '{}'", name);
        }
        AliasCommand::Remove { name } => {
            let entry = engine.registry.remove(&name)?;
            println!("Removed alias '{}' ({})", name, entry.template.program);
        }
        AliasCommand::List { format } => {
            print_aliases(engine, format)?;
        }
    }
    Ok(0)
}

/// Prints session summaries in the requested format.
pub fn print_sessions(sessions: &[SessionSummary], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            if sessions.is_empty() {
                println!("No sessions.");
                return Ok(());
            }

            println!(
                "{:<42}  {:<12}  {:<8}  {:<8}  COMMAND",
                "ID", "STATE", "STARTED", "EVENTS"
            );
            println!("{}", "-".repeat(90));
            for session in sessions {
                println!(
                    "{:<42}  {:<12}  {:<8}  {:<8}  {}",
                    session.id,
                    session.state.label(),
                    session.created_at.format("%H:%M:%S"),
                    session.last_seq,
                    truncate(&session.command, 40)
                );
            }
            println!("\n{} session(s)", sessions.len());
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(sessions)?;
            println!("{}", json);
        }
        OutputFormat::Brief => {
            for session in sessions {
                println!("{}\t{}", session.id, session.state.label());
            }
        }
    }
    Ok(())
}

fn print_aliases(engine: &Engine, format: OutputFormat) -> Result<()> {
    let entries = engine.registry.list();

    match format {
        OutputFormat::Table => {
            if entries.is_empty() {
                println!("No aliases.");
                return Ok(());
            }

            println!("{:<16}  {:<40}  DESCRIPTION", "ALIAS", "COMMAND");
            println!("{}", "-".repeat(80));
            for entry in &entries {
                let command = entry.template.resolve(&[]).display_line();
                println!(
                    "{:<16}  {:<40}  {}",
                    entry.name,
                    truncate(&command, 40),
                    entry.description.as_deref().unwrap_or("")
                );
            }
            println!("\n{} alias(es)", entries.len());
        }
        OutputFormat::Json => {
            let json = serde_json::to_string_pretty(&entries)?;
            println!("{}", json);
        }
        OutputFormat::Brief => {
            for entry in &entries {
                println!("{}\t{}", entry.name, entry.template.program);
            }
        }
    }
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        s.to_string()
    } else {
        format!("{}...", &s[..max.saturating_sub(3)])
    }
}
