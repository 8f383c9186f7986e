//! Command-line interface definition using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Conswol - terminal session and command orchestration engine
#[derive(Parser, Debug)]
#[command(name = "conswol")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Path to state directory
    #[arg(short, long, env = "CONSWOL_STATE_DIR")]
    pub state_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve an alias and run it, streaming output until it exits
    Run {
        /// Alias to resolve
        #[arg(required = true)]
        alias: String,

        /// Extra arguments substituted into the template
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Inspect sessions
    Sessions {
        #[command(subcommand)]
        command: SessionsCommand,
    },

    /// Operate on one session
    Session {
        #[command(subcommand)]
        command: SessionCommand,
    },

    /// Breakpoint operations against the configured debugger
    Bp {
        /// Alias of the debugger command to attach
        #[arg(short, long, default_value = "debugger")]
        debugger: String,

        #[command(subcommand)]
        command: BpCommand,
    },

    /// Manage command aliases
    Alias {
        #[command(subcommand)]
        command: AliasCommand,
    },

    /// Start interactive REPL mode
    Repl,
}

#[derive(Subcommand, Debug)]
pub enum SessionsCommand {
    /// List all sessions
    List {
        /// Output format (table, json, brief)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

#[derive(Subcommand, Debug)]
pub enum SessionCommand {
    /// Kill a session (graceful, then forced after the grace period)
    Kill {
        /// Session ID
        #[arg(required = true)]
        id: String,

        /// Skip the graceful signal and kill immediately
        #[arg(short, long)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum BpCommand {
    /// Set a breakpoint at file:line
    Set {
        /// Location, e.g. src/main.rs:42
        #[arg(required = true)]
        location: String,
    },

    /// Clear a breakpoint by ID
    Clear {
        /// Breakpoint ID
        #[arg(required = true)]
        id: u32,
    },

    /// Resume execution
    Continue,

    /// Execute one step
    Step,
}

#[derive(Subcommand, Debug)]
pub enum AliasCommand {
    /// Register an alias
    Add {
        /// Alias name
        #[arg(required = true)]
        name: String,

        /// Program to run
        #[arg(required = true)]
        program: String,

        /// Template arguments (may contain one `{args}` placeholder)
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,

        /// Working directory
        #[arg(long)]
        cwd: Option<String>,

        /// Environment overrides as KEY=VALUE (repeatable)
        #[arg(long = "env")]
        env: Vec<String>,

        /// Description shown in listings
        #[arg(long)]
        description: Option<String>,

        /// Replace an existing alias of the same name
        #[arg(long)]
        overwrite: bool,
    },

    /// Remove an alias
    Remove {
        /// Alias name
        #[arg(required = true)]
        name: String,
    },

    /// List registered aliases
    List {
        /// Output format (table, json, brief)
        #[arg(short, long, default_value = "table")]
        format: OutputFormat,
    },
}

/// Output format for list commands
#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Brief,
}

impl Cli {
    /// Returns the state directory path, using default if not specified.
    pub fn state_dir(&self) -> PathBuf {
        self.state_dir.clone().unwrap_or_else(|| {
            dirs::home_dir()
                .map(|h| h.join(".conswol"))
                .unwrap_or_else(|| PathBuf::from(".conswol"))
        })
    }

    /// Returns the log level based on verbosity.
    pub fn log_level(&self) -> tracing::Level {
        match self.verbose {
            0 => tracing::Level::WARN,
            1 => tracing::Level::INFO,
            2 => tracing::Level::DEBUG,
            _ => tracing::Level::TRACE,
        }
    }
}
