//! Conswol CLI entry point.

use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

use conswol_cli::cli::{Cli, Commands};
use conswol_cli::{commands, repl};

#[tokio::main]
async fn main() {
    // Load .env.local if it exists
    let _ = dotenvy::from_filename(".env.local");

    let cli = Cli::parse();

    // Initialize tracing
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().to_string()));

    fmt().with_env_filter(filter).with_target(false).init();

    let state_dir = cli.state_dir();

    let result = match cli.command {
        Some(Commands::Repl) | None => repl::run(&state_dir).await,
        Some(command) => commands::execute(command, &state_dir).await,
    };

    match result {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    }
}
