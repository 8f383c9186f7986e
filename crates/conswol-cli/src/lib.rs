//! CLI and REPL for Conswol.

pub mod cli;
pub mod commands;
pub mod context;
pub mod debugger;
pub mod repl;
