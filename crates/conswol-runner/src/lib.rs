//! Process runner for Conswol.
//!
//! This crate owns the lifecycle of a single external command:
//! - `ProcessRunner::spawn` starts the process and its supervisor task
//! - `RunnerHandle` accepts input and termination requests
//! - the supervisor emits `RunnerEvent`s: tagged output lines with
//!   per-session sequence numbers, then exactly one terminal status
//!
//! The supervisor blocks only on I/O from its own process, so one hung
//! command never affects another. Every exit path reaps the child.

pub mod config;
pub mod error;
pub mod runner;

pub use config::RunnerConfig;
pub use error::{Result, RunnerError};
pub use runner::{ProcessRunner, RunnerEvent, RunnerHandle, TerminateMode};
