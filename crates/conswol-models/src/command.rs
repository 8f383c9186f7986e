//! Command specifications.
//!
//! A [`CommandSpec`] is a fully-resolved description of one external
//! command: program, arguments, working directory, and environment
//! overrides. Specs are produced by registry resolution and consumed by the
//! process runner; once constructed they are not mutated.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How the child's standard input is wired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StdinMode {
    /// Input is piped; the session accepts `attach_input` writes.
    #[default]
    Piped,
    /// Input is closed immediately (for batch commands).
    Null,
}

/// A fully-specified external command.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Program to execute (path or name resolved via PATH).
    pub program: String,

    /// Ordered argument list.
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory for the child. Inherits the parent's when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    /// Environment variable overrides applied on top of the parent env.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Standard input wiring.
    #[serde(default)]
    pub stdin: StdinMode,
}

impl CommandSpec {
    /// Creates a spec for the given program with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
            stdin: StdinMode::default(),
        }
    }

    /// Replaces the argument list.
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Appends a single argument.
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Sets the working directory.
    pub fn with_working_dir(mut self, dir: impl Into<String>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    /// Adds an environment variable override.
    pub fn with_env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Sets the stdin mode.
    pub fn with_stdin(mut self, stdin: StdinMode) -> Self {
        self.stdin = stdin;
        self
    }

    /// Renders the command as a single display line, e.g. `make -j4 test`.
    pub fn display_line(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}
