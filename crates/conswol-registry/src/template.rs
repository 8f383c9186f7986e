//! Alias entries and command templates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use conswol_models::CommandSpec;

/// Placeholder token marking where extra arguments are spliced in.
pub const ARGS_PLACEHOLDER: &str = "{args}";

/// A command template: everything needed to build a [`CommandSpec`] except
/// the free-form arguments supplied at resolve time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandTemplate {
    /// Program to execute.
    pub program: String,

    /// Template arguments. May contain one [`ARGS_PLACEHOLDER`] token.
    #[serde(default)]
    pub args: Vec<String>,

    /// Working directory; `~` is expanded at resolve time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub working_dir: Option<String>,

    /// Environment variable overrides.
    #[serde(default)]
    pub env: HashMap<String, String>,
}

impl CommandTemplate {
    /// Creates a template for the given program with no arguments.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
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

    /// Builds a [`CommandSpec`] with the extra arguments substituted.
    ///
    /// Extra arguments replace the first [`ARGS_PLACEHOLDER`] token in the
    /// template argument list, or append at the tail when no placeholder is
    /// present. The substitution is deterministic: identical template and
    /// arguments always yield an identical spec.
    pub fn resolve(&self, extra_args: &[String]) -> CommandSpec {
        let mut args = Vec::with_capacity(self.args.len() + extra_args.len());
        let mut substituted = false;

        for arg in &self.args {
            if !substituted && arg == ARGS_PLACEHOLDER {
                args.extend(extra_args.iter().cloned());
                substituted = true;
            } else {
                args.push(arg.clone());
            }
        }
        if !substituted {
            args.extend(extra_args.iter().cloned());
        }

        let mut spec = CommandSpec::new(&self.program).with_args(args);
        if let Some(dir) = &self.working_dir {
            spec = spec.with_working_dir(shellexpand::tilde(dir).into_owned());
        }
        for (key, value) in &self.env {
            spec = spec.with_env_var(key, value);
        }
        spec
    }
}

/// One registered alias.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasEntry {
    /// Alias name, unique within the registry.
    pub name: String,

    /// The command template the alias expands to.
    pub template: CommandTemplate,

    /// Optional human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AliasEntry {
    /// Creates an alias entry.
    pub fn new(name: impl Into<String>, template: CommandTemplate) -> Self {
        Self {
            name: name.into(),
            template,
            description: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_resolve_appends_at_tail() {
        let template = CommandTemplate::new("make").with_args(["-j4"]);
        let spec = template.resolve(&args(&["test"]));

        assert_eq!(spec.program, "make");
        assert_eq!(spec.args, vec!["-j4", "test"]);
    }

    #[test]
    fn test_resolve_placeholder_position() {
        let template = CommandTemplate::new("cargo").with_args(["run", "{args}", "--quiet"]);
        let spec = template.resolve(&args(&["--bin", "tool"]));

        assert_eq!(spec.args, vec!["run", "--bin", "tool", "--quiet"]);
    }

    #[test]
    fn test_resolve_placeholder_with_no_extra_args() {
        let template = CommandTemplate::new("cargo").with_args(["run", "{args}"]);
        let spec = template.resolve(&[]);

        assert_eq!(spec.args, vec!["run"]);
    }

    #[test]
    fn test_resolve_only_first_placeholder_substituted() {
        let template = CommandTemplate::new("echo").with_args(["{args}", "{args}"]);
        let spec = template.resolve(&args(&["x"]));

        assert_eq!(spec.args, vec!["x", "{args}"]);
    }

    #[test]
    fn test_resolve_deterministic() {
        let template = CommandTemplate::new("make")
            .with_args(["-j4"])
            .with_working_dir("/src")
            .with_env_var("CC", "clang");

        let first = template.resolve(&args(&["test"]));
        let second = template.resolve(&args(&["test"]));

        assert_eq!(first, second);
    }

    #[test]
    fn test_resolve_expands_tilde() {
        let template = CommandTemplate::new("ls").with_working_dir("~/code");
        let spec = template.resolve(&[]);

        let dir = spec.working_dir.unwrap();
        assert!(!dir.starts_with('~'));
        assert!(dir.ends_with("/code"));
    }

    #[test]
    fn test_resolve_carries_env() {
        let template = CommandTemplate::new("make").with_env_var("CC", "clang");
        let spec = template.resolve(&[]);

        assert_eq!(spec.env.get("CC").map(String::as_str), Some("clang"));
    }

    #[test]
    fn test_alias_entry_builder() {
        let entry = AliasEntry::new("build", CommandTemplate::new("make"))
            .with_description("Build the project");

        assert_eq!(entry.name, "build");
        assert_eq!(entry.description.as_deref(), Some("Build the project"));
    }
}
