//! CommandRegistry - alias registration and resolution.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::debug;

use conswol_models::CommandSpec;

use crate::error::{RegistryError, Result};
use crate::store;
use crate::template::AliasEntry;

/// Maps short aliases to command templates.
///
/// The registry is loaded from the alias file at startup and rewritten
/// atomically on every mutation. Resolution never mutates state.
pub struct CommandRegistry {
    aliases: HashMap<String, AliasEntry>,
    /// Backing file; `None` keeps the registry purely in memory.
    path: Option<PathBuf>,
}

impl CommandRegistry {
    /// Creates an empty registry with no backing file.
    pub fn in_memory() -> Self {
        Self {
            aliases: HashMap::new(),
            path: None,
        }
    }

    /// Loads the registry from `path`. A missing file yields an empty
    /// registry backed by that path.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let aliases = store::load_aliases(&path)?;
        debug!(path = %path.display(), count = aliases.len(), "alias registry loaded");
        Ok(Self {
            aliases,
            path: Some(path),
        })
    }

    /// Returns the backing file path, if any.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Registers an alias.
    ///
    /// # Errors
    ///
    /// [`RegistryError::DuplicateAlias`] if the name is taken and
    /// `overwrite` is false. The registry is unchanged on error.
    pub fn register(&mut self, entry: AliasEntry, overwrite: bool) -> Result<()> {
        if !overwrite && self.aliases.contains_key(&entry.name) {
            return Err(RegistryError::DuplicateAlias(entry.name));
        }

        debug!(alias = %entry.name, program = %entry.template.program, "registering alias");
        self.aliases.insert(entry.name.clone(), entry);
        self.persist()
    }

    /// Removes an alias, returning its entry.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownAlias`] if absent; no state change.
    pub fn remove(&mut self, name: &str) -> Result<AliasEntry> {
        let entry = self
            .aliases
            .remove(name)
            .ok_or_else(|| RegistryError::UnknownAlias(name.to_string()))?;
        self.persist()?;
        Ok(entry)
    }

    /// Resolves an alias plus free-form arguments into a [`CommandSpec`].
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownAlias`] if absent.
    pub fn resolve(&self, name: &str, extra_args: &[String]) -> Result<CommandSpec> {
        let entry = self
            .aliases
            .get(name)
            .ok_or_else(|| RegistryError::UnknownAlias(name.to_string()))?;
        Ok(entry.template.resolve(extra_args))
    }

    /// Returns the entry for an alias.
    pub fn get(&self, name: &str) -> Option<&AliasEntry> {
        self.aliases.get(name)
    }

    /// Lists all entries sorted by name.
    pub fn list(&self) -> Vec<&AliasEntry> {
        let mut entries: Vec<&AliasEntry> = self.aliases.values().collect();
        entries.sort_by(|a, b| a.name.cmp(&b.name));
        entries
    }

    /// Returns the number of registered aliases.
    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    /// Returns true if no aliases are registered.
    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    fn persist(&self) -> Result<()> {
        if let Some(path) = &self.path {
            store::save_aliases(path, &self.aliases)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    use crate::template::CommandTemplate;

    fn build_entry() -> AliasEntry {
        AliasEntry::new("build", CommandTemplate::new("make").with_args(["-j4"]))
    }

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_register_and_resolve() {
        let mut registry = CommandRegistry::in_memory();
        registry.register(build_entry(), false).unwrap();

        let spec = registry.resolve("build", &args(&["test"])).unwrap();
        assert_eq!(spec.program, "make");
        assert_eq!(spec.args, vec!["-j4", "test"]);
    }

    #[test]
    fn test_register_duplicate_fails() {
        let mut registry = CommandRegistry::in_memory();
        registry.register(build_entry(), false).unwrap();

        let result = registry.register(build_entry(), false);
        assert!(matches!(result, Err(RegistryError::DuplicateAlias(name)) if name == "build"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_register_overwrite() {
        let mut registry = CommandRegistry::in_memory();
        registry.register(build_entry(), false).unwrap();

        let replacement =
            AliasEntry::new("build", CommandTemplate::new("ninja"));
        registry.register(replacement, true).unwrap();

        let spec = registry.resolve("build", &[]).unwrap();
        assert_eq!(spec.program, "ninja");
    }

    #[test]
    fn test_resolve_unknown_alias() {
        let registry = CommandRegistry::in_memory();
        let result = registry.resolve("nope", &[]);
        assert!(matches!(result, Err(RegistryError::UnknownAlias(name)) if name == "nope"));
    }

    #[test]
    fn test_remove() {
        let mut registry = CommandRegistry::in_memory();
        registry.register(build_entry(), false).unwrap();

        let entry = registry.remove("build").unwrap();
        assert_eq!(entry.name, "build");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_remove_unknown_alias() {
        let mut registry = CommandRegistry::in_memory();
        let result = registry.remove("nope");
        assert!(matches!(result, Err(RegistryError::UnknownAlias(_))));
    }

    #[test]
    fn test_resolve_is_deterministic() {
        let mut registry = CommandRegistry::in_memory();
        registry.register(build_entry(), false).unwrap();

        let first = registry.resolve("build", &args(&["test"])).unwrap();
        let second = registry.resolve("build", &args(&["test"])).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_list_sorted() {
        let mut registry = CommandRegistry::in_memory();
        registry
            .register(AliasEntry::new("zz", CommandTemplate::new("z")), false)
            .unwrap();
        registry
            .register(AliasEntry::new("aa", CommandTemplate::new("a")), false)
            .unwrap();

        let names: Vec<&str> = registry.list().iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["aa", "zz"]);
    }

    #[test]
    fn test_mutations_persist_to_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("aliases.toml");

        {
            let mut registry = CommandRegistry::load(&path).unwrap();
            assert!(registry.is_empty());
            registry.register(build_entry(), false).unwrap();
        }

        // Fresh load sees the registered alias.
        let registry = CommandRegistry::load(&path).unwrap();
        assert_eq!(registry.len(), 1);
        let spec = registry.resolve("build", &args(&["test"])).unwrap();
        assert_eq!(spec.args, vec!["-j4", "test"]);
    }

    #[test]
    fn test_remove_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("aliases.toml");

        let mut registry = CommandRegistry::load(&path).unwrap();
        registry.register(build_entry(), false).unwrap();
        registry.remove("build").unwrap();

        let registry = CommandRegistry::load(&path).unwrap();
        assert!(registry.is_empty());
    }

    #[test]
    fn test_failed_register_leaves_no_trace() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("aliases.toml");

        let mut registry = CommandRegistry::load(&path).unwrap();
        registry.register(build_entry(), false).unwrap();

        let other = AliasEntry::new("build", CommandTemplate::new("ninja"));
        assert!(registry.register(other, false).is_err());

        let registry = CommandRegistry::load(&path).unwrap();
        let spec = registry.resolve("build", &[]).unwrap();
        assert_eq!(spec.program, "make");
    }
}
