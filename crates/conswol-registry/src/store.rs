//! Atomic TOML persistence for the alias file.
//!
//! The file layout is one table per alias:
//!
//! ```toml
//! [aliases.build]
//! program = "make"
//! args = ["-j4"]
//! working_dir = "~/code/app"
//! description = "Build the project"
//!
//! [aliases.build.env]
//! CC = "clang"
//! ```

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{RegistryError, Result};
use crate::template::{AliasEntry, CommandTemplate};

/// On-disk shape of one alias: the template fields flattened.
#[derive(Debug, Serialize, Deserialize)]
struct StoredAlias {
    program: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    working_dir: Option<String>,
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    env: HashMap<String, String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
}

/// On-disk shape of the whole file. BTreeMap keeps the rewrite stable.
#[derive(Debug, Default, Serialize, Deserialize)]
struct AliasFile {
    #[serde(default)]
    aliases: BTreeMap<String, StoredAlias>,
}

/// Loads aliases from `path`. A missing file yields an empty map.
pub fn load_aliases(path: &Path) -> Result<HashMap<String, AliasEntry>> {
    if !path.exists() {
        return Ok(HashMap::new());
    }

    let text = fs::read_to_string(path).map_err(|source| RegistryError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let file: AliasFile = toml::from_str(&text).map_err(|source| RegistryError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    Ok(file
        .aliases
        .into_iter()
        .map(|(name, stored)| {
            let entry = AliasEntry {
                name: name.clone(),
                template: CommandTemplate {
                    program: stored.program,
                    args: stored.args,
                    working_dir: stored.working_dir,
                    env: stored.env,
                },
                description: stored.description,
            };
            (name, entry)
        })
        .collect())
}

/// Writes the alias map to `path` atomically (temp file + rename).
pub fn save_aliases(path: &Path, aliases: &HashMap<String, AliasEntry>) -> Result<()> {
    let file = AliasFile {
        aliases: aliases
            .values()
            .map(|entry| {
                (
                    entry.name.clone(),
                    StoredAlias {
                        program: entry.template.program.clone(),
                        args: entry.template.args.clone(),
                        working_dir: entry.template.working_dir.clone(),
                        env: entry.template.env.clone(),
                        description: entry.description.clone(),
                    },
                )
            })
            .collect(),
    };

    let text = toml::to_string_pretty(&file)?;
    atomic_write(path, text.as_bytes())
}

/// Writes data to a file atomically.
///
/// Writes to a temporary file in the same directory, then renames it over
/// the target, so the file is never observed partially written.
fn atomic_write(path: &Path, data: &[u8]) -> Result<()> {
    let write_err = |source| RegistryError::Write {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        if !parent.exists() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
    }

    let dir = path.parent().unwrap_or(Path::new("."));
    let mut temp_file = tempfile::NamedTempFile::new_in(dir).map_err(write_err)?;
    temp_file.write_all(data).map_err(write_err)?;
    temp_file.flush().map_err(write_err)?;
    temp_file.persist(path).map_err(|e| write_err(e.error))?;

    Ok(())
}
