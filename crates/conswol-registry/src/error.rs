//! Error types for the registry crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Alias already registered and overwrite was not requested.
    #[error("alias '{0}' already exists")]
    DuplicateAlias(String),

    /// No alias with the given name.
    #[error("unknown alias: {0}")]
    UnknownAlias(String),

    /// Reading the alias file failed.
    #[error("failed to read alias file {path}: {source}")]
    Read {
        /// File being read.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the alias file failed.
    #[error("failed to write alias file {path}: {source}")]
    Write {
        /// File being written.
        path: PathBuf,
        /// Underlying OS error.
        #[source]
        source: std::io::Error,
    },

    /// The alias file is not valid TOML.
    #[error("invalid alias file {path}: {source}")]
    Parse {
        /// File that failed to parse.
        path: PathBuf,
        /// Underlying parse error.
        #[source]
        source: toml::de::Error,
    },

    /// Serializing the registry failed.
    #[error("failed to serialize aliases: {0}")]
    Serialize(#[from] toml::ser::Error),
}

/// Result type alias for registry operations.
pub type Result<T> = std::result::Result<T, RegistryError>;
