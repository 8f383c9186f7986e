//! Command alias registry for Conswol.
//!
//! Maps short aliases (`build`, `test`, `debug`) to command templates and
//! resolves an alias plus free-form arguments into an executable
//! [`CommandSpec`](conswol_models::CommandSpec). The registry round-trips
//! through a TOML alias file rewritten atomically on every mutation.
//!
//! # Example
//!
//! ```
//! use conswol_registry::{AliasEntry, CommandRegistry, CommandTemplate};
//!
//! let mut registry = CommandRegistry::in_memory();
//! registry
//!     .register(
//!         AliasEntry::new("build", CommandTemplate::new("make").with_args(["-j4"])),
//!         false,
//!     )
//!     .unwrap();
//!
//! let spec = registry.resolve("build", &["test".to_string()]).unwrap();
//! assert_eq!(spec.display_line(), "make -j4 test");
//! ```

pub mod error;
pub mod registry;
pub mod store;
pub mod template;

pub use error::{RegistryError, Result};
pub use registry::CommandRegistry;
pub use template::{AliasEntry, CommandTemplate, ARGS_PLACEHOLDER};
