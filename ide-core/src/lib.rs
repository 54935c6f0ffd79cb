//! `simple-ide-core`: project file store behind the simple-ide HTTP service.
//!
//! Each top-level directory under the store root is a *project*; each regular
//! file inside it is a user-managed text file. Everything is recomputed from
//! the filesystem on every call: there is no index, cache or lock file.
//!
//! ## Layers
//! - [`names`]: allow-list validation for project and file names
//! - [`paths`]: the single path resolution + containment check
//! - [`store`]: project/file CRUD on top of `tokio::fs`
//! - [`compile`]: runs an external C compiler, optionally sandboxed
//! - [`config`]: layered configuration (defaults < file < env)

pub mod compile;
pub mod config;
pub mod error;
pub mod names;
pub mod paths;
pub mod store;

pub use compile::{CompileConfig, CompileError, CompileOutcome, Compiler, SandboxMode};
pub use config::{ConfigLoadError, ConfigLoader, ServiceConfig};
pub use error::{ErrorKind, StoreError};
pub use names::{FileName, ProjectName};
pub use paths::{PathRejection, PathResolution, resolve_in_project};
pub use store::{CompileTarget, FileEntry, ProjectStore};
