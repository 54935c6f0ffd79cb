//! Error taxonomy for store operations.
//!
//! Messages are client-safe: they never carry filesystem paths. The
//! underlying I/O cause is kept in [`StoreError::Io`] for logging only.

use crate::paths::PathRejection;

/// Coarse classification used by the HTTP layer to pick a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed name or content (400).
    ClientInput,
    /// Project or file absent (404).
    NotFound,
    /// Unexpected filesystem failure (500).
    Internal,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Project name is required.")]
    ProjectNameRequired,

    #[error(
        "Invalid project name. Only alphanumeric characters, underscores, and hyphens are allowed."
    )]
    InvalidProjectName,

    #[error("Project does not exist.")]
    ProjectNotFound,

    #[error("{}", .0.message())]
    InvalidPath(PathRejection),

    #[error("File already exists.")]
    FileExists,

    #[error("File does not exist in the project.")]
    FileNotFound,

    #[error("Content must be text only, no binary data allowed.")]
    BinaryContent,

    #[error("File name in the request body does not match the request path.")]
    FileNameMismatch,

    #[error("Only .c files can be compiled.")]
    NotCompilable,

    #[error("{context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}

impl StoreError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StoreError::ProjectNameRequired
            | StoreError::InvalidProjectName
            | StoreError::InvalidPath(_)
            | StoreError::FileExists
            | StoreError::BinaryContent
            | StoreError::FileNameMismatch
            | StoreError::NotCompilable => ErrorKind::ClientInput,
            StoreError::ProjectNotFound | StoreError::FileNotFound => ErrorKind::NotFound,
            StoreError::Io { .. } => ErrorKind::Internal,
        }
    }

    /// Wrap an I/O failure with a short, path-free description of the step.
    pub(crate) fn io(context: &'static str) -> impl FnOnce(std::io::Error) -> StoreError {
        move |source| StoreError::Io { context, source }
    }
}

impl From<PathRejection> for StoreError {
    fn from(rejection: PathRejection) -> Self {
        StoreError::InvalidPath(rejection)
    }
}
