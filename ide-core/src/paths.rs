//! Path resolution and containment.
//!
//! Every file operation resolves its target through [`resolve_in_project`];
//! no handler joins paths on its own.

use std::path::{Path, PathBuf};

use path_clean::PathClean;

use crate::names::FileName;

/// Why a requested file path was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathRejection {
    /// The name fails the `^[A-Za-z0-9_.-]+$` allow-list.
    InvalidName,
    /// The name passes the allow-list but resolves outside the project.
    OutsideProject,
}

impl PathRejection {
    pub fn message(self) -> &'static str {
        match self {
            PathRejection::InvalidName => {
                "Invalid file name. Only alphanumeric characters, underscores, hyphens, and dots are allowed."
            }
            PathRejection::OutsideProject => {
                "Invalid file path. File cannot be created outside the project directory."
            }
        }
    }
}

/// Outcome of resolving a file name against a project directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathResolution {
    Resolved { name: FileName, path: PathBuf },
    Rejected(PathRejection),
}

impl PathResolution {
    pub fn into_result(self) -> Result<(FileName, PathBuf), PathRejection> {
        match self {
            PathResolution::Resolved { name, path } => Ok((name, path)),
            PathResolution::Rejected(rejection) => Err(rejection),
        }
    }
}

/// Validate `raw_name` and resolve it inside `project_dir`.
///
/// The joined path is normalized lexically and must be strictly below the
/// normalized project directory, compared component by component. This is
/// what rejects `..` and `.`, which the character allow-list lets through.
pub fn resolve_in_project(project_dir: &Path, raw_name: &str) -> PathResolution {
    let name = match FileName::parse(raw_name) {
        Ok(name) => name,
        Err(rejection) => return PathResolution::Rejected(rejection),
    };

    let base = project_dir.to_path_buf().clean();
    let path = base.join(name.as_str()).clean();

    if path == base || !path.starts_with(&base) {
        return PathResolution::Rejected(PathRejection::OutsideProject);
    }

    PathResolution::Resolved { name, path }
}
