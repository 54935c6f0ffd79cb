//! Validated project and file names.
//!
//! The allow-lists are the first line of defense: a project name can never
//! contain a separator or a dot, a file name can never contain a separator.
//! File names may still be `.` or `..`, which is why every file access also
//! goes through [`crate::paths::resolve_in_project`].

use std::fmt;
use std::sync::LazyLock;

use regex_lite::Regex;

use crate::error::StoreError;
use crate::paths::PathRejection;

#[allow(clippy::unwrap_used)]
static PROJECT_NAME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_-]+$").unwrap());

#[allow(clippy::unwrap_used)]
static FILE_NAME_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.-]+$").unwrap());

/// A project name matching `^[a-zA-Z0-9_-]+$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName(String);

impl ProjectName {
    /// Validate a name supplied in a create request.
    ///
    /// An empty name is reported separately from a malformed one.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        if raw.is_empty() {
            return Err(StoreError::ProjectNameRequired);
        }
        if !PROJECT_NAME_RE.is_match(raw) {
            return Err(StoreError::InvalidProjectName);
        }
        Ok(Self(raw.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A file name matching `^[A-Za-z0-9_.-]+$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FileName(String);

impl FileName {
    pub fn parse(raw: &str) -> Result<Self, PathRejection> {
        if FILE_NAME_RE.is_match(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(PathRejection::InvalidName)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Name of the executable a compiler produces from this source file.
    ///
    /// `None` unless the name ends in `.c` with a non-empty stem.
    pub fn artifact_name(&self) -> Option<&str> {
        self.0.strip_suffix(".c").filter(|stem| !stem.is_empty())
    }
}

impl fmt::Display for FileName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
