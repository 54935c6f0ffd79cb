//! Filesystem-backed project store.
//!
//! ## Layout
//!
//! ```text
//! {root}/
//!   {project}/          one directory per project
//!     {file}            stored verbatim as UTF-8 text
//! ```
//!
//! There is no manifest: the directory listing is the source of truth.
//! Concurrent writers to the same file race at the filesystem layer.

use std::io::ErrorKind as IoErrorKind;
use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use tokio::io::AsyncWriteExt;

use crate::error::StoreError;
use crate::names::{FileName, ProjectName};
use crate::paths::resolve_in_project;

/// One row of a project's file listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileEntry {
    pub name: String,
    pub size: u64,
    #[serde(serialize_with = "serialize_millis")]
    pub modified: DateTime<Utc>,
}

fn serialize_millis<S: Serializer>(ts: &DateTime<Utc>, ser: S) -> Result<S::Ok, S::Error> {
    ser.serialize_str(&ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Source and executable of a compile request, both resolved inside the project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompileTarget {
    pub project_dir: PathBuf,
    pub source: FileName,
    pub artifact: FileName,
}

/// Project/file store rooted at an explicit directory.
#[derive(Debug, Clone)]
pub struct ProjectStore {
    root: PathBuf,
}

impl ProjectStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the root directory if it is missing.
    pub async fn ensure_root(&self) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root)
            .await
            .map_err(StoreError::io("create store root"))
    }

    // ── Projects ─────────────────────────────────────────────────────────

    /// Create a project directory, or do nothing if it already exists.
    pub async fn create_project(&self, raw_name: &str) -> Result<ProjectName, StoreError> {
        let name = ProjectName::parse(raw_name)?;
        self.ensure_root().await?;
        tokio::fs::create_dir_all(self.root.join(name.as_str()))
            .await
            .map_err(StoreError::io("create project directory"))?;
        tracing::info!(project = %name, "project created");
        Ok(name)
    }

    /// Names of the directories directly under the root, sorted.
    pub async fn list_projects(&self) -> Result<Vec<String>, StoreError> {
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io("list projects")(e)),
        };

        let mut projects = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(StoreError::io("list projects"))?
        {
            let file_type = entry
                .file_type()
                .await
                .map_err(StoreError::io("inspect project entry"))?;
            if file_type.is_dir() {
                projects.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        projects.sort();
        Ok(projects)
    }

    /// Whether `raw_name` names an existing project directory.
    ///
    /// Any failure, including an invalid name, counts as "does not exist".
    pub async fn project_exists(&self, raw_name: &str) -> bool {
        self.project_dir(raw_name).await.is_ok()
    }

    /// Directory of an existing project.
    pub async fn project_dir(&self, raw_name: &str) -> Result<PathBuf, StoreError> {
        let name = ProjectName::parse(raw_name).map_err(|_| StoreError::ProjectNotFound)?;
        let dir = self.root.join(name.as_str());
        match tokio::fs::metadata(&dir).await {
            Ok(meta) if meta.is_dir() => Ok(dir),
            _ => Err(StoreError::ProjectNotFound),
        }
    }

    /// Resolve a file inside an existing project.
    ///
    /// Checks project existence first (404), then name and containment (400).
    pub async fn resolve_file(
        &self,
        project: &str,
        file: &str,
    ) -> Result<(FileName, PathBuf), StoreError> {
        let dir = self.project_dir(project).await?;
        resolve_in_project(&dir, file)
            .into_result()
            .map_err(StoreError::from)
    }

    // ── Files ────────────────────────────────────────────────────────────

    /// Regular files of a project with size and modification time, sorted by name.
    pub async fn list_files(&self, project: &str) -> Result<Vec<FileEntry>, StoreError> {
        let dir = self.project_dir(project).await?;
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(StoreError::io("list files"))?;

        let mut files = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(StoreError::io("list files"))?
        {
            let meta = entry
                .metadata()
                .await
                .map_err(StoreError::io("stat file"))?;
            if !meta.is_file() {
                continue;
            }
            let modified = meta.modified().map_err(StoreError::io("stat file"))?;
            files.push(FileEntry {
                name: entry.file_name().to_string_lossy().into_owned(),
                size: meta.len(),
                modified: DateTime::<Utc>::from(modified),
            });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Create a new file. Never overwrites.
    ///
    /// `text` is `None` when the caller received non-text content; that is
    /// rejected only after the name and existence checks, so the error a
    /// client sees follows the same order for every request.
    pub async fn create_file(
        &self,
        project: &str,
        file: &str,
        text: Option<&str>,
    ) -> Result<FileName, StoreError> {
        let (name, path) = self.resolve_file(project, file).await?;
        if path_exists(&path).await {
            return Err(StoreError::FileExists);
        }
        let text = text.ok_or(StoreError::BinaryContent)?;

        let mut handle = match tokio::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .await
        {
            Ok(handle) => handle,
            Err(e) if e.kind() == IoErrorKind::AlreadyExists => {
                return Err(StoreError::FileExists);
            }
            Err(e) => return Err(StoreError::io("create file")(e)),
        };
        handle
            .write_all(text.as_bytes())
            .await
            .map_err(StoreError::io("write file"))?;
        handle.flush().await.map_err(StoreError::io("write file"))?;

        tracing::info!(project, file = %name, bytes = text.len(), "file created");
        Ok(name)
    }

    /// Full text of an existing file.
    ///
    /// Invalid UTF-8 sequences are replaced rather than rejected.
    pub async fn read_file(&self, project: &str, file: &str) -> Result<String, StoreError> {
        let (_, path) = self.existing_file(project, file).await?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(StoreError::io("read file"))?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Replace the full content of an existing file. No merge, no version check.
    pub async fn update_file(
        &self,
        project: &str,
        file: &str,
        text: Option<&str>,
    ) -> Result<FileName, StoreError> {
        let (name, path) = self.existing_file(project, file).await?;
        let text = text.ok_or(StoreError::BinaryContent)?;
        tokio::fs::write(&path, text.as_bytes())
            .await
            .map_err(StoreError::io("update file"))?;
        tracing::info!(project, file = %name, bytes = text.len(), "file updated");
        Ok(name)
    }

    /// Remove an existing file.
    pub async fn delete_file(&self, project: &str, file: &str) -> Result<FileName, StoreError> {
        let (name, path) = self.existing_file(project, file).await?;
        tokio::fs::remove_file(&path)
            .await
            .map_err(StoreError::io("delete file"))?;
        tracing::info!(project, file = %name, "file deleted");
        Ok(name)
    }

    /// Resolve a file and require it to be an existing regular file.
    pub async fn existing_file(
        &self,
        project: &str,
        file: &str,
    ) -> Result<(FileName, PathBuf), StoreError> {
        let (name, path) = self.resolve_file(project, file).await?;
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok((name, path)),
            _ => Err(StoreError::FileNotFound),
        }
    }

    /// Resolve an existing `.c` file and the executable it compiles to.
    ///
    /// The artifact name goes through the same containment check as every
    /// other file, so `...c` (artifact `..`) is refused.
    pub async fn compile_target(
        &self,
        project: &str,
        file: &str,
    ) -> Result<CompileTarget, StoreError> {
        let (source, path) = self.existing_file(project, file).await?;
        let project_dir = path
            .parent()
            .map(Path::to_path_buf)
            .ok_or(StoreError::ProjectNotFound)?;
        let stem = source.artifact_name().ok_or(StoreError::NotCompilable)?;
        let (artifact, _) = resolve_in_project(&project_dir, stem).into_result()?;
        Ok(CompileTarget {
            project_dir,
            source,
            artifact,
        })
    }
}

async fn path_exists(path: &Path) -> bool {
    tokio::fs::symlink_metadata(path).await.is_ok()
}
