//! Compile action: run an external C compiler on a project file.
//!
//! The command line is `<compiler> [args...] <file>.c -o <file>`, run with the
//! project directory as working directory. With [`SandboxMode::Firejail`] the
//! compiler is wrapped by the sandbox program in quiet mode, so the captured
//! stderr carries compiler diagnostics only.
//!
//! Success is structured: exit status 0 **and** the artifact present on disk
//! afterwards. Output text is never inspected to decide the result.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::process::Command;

use crate::names::FileName;

/// Appended to stderr when the compiler exits cleanly without an artifact.
pub const MISSING_ARTIFACT_MESSAGE: &str =
    "Compilation reported success but no executable was produced.";

/// Appended to stderr when the compiler was killed by a signal.
pub const TERMINATED_MESSAGE: &str = "Compiler was terminated before it finished.";

/// Process isolation wrapped around the compiler.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SandboxMode {
    /// Run the compiler directly.
    #[default]
    None,
    /// Run the compiler under `firejail --quiet`, network off, project dir whitelisted.
    Firejail,
}

impl FromStr for SandboxMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "none" | "off" => Ok(SandboxMode::None),
            "firejail" => Ok(SandboxMode::Firejail),
            other => Err(format!("unknown sandbox mode: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileConfig {
    /// Compiler binary (default: "gcc").
    pub compiler: String,
    /// Extra arguments placed before the source file.
    pub args: Vec<String>,
    /// Wall-clock limit for one compilation (default: 10 seconds).
    pub timeout_secs: u64,
    pub sandbox: SandboxMode,
    /// Sandbox binary used when `sandbox` is not `none` (default: "firejail").
    pub sandbox_program: String,
}

impl Default for CompileConfig {
    fn default() -> Self {
        Self {
            compiler: "gcc".to_string(),
            args: Vec::new(),
            timeout_secs: 10,
            sandbox: SandboxMode::None,
            sandbox_program: "firejail".to_string(),
        }
    }
}

impl CompileConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Result of a compiler run that actually executed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CompileOutcome {
    pub success: bool,
    pub stdout: String,
    pub stderr: String,
}

/// The compiler could not be run to completion.
#[derive(Debug, thiserror::Error)]
pub enum CompileError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("compilation timed out after {elapsed:?}")]
    Timeout { elapsed: Duration },

    #[error("failed to collect compiler output: {0}")]
    Wait(#[source] std::io::Error),
}

/// Runs compilations according to a [`CompileConfig`].
#[derive(Debug, Clone)]
pub struct Compiler {
    config: CompileConfig,
}

impl Compiler {
    pub fn new(config: CompileConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompileConfig {
        &self.config
    }

    /// Program and argument vector for compiling `source` into `artifact`.
    pub fn command_line(
        &self,
        project_dir: &Path,
        source: &str,
        artifact: &str,
    ) -> (String, Vec<String>) {
        let mut compiler_argv = self.config.args.clone();
        compiler_argv.extend([
            source.to_string(),
            "-o".to_string(),
            artifact.to_string(),
        ]);

        match self.config.sandbox {
            SandboxMode::None => (self.config.compiler.clone(), compiler_argv),
            SandboxMode::Firejail => {
                let dir = absolute_dir(project_dir);
                let mut argv = vec![
                    "--quiet".to_string(),
                    "--noprofile".to_string(),
                    "--net=none".to_string(),
                    format!("--whitelist={}", dir.display()),
                    self.config.compiler.clone(),
                ];
                argv.extend(compiler_argv);
                (self.config.sandbox_program.clone(), argv)
            }
        }
    }

    /// Compile `source` (a `.c` file) inside `project_dir`.
    ///
    /// Returns `Ok` whenever the process ran, including failed compilations;
    /// `Err` only when it could not be spawned, waited on, or timed out. The
    /// compiler runs in its own process group; on timeout the whole group is
    /// killed, so helpers it started (`cc1`, `as`, `ld`, sandboxed children)
    /// cannot write the artifact afterwards.
    pub async fn compile(
        &self,
        project_dir: &Path,
        source: &FileName,
        artifact: &str,
    ) -> Result<CompileOutcome, CompileError> {
        let (program, argv) = self.command_line(project_dir, source.as_str(), artifact);
        tracing::debug!(%program, ?argv, "spawning compiler");

        let mut command = Command::new(&program);
        command
            .args(&argv)
            .current_dir(project_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        #[cfg(unix)]
        command.process_group(0);

        let mut child = command.spawn().map_err(|source| CompileError::Spawn {
            program: program.clone(),
            source,
        })?;
        let pgid = child.id();
        let stdout_pipe = child.stdout.take();
        let stderr_pipe = child.stderr.take();

        let limit = self.config.timeout();
        let run = async {
            let (status, stdout, stderr) = tokio::join!(
                child.wait(),
                read_pipe(stdout_pipe),
                read_pipe(stderr_pipe)
            );
            Ok::<_, std::io::Error>((status?, stdout?, stderr?))
        };
        let waited = tokio::time::timeout(limit, run).await;
        let (status, stdout_bytes, stderr_bytes) = match waited {
            Ok(result) => result.map_err(CompileError::Wait)?,
            Err(_) => {
                kill_process_group(pgid);
                if let Err(e) = child.kill().await {
                    tracing::debug!("compiler already gone after group kill: {e}");
                }
                tracing::warn!(file = %source, ?limit, "compiler timed out, process group killed");
                return Err(CompileError::Timeout { elapsed: limit });
            }
        };
        let stdout = String::from_utf8_lossy(&stdout_bytes).into_owned();
        let mut stderr = String::from_utf8_lossy(&stderr_bytes).into_owned();

        let success = match status.code() {
            Some(0) => {
                let produced = matches!(
                    tokio::fs::metadata(project_dir.join(artifact)).await,
                    Ok(meta) if meta.is_file()
                );
                if !produced {
                    append_line(&mut stderr, MISSING_ARTIFACT_MESSAGE);
                }
                produced
            }
            Some(code) => {
                tracing::debug!(file = %source, code, "compiler exited with failure");
                false
            }
            None => {
                append_line(&mut stderr, TERMINATED_MESSAGE);
                false
            }
        };

        tracing::info!(file = %source, success, "compile finished");
        Ok(CompileOutcome {
            success,
            stdout,
            stderr,
        })
    }
}

async fn read_pipe<R: AsyncRead + Unpin>(pipe: Option<R>) -> std::io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    if let Some(mut pipe) = pipe {
        pipe.read_to_end(&mut buf).await?;
    }
    Ok(buf)
}

/// SIGKILL every process in the group led by `pgid`.
#[cfg(unix)]
fn kill_process_group(pgid: Option<u32>) {
    let Some(pgid) = pgid.and_then(|pid| i32::try_from(pid).ok()) else {
        return;
    };
    // SAFETY: kill(2) takes plain integers; a negative pid addresses the group.
    let rc = unsafe { libc::kill(-pgid, libc::SIGKILL) };
    if rc != 0 {
        tracing::debug!(
            pgid,
            "killpg failed: {}",
            std::io::Error::last_os_error()
        );
    }
}

#[cfg(not(unix))]
fn kill_process_group(_pgid: Option<u32>) {}

fn append_line(buf: &mut String, line: &str) {
    if !buf.is_empty() && !buf.ends_with('\n') {
        buf.push('\n');
    }
    buf.push_str(line);
}

fn absolute_dir(dir: &Path) -> PathBuf {
    std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf())
}
