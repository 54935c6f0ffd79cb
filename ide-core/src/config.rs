//! Layered configuration for the simple-ide service.
//!
//! Precedence, later layers win:
//! 1. Defaults ([`ServiceConfig::default`])
//! 2. File (`--config <path>`, else `$SIMPLE_IDE_HOME/config.toml`,
//!    else `~/.simple-ide/config.toml`)
//! 3. Environment (`SIMPLE_IDE_*`)
//! 4. Explicit overrides set on the loader (command-line flags)
//!
//! ## Example
//!
//! ```toml
//! bind_addr = "127.0.0.1:5000"
//! store_root = "/var/lib/simple-ide/projects"
//!
//! [compile]
//! compiler = "gcc"
//! args = ["-Wall"]
//! timeout_secs = 10
//! sandbox = "firejail"
//! ```

use std::collections::BTreeMap;
use std::env;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::compile::{CompileConfig, SandboxMode};

pub const DEFAULT_ENV_PREFIX: &str = "SIMPLE_IDE";

#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("I/O error reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML parsing error in {path}: {source}")]
    Toml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid value for ${var}: '{value}' (expected: {expected})")]
    InvalidEnvValue {
        var: String,
        value: String,
        expected: String,
    },

    #[error("Invalid value for `{key}` in {path}: {value} (expected: {expected})")]
    InvalidFileValue {
        path: PathBuf,
        key: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Cannot determine home directory; set ${0}_HOME or pass --config")]
    NoHomeDir(String),
}

/// Fully resolved service configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    pub bind_addr: SocketAddr,
    /// Directory holding one subdirectory per project.
    pub store_root: PathBuf,
    /// Largest accepted request body.
    pub max_body_bytes: usize,
    /// Answer CORS requests from any origin.
    pub cors_allow_any_origin: bool,
    pub compile: CompileConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 5000)),
            store_root: PathBuf::from("projects"),
            max_body_bytes: 1024 * 1024,
            cors_allow_any_origin: true,
            compile: CompileConfig::default(),
        }
    }
}

/// Shape of `config.toml`. Every field is optional.
#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    bind_addr: Option<SocketAddr>,
    store_root: Option<PathBuf>,
    max_body_bytes: Option<usize>,
    cors_allow_any_origin: Option<bool>,
    compile: Option<CompileConfig>,
    #[serde(flatten)]
    extra: BTreeMap<String, toml::Value>,
}

impl FileConfig {
    /// Reject values that parse but can never work, same rules as the env layer.
    fn validate(&self, path: &Path) -> Result<(), ConfigLoadError> {
        if let Some(compile) = &self.compile
            && compile.timeout_secs == 0
        {
            return Err(ConfigLoadError::InvalidFileValue {
                path: path.to_path_buf(),
                key: "compile.timeout_secs",
                value: compile.timeout_secs.to_string(),
                expected: "a positive number of seconds",
            });
        }
        Ok(())
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    home: Option<PathBuf>,
    config_path: Option<PathBuf>,
    env_prefix: String,
    skip_file: bool,
    skip_env: bool,
    bind_addr: Option<SocketAddr>,
    store_root: Option<PathBuf>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self {
            home: None,
            config_path: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
            skip_file: false,
            skip_env: false,
            bind_addr: None,
            store_root: None,
        }
    }

    /// Directory searched for `config.toml` when no explicit file is given.
    pub fn with_home(mut self, path: PathBuf) -> Self {
        self.home = Some(path);
        self
    }

    /// Explicit config file. Unlike the default location, it must exist.
    pub fn with_config_file(mut self, path: PathBuf) -> Self {
        self.config_path = Some(path);
        self
    }

    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.env_prefix = prefix.into();
        self
    }

    pub fn skip_file_layer(mut self) -> Self {
        self.skip_file = true;
        self
    }

    pub fn skip_env_layer(mut self) -> Self {
        self.skip_env = true;
        self
    }

    pub fn with_bind_addr(mut self, addr: Option<SocketAddr>) -> Self {
        self.bind_addr = addr;
        self
    }

    pub fn with_store_root(mut self, root: Option<PathBuf>) -> Self {
        self.store_root = root;
        self
    }

    pub fn load(self) -> Result<ServiceConfig, ConfigLoadError> {
        let mut config = ServiceConfig::default();

        if !self.skip_file {
            let file = match &self.config_path {
                Some(path) => Some(Self::read_file(path)?),
                None => {
                    let path = self.resolve_home()?.join("config.toml");
                    Self::read_optional_file(&path)?
                }
            };
            if let Some(file) = file {
                Self::merge_file(&mut config, file);
            }
        }

        if !self.skip_env {
            Self::apply_env_overrides(&mut config, &self.env_prefix)?;
        }

        if let Some(addr) = self.bind_addr {
            config.bind_addr = addr;
        }
        if let Some(root) = self.store_root {
            config.store_root = root;
        }

        Ok(config)
    }

    /// Priority: explicit home, `${PREFIX}_HOME`, `~/.simple-ide`.
    fn resolve_home(&self) -> Result<PathBuf, ConfigLoadError> {
        if let Some(path) = &self.home {
            return Ok(path.clone());
        }
        if let Ok(path) = env::var(format!("{}_HOME", self.env_prefix))
            && !path.trim().is_empty()
        {
            return Ok(PathBuf::from(path));
        }
        dirs::home_dir()
            .map(|home| home.join(".simple-ide"))
            .ok_or_else(|| ConfigLoadError::NoHomeDir(self.env_prefix.clone()))
    }

    fn read_optional_file(path: &Path) -> Result<Option<FileConfig>, ConfigLoadError> {
        match std::fs::metadata(path) {
            Ok(_) => Self::read_file(path).map(Some),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("config.toml not found at {}, using defaults", path.display());
                Ok(None)
            }
            Err(source) => Err(ConfigLoadError::Io {
                path: path.to_path_buf(),
                source,
            }),
        }
    }

    fn read_file(path: &Path) -> Result<FileConfig, ConfigLoadError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: FileConfig = toml::from_str(&contents).map_err(|source| ConfigLoadError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        file.validate(path)?;
        Ok(file)
    }

    fn merge_file(config: &mut ServiceConfig, file: FileConfig) {
        if let Some(addr) = file.bind_addr {
            config.bind_addr = addr;
        }
        if let Some(root) = file.store_root {
            config.store_root = root;
        }
        if let Some(max) = file.max_body_bytes {
            config.max_body_bytes = max;
        }
        if let Some(any) = file.cors_allow_any_origin {
            config.cors_allow_any_origin = any;
        }
        if let Some(compile) = file.compile {
            config.compile = compile;
        }
        for key in file.extra.keys() {
            tracing::warn!("ignoring unknown config key: {key}");
        }
    }

    /// Apply `{PREFIX}_*` variables.
    ///
    /// Supported: `BIND_ADDR`, `STORE_ROOT`, `MAX_BODY_BYTES`,
    /// `CORS_ANY_ORIGIN`, `COMPILER`, `COMPILE_TIMEOUT_SECS`, `SANDBOX`.
    pub fn apply_env_overrides(
        config: &mut ServiceConfig,
        prefix: &str,
    ) -> Result<(), ConfigLoadError> {
        if let Some((var, value)) = env_value(prefix, "BIND_ADDR") {
            config.bind_addr = value.parse().map_err(|_| invalid(var, value, "host:port"))?;
        }
        if let Some((_, value)) = env_value(prefix, "STORE_ROOT") {
            config.store_root = PathBuf::from(value);
        }
        if let Some((var, value)) = env_value(prefix, "MAX_BODY_BYTES") {
            config.max_body_bytes = value
                .parse()
                .map_err(|_| invalid(var, value, "a byte count"))?;
        }
        if let Some((var, value)) = env_value(prefix, "CORS_ANY_ORIGIN") {
            config.cors_allow_any_origin = parse_bool(&value)
                .ok_or_else(|| invalid(var, value, "true/false, 1/0, yes/no, on/off"))?;
        }
        if let Some((_, value)) = env_value(prefix, "COMPILER") {
            config.compile.compiler = value;
        }
        if let Some((var, value)) = env_value(prefix, "COMPILE_TIMEOUT_SECS") {
            config.compile.timeout_secs = value
                .parse()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| invalid(var, value, "a positive number of seconds"))?;
        }
        if let Some((var, value)) = env_value(prefix, "SANDBOX") {
            config.compile.sandbox = value
                .parse::<SandboxMode>()
                .map_err(|_| invalid(var, value, "none or firejail"))?;
        }
        Ok(())
    }
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// Non-blank value of `{prefix}_{key}`, paired with the variable name.
fn env_value(prefix: &str, key: &str) -> Option<(String, String)> {
    let var = format!("{prefix}_{key}");
    match env::var(&var) {
        Ok(value) if !value.trim().is_empty() => {
            tracing::debug!("Applying env override: {var}={value}");
            Some((var, value.trim().to_string()))
        }
        _ => None,
    }
}

fn invalid(var: String, value: String, expected: &str) -> ConfigLoadError {
    ConfigLoadError::InvalidEnvValue {
        var,
        value,
        expected: expected.to_string(),
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}
