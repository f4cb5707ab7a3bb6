//! CLI configuration
//!
//! Settings are layered, later sources overriding earlier ones:
//! 1. Built-in defaults
//! 2. `cairn.toml` in the working directory
//! 3. Environment variables (CAIRN_ROOTS, CAIRN_LOCKFILE, CAIRN_JSON, NO_COLOR)
//! 4. Command-line flags

use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read configuration file {file}: {error}")]
    Io {
        file: PathBuf,
        error: std::io::Error,
    },

    #[error("Invalid TOML syntax in {file}: {error}")]
    TomlParseError {
        file: PathBuf,
        error: toml::de::Error,
    },
}

/// Contents of `cairn.toml`
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    pub roots: Vec<PathBuf>,
    pub lockfile: Option<PathBuf>,
    pub output: OutputConfig,
}

/// The `[output]` table
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    pub json: Option<bool>,
    pub color: Option<bool>,
}

impl ConfigFile {
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            file: path.to_path_buf(),
            error,
        })?;

        toml::from_str(&content).map_err(|error| ConfigError::TomlParseError {
            file: path.to_path_buf(),
            error,
        })
    }
}

/// Effective CLI configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Directories searched for `resources/` and `content/`
    pub roots: Vec<PathBuf>,
    /// Default lockfile for `verify`
    pub lockfile: Option<PathBuf>,
    pub json: bool,
    pub color: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            roots: vec![PathBuf::from(".")],
            lockfile: None,
            json: false,
            color: true,
        }
    }
}

impl Config {
    pub const FILE_NAME: &'static str = "cairn.toml";

    /// Defaults, then `dir/cairn.toml` if present, then the environment
    pub fn load(dir: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        let path = dir.join(Self::FILE_NAME);
        if path.exists() {
            config.apply_file(ConfigFile::load_from_file(&path)?);
        }

        config.apply_env();
        Ok(config)
    }

    fn apply_file(&mut self, file: ConfigFile) {
        if !file.roots.is_empty() {
            self.roots = file.roots;
        }
        if file.lockfile.is_some() {
            self.lockfile = file.lockfile;
        }
        if let Some(json) = file.output.json {
            self.json = json;
        }
        if let Some(color) = file.output.color {
            self.color = color;
        }
    }

    fn apply_env(&mut self) {
        if let Some(roots) = env::var_os("CAIRN_ROOTS") {
            let roots: Vec<PathBuf> = env::split_paths(&roots)
                .filter(|p| !p.as_os_str().is_empty())
                .collect();
            if !roots.is_empty() {
                self.roots = roots;
            }
        }

        if let Some(lockfile) = env::var_os("CAIRN_LOCKFILE") {
            self.lockfile = Some(PathBuf::from(lockfile));
        }

        if let Ok(json) = env::var("CAIRN_JSON") {
            self.json = is_truthy(&json);
        }

        if env::var_os("NO_COLOR").is_some() {
            self.color = false;
        }
    }

    /// Command-line flags override everything else
    pub fn with_flags(mut self, roots: Vec<PathBuf>, json: bool) -> Self {
        if !roots.is_empty() {
            self.roots = roots;
        }
        self.json |= json;
        self
    }
}

fn is_truthy(value: &str) -> bool {
    matches!(value.to_lowercase().as_str(), "1" | "true" | "yes")
}
