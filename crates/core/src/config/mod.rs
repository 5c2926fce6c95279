//! Scan configuration.
//!
//! An analysed root may carry `popchain.yaml`, `popchain.yml` or `popchain.json`.
//! Every field is optional; a missing file means defaults.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::payload::StringLengths;
use crate::services::parsers::StrategyPreference;

/// File names probed, in order, when no explicit config path is given.
pub const CONFIG_FILE_NAMES: &[&str] = &["popchain.yaml", "popchain.yml", "popchain.json"];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse YAML config {path}: {source}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("Failed to parse JSON config {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Substring filters on file paths; empty means every file.
    #[serde(default)]
    pub includes: Vec<String>,
    /// File extensions (without dot) treated as source units.
    #[serde(default = "default_extensions")]
    pub extensions: Vec<String>,
    #[serde(default)]
    pub strategy: StrategyPreference,
    #[serde(default)]
    pub string_lengths: StringLengths,
}

fn default_extensions() -> Vec<String> {
    vec!["php".to_string()]
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            includes: Vec::new(),
            extensions: default_extensions(),
            strategy: StrategyPreference::default(),
            string_lengths: StringLengths::default(),
        }
    }
}

impl ScanConfig {
    /// Load an explicit config file; the format follows the extension (`json` or YAML).
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let body = fs::read_to_string(path)
            .map_err(|source| ConfigError::Io { path: path.to_path_buf(), source })?;
        let is_json = path.extension().and_then(|e| e.to_str()) == Some("json");
        if is_json {
            serde_json::from_str(&body)
                .map_err(|source| ConfigError::Json { path: path.to_path_buf(), source })
        } else {
            serde_yaml::from_str(&body)
                .map_err(|source| ConfigError::Yaml { path: path.to_path_buf(), source })
        }
    }

    /// Load the first config file found in `root`, or defaults when there is none.
    pub fn discover(root: &Path) -> Result<Self, ConfigError> {
        match CONFIG_FILE_NAMES.iter().map(|name| root.join(name)).find(|p| p.is_file()) {
            Some(path) => Self::load(&path),
            None => Ok(Self::default()),
        }
    }

    pub fn matches_extension(&self, path: &Path) -> bool {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return false;
        };
        self.extensions.iter().any(|want| want.eq_ignore_ascii_case(ext))
    }

    pub fn matches_includes(&self, path: &Path) -> bool {
        if self.includes.is_empty() {
            return true;
        }
        let display = path.to_string_lossy();
        self.includes.iter().any(|inc| display.contains(inc.as_str()))
    }
}
