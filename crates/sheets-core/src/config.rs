//! Engine configuration loaded from TOML.
//!
//! ```toml
//! version = "1.2"
//! ```

use directories::ProjectDirs;
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Result, SheetsError};

const MAX_CONFIG_FILE_BYTES: u64 = 1_048_576; // 1 MiB

pub const DEFAULT_VERSION: &str = "1.2";

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct EngineConfig {
    /// Text returned by the `VERSION()` formula function.
    pub version: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            version: DEFAULT_VERSION.to_string(),
        }
    }
}

impl EngineConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: EngineConfig = toml::from_str(content)?;
        if config.version.trim().is_empty() {
            return Err(SheetsError::Config("version must not be empty".to_string()));
        }
        Ok(config)
    }

    /// Load from `path`, or from the user config dir when `path` is `None`.
    ///
    /// A missing user config falls back to the defaults; a missing explicit
    /// path is an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match user_config_path() {
                Some(p) => (p, false),
                None => return Ok(Self::default()),
            },
        };

        if !path.exists() {
            if explicit {
                return Err(SheetsError::Config(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            log::debug!("no config at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let meta = std::fs::metadata(&path)?;
        if meta.len() > MAX_CONFIG_FILE_BYTES {
            return Err(SheetsError::Config(format!(
                "refusing to read {}: file too large ({} bytes, max {})",
                path.display(),
                meta.len(),
                MAX_CONFIG_FILE_BYTES
            )));
        }
        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_toml_str(&content)?;
        log::info!("loaded engine config from {}", path.display());
        Ok(config)
    }
}

fn user_config_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "sheets")?;
    let mut path = proj.config_dir().to_path_buf();
    path.push("engine.toml");
    Some(path)
}
