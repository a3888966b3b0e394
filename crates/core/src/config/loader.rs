//! Configuration file loading

use super::schema::EngineSettings;
use crate::error::{Error, ErrorCode, Result, ResultExt};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Loaded configuration together with where it came from
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: EngineSettings,
    pub path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a file path or the standard locations, falling back to defaults.
    ///
    /// An explicit path that does not exist is an error; a missing file in
    /// the standard locations is not.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) if !p.exists() => return Err(Error::config_not_found(p)),
            Some(p) => Some(p.to_path_buf()),
            None => find_config_file(),
        };

        let settings = match config_path {
            Some(ref p) => load_config_file(p)?,
            None => EngineSettings::default(),
        };
        settings.validate().context(match &config_path {
            Some(p) => format!("While loading {}", p.display()),
            None => "While loading built-in defaults".to_string(),
        })?;

        debug!(path = ?config_path, "Engine settings loaded");

        Ok(Self {
            settings,
            path: config_path,
        })
    }

    /// Defaults only (no file)
    pub fn defaults() -> Self {
        Self {
            settings: EngineSettings::default(),
            path: None,
        }
    }
}

/// Find configuration file in standard locations
fn find_config_file() -> Option<PathBuf> {
    let mut candidates = vec![PathBuf::from(".meetpoint.toml"), PathBuf::from("meetpoint.toml")];
    if let Some(dir) = dirs::config_dir() {
        candidates.push(dir.join("meetpoint").join("config.toml"));
    }

    candidates.into_iter().find(|candidate| candidate.exists())
}

/// Load and parse a TOML configuration file
fn load_config_file(path: &Path) -> Result<EngineSettings> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::new(
            ErrorCode::IoError,
            format!("Failed to read config file {}: {e}", path.display()),
        )
        .with_source(e)
    })?;

    toml::from_str(&content).map_err(|e| {
        Error::new(
            ErrorCode::ConfigParseError,
            format!("Failed to parse config file {}: {e}", path.display()),
        )
        .with_source(e)
    })
}
