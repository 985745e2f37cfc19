//! TOML configuration file loading
//!
//! Supports `~/.config/kyra/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::voice::VoiceSettings;
use crate::Result;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct KyraConfigFile {
    /// API keys for external services
    #[serde(default)]
    pub api_keys: ApiKeysFileConfig,

    /// Assistant persona and model
    #[serde(default)]
    pub assistant: AssistantFileConfig,

    /// Session storage
    #[serde(default)]
    pub storage: StorageFileConfig,

    /// Voice settings; missing fields keep their defaults
    #[serde(default)]
    pub voice: VoiceSettings,
}

/// API keys configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiKeysFileConfig {
    pub gemini: Option<String>,
    pub openweather: Option<String>,
    pub openai: Option<String>,
}

/// Assistant configuration
#[derive(Debug, Default, Deserialize)]
pub struct AssistantFileConfig {
    /// Model identifier (e.g. "gemini-2.5-pro")
    pub model: Option<String>,

    /// Name the assistant answers to
    pub name: Option<String>,
}

/// Storage configuration
#[derive(Debug, Default, Deserialize)]
pub struct StorageFileConfig {
    /// Directory holding the session document
    pub data_dir: Option<String>,
}

/// Load the TOML config file from the standard path
///
/// Returns `KyraConfigFile::default()` if the file doesn't exist or can't be parsed.
#[must_use]
pub fn load_config_file() -> KyraConfigFile {
    config_file_path().map_or_else(KyraConfigFile::default, |path| load_config_from(&path))
}

/// Load a TOML config file from an explicit path, falling back to defaults
#[must_use]
pub fn load_config_from(path: &Path) -> KyraConfigFile {
    if !path.exists() {
        return KyraConfigFile::default();
    }

    match parse_config_file(path) {
        Ok(config) => {
            tracing::info!(path = %path.display(), "loaded config file");
            config
        }
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to load config file, using defaults"
            );
            KyraConfigFile::default()
        }
    }
}

/// Read and parse a TOML config file
///
/// # Errors
///
/// Returns [`crate::Error::Io`] if the file cannot be read, or
/// [`crate::Error::Toml`] if it is not valid config
pub fn parse_config_file(path: &Path) -> Result<KyraConfigFile> {
    let content = std::fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Return the config file path: `~/.config/kyra/config.toml`
#[must_use]
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("kyra").join("config.toml"))
}
