//! TOML configuration file loading
//!
//! Supports `~/.config/spelling-voice/config.toml` as a persistent config source.
//! All fields are optional; the file is a partial overlay on top of defaults.

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Top-level TOML configuration file schema
#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    /// Speech service connection
    #[serde(default)]
    pub api: ApiFileConfig,

    /// Default voice and style
    #[serde(default)]
    pub voice: VoiceFileConfig,

    /// Durable audio cache
    #[serde(default)]
    pub cache: CacheFileConfig,
}

/// Speech service configuration
#[derive(Debug, Default, Deserialize)]
pub struct ApiFileConfig {
    /// `ElevenLabs` API key
    pub key: Option<String>,

    /// API root (e.g. `https://api.elevenlabs.io/v1`)
    pub base_url: Option<String>,

    /// Synthesis model (e.g. "eleven_multilingual_v2")
    pub model_id: Option<String>,

    /// Per-request timeout in seconds
    pub timeout_secs: Option<u64>,
}

/// Voice configuration
#[derive(Debug, Default, Deserialize)]
pub struct VoiceFileConfig {
    /// Catalog voice name or raw voice id
    pub name: Option<String>,

    /// Speaking style (`normal`, `slow`, `very_slow`)
    pub style: Option<String>,
}

/// Durable cache configuration
#[derive(Debug, Default, Deserialize)]
pub struct CacheFileConfig {
    pub data_dir: Option<String>,
    pub persist: Option<bool>,
    pub max_age_days: Option<u32>,
}

/// Load the TOML config file from the standard path
///
/// Returns `ConfigFile::default()` if the file doesn't exist or can't be parsed.
pub fn load_config_file() -> ConfigFile {
    config_file_path().map_or_else(ConfigFile::default, |path| load_config_file_from(&path))
}

/// Load a TOML config file from `path`, falling back to defaults
pub fn load_config_file_from(path: &Path) -> ConfigFile {
    if !path.exists() {
        return ConfigFile::default();
    }

    match std::fs::read_to_string(path) {
        Ok(content) => match toml::from_str(&content) {
            Ok(config) => {
                tracing::info!(path = %path.display(), "loaded config file");
                config
            }
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to parse config file, using defaults"
                );
                ConfigFile::default()
            }
        },
        Err(e) => {
            tracing::warn!(
                path = %path.display(),
                error = %e,
                "failed to read config file"
            );
            ConfigFile::default()
        }
    }
}

/// Return the config file path: `~/.config/spelling-voice/config.toml`
pub fn config_file_path() -> Option<PathBuf> {
    directories::BaseDirs::new().map(|d| d.config_dir().join("spelling-voice").join("config.toml"))
}
