//! Configuration management for spelling-voice
//!
//! Values resolve env > config file > default.

pub mod file;

use std::path::PathBuf;
use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use crate::cache::DEFAULT_MAX_AGE;
use crate::voice::{ClientOptions, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT, SpeechStyle};
use crate::{Error, Result};
use file::ConfigFile;

/// Credential environment variable
pub const API_KEY_ENV: &str = "ELEVENLABS_API_KEY";

/// spelling-voice configuration
#[derive(Debug)]
pub struct Config {
    /// Speech service connection
    pub api: ApiConfig,

    /// Default catalog voice name or raw voice id
    pub voice: String,

    /// Default speaking style
    pub style: SpeechStyle,

    /// Durable audio cache
    pub cache: CacheConfig,
}

/// Speech service connection
#[derive(Debug)]
pub struct ApiConfig {
    /// `ElevenLabs` API key; `None` when unset or a placeholder
    pub key: Option<SecretString>,

    pub base_url: String,

    pub model_id: String,

    pub timeout: Duration,
}

/// Durable audio cache configuration
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Directory holding the cache database
    pub data_dir: PathBuf,

    /// Whether audio persists across runs
    pub persist: bool,

    /// Records older than this are purged at startup
    pub max_age: Duration,
}

impl Config {
    /// Load configuration from the process environment and the config file
    ///
    /// # Errors
    ///
    /// Returns `Config` if a setting has an invalid value
    pub fn load() -> Result<Self> {
        Self::resolve(file::load_config_file(), |name| std::env::var(name).ok())
    }

    /// Resolve configuration from a parsed file and an environment lookup
    ///
    /// # Errors
    ///
    /// Returns `Config` if a setting has an invalid value
    pub fn resolve<F>(fc: ConfigFile, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = env(API_KEY_ENV)
            .or(fc.api.key)
            .and_then(usable_credential)
            .map(SecretString::from);

        let timeout_secs = match env("SPELLING_VOICE_TIMEOUT_SECS") {
            Some(v) => Some(parse_setting::<u64>("SPELLING_VOICE_TIMEOUT_SECS", &v)?),
            None => fc.api.timeout_secs,
        };
        let timeout = match timeout_secs {
            Some(0) => {
                return Err(Error::Config("request timeout must be at least 1 second".to_string()));
            }
            Some(secs) => Duration::from_secs(secs),
            None => DEFAULT_TIMEOUT,
        };

        let api = ApiConfig {
            key,
            base_url: env("SPELLING_VOICE_API_URL")
                .or(fc.api.base_url)
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            model_id: env("SPELLING_VOICE_MODEL")
                .or(fc.api.model_id)
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout,
        };

        let voice = env("SPELLING_VOICE_VOICE")
            .or(fc.voice.name)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| "Alice".to_string());

        let style = match env("SPELLING_VOICE_STYLE").or(fc.voice.style) {
            Some(id) => SpeechStyle::from_id(&id)
                .ok_or_else(|| Error::Config(format!("unknown speech style: {id}")))?,
            None => SpeechStyle::default(),
        };

        // Determine data directory (~/.local/share/spelling-voice on Linux)
        let data_dir = env("SPELLING_VOICE_DATA_DIR")
            .or(fc.cache.data_dir)
            .map_or_else(default_data_dir, PathBuf::from);

        let persist = match env("SPELLING_VOICE_PERSIST") {
            Some(v) => parse_flag("SPELLING_VOICE_PERSIST", &v)?,
            None => fc.cache.persist.unwrap_or(true),
        };

        let max_age = match env("SPELLING_VOICE_CACHE_DAYS") {
            Some(v) => Some(parse_setting::<u32>("SPELLING_VOICE_CACHE_DAYS", &v)?),
            None => fc.cache.max_age_days,
        }
        .map_or(DEFAULT_MAX_AGE, days);

        Ok(Self {
            api,
            voice,
            style,
            cache: CacheConfig {
                data_dir,
                persist,
                max_age,
            },
        })
    }

    /// Whether a usable credential is configured
    #[must_use]
    pub const fn has_credential(&self) -> bool {
        self.api.key.is_some()
    }

    /// Copy of the credential for building a client
    #[must_use]
    pub fn api_key(&self) -> Option<SecretString> {
        self.api
            .key
            .as_ref()
            .map(|k| SecretString::from(k.expose_secret().to_owned()))
    }

    /// Client options derived from this configuration
    #[must_use]
    pub fn client_options(&self) -> ClientOptions {
        ClientOptions {
            base_url: self.api.base_url.clone(),
            model_id: self.api.model_id.clone(),
            timeout: self.api.timeout,
        }
    }

    /// Path of the durable cache database
    #[must_use]
    pub fn db_path(&self) -> PathBuf {
        crate::db::default_db_path(&self.cache.data_dir)
    }
}

/// Filter out blank and placeholder credentials
///
/// Returns the trimmed credential if it looks real.
#[must_use]
pub fn usable_credential(raw: String) -> Option<String> {
    let key = raw.trim();
    let lower = key.to_ascii_lowercase();

    let placeholder = key.is_empty()
        || matches!(lower.as_str(), "your_api_key_here" | "your-api-key" | "changeme")
        || lower.starts_with("your_")
        || lower.starts_with("your-")
        || lower.starts_with('<')
        || lower.starts_with("xxx");

    if placeholder { None } else { Some(key.to_string()) }
}

fn default_data_dir() -> PathBuf {
    directories::BaseDirs::new().map_or_else(
        || PathBuf::from(".local/share/spelling-voice"),
        |d| d.data_dir().join("spelling-voice"),
    )
}

fn days(n: u32) -> Duration {
    Duration::from_secs(u64::from(n) * 24 * 60 * 60)
}

fn parse_setting<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("invalid value for {name}: {value}")))
}

fn parse_flag(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(Error::Config(format!("invalid value for {name}: {value}"))),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn resolve(file: &str, vars: &[(&str, &str)]) -> Result<Config> {
        let fc: ConfigFile = toml::from_str(file).unwrap();
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        Config::resolve(fc, |name| vars.get(name).cloned())
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = resolve("", &[]).unwrap();
        assert!(!config.has_credential());
        assert_eq!(config.voice, "Alice");
        assert_eq!(config.style, SpeechStyle::Normal);
        assert_eq!(config.api.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.api.model_id, DEFAULT_MODEL);
        assert_eq!(config.api.timeout, DEFAULT_TIMEOUT);
        assert!(config.cache.persist);
        assert_eq!(config.cache.max_age, DEFAULT_MAX_AGE);
        assert!(config.db_path().ends_with("audio-cache.db"));
    }

    #[test]
    fn test_env_overrides_file() {
        let config = resolve(
            "[voice]\nname = \"Brian\"\nstyle = \"slow\"\n[api]\nkey = \"file-key-123\"",
            &[("SPELLING_VOICE_VOICE", "Lily"), (API_KEY_ENV, "env-key-456")],
        )
        .unwrap();

        assert_eq!(config.voice, "Lily");
        assert_eq!(config.style, SpeechStyle::Slow);
        assert_eq!(config.api_key().unwrap().expose_secret(), "env-key-456");
    }

    #[test]
    fn test_placeholder_credentials_are_missing() {
        let placeholders = [
            "",
            "   ",
            "your_api_key_here",
            "your-api-key",
            "changeme",
            "xxxxxxxx",
            "<api key>",
            "YOUR_KEY",
        ];
        for raw in placeholders {
            assert_eq!(usable_credential(raw.to_string()), None, "{raw:?}");
        }
        assert_eq!(
            usable_credential(" sk_live_abc ".to_string()).as_deref(),
            Some("sk_live_abc")
        );

        let config = resolve("", &[(API_KEY_ENV, "your_api_key_here")]).unwrap();
        assert!(!config.has_credential());
    }

    #[test]
    fn test_cache_settings() {
        let config = resolve(
            "[cache]\ndata_dir = \"/tmp/sv\"\nmax_age_days = 3",
            &[("SPELLING_VOICE_PERSIST", "off")],
        )
        .unwrap();

        assert!(!config.cache.persist);
        assert_eq!(config.cache.max_age, Duration::from_secs(3 * 24 * 60 * 60));
        assert_eq!(config.db_path(), PathBuf::from("/tmp/sv/audio-cache.db"));
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        assert!(matches!(
            resolve("", &[("SPELLING_VOICE_STYLE", "fast")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            resolve("", &[("SPELLING_VOICE_CACHE_DAYS", "soon")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            resolve("", &[("SPELLING_VOICE_TIMEOUT_SECS", "0")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            resolve("", &[("SPELLING_VOICE_PERSIST", "maybe")]),
            Err(Error::Config(_))
        ));
    }
}
