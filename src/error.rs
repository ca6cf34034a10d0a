//! Error types for spelling-voice

use thiserror::Error;

/// Result type alias for spelling-voice operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while producing or playing a pronunciation
#[derive(Debug, Error)]
pub enum Error {
    /// No usable speech API credential is configured
    #[error("speech API key is not configured; set ELEVENLABS_API_KEY")]
    MissingCredential,

    /// Text rejected by a formatter before any I/O
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Speech endpoint returned an error status or the transport failed
    #[error("{}", synthesis_message(*status, message))]
    Synthesis {
        /// HTTP status code, `None` for transport failures
        status: Option<u16>,
        /// Response body or transport error text
        message: String,
    },

    /// Local audio output refused or failed to play a clip
    #[error("playback error: {0}")]
    Playback(String),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Database error
    #[error("database error: {0}")]
    Database(String),

    /// Durable audio store could not be opened
    #[error("durable audio store is unavailable")]
    StoreUnavailable,

    /// `SQLite` error
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("toml error: {0}")]
    Toml(#[from] toml::de::Error),
}

fn synthesis_message(status: Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("speech synthesis failed ({code}): {message}"),
        None => format!("speech synthesis failed: {message}"),
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Self::Synthesis {
            status: e.status().map(|s| s.as_u16()),
            message: e.to_string(),
        }
    }
}
