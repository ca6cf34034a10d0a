//! Text-to-speech (TTS) synthesis over the ElevenLabs HTTP API

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use clap::ValueEnum;
use reqwest::header::ACCEPT;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use super::catalog;
use crate::config::usable_credential;
use crate::{Error, Result};

/// Default API root
pub const DEFAULT_BASE_URL: &str = "https://api.elevenlabs.io/v1";

/// Default synthesis model
pub const DEFAULT_MODEL: &str = "eleven_multilingual_v2";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Numeric synthesis parameters sent with every request
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
    pub speed: f32,
}

/// Named speaking-style profile
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpeechStyle {
    /// Conversational pace
    #[default]
    Normal,
    /// Slightly slower, steadier delivery
    Slow,
    /// Slowest supported pace, for letters and sound segments
    #[value(name = "very_slow", alias = "very-slow")]
    VerySlow,
}

impl SpeechStyle {
    /// Identifier embedded in cache keys
    #[must_use]
    pub const fn id(self) -> &'static str {
        match self {
            Self::Normal => "normal",
            Self::Slow => "slow",
            Self::VerySlow => "very_slow",
        }
    }

    /// Parse a style identifier (`normal`, `slow`, `very_slow`)
    #[must_use]
    pub fn from_id(id: &str) -> Option<Self> {
        match id.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "normal" => Some(Self::Normal),
            "slow" => Some(Self::Slow),
            "very_slow" => Some(Self::VerySlow),
            _ => None,
        }
    }

    /// Synthesis parameters for this style
    #[must_use]
    pub const fn settings(self) -> VoiceSettings {
        match self {
            Self::Normal => VoiceSettings {
                stability: 0.5,
                similarity_boost: 0.75,
                style: 0.0,
                use_speaker_boost: true,
                speed: 1.0,
            },
            Self::Slow => VoiceSettings {
                stability: 0.6,
                similarity_boost: 0.8,
                style: 0.0,
                use_speaker_boost: true,
                speed: 0.85,
            },
            Self::VerySlow => VoiceSettings {
                stability: 0.75,
                similarity_boost: 0.85,
                style: 0.0,
                use_speaker_boost: true,
                speed: 0.7,
            },
        }
    }
}

impl std::fmt::Display for SpeechStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.id())
    }
}

/// Turns text into an encoded audio payload
///
/// Implementations do not cache; that is the caller's job.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Whether a usable credential is configured
    fn has_credential(&self) -> bool;

    /// Synthesize `text` with the given voice and parameters
    ///
    /// # Errors
    ///
    /// Returns `MissingCredential` before any network call if no credential is
    /// configured, or `Synthesis` if the request fails
    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        settings: &VoiceSettings,
    ) -> Result<Vec<u8>>;
}

/// Voice descriptor from the `/voices` endpoint
#[derive(Debug, Clone, Deserialize)]
pub struct VoiceDescriptor {
    pub voice_id: String,
    pub name: String,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub labels: Option<HashMap<String, String>>,
    #[serde(default)]
    pub preview_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct VoicesResponse {
    voices: Vec<VoiceDescriptor>,
}

/// Connection options for [`ElevenLabsClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    pub model_id: String,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model_id: DEFAULT_MODEL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// ElevenLabs speech client
pub struct ElevenLabsClient {
    client: reqwest::Client,
    api_key: Option<SecretString>,
    base_url: String,
    model: String,
}

impl ElevenLabsClient {
    /// Create a client against the public API
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn new(api_key: Option<SecretString>) -> Result<Self> {
        Self::with_options(api_key, ClientOptions::default())
    }

    /// Create a client with a custom endpoint, model or timeout
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built
    pub fn with_options(api_key: Option<SecretString>, options: ClientOptions) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()
            .map_err(|e| Error::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_key: api_key
                .and_then(|k| usable_credential(k.expose_secret().to_owned()))
                .map(SecretString::from),
            base_url: options.base_url.trim_end_matches('/').to_string(),
            model: options.model_id,
        })
    }

    /// Model id sent with synthesis requests
    #[must_use]
    pub fn model(&self) -> &str {
        &self.model
    }

    fn api_key(&self) -> Result<&str> {
        self.api_key
            .as_ref()
            .map(|k| k.expose_secret())
            .ok_or(Error::MissingCredential)
    }

    /// List the voices available to this account
    ///
    /// # Errors
    ///
    /// Returns `MissingCredential` without a credential, or `Synthesis` if the
    /// request fails
    pub async fn list_voices(&self) -> Result<Vec<VoiceDescriptor>> {
        let api_key = self.api_key()?;
        let url = format!("{}/voices", self.base_url);

        let response = self
            .client
            .get(&url)
            .header("xi-api-key", api_key)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let voices: VoicesResponse = response.json().await?;
        Ok(voices.voices)
    }
}

#[async_trait]
impl SpeechSynthesizer for ElevenLabsClient {
    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        settings: &VoiceSettings,
    ) -> Result<Vec<u8>> {
        #[derive(serde::Serialize)]
        struct ElevenLabsRequest<'a> {
            text: &'a str,
            model_id: &'a str,
            voice_settings: &'a VoiceSettings,
        }

        let api_key = self.api_key()?;

        let voice_id = catalog::resolve_voice_id(voice_id);
        let url = format!(
            "{}/text-to-speech/{}",
            self.base_url,
            urlencoding::encode(voice_id)
        );

        let request = ElevenLabsRequest {
            text,
            model_id: &self.model,
            voice_settings: settings,
        };

        tracing::debug!(
            voice_id,
            model = %self.model,
            chars = text.len(),
            "requesting speech synthesis"
        );

        let response = self
            .client
            .post(&url)
            .header("xi-api-key", api_key)
            .header(ACCEPT, "audio/mpeg")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Synthesis {
                status: Some(status.as_u16()),
                message: body,
            });
        }

        let audio = response.bytes().await?;
        if audio.is_empty() {
            return Err(Error::Synthesis {
                status: Some(status.as_u16()),
                message: "empty audio payload".to_string(),
            });
        }

        tracing::debug!(bytes = audio.len(), "speech synthesized");
        Ok(audio.to_vec())
    }
}
