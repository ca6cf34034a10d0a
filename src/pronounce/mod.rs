//! Pronunciation orchestration
//!
//! Turns a word into played audio with as few synthesis calls as possible:
//!
//! ```text
//! request ─▶ format ─▶ CacheKey ─▶ SessionCache ─hit─▶ play
//!                                      │ miss
//!                                      ▼
//!                                 DurableCache ─hit─▶ promote ─▶ play
//!                                      │ miss
//!                                      ▼
//!                              SpeechSynthesizer ─▶ session + detached persist ─▶ play
//! ```

mod format;
mod key;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use tokio::task::JoinHandle;

pub use format::{PronunciationMode, normalize};
pub use key::CacheKey;

use crate::cache::{AudioClip, DurableCache, SessionCache};
use crate::voice::{AudioSink, SpeechStyle, SpeechSynthesizer, catalog};
use crate::{Error, Result};

/// One pronunciation to produce; never stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PronunciationRequest {
    pub text: String,
    pub mode: PronunciationMode,
    pub voice: String,
    pub style: SpeechStyle,
}

impl PronunciationRequest {
    /// Request with explicit mode, voice and style
    #[must_use]
    pub fn new(
        text: impl Into<String>,
        mode: PronunciationMode,
        voice: impl Into<String>,
        style: SpeechStyle,
    ) -> Self {
        Self {
            text: text.into(),
            mode,
            voice: voice.into(),
            style,
        }
    }

    /// Plain word with the default voice and style
    #[must_use]
    pub fn word(text: impl Into<String>) -> Self {
        Self::with_defaults(text, PronunciationMode::Word)
    }

    /// "The word is spelled ..." with the default voice and style
    #[must_use]
    pub fn spelling(text: impl Into<String>) -> Self {
        Self::with_defaults(text, PronunciationMode::Spelling)
    }

    /// Letter-by-letter spelling with the default voice and style
    #[must_use]
    pub fn letter_by_letter(text: impl Into<String>) -> Self {
        Self::with_defaults(text, PronunciationMode::LetterByLetter)
    }

    /// Phonetic breakdown with the default voice and style
    #[must_use]
    pub fn phonetic_breakdown(text: impl Into<String>) -> Self {
        Self::with_defaults(text, PronunciationMode::PhoneticBreakdown)
    }

    fn with_defaults(text: impl Into<String>, mode: PronunciationMode) -> Self {
        let defaults = PronouncerDefaults::default();
        Self::new(text, mode, defaults.voice, defaults.style)
    }

    /// Override the voice
    #[must_use]
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    /// Override the style
    #[must_use]
    pub fn with_style(mut self, style: SpeechStyle) -> Self {
        self.style = style;
        self
    }

    /// Formatted utterance and its cache key
    ///
    /// The key names catalog voices by their catalog name, whichever spelling
    /// or id the request used.
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if the text formats to nothing
    pub fn resolve(&self) -> Result<(String, CacheKey)> {
        let text = self.mode.format(&self.text)?;
        let voice = catalog::canonical_voice(&self.voice);
        let key = CacheKey::derive(&text, voice, self.style.id());
        Ok((text, key))
    }
}

/// Voice and style used by the single-argument entry points
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PronouncerDefaults {
    pub voice: String,
    pub style: SpeechStyle,
}

impl Default for PronouncerDefaults {
    fn default() -> Self {
        Self {
            voice: "Alice".to_string(),
            style: SpeechStyle::Normal,
        }
    }
}

/// Per-key gates so concurrent first requests share one synthesis
#[derive(Default)]
struct InFlight {
    gates: Mutex<HashMap<CacheKey, Weak<tokio::sync::Mutex<()>>>>,
}

impl InFlight {
    fn gate(&self, key: &CacheKey) -> Arc<tokio::sync::Mutex<()>> {
        let mut gates = self.gates.lock().unwrap_or_else(PoisonError::into_inner);
        gates.retain(|_, gate| gate.strong_count() > 0);

        if let Some(gate) = gates.get(key).and_then(Weak::upgrade) {
            return gate;
        }

        let gate = Arc::new(tokio::sync::Mutex::new(()));
        gates.insert(key.clone(), Arc::downgrade(&gate));
        gate
    }
}

/// Where a clip came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipSource {
    Session,
    Durable,
    Synthesized,
}

/// Pronunciation service: owns the session cache and coordinates the tiers
pub struct Pronouncer {
    synthesizer: Arc<dyn SpeechSynthesizer>,
    session: SessionCache,
    durable: Arc<DurableCache>,
    sink: Arc<dyn AudioSink>,
    defaults: PronouncerDefaults,
    in_flight: InFlight,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

impl Pronouncer {
    /// Create a pronouncer with an empty session cache
    #[must_use]
    pub fn new(
        synthesizer: Arc<dyn SpeechSynthesizer>,
        durable: Arc<DurableCache>,
        sink: Arc<dyn AudioSink>,
        defaults: PronouncerDefaults,
    ) -> Self {
        Self {
            synthesizer,
            session: SessionCache::new(),
            durable,
            sink,
            defaults,
            in_flight: InFlight::default(),
            pending: Mutex::new(Vec::new()),
        }
    }

    /// Session cache for this instance
    #[must_use]
    pub const fn session_cache(&self) -> &SessionCache {
        &self.session
    }

    /// Durable cache shared with this instance
    #[must_use]
    pub const fn durable(&self) -> &Arc<DurableCache> {
        &self.durable
    }

    /// Defaults used by the single-argument entry points
    #[must_use]
    pub const fn defaults(&self) -> &PronouncerDefaults {
        &self.defaults
    }

    /// Build a request using the default voice and style
    #[must_use]
    pub fn request(&self, text: &str, mode: PronunciationMode) -> PronunciationRequest {
        PronunciationRequest::new(text, mode, self.defaults.voice.clone(), self.defaults.style)
    }

    /// Say a word with natural intonation
    ///
    /// # Errors
    ///
    /// See [`Pronouncer::speak`]
    pub async fn pronounce(&self, word: &str) -> Result<AudioClip> {
        self.speak(&self.request(word, PronunciationMode::Word)).await
    }

    /// Say "The word is spelled ..."
    ///
    /// # Errors
    ///
    /// See [`Pronouncer::speak`]
    pub async fn pronounce_spelling(&self, word: &str) -> Result<AudioClip> {
        self.speak(&self.request(word, PronunciationMode::Spelling)).await
    }

    /// Spell a word one letter at a time
    ///
    /// # Errors
    ///
    /// `InvalidInput` for input without letters; otherwise see [`Pronouncer::speak`]
    pub async fn pronounce_letter_by_letter(&self, word: &str) -> Result<AudioClip> {
        self.speak(&self.request(word, PronunciationMode::LetterByLetter)).await
    }

    /// Say phoneme segments with pauses between them
    ///
    /// # Errors
    ///
    /// `InvalidInput` for blank input; otherwise see [`Pronouncer::speak`]
    pub async fn pronounce_phonetic_breakdown(&self, breakdown: &str) -> Result<AudioClip> {
        self.speak(&self.request(breakdown, PronunciationMode::PhoneticBreakdown)).await
    }

    /// Resolve a request to audio and play it
    ///
    /// # Errors
    ///
    /// - `MissingCredential` if no credential is configured
    /// - `InvalidInput` if the text formats to nothing
    /// - `Synthesis` if the speech service fails on a cache miss
    /// - `Playback` if the audio cannot be played
    pub async fn speak(&self, request: &PronunciationRequest) -> Result<AudioClip> {
        let (clip, _) = self.fetch(request).await?;
        self.sink.play(&clip).await?;
        Ok(clip)
    }

    /// Resolve a request to audio without playing it
    ///
    /// # Errors
    ///
    /// Same as [`Pronouncer::speak`] minus `Playback`
    pub async fn fetch(&self, request: &PronunciationRequest) -> Result<(AudioClip, ClipSource)> {
        if !self.synthesizer.has_credential() {
            return Err(Error::MissingCredential);
        }

        let (text, key) = request.resolve()?;

        if let Some(clip) = self.session.get(&key) {
            tracing::debug!(%key, "session cache hit");
            return Ok((clip, ClipSource::Session));
        }

        let gate = self.in_flight.gate(&key);
        let _guard = gate.lock().await;

        // Another caller may have filled the entry while we waited
        if let Some(clip) = self.session.get(&key) {
            tracing::debug!(%key, "session cache filled by concurrent request");
            return Ok((clip, ClipSource::Session));
        }

        if let Some(payload) = self.durable.get(&key).await {
            tracing::debug!(%key, "durable cache hit");
            let clip = AudioClip::new(payload);
            self.session.set(key, clip.clone());
            return Ok((clip, ClipSource::Durable));
        }

        tracing::debug!(%key, mode = %request.mode, "cache miss, synthesizing");
        let payload = self
            .synthesizer
            .synthesize(&text, &request.voice, &request.style.settings())
            .await?;

        let clip = AudioClip::new(payload);
        self.session.set(key.clone(), clip.clone());
        self.persist_detached(key, clip.clone());

        Ok((clip, ClipSource::Synthesized))
    }

    /// Write a clip to the durable cache without blocking the caller
    fn persist_detached(&self, key: CacheKey, clip: AudioClip) {
        let durable = Arc::clone(&self.durable);
        let handle = tokio::spawn(async move {
            match durable.set(&key, clip.bytes()).await {
                Ok(()) => tracing::debug!(%key, bytes = clip.len(), "audio persisted"),
                Err(Error::StoreUnavailable) => {}
                Err(e) => tracing::warn!(
                    %key,
                    error = %e,
                    "failed to persist audio, keeping session copy only"
                ),
            }
        });

        let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
        pending.retain(|h| !h.is_finished());
        pending.push(handle);
    }

    /// Wait for persistence writes started so far
    ///
    /// Callers never need this for correctness; a process about to exit uses
    /// it so the runtime does not cancel writes still in flight.
    pub async fn flush(&self) {
        let handles = {
            let mut pending = self.pending.lock().unwrap_or_else(PoisonError::into_inner);
            std::mem::take(&mut *pending)
        };
        for handle in handles {
            if let Err(e) = handle.await {
                tracing::warn!(error = %e, "persistence task failed");
            }
        }
    }
}
