//! spelling-voice - pronunciation audio for spelling practice
//!
//! This library turns words into spoken audio for a spelling-practice app:
//! - Text formatting per pronunciation mode (word, spelling, letters, sounds)
//! - Speech synthesis over the `ElevenLabs` HTTP API
//! - A two-tier audio cache (in-memory session + durable `SQLite` store)
//! - Playback to speakers or files
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    Pronouncer                        │
//! │   pronounce │ spelling │ letters │ phonetic         │
//! └────────────────────┬────────────────────────────────┘
//!                      │ CacheKey
//! ┌────────────────────▼────────────────────────────────┐
//! │   SessionCache  ─miss─▶  DurableCache (SQLite)       │
//! └────────────────────┬────────────────────────────────┘
//!                      │ double miss
//! ┌────────────────────▼────────────────────────────────┐
//! │   ElevenLabs TTS  ─▶  AudioSink (speakers / files)   │
//! └─────────────────────────────────────────────────────┘
//! ```

pub mod cache;
pub mod config;
pub mod db;
pub mod error;
pub mod pronounce;
pub mod voice;
pub mod words;

pub use cache::{AudioClip, DurableCache, SessionCache};
pub use config::Config;
pub use db::{DbPool, SqliteAudioStore};
pub use error::{Error, Result};
pub use pronounce::{
    CacheKey, ClipSource, PronouncerDefaults, Pronouncer, PronunciationMode, PronunciationRequest,
};
pub use voice::{AudioSink, ElevenLabsClient, SpeechStyle, SpeechSynthesizer, VoiceSettings};
pub use words::{WordEntry, WordSet, load_word_set};
