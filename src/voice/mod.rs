//! Voice module
//!
//! Speech synthesis over HTTP, the built-in voice catalog, and audio output.

pub mod catalog;
mod playback;
mod tts;

pub use playback::{AudioSink, DecodedAudio, FileSink, SpeakerSink, decode_mp3};
pub use tts::{
    ClientOptions, DEFAULT_BASE_URL, DEFAULT_MODEL, DEFAULT_TIMEOUT, ElevenLabsClient, SpeechStyle,
    SpeechSynthesizer, VoiceDescriptor, VoiceSettings,
};
