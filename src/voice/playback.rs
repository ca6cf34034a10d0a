//! Audio playback to speakers or files

use std::io::Cursor;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{SampleRate, StreamConfig};
use sha2::{Digest, Sha256};

use crate::cache::AudioClip;
use crate::{Error, Result};

/// Destination for played clips
#[async_trait]
pub trait AudioSink: Send + Sync {
    /// Play one clip to completion
    ///
    /// # Errors
    ///
    /// Returns `Playback` if the clip cannot be decoded or output
    async fn play(&self, clip: &AudioClip) -> Result<()>;
}

/// Decoded mono PCM
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

/// Plays clips on the default output device
#[derive(Debug, Default)]
pub struct SpeakerSink;

impl SpeakerSink {
    /// Create a speaker sink; the device is opened per clip
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioSink for SpeakerSink {
    async fn play(&self, clip: &AudioClip) -> Result<()> {
        let audio = decode_mp3(clip.bytes())?;
        tokio::task::spawn_blocking(move || play_samples_blocking(&audio))
            .await
            .map_err(|e| Error::Playback(format!("playback task failed: {e}")))?
    }
}

/// Open an output stream at `sample_rate`, preferring mono
fn output_config(device: &cpal::Device, sample_rate: u32) -> Result<StreamConfig> {
    let rate = SampleRate(sample_rate);
    let supports = |channels: u16| {
        device
            .supported_output_configs()
            .ok()?
            .find(|c| {
                c.channels() == channels
                    && c.min_sample_rate() <= rate
                    && c.max_sample_rate() >= rate
            })
    };

    let supported = supports(1)
        .or_else(|| supports(2))
        .ok_or_else(|| Error::Playback(format!("no output config supports {sample_rate} Hz")))?;

    Ok(supported.with_sample_rate(rate).config())
}

/// Play samples in a blocking manner
fn play_samples_blocking(audio: &DecodedAudio) -> Result<()> {
    if audio.samples.is_empty() {
        return Ok(());
    }

    let host = cpal::default_host();
    let device = host
        .default_output_device()
        .ok_or_else(|| Error::Playback("no output device available".to_string()))?;

    let config = output_config(&device, audio.sample_rate)?;
    let channels = config.channels as usize;

    tracing::debug!(
        device = device.name().unwrap_or_default(),
        sample_rate = audio.sample_rate,
        channels,
        "audio playback starting"
    );

    let samples: Arc<[f32]> = audio.samples.clone().into();
    let position = Arc::new(Mutex::new(0usize));
    let finished = Arc::new(Mutex::new(false));

    let samples_clone = Arc::clone(&samples);
    let position_clone = Arc::clone(&position);
    let finished_clone = Arc::clone(&finished);

    let stream = device
        .build_output_stream(
            &config,
            move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                let mut pos = position_clone.lock().unwrap_or_else(PoisonError::into_inner);

                for frame in data.chunks_mut(channels) {
                    let sample = samples_clone.get(*pos).copied().unwrap_or_else(|| {
                        *finished_clone.lock().unwrap_or_else(PoisonError::into_inner) = true;
                        0.0
                    });

                    for out in frame.iter_mut() {
                        *out = sample;
                    }

                    if *pos < samples_clone.len() {
                        *pos += 1;
                    }
                }
            },
            |err| {
                tracing::error!(error = %err, "audio playback error");
            },
            None,
        )
        .map_err(|e| Error::Playback(e.to_string()))?;

    stream.play().map_err(|e| Error::Playback(e.to_string()))?;

    // Poll for completion with timeout
    let duration_ms = (samples.len() as u64 * 1000) / u64::from(audio.sample_rate);
    let timeout = Duration::from_millis(duration_ms + 500);
    let start = Instant::now();

    while !*finished.lock().unwrap_or_else(PoisonError::into_inner) {
        if start.elapsed() > timeout {
            break;
        }
        std::thread::sleep(Duration::from_millis(50));
    }

    // Small delay to ensure audio finishes
    std::thread::sleep(Duration::from_millis(100));

    drop(stream);
    tracing::debug!(samples = samples.len(), "playback complete");

    Ok(())
}

/// Decode MP3 bytes to mono f32 samples
///
/// # Errors
///
/// Returns `Playback` if the data is not decodable MP3
pub fn decode_mp3(mp3_data: &[u8]) -> Result<DecodedAudio> {
    let mut decoder = minimp3::Decoder::new(Cursor::new(mp3_data));
    let mut samples = Vec::new();
    let mut sample_rate = 0u32;

    loop {
        match decoder.next_frame() {
            Ok(frame) => {
                sample_rate = u32::try_from(frame.sample_rate).unwrap_or(sample_rate);

                if frame.channels == 2 {
                    // Stereo: average channels
                    samples.extend(frame.data.chunks(2).map(|chunk| {
                        let left = f32::from(chunk[0]) / 32768.0;
                        let right = f32::from(chunk.get(1).copied().unwrap_or(chunk[0])) / 32768.0;
                        f32::midpoint(left, right)
                    }));
                } else {
                    samples.extend(frame.data.iter().map(|&s| f32::from(s) / 32768.0));
                }
            }
            Err(minimp3::Error::Eof) => break,
            Err(e) => return Err(Error::Playback(format!("MP3 decode error: {e}"))),
        }
    }

    if samples.is_empty() || sample_rate == 0 {
        return Err(Error::Playback("no audio frames in clip".to_string()));
    }

    Ok(DecodedAudio { samples, sample_rate })
}

/// Writes clips to a directory instead of playing them
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    /// Write clips under `dir`, created on first write
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path a clip is written to: content hash, so repeats overwrite
    #[must_use]
    pub fn path_for(&self, clip: &AudioClip) -> PathBuf {
        let digest = Sha256::digest(clip.bytes());
        self.dir.join(format!("{}.mp3", hex::encode(&digest[..8])))
    }
}

#[async_trait]
impl AudioSink for FileSink {
    async fn play(&self, clip: &AudioClip) -> Result<()> {
        let path = self.path_for(clip);

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| Error::Playback(format!("cannot create {}: {e}", self.dir.display())))?;
        tokio::fs::write(&path, clip.bytes())
            .await
            .map_err(|e| Error::Playback(format!("cannot write {}: {e}", path.display())))?;

        tracing::info!(path = %path.display(), bytes = clip.len(), "clip written");
        Ok(())
    }
}
