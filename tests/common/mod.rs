//! Shared test utilities

#![allow(dead_code)]

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use spelling_voice::cache::{AudioRecord, AudioStore, RecordStamp};
use spelling_voice::{
    AudioClip, AudioSink, DurableCache, Error, PronouncerDefaults, Pronouncer, Result,
    SpeechSynthesizer, SqliteAudioStore, VoiceSettings,
};

/// Synthesizer that counts calls and returns `"mp3:{text}"`
#[derive(Default)]
pub struct CountingSynthesizer {
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, String, VoiceSettings)>>,
    no_credential: bool,
    fail_with: Option<u16>,
    delay: Option<Duration>,
}

impl CountingSynthesizer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn without_credential() -> Self {
        Self {
            no_credential: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn failing(status: u16) -> Self {
        Self {
            fail_with: Some(status),
            ..Self::default()
        }
    }

    /// Hold each synthesis for `delay` so concurrent callers overlap
    #[must_use]
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<(String, String, VoiceSettings)> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechSynthesizer for CountingSynthesizer {
    fn has_credential(&self) -> bool {
        !self.no_credential
    }

    async fn synthesize(
        &self,
        text: &str,
        voice_id: &str,
        settings: &VoiceSettings,
    ) -> Result<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests
            .lock()
            .unwrap()
            .push((text.to_string(), voice_id.to_string(), *settings));

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(status) = self.fail_with {
            return Err(Error::Synthesis {
                status: Some(status),
                message: "quota exceeded".to_string(),
            });
        }

        Ok(format!("mp3:{text}").into_bytes())
    }
}

/// Sink that records every clip it is asked to play
#[derive(Default)]
pub struct RecordingSink {
    played: Mutex<Vec<AudioClip>>,
    fail: bool,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn played(&self) -> Vec<AudioClip> {
        self.played.lock().unwrap().clone()
    }
}

#[async_trait]
impl AudioSink for RecordingSink {
    async fn play(&self, clip: &AudioClip) -> Result<()> {
        if self.fail {
            return Err(Error::Playback("output device refused to play".to_string()));
        }
        self.played.lock().unwrap().push(clip.clone());
        Ok(())
    }
}

/// Store wrapper that counts calls and can be told to fail
pub struct CountingStore {
    inner: SqliteAudioStore,
    opens: AtomicUsize,
    gets: AtomicUsize,
    puts: AtomicUsize,
    fail_open: bool,
    fail_put: bool,
}

impl CountingStore {
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: SqliteAudioStore::in_memory(),
            opens: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            puts: AtomicUsize::new(0),
            fail_open: false,
            fail_put: false,
        }
    }

    #[must_use]
    pub fn failing_open() -> Self {
        Self {
            fail_open: true,
            ..Self::new()
        }
    }

    #[must_use]
    pub fn failing_put() -> Self {
        Self {
            fail_put: true,
            ..Self::new()
        }
    }

    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn puts(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AudioStore for CountingStore {
    async fn open(&self) -> Result<()> {
        self.opens.fetch_add(1, Ordering::SeqCst);
        // Widen the window in which concurrent openers could race
        tokio::time::sleep(Duration::from_millis(20)).await;
        if self.fail_open {
            return Err(Error::Database("storage quota unavailable".to_string()));
        }
        self.inner.open().await
    }

    async fn get(&self, id: &str) -> Result<Option<AudioRecord>> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.inner.get(id).await
    }

    async fn put(&self, record: &AudioRecord) -> Result<()> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if self.fail_put {
            return Err(Error::Database("disk full".to_string()));
        }
        self.inner.put(record).await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        self.inner.delete(id).await
    }

    async fn scan(&self) -> Result<Vec<RecordStamp>> {
        self.inner.scan().await
    }
}

/// A pronouncer wired to test doubles
pub struct Harness {
    pub synth: Arc<CountingSynthesizer>,
    pub store: Arc<CountingStore>,
    pub durable: Arc<DurableCache>,
    pub sink: Arc<RecordingSink>,
    pub pronouncer: Pronouncer,
}

impl Harness {
    #[must_use]
    pub fn new() -> Self {
        Self::with(CountingSynthesizer::new(), CountingStore::new(), RecordingSink::new())
    }

    #[must_use]
    pub fn with(synth: CountingSynthesizer, store: CountingStore, sink: RecordingSink) -> Self {
        let synth = Arc::new(synth);
        let store = Arc::new(store);
        let durable = Arc::new(DurableCache::new(store.clone()));
        let sink = Arc::new(sink);
        let pronouncer = Pronouncer::new(
            synth.clone(),
            durable.clone(),
            sink.clone(),
            PronouncerDefaults::default(),
        );

        Self {
            synth,
            store,
            durable,
            sink,
            pronouncer,
        }
    }

    /// A second pronouncer sharing this harness's durable cache, as after a restart
    #[must_use]
    pub fn restarted(&self) -> (Arc<CountingSynthesizer>, Pronouncer) {
        let synth = Arc::new(CountingSynthesizer::new());
        let pronouncer = Pronouncer::new(
            synth.clone(),
            self.durable.clone(),
            Arc::new(RecordingSink::new()),
            PronouncerDefaults::default(),
        );
        (synth, pronouncer)
    }
}

/// Poll `check` until it holds or a second passes
pub async fn wait_for<F, Fut>(mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    for _ in 0..100 {
        if check().await {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}
