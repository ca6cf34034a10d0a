//! Pronunciation pipeline tests

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{CountingStore, CountingSynthesizer, Harness, RecordingSink, wait_for};
use spelling_voice::cache::{AudioStore, StoreState};
use spelling_voice::{CacheKey, ClipSource, Error, PronunciationRequest, SpeechStyle};

#[tokio::test]
async fn test_oxygen_end_to_end() {
    let h = Harness::new();

    let first = h.pronouncer.pronounce("oxygen").await.unwrap();
    assert_eq!(h.synth.calls(), 1);

    let (text, voice, settings) = h.synth.requests().remove(0);
    assert_eq!(text, "oxygen.");
    assert_eq!(voice, "Alice");
    assert_eq!(settings, SpeechStyle::Normal.settings());

    let key = CacheKey::derive("oxygen.", "Alice", "normal");
    assert_eq!(key.storage_id(), "oxygen.-Alice-normal");
    assert!(h.pronouncer.session_cache().contains(&key));

    h.pronouncer.flush().await;
    let record = h.store.get("oxygen.-Alice-normal").await.unwrap();
    assert!(record.is_some());

    let second = h.pronouncer.pronounce("oxygen").await.unwrap();
    assert_eq!(h.synth.calls(), 1);
    assert!(first.ptr_eq(&second));

    let played = h.sink.played();
    assert_eq!(played.len(), 2);
    assert_eq!(played[0].bytes(), b"mp3:oxygen.");
}

#[tokio::test]
async fn test_session_hit_skips_store_and_network() {
    let h = Harness::new();

    h.pronouncer.pronounce("cat").await.unwrap();
    h.pronouncer.flush().await;
    let gets = h.store.gets();
    let calls = h.synth.calls();

    // Trailing whitespace formats to the same utterance
    let (_, source) = h
        .pronouncer
        .fetch(&PronunciationRequest::word("cat  "))
        .await
        .unwrap();

    assert_eq!(source, ClipSource::Session);
    assert_eq!(h.store.gets(), gets);
    assert_eq!(h.synth.calls(), calls);
}

#[tokio::test]
async fn test_miss_writes_through_to_both_tiers() {
    let h = Harness::new();
    let request = PronunciationRequest::letter_by_letter("letter");

    let (clip, source) = h.pronouncer.fetch(&request).await.unwrap();
    assert_eq!(source, ClipSource::Synthesized);
    assert_eq!(clip.bytes(), b"mp3:l . e . t . t . e . r");

    let (_, key) = request.resolve().unwrap();
    assert!(h.pronouncer.session_cache().contains(&key));

    h.pronouncer.flush().await;
    assert_eq!(h.durable.get(&key).await.as_deref(), Some(clip.bytes()));
}

#[tokio::test]
async fn test_durable_hit_is_promoted_after_restart() {
    let h = Harness::new();
    h.pronouncer.pronounce_spelling("rhythm").await.unwrap();
    h.pronouncer.flush().await;

    let (synth, restarted) = h.restarted();
    let request = PronunciationRequest::spelling("rhythm");

    let (clip, source) = restarted.fetch(&request).await.unwrap();
    assert_eq!(source, ClipSource::Durable);
    assert_eq!(clip.bytes(), b"mp3:The word is spelled rhythm");
    assert_eq!(synth.calls(), 0);

    let (_, source) = restarted.fetch(&request).await.unwrap();
    assert_eq!(source, ClipSource::Session);
}

#[tokio::test]
async fn test_failing_store_write_does_not_fail_pronunciation() {
    let h = Harness::with(
        CountingSynthesizer::new(),
        CountingStore::failing_put(),
        RecordingSink::new(),
    );

    let clip = h.pronouncer.pronounce("necessary").await.unwrap();
    assert_eq!(h.sink.played().len(), 1);
    let store = Arc::clone(&h.store);
    assert!(
        wait_for(|| {
            let store = Arc::clone(&store);
            async move { store.puts() == 1 }
        })
        .await
    );

    // Still served from the session tier
    let again = h.pronouncer.pronounce("necessary").await.unwrap();
    assert!(clip.ptr_eq(&again));
    assert_eq!(h.synth.calls(), 1);
}

#[tokio::test]
async fn test_unavailable_store_degrades_to_direct_synthesis() {
    let h = Harness::with(
        CountingSynthesizer::new(),
        CountingStore::failing_open(),
        RecordingSink::new(),
    );

    h.pronouncer.pronounce("island").await.unwrap();
    h.pronouncer.pronounce("castle").await.unwrap();
    h.pronouncer.flush().await;

    assert_eq!(h.durable.open().await, StoreState::Unavailable);
    assert_eq!(h.store.opens(), 1);
    assert_eq!(h.store.gets(), 0);
    assert_eq!(h.store.puts(), 0);
    assert_eq!(h.sink.played().len(), 2);
}

#[tokio::test]
async fn test_concurrent_opens_share_one_attempt() {
    let h = Harness::new();

    let (a, b, c) = tokio::join!(h.durable.open(), h.durable.open(), h.durable.open());

    assert_eq!([a, b, c], [StoreState::Ready; 3]);
    assert_eq!(h.store.opens(), 1);
}

#[tokio::test]
async fn test_empty_input_is_rejected_without_io() {
    let h = Harness::new();

    let letters = h.pronouncer.pronounce_letter_by_letter("").await;
    assert!(matches!(letters, Err(Error::InvalidInput(_))));

    let phonetic = h.pronouncer.pronounce_phonetic_breakdown("   ").await;
    assert!(matches!(phonetic, Err(Error::InvalidInput(_))));

    assert_eq!(h.synth.calls(), 0);
    assert_eq!(h.store.opens(), 0);
    assert!(h.sink.played().is_empty());
}

#[tokio::test]
async fn test_missing_credential_fails_fast() {
    let h = Harness::with(
        CountingSynthesizer::without_credential(),
        CountingStore::new(),
        RecordingSink::new(),
    );

    for result in [
        h.pronouncer.pronounce("cat").await,
        h.pronouncer.pronounce_spelling("cat").await,
        h.pronouncer.pronounce_letter_by_letter("cat").await,
        h.pronouncer.pronounce_phonetic_breakdown("c-a-t").await,
    ] {
        assert!(matches!(result, Err(Error::MissingCredential)));
    }

    assert_eq!(h.synth.calls(), 0);
    assert_eq!(h.store.gets(), 0);
}

#[tokio::test]
async fn test_synthesis_error_propagates_and_caches_nothing() {
    let h = Harness::with(
        CountingSynthesizer::failing(429),
        CountingStore::new(),
        RecordingSink::new(),
    );

    let result = h.pronouncer.pronounce("quota").await;
    assert!(matches!(result, Err(Error::Synthesis { status: Some(429), .. })));

    h.pronouncer.flush().await;
    assert!(h.pronouncer.session_cache().is_empty());
    assert_eq!(h.store.puts(), 0);
    assert!(h.sink.played().is_empty());
}

#[tokio::test]
async fn test_playback_error_is_surfaced_after_fetch() {
    let h = Harness::with(
        CountingSynthesizer::new(),
        CountingStore::new(),
        RecordingSink::failing(),
    );

    let result = h.pronouncer.pronounce("quiet").await;
    assert!(matches!(result, Err(Error::Playback(_))));

    // The audio was fetched and cached before playback failed
    assert_eq!(h.synth.calls(), 1);
    assert_eq!(h.pronouncer.session_cache().len(), 1);
}

#[tokio::test]
async fn test_voice_and_style_are_separate_entries() {
    let h = Harness::new();

    let normal = PronunciationRequest::word("tomato");
    let slow = normal.clone().with_style(SpeechStyle::Slow);
    let other_voice = normal.clone().with_voice("Brian");

    for request in [&normal, &slow, &other_voice] {
        h.pronouncer.speak(request).await.unwrap();
    }

    assert_eq!(h.synth.calls(), 3);
    assert_eq!(h.pronouncer.session_cache().len(), 3);

    let requests = h.synth.requests();
    assert_eq!(requests[1].2.speed, SpeechStyle::Slow.settings().speed);
    assert_eq!(requests[2].1, "Brian");
}

// Deliberate improvement over letting both callers synthesize: concurrent
// first requests for one key share a single synthesis.
#[tokio::test]
async fn test_concurrent_first_requests_share_one_synthesis() {
    let h = Harness::with(
        CountingSynthesizer::slow(Duration::from_millis(50)),
        CountingStore::new(),
        RecordingSink::new(),
    );
    let request = PronunciationRequest::word("queue");

    let (a, b) = tokio::join!(h.pronouncer.fetch(&request), h.pronouncer.fetch(&request));
    let (a, a_source) = a.unwrap();
    let (b, b_source) = b.unwrap();

    assert_eq!(h.synth.calls(), 1);
    assert!(a.ptr_eq(&b));
    assert_eq!(
        [a_source, b_source].iter().filter(|s| **s == ClipSource::Synthesized).count(),
        1
    );
}

#[tokio::test]
async fn test_concurrent_requests_for_different_keys_are_independent() {
    let h = Arc::new(Harness::with(
        CountingSynthesizer::slow(Duration::from_millis(20)),
        CountingStore::new(),
        RecordingSink::new(),
    ));

    let words = ["ant", "bee", "cow", "dog"];
    let tasks: Vec<_> = words
        .iter()
        .map(|word| {
            let h = Arc::clone(&h);
            let request = PronunciationRequest::word(*word);
            tokio::spawn(async move { h.pronouncer.fetch(&request).await.map(|(clip, _)| clip) })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    assert_eq!(h.synth.calls(), words.len());
    assert_eq!(h.pronouncer.session_cache().len(), words.len());
}

#[tokio::test]
async fn test_voice_name_case_and_id_share_one_clip() {
    let h = Harness::new();

    let (first, source) = h
        .pronouncer
        .fetch(&PronunciationRequest::word("oxygen").with_voice("alice"))
        .await
        .unwrap();
    assert_eq!(source, ClipSource::Synthesized);

    for voice in ["Alice", "Xb7hH8MSUJpSbSDYk0k2"] {
        let request = PronunciationRequest::word("oxygen").with_voice(voice);
        let (clip, source) = h.pronouncer.fetch(&request).await.unwrap();
        assert_eq!(source, ClipSource::Session, "{voice:?}");
        assert!(first.ptr_eq(&clip));
    }

    assert_eq!(h.synth.calls(), 1);
    h.pronouncer.flush().await;
    assert!(h.store.get("oxygen.-Alice-normal").await.unwrap().is_some());
}
