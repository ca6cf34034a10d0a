//! Built-in voice catalog
//!
//! Well-known premade voices, so callers can say "Alice" (or "alice") instead
//! of a raw voice id. Anything not listed here is passed through as an id.

use std::cmp::Ordering;

/// Metadata for a catalog voice
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogVoice {
    pub voice_id: &'static str,
    pub accent: &'static str,
    pub gender: &'static str,
}

const fn entry(voice_id: &'static str, accent: &'static str, gender: &'static str) -> CatalogVoice {
    CatalogVoice {
        voice_id,
        accent,
        gender,
    }
}

/// Sorted by name, ignoring case, for binary search
const VOICES: &[(&str, CatalogVoice)] = &[
    ("Adam", entry("pNInz6obpgDQGcFmaJgB", "american", "male")),
    ("Alice", entry("Xb7hH8MSUJpSbSDYk0k2", "british", "female")),
    ("Aria", entry("9BWtsMINqrJLrRacOk9x", "american", "female")),
    ("Bill", entry("pqHfZKP75CvOlQylNhV4", "american", "male")),
    ("Brian", entry("nPczCjzI2devNBz1zQrb", "american", "male")),
    ("Callum", entry("N2lVS1w4EtoT3dr4eOWO", "transatlantic", "male")),
    ("Charlie", entry("IKne3meq5aSn9XLyUdCD", "australian", "male")),
    ("Charlotte", entry("XB0fDUnXU5powFXDhCwa", "swedish", "female")),
    ("Chris", entry("iP95p4xoKVk53GoZ742B", "american", "male")),
    ("Daniel", entry("onwK4e9ZLuTAKqWW03F9", "british", "male")),
    ("Eric", entry("cjVigY5qzO86Huf0OWal", "american", "male")),
    ("George", entry("JBFqnCBsd6RMkjVDRZzb", "british", "male")),
    ("Jessica", entry("cgSgspJ2msm6clMCkdW9", "american", "female")),
    ("Laura", entry("FGY2WhTYpPnrIDTdsKH5", "american", "female")),
    ("Liam", entry("TX3LPaxmHKxFdv7VOQHJ", "american", "male")),
    ("Lily", entry("pFZP5JQG7iQjIQuC4Bku", "british", "female")),
    ("Matilda", entry("XrExE9yKIg1WjnnlVkGX", "american", "female")),
    ("River", entry("SAz9YHcvj6GT2YYXdXww", "american", "neutral")),
    ("Roger", entry("CwhRBWXzGAHq8TQ4Fs17", "american", "male")),
    ("Sarah", entry("EXAVITQu4vr4xnSDxMaL", "american", "female")),
    ("Will", entry("bIHbv24MWmeRgasZH58o", "american", "male")),
];

/// Look up a catalog voice by name, ignoring ASCII case
#[must_use]
pub fn get_voice(name: &str) -> Option<&'static CatalogVoice> {
    lookup(name).map(|(_, voice)| voice)
}

/// Map a catalog name to its voice id; other values are taken as ids already
#[must_use]
pub fn resolve_voice_id(name_or_id: &str) -> &str {
    get_voice(name_or_id).map_or_else(|| name_or_id.trim(), |v| v.voice_id)
}

/// Voice identifier used in cache keys
///
/// A catalog name in any case, or a catalog voice id, maps to the catalog
/// name so every spelling of one voice shares cached audio.
#[must_use]
pub fn canonical_voice(name_or_id: &str) -> &str {
    let trimmed = name_or_id.trim();
    lookup(trimmed)
        .or_else(|| {
            VOICES
                .iter()
                .find(|(_, voice)| voice.voice_id == trimmed)
                .map(|(name, voice)| (*name, voice))
        })
        .map_or(trimmed, |(name, _)| name)
}

fn lookup(name: &str) -> Option<(&'static str, &'static CatalogVoice)> {
    let name = name.trim();
    VOICES
        .binary_search_by(|(n, _)| cmp_ignore_case(n, name))
        .ok()
        .map(|idx| (VOICES[idx].0, &VOICES[idx].1))
}

fn cmp_ignore_case(a: &str, b: &str) -> Ordering {
    a.bytes()
        .map(|c| c.to_ascii_lowercase())
        .cmp(b.bytes().map(|c| c.to_ascii_lowercase()))
}

/// Every catalog entry in name order
pub fn voices() -> impl Iterator<Item = (&'static str, &'static CatalogVoice)> {
    VOICES.iter().map(|(name, voice)| (*name, voice))
}
