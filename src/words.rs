//! Word sets
//!
//! Records produced by the word-generation service, loaded from JSON so the
//! CLI can pronounce or pre-warm a whole set.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

/// One word to practise
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordEntry {
    pub word: String,

    #[serde(default)]
    pub definition: String,

    /// Free-form level, e.g. "easy" or "hard"
    #[serde(default)]
    pub difficulty: String,

    /// Spelling rule the word illustrates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rule: Option<String>,

    /// Hyphen or space separated sound segments, e.g. "ox-y-gen"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonetic: Option<String>,
}

impl WordEntry {
    /// Phonetic breakdown, if present and not blank
    #[must_use]
    pub fn phonetic(&self) -> Option<&str> {
        self.phonetic.as_deref().map(str::trim).filter(|p| !p.is_empty())
    }
}

/// A named list of words
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordSet {
    #[serde(default)]
    pub name: String,
    pub words: Vec<WordEntry>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum WordSetFile {
    Set(WordSet),
    Bare(Vec<WordEntry>),
}

impl WordSet {
    /// Parse a word set from JSON: a `{name, words}` object or a bare array
    ///
    /// # Errors
    ///
    /// Returns `Serialization` if the JSON matches neither shape
    pub fn from_json(json: &str) -> Result<Self> {
        // Parse once into a value so the error names the real problem
        let value: serde_json::Value = serde_json::from_str(json)?;
        let set = match serde_json::from_value(value.clone()) {
            Ok(WordSetFile::Set(set)) => set,
            Ok(WordSetFile::Bare(words)) => Self {
                name: String::new(),
                words,
            },
            Err(_) if value.is_array() => Self {
                name: String::new(),
                words: serde_json::from_value(value)?,
            },
            Err(_) => serde_json::from_value(value)?,
        };
        Ok(set)
    }

    /// Entries with a non-blank word
    pub fn entries(&self) -> impl Iterator<Item = &WordEntry> {
        self.words.iter().filter(|w| !w.word.trim().is_empty())
    }
}

/// Load a word set from a JSON file
///
/// Sets without a name are named after the file stem.
///
/// # Errors
///
/// Returns `Io` if the file cannot be read, `Serialization` if it is not a
/// word set
pub fn load_word_set(path: &Path) -> Result<WordSet> {
    let content = std::fs::read_to_string(path)?;
    let mut set = WordSet::from_json(&content)?;

    if set.name.is_empty() {
        set.name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
    }

    tracing::debug!(
        path = %path.display(),
        name = %set.name,
        words = set.words.len(),
        "loaded word set"
    );
    Ok(set)
}
