//! Mode-specific text formatting for pronunciation requests

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Pause marker placed between letters and phonetic segments
const PAUSE: &str = " . ";

/// How a piece of text should be spoken
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PronunciationMode {
    /// The word itself, with natural sentence intonation
    Word,
    /// "The word is spelled ..."
    Spelling,
    /// Every letter separated by a pause
    LetterByLetter,
    /// Phoneme segments separated by pauses
    PhoneticBreakdown,
}

impl PronunciationMode {
    /// Turn raw user text into the utterance sent to the speech service
    ///
    /// # Errors
    ///
    /// Returns `InvalidInput` if nothing speakable remains after formatting
    pub fn format(self, raw: &str) -> Result<String> {
        match self {
            Self::Word => format_word(raw),
            Self::Spelling => format_spelling(raw),
            Self::LetterByLetter => format_letter_by_letter(raw),
            Self::PhoneticBreakdown => format_phonetic_breakdown(raw),
        }
    }

    /// Short name used in logs
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Word => "word",
            Self::Spelling => "spelling",
            Self::LetterByLetter => "letter_by_letter",
            Self::PhoneticBreakdown => "phonetic_breakdown",
        }
    }
}

impl std::fmt::Display for PronunciationMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Collapse whitespace and space punctuation consistently
///
/// No whitespace before `, ; : . ! ?`, exactly one space after `, ; :` when
/// more text follows.
#[must_use]
pub fn normalize(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for c in text.trim().chars() {
        if c.is_whitespace() {
            pending_space = true;
            continue;
        }

        if matches!(c, ',' | ';' | ':' | '.' | '!' | '?') {
            out.push(c);
            pending_space = matches!(c, ',' | ';' | ':');
            continue;
        }

        if pending_space && !out.is_empty() {
            out.push(' ');
        }
        pending_space = false;
        out.push(c);
    }

    out
}

/// Strip one pair of wrapping quotes, if present
fn strip_quotes(text: &str) -> &str {
    const QUOTES: [(char, char); 4] = [('"', '"'), ('\'', '\''), ('“', '”'), ('‘', '’')];

    for (open, close) in QUOTES {
        if let Some(inner) = text.strip_prefix(open).and_then(|t| t.strip_suffix(close)) {
            return inner;
        }
    }
    text
}

fn require_text(normalized: String, what: &str) -> Result<String> {
    if normalized.is_empty() {
        return Err(Error::InvalidInput(format!("{what} must not be empty")));
    }
    Ok(normalized)
}

fn format_word(raw: &str) -> Result<String> {
    let mut text = require_text(normalize(strip_quotes(raw.trim())), "word")?;

    if !text.ends_with(['.', '!', '?']) {
        text.push('.');
    }
    Ok(text)
}

fn format_spelling(raw: &str) -> Result<String> {
    let word = require_text(normalize(strip_quotes(raw.trim())), "word")?;
    Ok(format!("The word is spelled {word}"))
}

fn format_letter_by_letter(raw: &str) -> Result<String> {
    let letters: Vec<String> = raw
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(char::to_lowercase)
        .map(String::from)
        .collect();

    if letters.is_empty() {
        return Err(Error::InvalidInput(
            "letter-by-letter text must contain at least one letter".to_string(),
        ));
    }
    Ok(letters.join(PAUSE))
}

fn format_phonetic_breakdown(raw: &str) -> Result<String> {
    let segments: Vec<&str> = raw
        .split(|c: char| c == '-' || c == '·' || c == '/' || c.is_whitespace())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .collect();

    if segments.is_empty() {
        return Err(Error::InvalidInput(
            "phonetic breakdown must contain at least one segment".to_string(),
        ));
    }
    Ok(segments.join(PAUSE))
}
