//! Cache key derivation

use std::fmt;

/// Separator between key components in the rendered storage id
const SEPARATOR: char = '-';

/// Escape character for separators appearing inside a component
const ESCAPE: char = '\\';

/// Identity of one pronunciation: formatted text, voice and speech style
///
/// Two requests that produce the same audio map to equal keys, and keys that
/// differ in any component never render to the same storage id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    text: String,
    voice: String,
    style: String,
}

impl CacheKey {
    /// Derive the key for already formatted text
    ///
    /// Pure: no clock, no I/O. Components are trimmed so incidental
    /// surrounding whitespace never splits the cache.
    #[must_use]
    pub fn derive(text: &str, voice: &str, style: &str) -> Self {
        Self {
            text: text.trim().to_string(),
            voice: voice.trim().to_string(),
            style: style.trim().to_string(),
        }
    }

    /// Formatted text component
    #[must_use]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// Voice component
    #[must_use]
    pub fn voice(&self) -> &str {
        &self.voice
    }

    /// Style component
    #[must_use]
    pub fn style(&self) -> &str {
        &self.style
    }

    /// Render the id used by the durable store: `{text}-{voice}-{style}`
    ///
    /// `-` and `\` inside a component are escaped, so `("a-b", "c", ..)` and
    /// `("a", "b-c", ..)` stay distinct.
    #[must_use]
    pub fn storage_id(&self) -> String {
        let len = self.text.len() + self.voice.len() + self.style.len() + 2;
        let mut id = String::with_capacity(len);
        push_escaped(&mut id, &self.text);
        id.push(SEPARATOR);
        push_escaped(&mut id, &self.voice);
        id.push(SEPARATOR);
        push_escaped(&mut id, &self.style);
        id
    }
}

fn push_escaped(out: &mut String, component: &str) {
    for c in component.chars() {
        if c == SEPARATOR || c == ESCAPE {
            out.push(ESCAPE);
        }
        out.push(c);
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.storage_id())
    }
}
