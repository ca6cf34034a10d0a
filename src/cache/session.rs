//! In-memory audio cache for the lifetime of one process

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use crate::pronounce::CacheKey;

/// Playable audio handle (MP3 bytes)
///
/// Cloning is cheap and shares the underlying buffer.
#[derive(Debug, Clone)]
pub struct AudioClip {
    data: Arc<[u8]>,
}

impl AudioClip {
    /// Wrap an encoded audio payload
    #[must_use]
    pub fn new(data: impl Into<Arc<[u8]>>) -> Self {
        Self { data: data.into() }
    }

    /// Encoded audio bytes
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Payload size in bytes
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the payload is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether two handles share the same buffer
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.data, &other.data)
    }
}

/// Session-scoped mapping from cache key to playable clip
///
/// Starts empty, never evicts, never persisted.
#[derive(Debug, Default)]
pub struct SessionCache {
    entries: RwLock<HashMap<CacheKey, AudioClip>>,
}

impl SessionCache {
    /// Create an empty cache
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a clip
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<AudioClip> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    /// Insert or replace a clip
    pub fn set(&self, key: CacheKey, clip: AudioClip) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, clip);
    }

    /// Whether a clip is cached for `key`
    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Number of cached clips
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Whether the cache is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every cached clip
    pub fn clear(&self) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_then_get_returns_same_handle() {
        let cache = SessionCache::new();
        let key = CacheKey::derive("cat.", "Alice", "normal");
        let clip = AudioClip::new(vec![1u8, 2, 3]);

        assert!(cache.get(&key).is_none());
        cache.set(key.clone(), clip.clone());

        let cached = cache.get(&key).unwrap();
        assert!(cached.ptr_eq(&clip));
        assert_eq!(cached.bytes(), &[1, 2, 3]);
        assert!(cache.contains(&key));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_clear_empties_cache() {
        let cache = SessionCache::new();
        cache.set(CacheKey::derive("a.", "v", "s"), AudioClip::new(vec![0u8]));
        cache.set(CacheKey::derive("b.", "v", "s"), AudioClip::new(vec![0u8]));
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }
}
