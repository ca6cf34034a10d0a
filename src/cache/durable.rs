//! Durable audio cache that survives restarts
//!
//! Wraps a generic [`AudioStore`] and absorbs every storage fault: a broken
//! or missing store degrades to cache misses, never to a failed pronunciation.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use chrono::{DateTime, Utc};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;

use crate::pronounce::CacheKey;
use crate::{Error, Result};

/// Default retention for durable records
pub const DEFAULT_MAX_AGE: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// One persisted audio payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioRecord {
    /// Storage id rendered from the cache key
    pub id: String,
    /// Base64-encoded audio payload
    pub audio_data: String,
    /// Creation time
    pub timestamp: DateTime<Utc>,
}

/// Record metadata returned by [`AudioStore::scan`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordStamp {
    pub id: String,
    pub timestamp: DateTime<Utc>,
}

/// Generic key/blob persistence backing the durable cache
#[async_trait]
pub trait AudioStore: Send + Sync {
    /// Prepare the underlying storage
    ///
    /// # Errors
    ///
    /// Returns error if the storage cannot be opened
    async fn open(&self) -> Result<()>;

    /// Fetch a record by id
    ///
    /// # Errors
    ///
    /// Returns error if the lookup fails
    async fn get(&self, id: &str) -> Result<Option<AudioRecord>>;

    /// Insert or replace a record
    ///
    /// # Errors
    ///
    /// Returns error if the write fails
    async fn put(&self, record: &AudioRecord) -> Result<()>;

    /// Delete a record, returning whether it existed
    ///
    /// # Errors
    ///
    /// Returns error if the delete fails
    async fn delete(&self, id: &str) -> Result<bool>;

    /// List every record's id and timestamp
    ///
    /// # Errors
    ///
    /// Returns error if the scan fails
    async fn scan(&self) -> Result<Vec<RecordStamp>>;
}

/// Outcome of opening the durable store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreState {
    Ready,
    Unavailable,
}

/// Fault-absorbing durable cache over an [`AudioStore`]
pub struct DurableCache {
    store: Option<Arc<dyn AudioStore>>,
    state: OnceCell<StoreState>,
}

impl DurableCache {
    /// Wrap a store; it is opened lazily on first use
    #[must_use]
    pub fn new(store: Arc<dyn AudioStore>) -> Self {
        Self {
            store: Some(store),
            state: OnceCell::new(),
        }
    }

    /// A cache with no backing storage: every lookup misses, every write fails
    #[must_use]
    pub fn unavailable() -> Self {
        Self {
            store: None,
            state: OnceCell::new_with(Some(StoreState::Unavailable)),
        }
    }

    /// Open the store once; concurrent callers share the same attempt
    pub async fn open(&self) -> StoreState {
        *self
            .state
            .get_or_init(|| async {
                let Some(store) = &self.store else {
                    return StoreState::Unavailable;
                };

                match store.open().await {
                    Ok(()) => {
                        tracing::info!("durable audio store ready");
                        StoreState::Ready
                    }
                    Err(e) => {
                        tracing::warn!(
                            error = %e,
                            "durable audio store unavailable, continuing without it"
                        );
                        StoreState::Unavailable
                    }
                }
            })
            .await
    }

    async fn ready_store(&self) -> Option<&Arc<dyn AudioStore>> {
        match self.open().await {
            StoreState::Ready => self.store.as_ref(),
            StoreState::Unavailable => None,
        }
    }

    /// Look up a payload; faults behave as a miss
    pub async fn get(&self, key: &CacheKey) -> Option<Vec<u8>> {
        let store = self.ready_store().await?;
        let id = key.storage_id();

        let record = match store.get(&id).await {
            Ok(record) => record?,
            Err(e) => {
                tracing::warn!(key = %id, error = %e, "durable cache lookup failed");
                return None;
            }
        };

        match BASE64.decode(record.audio_data.as_bytes()) {
            Ok(payload) => Some(payload),
            Err(e) => {
                tracing::warn!(key = %id, error = %e, "durable cache record is corrupt, ignoring");
                None
            }
        }
    }

    /// Persist a payload stamped with the current time
    ///
    /// # Errors
    ///
    /// Returns `StoreUnavailable` if the store never opened, or the store's
    /// error if the write failed. Callers treat both as non-fatal.
    pub async fn set(&self, key: &CacheKey, payload: &[u8]) -> Result<()> {
        self.set_at(key, payload, Utc::now()).await
    }

    /// Persist a payload with an explicit timestamp
    ///
    /// # Errors
    ///
    /// Same as [`DurableCache::set`]
    pub async fn set_at(
        &self,
        key: &CacheKey,
        payload: &[u8],
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let store = self.ready_store().await.ok_or(Error::StoreUnavailable)?;

        let record = AudioRecord {
            id: key.storage_id(),
            audio_data: BASE64.encode(payload),
            timestamp,
        };
        store.put(&record).await
    }

    /// Delete every record older than `max_age`, returning how many were removed
    pub async fn purge_older_than(&self, max_age: Duration) -> usize {
        self.purge_older_than_at(max_age, Utc::now()).await
    }

    /// Delete every record with `timestamp < now - max_age`
    pub async fn purge_older_than_at(&self, max_age: Duration, now: DateTime<Utc>) -> usize {
        let Some(store) = self.ready_store().await else {
            return 0;
        };

        let Ok(max_age) = chrono::Duration::from_std(max_age) else {
            tracing::warn!(?max_age, "retention period out of range, skipping purge");
            return 0;
        };
        let cutoff = now - max_age;

        let stamps = match store.scan().await {
            Ok(stamps) => stamps,
            Err(e) => {
                tracing::warn!(error = %e, "durable cache scan failed, skipping purge");
                return 0;
            }
        };

        let mut removed = 0;
        for stamp in stamps.into_iter().filter(|s| s.timestamp < cutoff) {
            match store.delete(&stamp.id).await {
                Ok(true) => removed += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!(key = %stamp.id, error = %e, "failed to delete expired audio");
                }
            }
        }

        tracing::info!(removed, %cutoff, "durable cache purge complete");
        removed
    }

    /// Run the retention sweep on a detached task
    pub fn spawn_purge(self: &Arc<Self>, max_age: Duration) -> JoinHandle<()> {
        let cache = Arc::clone(self);
        tokio::spawn(async move {
            cache.purge_older_than(max_age).await;
        })
    }

    /// Number of persisted records, `None` if the store is unavailable
    pub async fn record_count(&self) -> Option<usize> {
        let store = self.ready_store().await?;
        match store.scan().await {
            Ok(stamps) => Some(stamps.len()),
            Err(e) => {
                tracing::warn!(error = %e, "durable cache scan failed");
                None
            }
        }
    }
}
