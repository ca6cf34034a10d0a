//! `SQLite` implementation of the durable audio store

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rusqlite::Connection;

use super::DbPool;
use crate::cache::{AudioRecord, AudioStore, RecordStamp};
use crate::{Error, Result};

#[derive(Debug, Clone)]
enum Location {
    File(PathBuf),
    Memory,
}

/// Audio store backed by a pooled `SQLite` database
///
/// The pool is created on [`AudioStore::open`]; until then every operation
/// fails with `StoreUnavailable`.
pub struct SqliteAudioStore {
    location: Location,
    pool: OnceLock<DbPool>,
}

impl SqliteAudioStore {
    /// Store in a database file, created on open along with its parent directory
    #[must_use]
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: Location::File(path.into()),
            pool: OnceLock::new(),
        }
    }

    /// Store in a private in-memory database
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            location: Location::Memory,
            pool: OnceLock::new(),
        }
    }

    fn pool(&self) -> Result<DbPool> {
        self.pool.get().cloned().ok_or(Error::StoreUnavailable)
    }

    /// Run a database closure on the blocking pool
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
    {
        let pool = self.pool()?;
        tokio::task::spawn_blocking(move || {
            let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
            f(&conn)
        })
        .await
        .map_err(|e| Error::Database(format!("database task failed: {e}")))?
    }
}

fn open_location(location: &Location) -> Result<DbPool> {
    match location {
        Location::File(path) => super::open_file(path),
        Location::Memory => super::open_memory(),
    }
}

fn from_millis(millis: i64) -> Result<DateTime<Utc>> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| Error::Database(format!("timestamp out of range: {millis}")))
}

#[async_trait]
impl AudioStore for SqliteAudioStore {
    async fn open(&self) -> Result<()> {
        if self.pool.get().is_some() {
            return Ok(());
        }

        let location = self.location.clone();
        let pool = tokio::task::spawn_blocking(move || open_location(&location))
            .await
            .map_err(|e| Error::Database(format!("database task failed: {e}")))??;

        // A concurrent opener may have won; either pool is equivalent
        let _ = self.pool.set(pool);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<AudioRecord>> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let result = conn.query_row(
                "SELECT id, audio_data, timestamp FROM audio_cache WHERE id = ?1",
                [&id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                    ))
                },
            );

            match result {
                Ok((id, audio_data, millis)) => Ok(Some(AudioRecord {
                    id,
                    audio_data,
                    timestamp: from_millis(millis)?,
                })),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn put(&self, record: &AudioRecord) -> Result<()> {
        let record = record.clone();
        self.with_conn(move |conn| {
            conn.execute(
                r"INSERT INTO audio_cache (id, audio_data, timestamp)
                  VALUES (?1, ?2, ?3)
                  ON CONFLICT(id) DO UPDATE SET
                    audio_data = excluded.audio_data,
                    timestamp = excluded.timestamp",
                rusqlite::params![
                    record.id,
                    record.audio_data,
                    record.timestamp.timestamp_millis()
                ],
            )?;
            Ok(())
        })
        .await
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let id = id.to_string();
        self.with_conn(move |conn| {
            let deleted = conn.execute("DELETE FROM audio_cache WHERE id = ?1", [&id])?;
            Ok(deleted > 0)
        })
        .await
    }

    async fn scan(&self) -> Result<Vec<RecordStamp>> {
        self.with_conn(|conn| {
            let mut stmt =
                conn.prepare("SELECT id, timestamp FROM audio_cache ORDER BY timestamp")?;

            let rows = stmt
                .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?)))?
                .collect::<std::result::Result<Vec<_>, _>>()?;

            rows.into_iter()
                .map(|(id, millis)| {
                    Ok(RecordStamp {
                        id,
                        timestamp: from_millis(millis)?,
                    })
                })
                .collect()
        })
        .await
    }
}

impl std::fmt::Debug for SqliteAudioStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteAudioStore")
            .field("location", &self.location)
            .field("open", &self.pool.get().is_some())
            .finish()
    }
}

/// Default database file inside a data directory
#[must_use]
pub fn default_db_path(data_dir: &Path) -> PathBuf {
    data_dir.join("audio-cache.db")
}
