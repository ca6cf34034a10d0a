//! `SQLite` storage for the durable audio cache
//!
//! Detached persistence writes and the startup purge run on separate pooled
//! connections against one file, so file connections use WAL with a busy
//! timeout rather than failing on a locked database.

mod audio;
mod schema;

use std::path::Path;
use std::time::Duration;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::{Error, Result};

pub use audio::{SqliteAudioStore, default_db_path};
pub use schema::SCHEMA_VERSION;

/// Audio cache connection pool
pub type DbPool = Pool<SqliteConnectionManager>;

/// Connections per file-backed pool
const POOL_SIZE: u32 = 4;

/// How long a connection waits on a locked database
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Open the cache database at `path`, creating the file and its parent directory
///
/// # Errors
///
/// Returns error if the directory cannot be created or the database cannot
/// be opened or migrated
pub fn open_file(path: &Path) -> Result<DbPool> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let manager = SqliteConnectionManager::file(path).with_init(configure_file_connection);
    let builder = Pool::builder()
        .max_size(POOL_SIZE)
        .connection_timeout(BUSY_TIMEOUT);
    let pool = build(builder, manager)?;

    tracing::debug!(
        path = %path.display(),
        version = SCHEMA_VERSION,
        "audio cache database ready"
    );
    Ok(pool)
}

/// Open a private in-memory cache database
///
/// # Errors
///
/// Returns error if the schema cannot be created
pub fn open_memory() -> Result<DbPool> {
    // Every in-memory connection is its own database; keep exactly one alive
    let builder = Pool::builder()
        .max_size(1)
        .idle_timeout(None)
        .max_lifetime(None);
    build(builder, SqliteConnectionManager::memory())
}

fn configure_file_connection(conn: &mut Connection) -> rusqlite::Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))?;
    conn.pragma_update(None, "synchronous", "NORMAL")
}

fn build(
    builder: r2d2::Builder<SqliteConnectionManager>,
    manager: SqliteConnectionManager,
) -> Result<DbPool> {
    let pool = builder
        .build(manager)
        .map_err(|e| Error::Database(e.to_string()))?;

    let conn = pool.get().map_err(|e| Error::Database(e.to_string()))?;
    schema::init(&conn)?;

    Ok(pool)
}
