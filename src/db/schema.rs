//! Database schema and migrations

use rusqlite::Connection;

use crate::Result;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 2;

/// Initialize the database schema
///
/// # Errors
///
/// Returns error if migration fails
pub fn init(conn: &Connection) -> Result<()> {
    let version: i32 = conn
        .query_row("PRAGMA user_version", [], |row| row.get(0))
        .unwrap_or(0);

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

fn migrate_v1(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Synthesized audio keyed by rendered cache key
        CREATE TABLE IF NOT EXISTS audio_cache (
            id TEXT PRIMARY KEY,
            audio_data TEXT NOT NULL,
            timestamp INTEGER NOT NULL
        );

        PRAGMA user_version = 1;
        ",
    )?;

    tracing::info!("migrated to schema v1");
    Ok(())
}

fn migrate_v2(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r"
        -- Retention sweeps filter on age
        CREATE INDEX IF NOT EXISTS idx_audio_cache_timestamp ON audio_cache(timestamp);

        PRAGMA user_version = 2;
        ",
    )?;

    tracing::info!("migrated to schema v2 (retention index)");
    Ok(())
}
