//! Cache database schema and migrations
//!
//! Uses SQLite with embedded migrations managed via PRAGMA user_version.

use rusqlite::Connection;

/// Current schema version
pub const SCHEMA_VERSION: i32 = 1;

/// SQL migrations, indexed by version number
const MIGRATIONS: &[&str] = &[
    // Version 1: result bundles as JSON
    r#"
    CREATE TABLE IF NOT EXISTS cache_entries (
        operation        TEXT NOT NULL,
        fingerprint      TEXT NOT NULL,
        params           TEXT NOT NULL DEFAULT '',
        bundle           JSON NOT NULL,
        created_at       DATETIME NOT NULL,
        PRIMARY KEY (operation, fingerprint, params)
    );

    CREATE INDEX IF NOT EXISTS idx_cache_entries_fingerprint
        ON cache_entries(fingerprint);
    "#,
];

/// Bring the schema up to [`SCHEMA_VERSION`].
pub fn run_migrations(conn: &Connection) -> crate::error::Result<()> {
    let current_version = get_schema_version(conn)?;

    for (i, migration) in MIGRATIONS.iter().enumerate() {
        let version = (i + 1) as i32;
        if version > current_version {
            tracing::info!(version, "Running cache migration");
            conn.execute_batch(migration)?;
            conn.execute_batch(&format!("PRAGMA user_version = {}", version))?;
        }
    }

    if current_version < SCHEMA_VERSION {
        tracing::debug!(
            from = current_version,
            to = SCHEMA_VERSION,
            "Cache migrations complete"
        );
    }

    Ok(())
}

/// Get the current schema version from the database
pub fn get_schema_version(conn: &Connection) -> crate::error::Result<i32> {
    let version: i32 = conn.query_row("PRAGMA user_version", [], |r| r.get(0))?;
    Ok(version)
}
