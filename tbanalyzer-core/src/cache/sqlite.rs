//! On-disk cache backed by SQLite.

use super::schema;
use super::{AnalysisCache, CacheKey};
use crate::analytics::ResultBundle;
use crate::error::Result;
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Result bundles stored as JSON rows in `cache_entries`.
pub struct SqliteCache {
    conn: Mutex<Connection>,
}

impl SqliteCache {
    /// Open or create the cache database at the given path.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            ",
        )?;
        schema::run_migrations(&conn)?;

        tracing::debug!(path = %path.display(), "Opened cache database");
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory cache database (for testing)
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        schema::run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AnalysisCache for SqliteCache {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn get(&self, key: &CacheKey) -> Result<Option<ResultBundle>> {
        let conn = self.conn();
        let json: Option<String> = conn
            .query_row(
                "SELECT bundle FROM cache_entries
                 WHERE operation = ?1 AND fingerprint = ?2 AND params = ?3",
                params![key.operation, key.fingerprint, key.params],
                |row| row.get(0),
            )
            .optional()?;

        match json {
            Some(json) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    fn put(&self, key: &CacheKey, bundle: &ResultBundle) -> Result<()> {
        let json = serde_json::to_string(bundle)?;
        let conn = self.conn();
        conn.execute(
            "INSERT OR REPLACE INTO cache_entries
                 (operation, fingerprint, params, bundle, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                key.operation,
                key.fingerprint,
                key.params,
                json,
                Utc::now().to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn clear(&self) -> Result<usize> {
        let removed = self.conn().execute("DELETE FROM cache_entries", [])?;
        tracing::info!(removed, "Cleared analysis cache");
        Ok(removed)
    }

    fn len(&self) -> Result<usize> {
        let count: i64 = self
            .conn()
            .query_row("SELECT COUNT(*) FROM cache_entries", [], |r| r.get(0))?;
        Ok(count as usize)
    }
}
