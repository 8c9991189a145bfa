//! Result bundle caching
//!
//! The analysis manager memoizes [`ResultBundle`]s through an injected
//! [`AnalysisCache`]. Entries are keyed by the operation name and a
//! fingerprint of the input table; they never expire and are only removed
//! by [`AnalysisCache::clear`].
//!
//! ## Backends
//!
//! - [`MemoryCache`]: process-local map
//! - [`SqliteCache`]: SQLite file under the data directory, survives restarts
//! - [`NoopCache`]: stores nothing; every lookup misses

pub mod schema;
pub mod sqlite;

pub use sqlite::SqliteCache;

use crate::analytics::ResultBundle;
use crate::config::{CacheBackend, CacheConfig};
use crate::error::Result;
use crate::types::{Column, EventTable};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::Mutex;

/// File name of the on-disk cache inside the cache directory.
pub const CACHE_DB_NAME: &str = "analysis_cache.db";

// ============================================
// Keys and fingerprints
// ============================================

/// Identifies one cached bundle.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Operation name (e.g. "analyze_all")
    pub operation: String,
    /// Fingerprint of the input table
    pub fingerprint: String,
    /// Service parameters that affect results (e.g. efficiency ε)
    pub params: String,
}

impl CacheKey {
    pub fn new(operation: &str, fingerprint: &str, params: &str) -> Self {
        Self {
            operation: operation.to_string(),
            fingerprint: fingerprint.to_string(),
            params: params.to_string(),
        }
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let short = self.fingerprint.get(..12).unwrap_or(&self.fingerprint);
        write!(f, "{}:{}", self.operation, short)
    }
}

/// SHA-256 over the column names and every cell, hex encoded.
///
/// Row order matters: the same rows in a different order fingerprint
/// differently.
pub fn fingerprint(table: &EventTable) -> String {
    let mut hasher = Sha256::new();

    let columns = table.columns();
    hasher.update((table.len() as u64).to_le_bytes());
    for column in &columns {
        hasher.update(column.name().as_bytes());
        hasher.update([0x1f]);
    }
    hasher.update([0x1e]);

    for column in &columns {
        match column {
            Column::Score => {
                for score in table.scores().unwrap_or_default() {
                    hasher.update(score.to_bits().to_le_bytes());
                }
            }
            Column::Date => {
                for cell in table.dates().unwrap_or_default() {
                    match cell {
                        Some(value) => {
                            hasher.update([1]);
                            update_text(&mut hasher, value);
                        }
                        None => hasher.update([0]),
                    }
                }
            }
            text => {
                for value in table.text_column(*text).unwrap_or_default() {
                    update_text(&mut hasher, value);
                }
            }
        }
        hasher.update([0x1e]);
    }

    hex::encode(hasher.finalize())
}

/// Length-prefixed so adjacent cells can't run together.
fn update_text(hasher: &mut Sha256, value: &str) {
    hasher.update((value.len() as u64).to_le_bytes());
    hasher.update(value.as_bytes());
}

// ============================================
// Cache trait
// ============================================

/// Storage for computed result bundles.
///
/// Implementations are internally synchronized so a manager holding one can
/// be shared across threads.
pub trait AnalysisCache: Send + Sync {
    /// Backend name for logs (e.g. "sqlite").
    fn name(&self) -> &str;

    fn get(&self, key: &CacheKey) -> Result<Option<ResultBundle>>;

    /// Store a bundle, replacing any existing entry under the key.
    fn put(&self, key: &CacheKey, bundle: &ResultBundle) -> Result<()>;

    /// Remove every entry; returns how many were removed.
    fn clear(&self) -> Result<usize>;

    fn len(&self) -> Result<usize>;

    fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }
}

/// Cache that never stores anything.
#[derive(Debug, Default)]
pub struct NoopCache;

impl NoopCache {
    pub fn new() -> Self {
        Self
    }
}

impl AnalysisCache for NoopCache {
    fn name(&self) -> &str {
        "none"
    }

    fn get(&self, _key: &CacheKey) -> Result<Option<ResultBundle>> {
        Ok(None)
    }

    fn put(&self, _key: &CacheKey, _bundle: &ResultBundle) -> Result<()> {
        Ok(())
    }

    fn clear(&self) -> Result<usize> {
        Ok(0)
    }

    fn len(&self) -> Result<usize> {
        Ok(0)
    }
}

/// Process-local cache.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<CacheKey, ResultBundle>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<CacheKey, ResultBundle>> {
        // A panic mid-insert leaves the map itself intact
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl AnalysisCache for MemoryCache {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &CacheKey) -> Result<Option<ResultBundle>> {
        Ok(self.entries().get(key).cloned())
    }

    fn put(&self, key: &CacheKey, bundle: &ResultBundle) -> Result<()> {
        self.entries().insert(key.clone(), bundle.clone());
        Ok(())
    }

    fn clear(&self) -> Result<usize> {
        let mut entries = self.entries();
        let removed = entries.len();
        entries.clear();
        Ok(removed)
    }

    fn len(&self) -> Result<usize> {
        Ok(self.entries().len())
    }
}

/// Build the cache selected by configuration.
pub fn open_cache(config: &CacheConfig) -> Result<Box<dyn AnalysisCache>> {
    let cache: Box<dyn AnalysisCache> = match config.effective_backend() {
        CacheBackend::None => Box::new(NoopCache::new()),
        CacheBackend::Memory => Box::new(MemoryCache::new()),
        CacheBackend::Sqlite => Box::new(SqliteCache::open(&config.dir().join(CACHE_DB_NAME))?),
    };

    tracing::debug!(backend = cache.name(), "Opened analysis cache");
    Ok(cache)
}
