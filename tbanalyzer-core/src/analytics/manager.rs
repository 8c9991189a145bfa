//! Analysis manager
//!
//! Runs the registered metric services over an event table and memoizes the
//! resulting [`ResultBundle`] through an injected [`AnalysisCache`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                     ANALYSIS MANAGER                            │
//! │                                                                 │
//! │  analyze(table, scope)                                          │
//! │     │                                                           │
//! │     ├── fingerprint(table) + scope + service params → CacheKey  │
//! │     │                                                           │
//! │     ├── cache hit  → stored bundle                              │
//! │     │                                                           │
//! │     └── cache miss → for each service in scope:                 │
//! │            overview_statistics / distribution /                 │
//! │            cross_effectiveness / time_trends                    │
//! │                  → "<service>_<view>" in a new bundle → put     │
//! └─────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Cache failures never fail an analysis: they are logged and the bundle is
//! computed from scratch.

use super::bundle::{AnalysisScope, ResultBundle, View};
use super::outcome::Outcome;
use super::services::MetricService;
use crate::cache::{fingerprint, AnalysisCache, CacheKey};
use crate::error::{Error, Result};
use crate::types::EventTable;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

/// Counters for cache effectiveness.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ManagerStats {
    pub cache_hits: u64,
    pub cache_misses: u64,
    /// Bundles computed from scratch
    pub computations: u64,
}

/// Orchestrates metric services and the result cache.
pub struct AnalysisManager {
    services: Vec<Box<dyn MetricService>>,
    cache: Box<dyn AnalysisCache>,
    debug: bool,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    computations: AtomicU64,
}

impl AnalysisManager {
    /// Create a manager with no services.
    pub fn new(cache: Box<dyn AnalysisCache>) -> Self {
        Self {
            services: Vec::new(),
            cache,
            debug: false,
            cache_hits: AtomicU64::new(0),
            cache_misses: AtomicU64::new(0),
            computations: AtomicU64::new(0),
        }
    }

    /// Log every empty or failed view, not just failures.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Register a service. Services run in registration order.
    pub fn register(&mut self, service: Box<dyn MetricService>) {
        tracing::debug!(service = service.name(), "Registered metric service");
        self.services.push(service);
    }

    /// Get list of registered service names.
    pub fn service_names(&self) -> Vec<&str> {
        self.services.iter().map(|s| s.name()).collect()
    }

    /// Check if a service is registered.
    pub fn has_service(&self, name: &str) -> bool {
        self.services.iter().any(|s| s.name() == name)
    }

    /// Name of the backing cache.
    pub fn cache_name(&self) -> &str {
        self.cache.name()
    }

    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            cache_hits: self.cache_hits.load(Ordering::Relaxed),
            cache_misses: self.cache_misses.load(Ordering::Relaxed),
            computations: self.computations.load(Ordering::Relaxed),
        }
    }

    /// Every registered service.
    pub fn analyze_all(&self, table: &EventTable) -> Result<ResultBundle> {
        self.analyze(table, AnalysisScope::All)
    }

    pub fn player_only(&self, table: &EventTable) -> Result<ResultBundle> {
        self.analyze(table, AnalysisScope::Player)
    }

    pub fn chest_only(&self, table: &EventTable) -> Result<ResultBundle> {
        self.analyze(table, AnalysisScope::Chest)
    }

    pub fn source_only(&self, table: &EventTable) -> Result<ResultBundle> {
        self.analyze(table, AnalysisScope::Source)
    }

    /// Analyze `table` with the services in `scope`, reusing a cached bundle
    /// when the same table was analyzed before.
    ///
    /// Fails only when no registered service belongs to the scope.
    pub fn analyze(&self, table: &EventTable, scope: AnalysisScope) -> Result<ResultBundle> {
        let services: Vec<&dyn MetricService> = self
            .services
            .iter()
            .map(|s| s.as_ref())
            .filter(|s| scope.includes(s.dimension()))
            .collect();

        if services.is_empty() {
            return Err(Error::Config(format!(
                "no metric service registered for scope '{}'",
                scope
            )));
        }

        let _span = tracing::info_span!("analyze", scope = %scope, rows = table.len()).entered();

        let fingerprint = fingerprint(table);
        let params: Vec<String> = services.iter().map(|s| s.cache_tag()).collect();
        let key = CacheKey::new(scope.operation_name(), &fingerprint, &params.join(";"));

        match self.cache.get(&key) {
            Ok(Some(bundle)) => {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
                tracing::debug!(key = %key, cache = self.cache.name(), "Cache hit");
                return Ok(bundle);
            }
            Ok(None) => {
                tracing::debug!(key = %key, cache = self.cache.name(), "Cache miss");
            }
            Err(e) => {
                tracing::warn!(
                    key = %key,
                    cache = self.cache.name(),
                    error = %e,
                    "Cache read failed; recomputing"
                );
            }
        }
        self.cache_misses.fetch_add(1, Ordering::Relaxed);

        let start = Instant::now();
        let mut bundle = ResultBundle::new(scope, fingerprint, table.len());
        for service in &services {
            self.run_service(*service, table, &mut bundle);
        }
        self.computations.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            operation = scope.operation_name(),
            rows = table.len(),
            views = bundle.views.len(),
            failed = bundle.failures().len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "Analysis complete"
        );

        if let Err(e) = self.cache.put(&key, &bundle) {
            tracing::warn!(
                key = %key,
                cache = self.cache.name(),
                error = %e,
                "Cache write failed"
            );
        }

        Ok(bundle)
    }

    /// Remove every cached bundle.
    pub fn clear_cache(&self) -> Result<usize> {
        let removed = self.cache.clear()?;
        tracing::info!(removed, cache = self.cache.name(), "Analysis cache cleared");
        Ok(removed)
    }

    fn run_service(&self, service: &dyn MetricService, table: &EventTable, bundle: &mut ResultBundle) {
        let name = service.name();

        let overview = self.timed(name, "overview", || {
            service.overview_statistics(table).map(View::Overview)
        });
        bundle.insert(format!("{}_overview", name), overview);

        let distribution = self.timed(name, "distribution", || {
            service.distribution(table).map(View::Table)
        });
        bundle.insert(format!("{}_distribution", name), distribution);

        let cross = self.timed(name, "cross_effectiveness", || {
            service.cross_effectiveness(table).map(View::Table)
        });
        bundle.insert(format!("{}_cross_effectiveness", name), cross);

        let trends = self.timed(name, "time_trends", || {
            service.time_trends(table).map(View::Trends)
        });
        bundle.insert(format!("{}_time_trends", name), trends);
    }

    fn timed(
        &self,
        service: &str,
        view: &str,
        run: impl FnOnce() -> Outcome<View>,
    ) -> Outcome<View> {
        let start = Instant::now();
        let outcome = run();
        let duration_ms = start.elapsed().as_millis() as u64;

        match &outcome {
            Outcome::Failed(reason) => {
                tracing::warn!(service, view, duration_ms, reason = %reason, "View failed");
            }
            Outcome::Empty(reason) if self.debug => {
                tracing::debug!(service, view, duration_ms, reason = %reason, "View empty");
            }
            _ => {
                tracing::trace!(service, view, duration_ms, status = outcome.status(), "View computed");
            }
        }

        outcome
    }
}
