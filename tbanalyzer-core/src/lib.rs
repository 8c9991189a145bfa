//! # tbanalyzer-core
//!
//! Core library for tbanalyzer - chest analytics for Total Battle clans.
//!
//! This library provides:
//! - A column-oriented event table for imported chest records
//! - CSV / JSON Lines ingestion
//! - Player, chest and source metric services
//! - An analysis manager that memoizes result bundles through a pluggable cache
//! - SVG chart and HTML/Markdown report rendering
//! - Configuration management and logging infrastructure
//!
//! ## Architecture
//!
//! Data flows through three layers:
//! - **Input:** CSV or JSONL exports on disk (immutable)
//! - **Table:** [`EventTable`] held in memory for the session
//! - **Derived:** [`ResultBundle`]s of metric tables (regenerable, optionally cached)
//!
//! ## Example
//!
//! ```rust,no_run
//! use tbanalyzer_core::analytics::create_default_manager;
//! use tbanalyzer_core::cache::MemoryCache;
//! use tbanalyzer_core::ingest;
//!
//! let loaded = ingest::load_path("chests.csv".as_ref()).expect("failed to load chests");
//! let manager = create_default_manager(Box::new(MemoryCache::new()));
//! let bundle = manager.analyze_all(&loaded.table).expect("analysis failed");
//! println!("{} views", bundle.views.len());
//! ```

// Re-export commonly used items at the crate root
pub use analytics::{AnalysisManager, AnalysisScope, Outcome, ResultBundle};
pub use config::Config;
pub use error::{Error, Result};
pub use types::*;

// Public modules
pub mod analytics;
pub mod cache;
pub mod chart;
pub mod config;
pub mod error;
pub mod format;
pub mod ingest;
pub mod logging;
pub mod report;
pub mod types;
