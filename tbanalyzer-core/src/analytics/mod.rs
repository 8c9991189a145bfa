//! Chest analytics
//!
//! Provides grouped score statistics along three dimensions:
//! - Metric services for players, chest types and sources
//! - Typed per-view outcomes (ready / empty / failed)
//! - An analysis manager that memoizes result bundles
//! - A registry describing every metric column
//!
//! See [`services`] for the per-dimension analyses and [`manager`] for
//! orchestration and caching.

pub mod bundle;
pub mod manager;
pub mod metric_table;
pub mod metrics_registry;
pub mod outcome;
pub mod services;
pub mod stats;

pub use bundle::{AnalysisScope, ResultBundle, View};
pub use manager::{AnalysisManager, ManagerStats};
pub use metric_table::{MetricField, MetricRow, MetricTable, OverviewStats, TimeTrends, TopGroup};
pub use outcome::{EmptyReason, Outcome};
pub use services::{
    create_default_manager, create_manager_with_epsilon, ChestService, MetricService,
    PlayerService, SourceService,
};
pub use stats::{DerivedScores, ScoreStats, DEFAULT_EFFICIENCY_EPSILON};
