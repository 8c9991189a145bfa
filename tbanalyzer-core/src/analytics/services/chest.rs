//! Chest Service
//!
//! Aggregates scores per chest type. Cross-effectiveness pairs each chest
//! type with the source that yields it at the highest mean score.

use super::MetricService;
use crate::analytics::stats::DEFAULT_EFFICIENCY_EPSILON;
use crate::types::{Column, Dimension};

/// Per-chest-type analysis.
pub struct ChestService {
    epsilon: f64,
}

impl ChestService {
    pub fn new() -> Self {
        Self {
            epsilon: DEFAULT_EFFICIENCY_EPSILON,
        }
    }

    pub fn with_epsilon(epsilon: f64) -> Self {
        Self { epsilon }
    }
}

impl Default for ChestService {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricService for ChestService {
    fn name(&self) -> &str {
        "chest"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Chest
    }

    fn secondary_column(&self) -> Column {
        Column::Source
    }

    fn efficiency_epsilon(&self) -> f64 {
        self.epsilon
    }
}
