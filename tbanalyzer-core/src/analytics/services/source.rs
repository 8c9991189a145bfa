//! Source Service
//!
//! Aggregates scores per chest source (crypt, arena, guild event, ...).
//! Cross-effectiveness reports the chest type each source yields at the
//! highest mean score.

use super::MetricService;
use crate::analytics::stats::DEFAULT_EFFICIENCY_EPSILON;
use crate::types::{Column, Dimension};

/// Per-source analysis.
pub struct SourceService {
    epsilon: f64,
}

impl SourceService {
    pub fn new() -> Self {
        Self {
            epsilon: DEFAULT_EFFICIENCY_EPSILON,
        }
    }

    pub fn with_epsilon(epsilon: f64) -> Self {
        Self { epsilon }
    }
}

impl Default for SourceService {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricService for SourceService {
    fn name(&self) -> &str {
        "source"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Source
    }

    fn secondary_column(&self) -> Column {
        Column::Chest
    }

    fn efficiency_epsilon(&self) -> f64 {
        self.epsilon
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::outcome::{EmptyReason, Outcome};
    use crate::analytics::services::fixtures::small_table;
    use crate::types::EventTable;

    #[test]
    fn test_source_views() {
        let service = SourceService::new();
        let table = small_table();

        let dist = service.distribution(&table).into_ready().unwrap();
        assert_eq!(dist.rows[0].key, vec!["Arena"]);
        assert_eq!(dist.row(&["Guild"]).unwrap().stats.total, 150.0);

        let cross = service.cross_effectiveness(&table).into_ready().unwrap();
        assert_eq!(cross.key_columns, vec!["SOURCE", "CHEST"]);
        assert_eq!(cross.row(&["Guild", "Gold"]).unwrap().stats.mean, 100.0);

        let overview = service.overview_statistics(&table).into_ready().unwrap();
        assert_eq!(overview.unique_sources, Some(2));
        assert_eq!(overview.top_group.unwrap().key, "Arena");
    }

    #[test]
    fn test_empty_table_is_empty_everywhere() {
        let service = SourceService::new();
        let table = EventTable::empty();
        let expected = EmptyReason::NoRows;

        assert_eq!(
            service.overview_statistics(&table),
            Outcome::Empty(expected.clone())
        );
        assert_eq!(service.distribution(&table), Outcome::Empty(expected.clone()));
        assert_eq!(
            service.cross_effectiveness(&table),
            Outcome::Empty(expected.clone())
        );
        assert_eq!(service.time_trends(&table), Outcome::Empty(expected));
    }
}
