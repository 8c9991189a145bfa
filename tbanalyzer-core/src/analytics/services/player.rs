//! Player Service
//!
//! Aggregates chest scores per player.
//!
//! ## Views Produced
//!
//! | View | Key columns | Description |
//! |------|-------------|-------------|
//! | `player_overview` | - | Totals, unique counts, date range, top player |
//! | `player_distribution` | `PLAYER` | Per-player stats with derived scores |
//! | `player_cross_effectiveness` | `PLAYER`, `SOURCE` | Best source per player by mean score |
//! | `player_time_trends` | `PLAYER`, `YEAR`, `MONTH` | Monthly totals, plus daily totals keyed `PLAYER`, `DATE` |
//!
//! ## Example
//!
//! Rows `A/Gold/Guild/100`, `A/Silver/Guild/50`, `B/Gold/Arena/200`:
//! - `A`: total 150, count 2
//! - `B`: total 200, count 1
//! - distribution order: `B`, `A`

use super::{daily_trends, monthly_trends, MetricService};
use crate::analytics::metric_table::TimeTrends;
use crate::analytics::outcome::Outcome;
use crate::analytics::stats::DEFAULT_EFFICIENCY_EPSILON;
use crate::types::{Column, Dimension, EventTable};

/// Per-player analysis.
pub struct PlayerService {
    epsilon: f64,
}

impl PlayerService {
    pub fn new() -> Self {
        Self {
            epsilon: DEFAULT_EFFICIENCY_EPSILON,
        }
    }

    /// Use a different ε for the efficiency score.
    pub fn with_epsilon(epsilon: f64) -> Self {
        Self { epsilon }
    }
}

impl Default for PlayerService {
    fn default() -> Self {
        Self::new()
    }
}

impl MetricService for PlayerService {
    fn name(&self) -> &str {
        "player"
    }

    fn dimension(&self) -> Dimension {
        Dimension::Player
    }

    fn secondary_column(&self) -> Column {
        Column::Source
    }

    fn efficiency_epsilon(&self) -> f64 {
        self.epsilon
    }

    fn time_trends(&self, table: &EventTable) -> Outcome<TimeTrends> {
        let result = monthly_trends(table, Dimension::Player).and_then(|(monthly, dropped_rows)| {
            Ok(TimeTrends {
                monthly,
                daily: Some(daily_trends(table, Dimension::Player)?),
                dropped_rows,
            })
        });
        result.into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::metric_table::MetricField;
    use crate::analytics::outcome::EmptyReason;
    use crate::analytics::services::fixtures::{dated_table, small_table};

    #[test]
    fn test_worked_example() {
        let service = PlayerService::new();
        let table = small_table();

        let dist = service.distribution(&table).into_ready().unwrap();
        assert_eq!(dist.key_columns, vec!["PLAYER"]);
        let keys: Vec<_> = dist.rows.iter().map(|r| r.key[0].as_str()).collect();
        assert_eq!(keys, vec!["B", "A"]);

        let a = dist.row(&["A"]).unwrap();
        assert_eq!(a.stats.total, 150.0);
        assert_eq!(a.stats.count, 2);
        let b = dist.row(&["B"]).unwrap();
        assert_eq!(b.stats.total, 200.0);
        assert_eq!(b.stats.std, 0.0);
        assert!((b.field(MetricField::Rarity).unwrap() - 2.0 / 3.0).abs() < 1e-12);

        let overview = service.overview_statistics(&table).into_ready().unwrap();
        assert_eq!(overview.total_score, 350.0);
        assert_eq!(overview.total_chests, 3);
        assert_eq!(overview.unique_players, Some(2));
        assert_eq!(overview.unique_groups, 2);
    }

    #[test]
    fn test_best_source_per_player() {
        let cross = PlayerService::new()
            .cross_effectiveness(&small_table())
            .into_ready()
            .unwrap();
        assert_eq!(cross.key_columns, vec!["PLAYER", "SOURCE"]);
        assert_eq!(cross.rows[0].key, vec!["A", "Guild"]);
        assert_eq!(cross.rows[0].stats.mean, 75.0);
        assert_eq!(cross.rows[1].key, vec!["B", "Arena"]);
    }

    #[test]
    fn test_time_trends_include_daily() {
        let trends = PlayerService::new()
            .time_trends(&dated_table())
            .into_ready()
            .unwrap();
        assert_eq!(trends.dropped_rows, 1);

        let daily = trends.daily.unwrap();
        assert_eq!(daily.key_columns, vec!["PLAYER", "DATE"]);
        assert_eq!(daily.row(&["A", "2024-01-05"]).unwrap().stats.total, 100.0);
        assert_eq!(daily.len(), 4);
    }

    #[test]
    fn test_time_trends_without_dates() {
        let outcome = PlayerService::new().time_trends(&small_table());
        assert_eq!(
            outcome,
            Outcome::Empty(EmptyReason::MissingColumn {
                column: Column::Date
            })
        );
    }

    #[test]
    fn test_epsilon_in_cache_tag() {
        let default = PlayerService::new().cache_tag();
        let custom = PlayerService::with_epsilon(0.5).cache_tag();
        assert_ne!(default, custom);
        assert!(custom.contains("eps=0.5"));
    }
}
