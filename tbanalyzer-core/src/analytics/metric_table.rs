//! Metric tables and the other view payloads a service produces.

use super::stats::{DerivedScores, ScoreStats};
use crate::format::format_metric;
use crate::types::Dimension;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Named numeric field of a metric row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MetricField {
    TotalScore,
    MeanScore,
    StdScore,
    Count,
    Rarity,
    Value,
    Consistency,
    Efficiency,
    Share,
}

impl MetricField {
    pub const ALL: [MetricField; 9] = [
        MetricField::TotalScore,
        MetricField::MeanScore,
        MetricField::StdScore,
        MetricField::Count,
        MetricField::Rarity,
        MetricField::Value,
        MetricField::Consistency,
        MetricField::Efficiency,
        MetricField::Share,
    ];

    /// Column name as shown in tables (e.g. "TOTAL_SCORE").
    pub fn name(&self) -> &'static str {
        match self {
            MetricField::TotalScore => "TOTAL_SCORE",
            MetricField::MeanScore => "MEAN_SCORE",
            MetricField::StdScore => "STD_SCORE",
            MetricField::Count => "COUNT",
            MetricField::Rarity => "RARITY",
            MetricField::Value => "VALUE",
            MetricField::Consistency => "CONSISTENCY",
            MetricField::Efficiency => "EFFICIENCY",
            MetricField::Share => "SHARE",
        }
    }

    /// Parse a field name, case-insensitively.
    pub fn from_name(name: &str) -> Option<Self> {
        let upper = name.trim().to_ascii_uppercase();
        Self::ALL.into_iter().find(|f| f.name() == upper)
    }

    /// Whether the field only exists on distribution rows.
    pub fn is_derived(&self) -> bool {
        !matches!(
            self,
            MetricField::TotalScore
                | MetricField::MeanScore
                | MetricField::StdScore
                | MetricField::Count
        )
    }
}

impl std::fmt::Display for MetricField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// One group of a metric table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRow {
    /// Group key, one entry per key column
    pub key: Vec<String>,
    pub stats: ScoreStats,
    /// Present on distribution tables only
    pub derived: Option<DerivedScores>,
}

impl MetricRow {
    /// Read a numeric field; `None` when the row has no derived scores.
    pub fn field(&self, field: MetricField) -> Option<f64> {
        let derived = self.derived.as_ref();
        match field {
            MetricField::TotalScore => Some(self.stats.total),
            MetricField::MeanScore => Some(self.stats.mean),
            MetricField::StdScore => Some(self.stats.std),
            MetricField::Count => Some(self.stats.count as f64),
            MetricField::Rarity => derived.map(|d| d.rarity),
            MetricField::Value => derived.map(|d| d.value),
            MetricField::Consistency => derived.map(|d| d.consistency),
            MetricField::Efficiency => derived.map(|d| d.efficiency),
            MetricField::Share => derived.map(|d| d.share),
        }
    }

    /// Key joined for display (e.g. "Alice / Arena").
    pub fn label(&self) -> String {
        self.key.join(" / ")
    }
}

/// Grouped aggregate output keyed by one or more dimensions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricTable {
    /// Names of the key columns (e.g. ["PLAYER", "SOURCE"])
    pub key_columns: Vec<String>,
    pub rows: Vec<MetricRow>,
}

impl MetricTable {
    pub fn new(key_columns: &[&str]) -> Self {
        Self {
            key_columns: key_columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a key column, case-insensitively.
    pub fn key_index(&self, column: &str) -> Option<usize> {
        self.key_columns
            .iter()
            .position(|c| c.eq_ignore_ascii_case(column))
    }

    /// Find the row with exactly this key.
    pub fn row(&self, key: &[&str]) -> Option<&MetricRow> {
        self.rows
            .iter()
            .find(|r| r.key.len() == key.len() && r.key.iter().zip(key).all(|(a, b)| a == b))
    }

    /// Sum a field over all rows (rows without the field count as 0).
    pub fn sum(&self, field: MetricField) -> f64 {
        self.rows.iter().filter_map(|r| r.field(field)).sum()
    }

    /// Whether rows carry the given field.
    pub fn has_field(&self, field: MetricField) -> bool {
        !field.is_derived() || self.rows.iter().any(|r| r.derived.is_some())
    }

    /// Display headers and formatted cells for the first `max_rows` rows.
    ///
    /// Key columns come first, then every field the rows carry.
    pub fn cells(&self, max_rows: usize) -> (Vec<String>, Vec<Vec<String>>) {
        let fields: Vec<MetricField> = MetricField::ALL
            .into_iter()
            .filter(|f| self.has_field(*f))
            .collect();

        let mut headers = self.key_columns.clone();
        headers.extend(fields.iter().map(|f| f.name().to_string()));

        let rows = self
            .rows
            .iter()
            .take(max_rows)
            .map(|row| {
                let mut cells = row.key.clone();
                cells.extend(
                    fields
                        .iter()
                        .map(|f| row.field(*f).map(format_metric).unwrap_or_default()),
                );
                cells
            })
            .collect();

        (headers, rows)
    }
}

/// Best group along the dimension by total score.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopGroup {
    pub key: String,
    pub total_score: f64,
}

/// Scalar summary of the table from one dimension's point of view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverviewStats {
    pub dimension: Dimension,
    /// Row count, including rows with malformed dates
    pub total_chests: usize,
    pub total_score: f64,
    pub mean_score: f64,
    /// Distinct values along this dimension
    pub unique_groups: usize,
    pub unique_players: Option<usize>,
    pub unique_chest_types: Option<usize>,
    pub unique_sources: Option<usize>,
    /// First and last parseable date
    pub date_range: Option<(NaiveDate, NaiveDate)>,
    pub top_group: Option<TopGroup>,
}

/// Time-bucketed aggregates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeTrends {
    /// Keyed (dimension, YEAR, MONTH)
    pub monthly: MetricTable,
    /// Keyed (dimension, DATE); player trends only
    pub daily: Option<MetricTable>,
    /// Rows left out because their date did not parse
    pub dropped_rows: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &[&str], total: f64, derived: bool) -> MetricRow {
        MetricRow {
            key: key.iter().map(|k| k.to_string()).collect(),
            stats: ScoreStats {
                total,
                mean: total,
                std: 0.0,
                count: 1,
            },
            derived: derived.then(DerivedScores::default),
        }
    }

    #[test]
    fn test_field_names_round_trip() {
        for field in MetricField::ALL {
            assert_eq!(MetricField::from_name(field.name()), Some(field));
        }
        assert_eq!(
            MetricField::from_name("total_score"),
            Some(MetricField::TotalScore)
        );
        assert_eq!(MetricField::from_name("bogus"), None);
    }

    #[test]
    fn test_row_fields() {
        let plain = row(&["A"], 10.0, false);
        assert_eq!(plain.field(MetricField::Count), Some(1.0));
        assert_eq!(plain.field(MetricField::Rarity), None);
        assert!(row(&["A"], 1.0, true).field(MetricField::Rarity).is_some());
    }

    #[test]
    fn test_table_lookup_and_sum() {
        let mut table = MetricTable::new(&["PLAYER", "SOURCE"]);
        table.rows.push(row(&["A", "Arena"], 10.0, false));
        table.rows.push(row(&["B", "Crypt"], 5.0, false));

        assert_eq!(table.key_index("source"), Some(1));
        assert_eq!(table.row(&["B", "Crypt"]).unwrap().stats.total, 5.0);
        assert!(table.row(&["B"]).is_none());
        assert_eq!(table.sum(MetricField::TotalScore), 15.0);
        assert!(!table.has_field(MetricField::Efficiency));
        assert_eq!(table.rows[0].label(), "A / Arena");
    }

    #[test]
    fn test_cells() {
        let mut table = MetricTable::new(&["PLAYER"]);
        table.rows.push(row(&["A"], 10.5, true));
        table.rows.push(row(&["B"], 4.0, false));

        let (headers, rows) = table.cells(1);
        assert_eq!(headers[0], "PLAYER");
        assert_eq!(headers[1], "TOTAL_SCORE");
        assert!(headers.iter().any(|h| h == "EFFICIENCY"));
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][..2], ["A".to_string(), "10.500".to_string()]);

        // A row without derived scores leaves those cells blank
        let (_, rows) = table.cells(10);
        assert_eq!(rows[1].len(), headers.len());
        assert_eq!(rows[1].last().map(String::as_str), Some(""));
    }
}
