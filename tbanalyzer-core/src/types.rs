//! Core domain types for tbanalyzer
//!
//! These types represent imported chest events, held in a column-oriented
//! [`EventTable`] for the duration of an analysis session.
//!
//! ## Terminology
//!
//! | Term | Definition |
//! |------|------------|
//! | **Player** | Clan member who opened the chest |
//! | **Chest** | Chest type (e.g. "Rare Chest", "Citadel Chest") |
//! | **Source** | Where the chest came from (e.g. "Level 25 Crypt", "Arena") |
//! | **Score** | Points credited for the chest |
//! | **Dimension** | One of player / chest / source, used as a grouping key |

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

// ============================================
// Columns and dimensions
// ============================================

/// A column of the event table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Column {
    Player,
    Chest,
    Source,
    Score,
    Date,
}

impl Column {
    /// All columns in canonical order.
    pub const ALL: [Column; 5] = [
        Column::Player,
        Column::Chest,
        Column::Source,
        Column::Score,
        Column::Date,
    ];

    /// Header name as it appears in exports.
    pub fn name(&self) -> &'static str {
        match self {
            Column::Player => "PLAYER",
            Column::Chest => "CHEST",
            Column::Source => "SOURCE",
            Column::Score => "SCORE",
            Column::Date => "DATE",
        }
    }

    /// Match a header cell, case-insensitively.
    pub fn from_header(header: &str) -> Option<Self> {
        match header.trim().to_ascii_uppercase().as_str() {
            "PLAYER" => Some(Column::Player),
            "CHEST" | "CHEST_TYPE" => Some(Column::Chest),
            "SOURCE" => Some(Column::Source),
            "SCORE" => Some(Column::Score),
            "DATE" => Some(Column::Date),
            _ => None,
        }
    }

    /// Whether analyses require this column (DATE is optional).
    pub fn is_required(&self) -> bool {
        !matches!(self, Column::Date)
    }
}

impl std::fmt::Display for Column {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Grouping dimension for the metric services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Player,
    Chest,
    Source,
}

impl Dimension {
    /// Column holding this dimension's group keys.
    pub fn column(&self) -> Column {
        match self {
            Dimension::Player => Column::Player,
            Dimension::Chest => Column::Chest,
            Dimension::Source => Column::Source,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Player => "player",
            Dimension::Chest => "chest",
            Dimension::Source => "source",
        }
    }
}

// ============================================
// Records and table
// ============================================

/// One imported chest event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub player: String,
    pub chest_type: String,
    pub source: String,
    pub score: f64,
    /// Raw date cell; coerced with [`parse_date`] when needed
    pub date: Option<String>,
}

impl EventRecord {
    pub fn new(player: &str, chest_type: &str, source: &str, score: f64) -> Self {
        Self {
            player: player.to_string(),
            chest_type: chest_type.to_string(),
            source: source.to_string(),
            score,
            date: None,
        }
    }

    pub fn with_date(mut self, date: &str) -> Self {
        self.date = Some(date.to_string());
        self
    }
}

/// Column-oriented table of chest events.
///
/// Each column is either present with exactly one cell per row, or absent.
/// Analyses check for the columns they need and report an empty outcome
/// when one is missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventTable {
    len: usize,
    player: Option<Vec<String>>,
    chest: Option<Vec<String>>,
    source: Option<Vec<String>>,
    score: Option<Vec<f64>>,
    date: Option<Vec<Option<String>>>,
}

impl EventTable {
    /// Table with all required columns and no rows.
    pub fn empty() -> Self {
        Self::with_columns(&Column::ALL[..4], Vec::new())
    }

    /// Build a table from records.
    ///
    /// The DATE column is present only if at least one record carries a date.
    pub fn from_records(records: Vec<EventRecord>) -> Self {
        let mut columns = Column::ALL[..4].to_vec();
        if records.iter().any(|r| r.date.is_some()) {
            columns.push(Column::Date);
        }
        Self::with_columns(&columns, records)
    }

    /// Build a table keeping only the listed columns.
    pub fn with_columns(columns: &[Column], records: Vec<EventRecord>) -> Self {
        let len = records.len();
        let keep = |c: Column| columns.contains(&c);

        let mut player = keep(Column::Player).then(|| Vec::with_capacity(len));
        let mut chest = keep(Column::Chest).then(|| Vec::with_capacity(len));
        let mut source = keep(Column::Source).then(|| Vec::with_capacity(len));
        let mut score = keep(Column::Score).then(|| Vec::with_capacity(len));
        let mut date = keep(Column::Date).then(|| Vec::with_capacity(len));

        for record in records {
            if let Some(col) = player.as_mut() {
                col.push(record.player);
            }
            if let Some(col) = chest.as_mut() {
                col.push(record.chest_type);
            }
            if let Some(col) = source.as_mut() {
                col.push(record.source);
            }
            if let Some(col) = score.as_mut() {
                col.push(record.score);
            }
            if let Some(col) = date.as_mut() {
                col.push(record.date);
            }
        }

        Self {
            len,
            player,
            chest,
            source,
            score,
            date,
        }
    }

    /// Drop a column from the table.
    pub fn without_column(mut self, column: Column) -> Self {
        match column {
            Column::Player => self.player = None,
            Column::Chest => self.chest = None,
            Column::Source => self.source = None,
            Column::Score => self.score = None,
            Column::Date => self.date = None,
        }
        self
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn has_column(&self, column: Column) -> bool {
        match column {
            Column::Player => self.player.is_some(),
            Column::Chest => self.chest.is_some(),
            Column::Source => self.source.is_some(),
            Column::Score => self.score.is_some(),
            Column::Date => self.date.is_some(),
        }
    }

    /// Present columns in canonical order.
    pub fn columns(&self) -> Vec<Column> {
        Column::ALL
            .into_iter()
            .filter(|c| self.has_column(*c))
            .collect()
    }

    /// Values of a text column (PLAYER, CHEST or SOURCE).
    pub fn text_column(&self, column: Column) -> Option<&[String]> {
        match column {
            Column::Player => self.player.as_deref(),
            Column::Chest => self.chest.as_deref(),
            Column::Source => self.source.as_deref(),
            Column::Score | Column::Date => None,
        }
    }

    /// Group keys for a dimension.
    pub fn dimension_values(&self, dimension: Dimension) -> Option<&[String]> {
        self.text_column(dimension.column())
    }

    pub fn scores(&self) -> Option<&[f64]> {
        self.score.as_deref()
    }

    /// Raw date cells.
    pub fn dates(&self) -> Option<&[Option<String>]> {
        self.date.as_deref()
    }

    /// Date cells coerced to calendar dates; malformed cells become `None`.
    pub fn parsed_dates(&self) -> Option<Vec<Option<NaiveDate>>> {
        self.date.as_ref().map(|col| {
            col.iter()
                .map(|cell| cell.as_deref().and_then(parse_date))
                .collect()
        })
    }

    /// Append rows from another table.
    ///
    /// The result keeps only columns present in both tables.
    pub fn append(&mut self, other: EventTable) {
        fn merge<T>(left: &mut Option<Vec<T>>, right: Option<Vec<T>>) {
            match (left.as_mut(), right) {
                (Some(l), Some(r)) => l.extend(r),
                _ => *left = None,
            }
        }

        if self.len == 0 && self.columns().is_empty() {
            *self = other;
            return;
        }

        merge(&mut self.player, other.player);
        merge(&mut self.chest, other.chest);
        merge(&mut self.source, other.source);
        merge(&mut self.score, other.score);
        merge(&mut self.date, other.date);
        self.len += other.len;
    }
}

/// Coerce an ISO-ish date string to a calendar date.
///
/// Accepts `YYYY-MM-DD`, `YYYY/MM/DD`, `DD.MM.YYYY`, `YYYY-MM-DD HH:MM[:SS]`
/// and RFC 3339 timestamps. Anything else yields `None`.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    for fmt in ["%Y-%m-%d", "%Y/%m/%d", "%d.%m.%Y"] {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return Some(date);
        }
    }

    for fmt in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(raw, fmt) {
            return Some(ts.date());
        }
    }

    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|ts| ts.date_naive())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_from_header() {
        assert_eq!(Column::from_header(" player "), Some(Column::Player));
        assert_eq!(Column::from_header("Chest_Type"), Some(Column::Chest));
        assert_eq!(Column::from_header("CLAN"), None);
        assert!(!Column::Date.is_required());
        assert!(Column::Score.is_required());
    }

    #[test]
    fn test_from_records_date_column() {
        let table = EventTable::from_records(vec![EventRecord::new("A", "Gold", "Guild", 1.0)]);
        assert!(!table.has_column(Column::Date));

        let table = EventTable::from_records(vec![
            EventRecord::new("A", "Gold", "Guild", 1.0).with_date("2024-01-02"),
            EventRecord::new("B", "Gold", "Guild", 1.0),
        ]);
        assert!(table.has_column(Column::Date));
        assert_eq!(table.dates().unwrap()[1], None);
    }

    #[test]
    fn test_without_column() {
        let table = EventTable::from_records(vec![EventRecord::new("A", "Gold", "Guild", 1.0)])
            .without_column(Column::Score);
        assert_eq!(table.len(), 1);
        assert!(table.scores().is_none());
        assert_eq!(
            table.columns(),
            vec![Column::Player, Column::Chest, Column::Source]
        );
    }

    #[test]
    fn test_append_keeps_common_columns() {
        let mut left = EventTable::from_records(vec![
            EventRecord::new("A", "Gold", "Guild", 1.0).with_date("2024-01-01")
        ]);
        let right = EventTable::from_records(vec![EventRecord::new("B", "Gold", "Arena", 2.0)]);
        left.append(right);

        assert_eq!(left.len(), 2);
        assert!(!left.has_column(Column::Date));
        assert_eq!(left.scores().unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 5);
        assert_eq!(parse_date("2024-03-05"), expected);
        assert_eq!(parse_date("2024/03/05"), expected);
        assert_eq!(parse_date("05.03.2024"), expected);
        assert_eq!(parse_date("2024-03-05 18:22:01"), expected);
        assert_eq!(parse_date("2024-03-05T18:22:01+02:00"), expected);
        assert_eq!(parse_date("not a date"), None);
        assert_eq!(parse_date("2024-13-40"), None);
        assert_eq!(parse_date(""), None);
    }
}
