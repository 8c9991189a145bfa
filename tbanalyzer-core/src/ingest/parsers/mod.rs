//! Input format parsers
//!
//! Each parser converts one export format into an [`EventTable`](crate::EventTable).
//!
//! - [`CsvParser`]: comma or semicolon separated exports with a header row
//! - [`JsonlParser`]: one JSON object per line

pub mod csv;
pub mod jsonl;

pub use self::csv::CsvParser;
pub use self::jsonl::JsonlParser;

use super::parser::{parse_score, NumberLocale};
use crate::types::{Column, EventRecord};

/// Build a record from the cells of one row.
///
/// `declared` lists the columns the input provides; `cell` looks one up.
/// Returns a warning message when the row must be skipped.
pub(crate) fn build_record<'a>(
    declared: &[Column],
    locale: NumberLocale,
    cell: impl Fn(Column) -> Option<&'a str>,
) -> std::result::Result<EventRecord, String> {
    let text = |column: Column| -> std::result::Result<String, String> {
        if !declared.contains(&column) {
            return Ok(String::new());
        }
        match cell(column).map(str::trim) {
            Some(value) if !value.is_empty() => Ok(value.to_string()),
            _ => Err(format!("empty {} cell", column)),
        }
    };

    let player = text(Column::Player)?;
    let chest_type = text(Column::Chest)?;
    let source = text(Column::Source)?;

    let score = if declared.contains(&Column::Score) {
        let raw = cell(Column::Score).unwrap_or("");
        parse_score(raw, locale).ok_or_else(|| format!("unparsable SCORE {:?}", raw.trim()))?
    } else {
        0.0
    };

    let date = if declared.contains(&Column::Date) {
        cell(Column::Date)
            .map(str::trim)
            .filter(|d| !d.is_empty())
            .map(str::to_string)
    } else {
        None
    };

    Ok(EventRecord {
        player,
        chest_type,
        source,
        score,
        date,
    })
}
