//! Parser trait abstraction
//!
//! All input formats implement the [`EventParser`] trait to provide
//! a unified interface for turning an export file into an [`EventTable`].
//!
//! ## Design Principles
//!
//! 1. **Resilience**: Bad rows log warnings and are skipped, the file still loads
//! 2. **Column fidelity**: Columns absent from the header stay absent in the table
//! 3. **Extensible**: New formats only require implementing this trait

use crate::error::Result;
use crate::types::{Column, EventRecord, EventTable};
use std::io::Read;
use std::path::Path;

/// Result of parsing one input.
#[derive(Debug, Default)]
pub struct ParseResult {
    /// Rows that parsed cleanly
    pub records: Vec<EventRecord>,
    /// Columns the input declared
    pub columns: Vec<Column>,
    /// Warnings encountered during parsing (non-fatal)
    pub warnings: Vec<String>,
}

impl ParseResult {
    /// Build the event table, keeping only declared columns.
    pub fn into_table(self) -> (EventTable, Vec<String>) {
        let table = EventTable::with_columns(&self.columns, self.records);
        (table, self.warnings)
    }
}

/// Trait for chest export parsers.
pub trait EventParser: Send + Sync {
    /// Short format name used in logs (e.g. "csv")
    fn name(&self) -> &'static str;

    /// File extensions this parser handles, lowercase without the dot.
    fn extensions(&self) -> &'static [&'static str];

    /// Whether this parser should handle the given path.
    fn can_parse(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext = ext.to_ascii_lowercase();
                self.extensions().iter().any(|e| *e == ext)
            })
            .unwrap_or(false)
    }

    /// Parse an input stream. `source_name` is used in warnings and errors.
    fn parse(&self, source_name: &str, input: &mut dyn Read) -> Result<ParseResult>;
}

/// How an export writes decimal and thousands separators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum NumberLocale {
    /// `1,250.5`
    #[default]
    DecimalPoint,
    /// `1.250,5`, used by semicolon separated exports
    DecimalComma,
}

impl NumberLocale {
    /// (decimal separator, thousands separator)
    fn separators(self) -> (char, char) {
        match self {
            NumberLocale::DecimalPoint => ('.', ','),
            NumberLocale::DecimalComma => (',', '.'),
        }
    }
}

/// Parse a score cell written in `locale`.
///
/// Thousands separators must split the integer part into groups of three;
/// anything else is ambiguous and rejected, as are non-finite values.
pub(crate) fn parse_score(raw: &str, locale: NumberLocale) -> Option<f64> {
    let cleaned: String = raw
        .trim()
        .chars()
        .filter(|c| *c != '_' && !c.is_whitespace())
        .collect();
    let (decimal, group) = locale.separators();

    // Plain Rust syntax ("12.5", "1e3"); for decimal comma only when no '.' could be a group
    if locale == NumberLocale::DecimalPoint || !cleaned.contains('.') {
        if let Ok(value) = cleaned.parse::<f64>() {
            return value.is_finite().then_some(value);
        }
    }

    let (sign, body) = match cleaned.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", cleaned.strip_prefix('+').unwrap_or(&cleaned)),
    };

    let mut parts = body.split(decimal);
    let integer = ungroup(parts.next()?, group)?;
    let fraction = parts.next();
    if parts.next().is_some() {
        return None;
    }

    let mut normalized = format!("{}{}", sign, integer);
    if let Some(fraction) = fraction {
        if fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()) {
            return None;
        }
        normalized.push('.');
        normalized.push_str(fraction);
    }

    let value = normalized.parse::<f64>().ok()?;
    value.is_finite().then_some(value)
}

/// Join digit groups, requiring every group after the first to have three digits.
fn ungroup(integer: &str, group: char) -> Option<String> {
    let groups: Vec<&str> = integer.split(group).collect();
    let (first, rest) = groups.split_first()?;

    let digits = groups.iter().all(|g| g.chars().all(|c| c.is_ascii_digit()));
    let leading = !first.is_empty() && (rest.is_empty() || first.len() <= 3);
    let grouped = rest.iter().all(|g| g.len() == 3);

    (digits && leading && grouped).then(|| groups.concat())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_score_decimal_point() {
        let point = |raw| parse_score(raw, NumberLocale::DecimalPoint);
        assert_eq!(point("100"), Some(100.0));
        assert_eq!(point(" 12.5 "), Some(12.5));
        assert_eq!(point("1e3"), Some(1000.0));
        assert_eq!(point("1,250"), Some(1250.0));
        assert_eq!(point("-1,250,000.75"), Some(-1_250_000.75));
        assert_eq!(point("1 250"), Some(1250.0));
        // Not a thousands grouping
        assert_eq!(point("1,5"), None);
        assert_eq!(point("12,50,0"), None);
        assert_eq!(point("abc"), None);
        assert_eq!(point("NaN"), None);
        assert_eq!(point("inf"), None);
        assert_eq!(point(""), None);
    }

    #[test]
    fn test_parse_score_decimal_comma() {
        let comma = |raw| parse_score(raw, NumberLocale::DecimalComma);
        assert_eq!(comma("1,5"), Some(1.5));
        assert_eq!(comma("-3,25"), Some(-3.25));
        assert_eq!(comma("1.250"), Some(1250.0));
        assert_eq!(comma("1.250.000,5"), Some(1_250_000.5));
        assert_eq!(comma("100"), Some(100.0));
        // A lone point with fewer than three digits after it is ambiguous
        assert_eq!(comma("12.5"), None);
        assert_eq!(comma("1,2,3"), None);
        assert_eq!(comma("1,"), None);
    }
}
