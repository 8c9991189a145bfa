//! JSON Lines export parser
//!
//! Each non-blank line is an object whose keys match the CSV headers
//! (case-insensitive). SCORE may be a number or a numeric string.

use super::build_record;
use crate::error::Result;
use crate::ingest::parser::{EventParser, NumberLocale, ParseResult};
use crate::types::Column;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::io::{BufRead, BufReader, Read};

pub struct JsonlParser;

impl JsonlParser {
    pub fn new() -> Self {
        Self
    }

    /// Flatten one object into column -> text cells.
    fn cells(object: &serde_json::Map<String, Value>) -> HashMap<Column, String> {
        object
            .iter()
            .filter_map(|(key, value)| {
                let column = Column::from_header(key)?;
                let text = match value {
                    Value::String(s) => s.clone(),
                    Value::Number(n) => n.to_string(),
                    Value::Null => String::new(),
                    other => other.to_string(),
                };
                Some((column, text))
            })
            .collect()
    }
}

impl Default for JsonlParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EventParser for JsonlParser {
    fn name(&self) -> &'static str {
        "jsonl"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["jsonl", "ndjson"]
    }

    fn parse(&self, source_name: &str, input: &mut dyn Read) -> Result<ParseResult> {
        let mut result = ParseResult::default();
        let mut rows: Vec<(usize, HashMap<Column, String>)> = Vec::new();
        let mut seen: BTreeSet<Column> = BTreeSet::new();

        for (i, line) in BufReader::new(input).lines().enumerate() {
            let line_no = i + 1;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            match serde_json::from_str::<Value>(&line) {
                Ok(Value::Object(object)) => {
                    let cells = Self::cells(&object);
                    seen.extend(cells.keys().copied());
                    rows.push((line_no, cells));
                }
                Ok(_) => {
                    result
                        .warnings
                        .push(format!("{}:{}: expected a JSON object", source_name, line_no));
                }
                Err(e) => {
                    tracing::warn!(source = source_name, line = line_no, error = %e, "Skipping malformed JSON line");
                    result
                        .warnings
                        .push(format!("{}:{}: {}", source_name, line_no, e));
                }
            }
        }

        result.columns = seen.into_iter().collect();

        for (line_no, cells) in rows {
            let cell = |column: Column| cells.get(&column).map(String::as_str);
            match build_record(&result.columns, NumberLocale::DecimalPoint, cell) {
                Ok(event) => result.records.push(event),
                Err(reason) => {
                    result
                        .warnings
                        .push(format!("{}:{}: {}", source_name, line_no, reason));
                }
            }
        }

        tracing::debug!(
            source = source_name,
            rows = result.records.len(),
            skipped = result.warnings.len(),
            "Parsed JSONL export"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_jsonl() {
        let input = r#"{"player":"Alice","chest":"Rare","source":"Crypt","score":25,"date":"2024-02-01"}

{"PLAYER":"Bob","CHEST":"Gold","SOURCE":"Arena","SCORE":"40"}
not json
[1,2]
"#;
        let result = JsonlParser::new()
            .parse("events.jsonl", &mut input.as_bytes())
            .unwrap();

        assert_eq!(result.columns, Column::ALL.to_vec());
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].score, 25.0);
        assert_eq!(result.records[1].score, 40.0);
        assert_eq!(result.records[1].date, None);
        assert_eq!(result.warnings.len(), 2);
    }

    #[test]
    fn test_can_parse_by_extension() {
        let parser = JsonlParser::new();
        assert!(parser.can_parse(std::path::Path::new("a/b/events.JSONL")));
        assert!(!parser.can_parse(std::path::Path::new("events.csv")));
    }
}
