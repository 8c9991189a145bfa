//! CSV export parser
//!
//! Total Battle exports are either comma or semicolon separated depending on
//! the locale of the exporting tool. The delimiter is sniffed from the header.

use super::build_record;
use crate::error::{Error, Result};
use crate::ingest::parser::{EventParser, NumberLocale, ParseResult};
use crate::types::Column;
use std::collections::HashMap;
use std::io::Read;

pub struct CsvParser;

impl CsvParser {
    pub fn new() -> Self {
        Self
    }

    /// Pick `;` when the header has more semicolons than commas.
    fn sniff_delimiter(content: &str) -> u8 {
        let header = content.lines().next().unwrap_or("");
        let semicolons = header.matches(';').count();
        let commas = header.matches(',').count();
        if semicolons > commas {
            b';'
        } else {
            b','
        }
    }
}

impl Default for CsvParser {
    fn default() -> Self {
        Self::new()
    }
}

impl EventParser for CsvParser {
    fn name(&self) -> &'static str {
        "csv"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["csv", "txt"]
    }

    fn parse(&self, source_name: &str, input: &mut dyn Read) -> Result<ParseResult> {
        let mut content = String::new();
        input.read_to_string(&mut content)?;
        // Spreadsheet exports often start with a UTF-8 BOM
        let content = content.trim_start_matches('\u{feff}');

        let delimiter = Self::sniff_delimiter(content);
        // Semicolon exports come from locales that write decimal commas
        let locale = if delimiter == b';' {
            NumberLocale::DecimalComma
        } else {
            NumberLocale::DecimalPoint
        };

        let mut reader = ::csv::ReaderBuilder::new()
            .delimiter(delimiter)
            .trim(::csv::Trim::All)
            .flexible(true)
            .from_reader(content.as_bytes());

        let mut index: HashMap<Column, usize> = HashMap::new();
        for (i, header) in reader.headers()?.iter().enumerate() {
            if let Some(column) = Column::from_header(header) {
                index.entry(column).or_insert(i);
            }
        }

        if index.is_empty() {
            return Err(Error::Parse {
                source_name: source_name.to_string(),
                message: "header has none of PLAYER, CHEST, SOURCE, SCORE, DATE".to_string(),
            });
        }

        let columns: Vec<Column> = Column::ALL
            .into_iter()
            .filter(|c| index.contains_key(c))
            .collect();

        let mut result = ParseResult {
            columns,
            ..Default::default()
        };

        for (row, record) in reader.records().enumerate() {
            // Header is line 1
            let line = row + 2;
            let record = match record {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!(source = source_name, line, error = %e, "Skipping unreadable CSV row");
                    result.warnings.push(format!("{}:{}: {}", source_name, line, e));
                    continue;
                }
            };

            let cell = |column: Column| index.get(&column).and_then(|&i| record.get(i));
            match build_record(&result.columns, locale, cell) {
                Ok(event) => result.records.push(event),
                Err(reason) => {
                    tracing::warn!(source = source_name, line, %reason, "Skipping CSV row");
                    result
                        .warnings
                        .push(format!("{}:{}: {}", source_name, line, reason));
                }
            }
        }

        tracing::debug!(
            source = source_name,
            rows = result.records.len(),
            skipped = result.warnings.len(),
            "Parsed CSV export"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(content: &str) -> Result<ParseResult> {
        CsvParser::new().parse("test.csv", &mut content.as_bytes())
    }

    #[test]
    fn test_parse_comma_separated() {
        let result = parse(
            "DATE,PLAYER,SOURCE,CHEST,SCORE,CLAN\n\
             2024-01-05,Alice,Level 25 Crypt,Rare Chest,25,XYZ\n\
             2024-01-06,Bob,Arena,Gold Chest,40,XYZ\n",
        )
        .unwrap();

        assert_eq!(result.columns, Column::ALL.to_vec());
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].player, "Alice");
        assert_eq!(result.records[0].chest_type, "Rare Chest");
        assert_eq!(result.records[0].source, "Level 25 Crypt");
        assert_eq!(result.records[1].score, 40.0);
        assert_eq!(result.records[1].date.as_deref(), Some("2024-01-06"));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_parse_semicolon_with_bom() {
        let result = parse(
            "\u{feff}player;chest;source;score\n\
             Alice;Rare;Crypt;1,5\n\
             Bob;Rare;Crypt;1.250,75\n",
        )
        .unwrap();
        assert_eq!(result.records.len(), 2);
        assert_eq!(result.records[0].score, 1.5);
        assert_eq!(result.records[1].score, 1250.75);
        assert!(!result.columns.contains(&Column::Date));
    }

    #[test]
    fn test_comma_file_keeps_thousands_grouping() {
        let result = parse(
            "PLAYER,CHEST,SOURCE,SCORE\n\
             Alice,Rare,Crypt,\"1,250\"\n\
             Bob,Rare,Crypt,\"1,5\"\n",
        )
        .unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.records[0].score, 1250.0);
        assert!(result.warnings[0].contains("unparsable SCORE"));
    }

    #[test]
    fn test_bad_rows_become_warnings() {
        let result = parse(
            "PLAYER,CHEST,SOURCE,SCORE\n\
             Alice,Rare,Crypt,ten\n\
             ,Rare,Crypt,10\n\
             Bob,Rare,Crypt,10\n",
        )
        .unwrap();
        assert_eq!(result.records.len(), 1);
        assert_eq!(result.warnings.len(), 2);
        assert!(result.warnings[0].starts_with("test.csv:2:"));
    }

    #[test]
    fn test_missing_score_column_is_kept_absent() {
        let result = parse("PLAYER,CHEST,SOURCE\nAlice,Rare,Crypt\n").unwrap();
        let (table, _) = result.into_table();
        assert_eq!(table.len(), 1);
        assert!(table.scores().is_none());
    }

    #[test]
    fn test_unrecognised_header_is_error() {
        let err = parse("foo,bar\n1,2\n").unwrap_err();
        assert!(matches!(err, Error::Parse { .. }));
    }
}
