//! Ingestion of chest exports
//!
//! Turns one or more export files into a single [`EventTable`].
//!
//! ## Flow
//!
//! ```text
//! inputs (paths or glob patterns)
//!     │
//!     ▼
//! resolve_inputs() ── sorted, de-duplicated file list
//!     │
//!     ▼
//! parser_for(path) ── CsvParser / JsonlParser by extension
//!     │
//!     ▼
//! EventParser::parse() ── records + warnings per file
//!     │
//!     ▼
//! EventTable::append() ── one table, columns common to every file
//! ```

pub mod parser;
pub mod parsers;

pub use parser::{EventParser, ParseResult};

use crate::error::{Error, Result};
use crate::types::EventTable;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Outcome of loading one or more inputs.
#[derive(Debug, Default)]
pub struct LoadResult {
    /// Combined table
    pub table: EventTable,
    /// Files that were read, in load order
    pub files: Vec<PathBuf>,
    /// Skipped-row warnings from every file
    pub warnings: Vec<String>,
}

/// All built-in parsers.
pub fn default_parsers() -> Vec<Box<dyn EventParser>> {
    vec![
        Box::new(parsers::CsvParser::new()),
        Box::new(parsers::JsonlParser::new()),
    ]
}

/// Pick the parser for a path by extension.
pub fn parser_for(path: &Path) -> Option<Box<dyn EventParser>> {
    default_parsers().into_iter().find(|p| p.can_parse(path))
}

/// Parse an in-memory or streamed input with the given parser.
pub fn load_reader(
    parser: &dyn EventParser,
    source_name: &str,
    input: &mut dyn Read,
) -> Result<LoadResult> {
    let (table, warnings) = parser.parse(source_name, input)?.into_table();
    Ok(LoadResult {
        table,
        files: Vec::new(),
        warnings,
    })
}

/// Load a single export file.
pub fn load_path(path: &Path) -> Result<LoadResult> {
    let parser = parser_for(path).ok_or_else(|| {
        Error::Unsupported(format!(
            "no parser for {} (expected .csv, .txt, .jsonl or .ndjson)",
            path.display()
        ))
    })?;

    let mut file = File::open(path)?;
    let source_name = path.display().to_string();
    let mut result = load_reader(parser.as_ref(), &source_name, &mut file)?;
    result.files.push(path.to_path_buf());

    tracing::info!(
        path = %path.display(),
        parser = parser.name(),
        rows = result.table.len(),
        warnings = result.warnings.len(),
        "Loaded export"
    );

    Ok(result)
}

/// Expand inputs into a sorted list of files.
///
/// Each input is either an existing path or a glob pattern.
pub fn resolve_inputs<S: AsRef<str>>(inputs: &[S]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for input in inputs {
        let input = input.as_ref();
        let path = Path::new(input);
        if path.exists() {
            files.push(path.to_path_buf());
            continue;
        }

        let mut matched: Vec<PathBuf> = glob::glob(input)?
            .filter_map(|entry| match entry {
                Ok(p) => Some(p),
                Err(e) => {
                    tracing::warn!(error = %e, "Unreadable path while expanding pattern");
                    None
                }
            })
            .filter(|p| p.is_file())
            .collect();

        if matched.is_empty() {
            return Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                format!("no input matches {}", input),
            )));
        }

        matched.sort();
        files.extend(matched);
    }

    files.dedup();
    Ok(files)
}

/// Load and combine every file named by `inputs`.
pub fn load_inputs<S: AsRef<str>>(inputs: &[S]) -> Result<LoadResult> {
    let mut combined = LoadResult::default();

    for path in resolve_inputs(inputs)? {
        let loaded = load_path(&path)?;
        combined.table.append(loaded.table);
        combined.files.extend(loaded.files);
        combined.warnings.extend(loaded.warnings);
    }

    Ok(combined)
}
