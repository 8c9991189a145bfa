//! Error types for tbanalyzer-core

use thiserror::Error;

/// Main error type for the tbanalyzer-core library
#[derive(Error, Debug)]
pub enum Error {
    /// Cache database error
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV reader error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Malformed input file
    #[error("parse error in {source_name}: {message}")]
    Parse {
        source_name: String,
        message: String,
    },

    /// Invalid glob pattern for multi-file import
    #[error("invalid file pattern: {0}")]
    Pattern(#[from] glob::PatternError),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),

    /// Chart configuration or export error
    #[error("chart error: {0}")]
    Chart(String),

    /// Report generation or export error
    #[error("report error: {0}")]
    Report(String),

    /// Requested capability is not available in this build
    #[error("unsupported: {0}")]
    Unsupported(String),
}

/// Result type alias for tbanalyzer-core
pub type Result<T> = std::result::Result<T, Error>;
