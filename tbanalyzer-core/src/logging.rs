//! Logging for tbanalyzer
//!
//! Analysis runs log to [`Config::log_path`], rotated daily. The console stays
//! free for the CLI's own output; `--verbose` raises this crate and the CLI to
//! `debug` unless `RUST_LOG` says otherwise.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use std::ffi::OsStr;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

/// Filter used when `RUST_LOG` is unset.
fn filter_directive(config: &LoggingConfig, verbose: bool) -> String {
    if verbose {
        format!("{},tbanalyzer=debug,tbanalyzer_core=debug", config.level)
    } else {
        config.level.clone()
    }
}

fn build_filter(config: &LoggingConfig, verbose: bool) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    let directive = filter_directive(config, verbose);
    EnvFilter::try_new(&directive)
        .map_err(|e| Error::Config(format!("invalid logging.level '{}': {}", config.level, e)))
}

/// Start file logging for an analysis run.
///
/// Keeps at most `max_files` rotated logs. The returned guard flushes
/// buffered lines when dropped, so hold it until the run ends.
pub fn init(config: &LoggingConfig, verbose: bool) -> Result<LoggingGuard> {
    let filter = build_filter(config, verbose)?;

    let log_path = Config::log_path();
    let log_dir = log_path.parent().map(|p| p.to_path_buf()).unwrap_or_default();
    let file_name = log_path
        .file_name()
        .and_then(OsStr::to_str)
        .unwrap_or("tbanalyzer.log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(file_name)
        .max_log_files(config.max_files.max(1))
        .build(&log_dir)
        .map_err(|e| Error::Config(format!("failed to create log appender: {}", e)))?;
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    // Closed spans carry the analysis timings
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_span_events(FmtSpan::CLOSE);

    // Already initialized (a test harness, or a second call) keeps the first
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .try_init();

    tracing::info!(
        path = %log_path.display(),
        level = %config.level,
        verbose,
        "Logging started"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// Log to the test writer, honoring `RUST_LOG`.
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}

/// Flushes pending log lines on drop.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}
