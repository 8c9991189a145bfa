//! tbanalyzer - chest analytics for Total Battle clans
//!
//! Loads chest exports, runs the player / chest / source analyses and prints
//! the results, optionally exporting a report and a chart.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tbanalyzer_core::analytics::{
    create_manager_with_epsilon, metrics_registry, AnalysisScope, MetricField, MetricTable,
    Outcome, OverviewStats, ResultBundle, View,
};
use tbanalyzer_core::cache::{open_cache, AnalysisCache, NoopCache};
use tbanalyzer_core::chart::{render_chart, ChartConfiguration, ChartKind, SortOrder};
use tbanalyzer_core::format::{format_date_range, format_metric, format_score};
use tbanalyzer_core::ingest;
use tbanalyzer_core::report::{ReportFormat, ReportGenerator, ReportTemplate};
use tbanalyzer_core::Config;

#[derive(Parser, Debug)]
#[command(name = "tbanalyzer")]
#[command(about = "Analyze Total Battle chest exports")]
#[command(version)]
struct Args {
    /// CSV / JSONL exports or glob patterns (e.g. "exports/*.csv")
    inputs: Vec<String>,

    /// Analysis scope: all, player, chest or source
    #[arg(short, long, default_value = "all")]
    scope: String,

    /// Output format: text (default) or json
    #[arg(short, long, default_value = "text")]
    format: String,

    /// Rows shown per table in text output
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Write a report (format from extension: .html, .md)
    #[arg(long)]
    report: Option<PathBuf>,

    /// Write an SVG chart
    #[arg(long)]
    chart: Option<PathBuf>,

    /// View to chart (default: <scope>_distribution)
    #[arg(long)]
    chart_view: Option<String>,

    /// Chart kind: bar, horizontal_bar, pie, line, scatter
    #[arg(long, default_value = "bar")]
    chart_kind: String,

    /// Metric to plot (e.g. TOTAL_SCORE, EFFICIENCY)
    #[arg(long, default_value = "TOTAL_SCORE")]
    chart_field: String,

    /// Key column for chart categories (default: first key column of the view)
    #[arg(long)]
    chart_column: Option<String>,

    /// Chart row order: desc, asc or none
    #[arg(long, default_value = "desc")]
    chart_sort: String,

    /// Bypass the result cache for this run
    #[arg(long)]
    no_cache: bool,

    /// Remove all cached results before running
    #[arg(long)]
    clear_cache: bool,

    /// List metric columns without running analysis
    #[arg(long)]
    list_metrics: bool,

    /// Verbose output (skipped-row warnings, cache stats)
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    Config::ensure_xdg_env();

    // Load configuration
    let config = Config::load().context("failed to load configuration")?;

    // Initialize logging
    let _log_guard = tbanalyzer_core::logging::init(&config.logging, args.verbose)
        .context("failed to initialize logging")?;

    if args.list_metrics {
        print_metrics();
        return Ok(());
    }

    let scope: AnalysisScope = args.scope.parse().context("invalid --scope")?;
    if args.format != "text" && args.format != "json" {
        anyhow::bail!("Unknown format: {}. Use 'text' or 'json'", args.format);
    }

    let cache: Box<dyn AnalysisCache> = if args.no_cache {
        Box::new(NoopCache::new())
    } else {
        open_cache(&config.cache).context("failed to open analysis cache")?
    };
    let manager = create_manager_with_epsilon(cache, config.analysis.efficiency_epsilon)
        .with_debug(config.analysis.debug);

    if args.clear_cache {
        let removed = manager.clear_cache().context("failed to clear cache")?;
        println!("Cleared {} cached result(s)", removed);
        if args.inputs.is_empty() {
            return Ok(());
        }
    }

    if args.inputs.is_empty() {
        anyhow::bail!("No input files given. Pass one or more CSV/JSONL exports.");
    }

    let loaded = ingest::load_inputs(&args.inputs).context("failed to load inputs")?;
    if !loaded.warnings.is_empty() {
        eprintln!("Skipped {} malformed row(s)", loaded.warnings.len());
        if args.verbose {
            for warning in &loaded.warnings {
                eprintln!("  {}", warning);
            }
        }
    }

    tracing::info!(
        files = loaded.files.len(),
        rows = loaded.table.len(),
        skipped = loaded.warnings.len(),
        scope = %scope,
        "Running analysis"
    );

    let bundle = manager
        .analyze(&loaded.table, scope)
        .context("analysis failed")?;

    if args.format == "json" {
        let output = serde_json::json!({
            "files": loaded.files,
            "skipped_rows": loaded.warnings.len(),
            "cache": manager.cache_name(),
            "stats": manager.stats(),
            "bundle": bundle,
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        println!(
            "Analyzed {} row(s) from {} file(s), scope {}\n",
            loaded.table.len(),
            loaded.files.len(),
            scope
        );
        print_bundle(&bundle, args.top);
    }

    if let Some(path) = &args.report {
        let format = ReportFormat::from_path(path).unwrap_or(ReportFormat::Html);
        let template = ReportTemplate::standard(&config.chart)?.for_scope(scope);
        ReportGenerator::from_template(template, &config.report)
            .export(&bundle, path, format)
            .with_context(|| format!("failed to export report to {}", path.display()))?;
        eprintln!("Report written to {}", path.display());
    }

    if let Some(path) = &args.chart {
        let view = args
            .chart_view
            .clone()
            .unwrap_or_else(|| default_chart_view(scope));
        let table = bundle
            .table(&view)
            .cloned()
            .unwrap_or_else(|| MetricTable::new(&[]));
        let column = args
            .chart_column
            .clone()
            .or_else(|| table.key_columns.first().cloned())
            .unwrap_or_else(|| "PLAYER".to_string());
        let field = MetricField::from_name(&args.chart_field)
            .with_context(|| format!("unknown metric field '{}'", args.chart_field))?;
        let kind: ChartKind = args.chart_kind.parse()?;
        let sort: SortOrder = args.chart_sort.parse()?;

        let chart_config = ChartConfiguration::builder(kind, &column, field)
            .title(&format!("{} by {}", field, column.to_ascii_lowercase()))
            .defaults(&config.chart)
            .sort(sort)
            .build()?;
        let chart = render_chart(&table, &chart_config)?;
        chart
            .save(path)
            .with_context(|| format!("failed to write chart to {}", path.display()))?;
        eprintln!("Chart written to {}", path.display());
    }

    if args.verbose {
        let stats = manager.stats();
        eprintln!(
            "Cache ({}): {} hit(s), {} miss(es)",
            manager.cache_name(),
            stats.cache_hits,
            stats.cache_misses
        );
    }

    Ok(())
}

fn default_chart_view(scope: AnalysisScope) -> String {
    match scope {
        AnalysisScope::All => "player_distribution".to_string(),
        other => format!("{}_distribution", other),
    }
}

fn print_metrics() {
    println!("Available metrics:");
    for metric in metrics_registry::list_metrics() {
        println!(
            "  - {:<12} [{}] {}",
            metric.field.name(),
            metric.scope.as_str(),
            metric.summary
        );
        println!("      {}", metric.formula);
    }
}

fn print_bundle(bundle: &ResultBundle, top: usize) {
    for (name, outcome) in &bundle.views {
        match outcome {
            Outcome::Ready(View::Overview(stats)) => {
                println!("{}", name);
                print_overview(stats);
            }
            Outcome::Ready(View::Table(table)) => {
                println!("{} ({} rows)", name, table.len());
                print_table(table, top);
            }
            Outcome::Ready(View::Trends(trends)) => {
                println!(
                    "{} ({} monthly rows, {} undated row(s) skipped)",
                    name,
                    trends.monthly.len(),
                    trends.dropped_rows
                );
                print_table(&trends.monthly, top);
            }
            Outcome::Empty(reason) => println!("{}: no data ({})", name, reason),
            Outcome::Failed(reason) => println!("{}: FAILED ({})", name, reason),
        }
        println!();
    }
}

fn print_overview(stats: &OverviewStats) {
    println!(
        "   Chests: {:<10} Total: {:<10} Mean: {}",
        stats.total_chests,
        format_score(stats.total_score),
        format_metric(stats.mean_score)
    );
    println!(
        "   Groups: {:<10} Dates: {}",
        stats.unique_groups,
        format_date_range(stats.date_range)
    );
    if let Some(top) = &stats.top_group {
        println!("   Top:    {} ({})", top.key, format_score(top.total_score));
    }
}

fn print_table(table: &MetricTable, top: usize) {
    let (header, rows) = table.cells(top);

    let widths: Vec<usize> = (0..header.len())
        .map(|i| {
            rows.iter()
                .map(|r| r[i].chars().count())
                .chain(std::iter::once(header[i].len()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let render = |cells: &[String]| {
        cells
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{:<width$}", c, width = w))
            .collect::<Vec<_>>()
            .join("  ")
    };

    println!("   {}", render(&header));
    for row in &rows {
        println!("   {}", render(row));
    }
    if table.len() > top {
        println!("   ... {} more", table.len() - top);
    }
}
