//! End-to-end checks: load exports, analyze, cache, render.

use std::path::PathBuf;
use tbanalyzer_core::analytics::{
    create_default_manager, create_manager_with_epsilon, AnalysisScope, EmptyReason, MetricField,
    Outcome,
};
use tbanalyzer_core::cache::{MemoryCache, SqliteCache};
use tbanalyzer_core::chart::{render_chart, ChartConfiguration, ChartKind};
use tbanalyzer_core::config::{ChartDefaults, ReportDefaults};
use tbanalyzer_core::ingest;
use tbanalyzer_core::report::{ReportFormat, ReportGenerator, ReportTemplate};
use tbanalyzer_core::{Column, EventRecord, EventTable};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(name)
}

fn load_fixture() -> EventTable {
    tbanalyzer_core::logging::init_test();
    let loaded = ingest::load_path(&fixture("chests.csv")).expect("fixture should load");
    assert_eq!(loaded.warnings.len(), 1, "the 'oops' score row is skipped");
    loaded.table
}

#[test]
fn fixture_loads_with_all_columns() {
    let table = load_fixture();
    assert_eq!(table.len(), 6);
    assert_eq!(table.columns(), Column::ALL.to_vec());
}

#[test]
fn distribution_conserves_totals_and_counts() {
    let table = load_fixture();
    let bundle = create_default_manager(Box::new(MemoryCache::new()))
        .analyze_all(&table)
        .unwrap();

    for service in ["player", "chest", "source"] {
        let dist = bundle
            .table(&format!("{}_distribution", service))
            .unwrap_or_else(|| panic!("{} distribution should be ready", service));

        assert_eq!(dist.sum(MetricField::TotalScore), 240.0);
        assert_eq!(dist.sum(MetricField::Count), 6.0);
        for row in &dist.rows {
            let rarity = row.field(MetricField::Rarity).unwrap();
            let consistency = row.field(MetricField::Consistency).unwrap();
            assert!((0.0..=1.0).contains(&rarity), "rarity {}", rarity);
            assert!((0.0..=1.0).contains(&consistency), "consistency {}", consistency);
        }
    }
}

#[test]
fn worked_example() {
    let table = EventTable::from_records(vec![
        EventRecord::new("A", "Gold", "Guild", 100.0),
        EventRecord::new("A", "Silver", "Guild", 50.0),
        EventRecord::new("B", "Gold", "Arena", 200.0),
    ]);
    let bundle = create_default_manager(Box::new(MemoryCache::new()))
        .player_only(&table)
        .unwrap();

    let dist = bundle.table("player_distribution").unwrap();
    let a = dist.row(&["A"]).unwrap();
    assert_eq!((a.stats.total, a.stats.count), (150.0, 2));
    let b = dist.row(&["B"]).unwrap();
    assert_eq!((b.stats.total, b.stats.count), (200.0, 1));

    let overview = bundle.overview("player_overview").unwrap();
    assert_eq!(overview.total_score, 350.0);
    assert_eq!(overview.total_chests, 3);
    assert_eq!(overview.unique_players, Some(2));
}

#[test]
fn bad_date_row_only_leaves_time_trends() {
    let table = load_fixture();
    let bundle = create_default_manager(Box::new(MemoryCache::new()))
        .player_only(&table)
        .unwrap();

    let overview = bundle.overview("player_overview").unwrap();
    assert_eq!(overview.total_chests, 6);
    assert_eq!(overview.total_score, 240.0);

    let trends = bundle.trends("player_time_trends").unwrap();
    assert_eq!(trends.dropped_rows, 1);
    assert_eq!(trends.monthly.sum(MetricField::TotalScore), 140.0);
    assert!(trends.monthly.rows.iter().all(|r| r.key[0] != "Carol" || r.key[2] == "02"));

    let daily = trends.daily.as_ref().unwrap();
    assert_eq!(daily.row(&["Alice", "2024-01-05"]).unwrap().stats.total, 65.0);
}

#[test]
fn empty_and_scoreless_tables_are_empty_everywhere() {
    let manager = create_default_manager(Box::new(MemoryCache::new()));

    let empty = manager.analyze_all(&EventTable::empty()).unwrap();
    assert!(empty
        .views
        .values()
        .all(|o| *o == Outcome::Empty(EmptyReason::NoRows)));

    let scoreless = load_fixture().without_column(Column::Score);
    let bundle = manager.analyze_all(&scoreless).unwrap();
    assert_eq!(bundle.views.len(), 12);
    assert!(bundle.views.values().all(|o| *o
        == Outcome::Empty(EmptyReason::MissingColumn {
            column: Column::Score
        })));
}

#[test]
fn repeated_analysis_is_served_from_cache() {
    let table = load_fixture();
    let manager = create_default_manager(Box::new(MemoryCache::new()));

    let first = manager.analyze(&table, AnalysisScope::Source).unwrap();
    let second = manager.analyze(&table, AnalysisScope::Source).unwrap();
    assert_eq!(first, second);
    assert_eq!(manager.stats().cache_hits, 1);

    manager.clear_cache().unwrap();
    let third = manager.analyze(&table, AnalysisScope::Source).unwrap();
    assert!(third.same_results(&first));
    assert_eq!(manager.stats().computations, 2);
}

#[test]
fn sqlite_cache_is_shared_across_managers() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analysis_cache.db");
    let table = load_fixture();

    let first = create_default_manager(Box::new(SqliteCache::open(&path).unwrap()))
        .chest_only(&table)
        .unwrap();

    let manager = create_default_manager(Box::new(SqliteCache::open(&path).unwrap()));
    let second = manager.chest_only(&table).unwrap();
    assert_eq!(manager.stats().cache_hits, 1);
    assert!(second.same_results(&first));
}

#[test]
fn overflowing_scores_fail_and_survive_the_sqlite_cache() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("analysis_cache.db");
    let table = EventTable::from_records(vec![
        EventRecord::new("A", "Gold", "Guild", 1e308),
        EventRecord::new("A", "Gold", "Guild", 1e308),
    ]);

    let first = create_default_manager(Box::new(SqliteCache::open(&path).unwrap()))
        .player_only(&table)
        .unwrap();
    assert!(matches!(
        first.view("player_distribution"),
        Some(Outcome::Failed(reason)) if reason.contains("overflow")
    ));

    let manager = create_default_manager(Box::new(SqliteCache::open(&path).unwrap()));
    let second = manager.player_only(&table).unwrap();
    assert_eq!(manager.stats().cache_hits, 1);
    assert!(second.same_results(&first));
}

#[test]
fn epsilon_changes_cache_key_and_efficiency() {
    let table = load_fixture();
    let cache_path = tempfile::tempdir().unwrap();
    let path = cache_path.path().join("analysis_cache.db");

    let default = create_default_manager(Box::new(SqliteCache::open(&path).unwrap()))
        .player_only(&table)
        .unwrap();
    let manager = create_manager_with_epsilon(Box::new(SqliteCache::open(&path).unwrap()), 0.5);
    let custom = manager.player_only(&table).unwrap();

    assert_eq!(manager.stats().cache_hits, 0);
    let efficiency = |bundle: &tbanalyzer_core::ResultBundle| {
        bundle
            .table("player_distribution")
            .unwrap()
            .row(&["Carol"])
            .unwrap()
            .field(MetricField::Efficiency)
            .unwrap()
    };
    assert!(efficiency(&default) > efficiency(&custom));
}

#[test]
fn report_and_chart_from_fixture() {
    let table = load_fixture();
    let bundle = create_default_manager(Box::new(MemoryCache::new()))
        .analyze_all(&table)
        .unwrap();

    let template = ReportTemplate::standard(&ChartDefaults::default()).unwrap();
    let html = ReportGenerator::from_template(template, &ReportDefaults::default())
        .generate(&bundle, ReportFormat::Html)
        .unwrap();
    assert!(html.contains("Carol"));
    assert!(html.contains("<h2>Source cross-effectiveness</h2>"));
    assert!(!html.contains("No data"));

    let config = ChartConfiguration::builder(ChartKind::Pie, "CHEST", MetricField::Share)
        .pie_max_categories(2)
        .build()
        .unwrap();
    let chart = render_chart(bundle.table("chest_distribution").unwrap(), &config).unwrap();
    assert!(!chart.placeholder);
    assert!(chart.svg.contains("Others"));
}
