//! Metric services
//!
//! Each service analyzes the event table along one [`Dimension`]:
//!
//! - [`player`]: per-player totals, best source per player, monthly and daily trends
//! - [`chest`]: per-chest-type distribution, best source per chest type
//! - [`source`]: per-source distribution, best chest type per source
//!
//! ## Creating Custom Services
//!
//! 1. Implement [`MetricService`]; the provided methods cover the common
//!    grouped aggregates, override any that need dimension-specific behavior
//! 2. Register it via [`AnalysisManager::register`](super::AnalysisManager::register)
//!
//! Or use [`create_default_manager`] to get a manager with all built-in services.

pub mod chest;
pub mod player;
pub mod source;

pub use chest::ChestService;
pub use player::PlayerService;
pub use source::SourceService;

use super::manager::AnalysisManager;
use super::metric_table::{MetricRow, MetricTable, OverviewStats, TimeTrends, TopGroup};
use super::outcome::{EmptyReason, Halt, Outcome};
use super::stats::{first_non_finite, group_scores, DerivedScores, ScoreStats};
use crate::cache::AnalysisCache;
use crate::types::{Column, Dimension, EventTable};
use chrono::{Datelike, NaiveDate};
use std::collections::{BTreeMap, HashSet};

// ============================================
// Service trait
// ============================================

/// Trait that all metric services implement.
///
/// Services are stateless analyzers over an [`EventTable`]. They should be:
/// - **Deterministic**: Same input produces same output, including row order
/// - **Fault-isolated**: Each operation reports its own [`Outcome`] and never panics
/// - **Complete**: Every group key in the input appears exactly once in a table
pub trait MetricService: Send + Sync {
    /// Unique name, used as the view-name prefix (e.g. "player")
    fn name(&self) -> &str;

    /// Grouping dimension.
    fn dimension(&self) -> Dimension;

    /// Column paired with the dimension in [`cross_effectiveness`](Self::cross_effectiveness).
    fn secondary_column(&self) -> Column;

    /// ε used in `efficiency = value / (rarity + ε)`.
    fn efficiency_epsilon(&self) -> f64;

    /// Parameters that change results; folded into cache keys.
    fn cache_tag(&self) -> String {
        format!(
            "{}:{}:eps={}",
            self.name(),
            self.secondary_column(),
            self.efficiency_epsilon()
        )
    }

    /// Scalar summary: counts, totals, mean, date range.
    fn overview_statistics(&self, table: &EventTable) -> Outcome<OverviewStats> {
        overview(table, self.dimension()).into()
    }

    /// Grouped score aggregates with rarity / value / consistency / efficiency.
    fn distribution(&self, table: &EventTable) -> Outcome<MetricTable> {
        distribution(table, self.dimension(), self.efficiency_epsilon()).into()
    }

    /// Best secondary category per group by mean score.
    fn cross_effectiveness(&self, table: &EventTable) -> Outcome<MetricTable> {
        cross_effectiveness(table, self.dimension(), self.secondary_column()).into()
    }

    /// Monthly aggregates over rows with a parseable date.
    fn time_trends(&self, table: &EventTable) -> Outcome<TimeTrends> {
        monthly_trends(table, self.dimension())
            .map(|(monthly, dropped_rows)| TimeTrends {
                monthly,
                daily: None,
                dropped_rows,
            })
            .into()
    }
}

/// Create a manager with the player, chest and source services registered.
///
/// ```rust,ignore
/// use tbanalyzer_core::analytics::create_default_manager;
/// use tbanalyzer_core::cache::MemoryCache;
///
/// let manager = create_default_manager(Box::new(MemoryCache::new()));
/// println!("Registered services: {:?}", manager.service_names());
/// ```
pub fn create_default_manager(cache: Box<dyn AnalysisCache>) -> AnalysisManager {
    create_manager_with_epsilon(cache, super::stats::DEFAULT_EFFICIENCY_EPSILON)
}

/// Like [`create_default_manager`] with a custom efficiency ε.
pub fn create_manager_with_epsilon(cache: Box<dyn AnalysisCache>, epsilon: f64) -> AnalysisManager {
    let mut manager = AnalysisManager::new(cache);
    manager.register(Box::new(PlayerService::with_epsilon(epsilon)));
    manager.register(Box::new(ChestService::with_epsilon(epsilon)));
    manager.register(Box::new(SourceService::with_epsilon(epsilon)));
    manager
}

// ============================================
// Shared computations
// ============================================

/// Check the table can be grouped along `dimension` and return its columns.
pub(crate) fn require<'a>(
    table: &'a EventTable,
    dimension: Dimension,
) -> Result<(&'a [String], &'a [f64]), Halt> {
    if table.is_empty() {
        return Err(EmptyReason::NoRows.into());
    }
    let scores = table.scores().ok_or(EmptyReason::MissingColumn {
        column: Column::Score,
    })?;
    let keys = table
        .dimension_values(dimension)
        .ok_or(EmptyReason::MissingColumn {
            column: dimension.column(),
        })?;

    if let Some(row) = first_non_finite(scores) {
        return Err(Halt::Failed(format!(
            "SCORE at row {} is not a finite number",
            row
        )));
    }

    Ok((keys, scores))
}

/// Reject groups whose aggregates overflowed.
fn finite<K>(groups: BTreeMap<K, ScoreStats>) -> Result<BTreeMap<K, ScoreStats>, Halt> {
    if groups.values().all(ScoreStats::is_finite) {
        Ok(groups)
    } else {
        Err(overflow())
    }
}

fn overflow() -> Halt {
    Halt::Failed("score aggregates overflow the f64 range".to_string())
}

fn unique_count(values: Option<&[String]>) -> Option<usize> {
    values.map(|v| v.iter().collect::<HashSet<_>>().len())
}

pub(crate) fn overview(table: &EventTable, dimension: Dimension) -> Result<OverviewStats, Halt> {
    let (keys, scores) = require(table, dimension)?;

    let total_score: f64 = scores.iter().sum();
    if !total_score.is_finite() {
        return Err(overflow());
    }
    let groups = finite(group_scores(scores, |i| Some(keys[i].as_str())))?;

    // Highest total wins; BTreeMap order breaks ties by key ascending
    let mut top_group: Option<TopGroup> = None;
    for (key, stats) in &groups {
        if top_group.as_ref().map_or(true, |t| stats.total > t.total_score) {
            top_group = Some(TopGroup {
                key: key.to_string(),
                total_score: stats.total,
            });
        }
    }

    let date_range = table.parsed_dates().and_then(|dates| {
        let mut valid = dates.into_iter().flatten();
        let first = valid.next()?;
        Some(valid.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d))))
    });

    Ok(OverviewStats {
        dimension,
        total_chests: table.len(),
        total_score,
        mean_score: total_score / table.len() as f64,
        unique_groups: groups.len(),
        unique_players: unique_count(table.text_column(Column::Player)),
        unique_chest_types: unique_count(table.text_column(Column::Chest)),
        unique_sources: unique_count(table.text_column(Column::Source)),
        date_range,
        top_group,
    })
}

pub(crate) fn distribution(
    table: &EventTable,
    dimension: Dimension,
    epsilon: f64,
) -> Result<MetricTable, Halt> {
    let (keys, scores) = require(table, dimension)?;

    let total_count = scores.len();
    let grand_total: f64 = scores.iter().sum();

    if !grand_total.is_finite() {
        return Err(overflow());
    }

    let mut result = MetricTable::new(&[dimension.column().name()]);
    for (key, stats) in finite(group_scores(scores, |i| Some(keys[i].as_str())))? {
        let derived = DerivedScores::compute(&stats, total_count, grand_total, epsilon);
        if !derived.is_finite() {
            return Err(overflow());
        }
        result.rows.push(MetricRow {
            key: vec![key.to_string()],
            stats,
            derived: Some(derived),
        });
    }

    // Groups arrive key-ascending, so a stable sort keeps that as the tie-break
    result
        .rows
        .sort_by(|a, b| b.stats.total.total_cmp(&a.stats.total));

    Ok(result)
}

pub(crate) fn cross_effectiveness(
    table: &EventTable,
    dimension: Dimension,
    secondary: Column,
) -> Result<MetricTable, Halt> {
    let (keys, scores) = require(table, dimension)?;
    let secondary_values = table
        .text_column(secondary)
        .ok_or(EmptyReason::MissingColumn { column: secondary })?;

    let pairs = finite(group_scores(scores, |i| {
        Some((keys[i].as_str(), secondary_values[i].as_str()))
    }))?;

    // Pairs arrive sorted by (primary, secondary); strict > keeps the
    // alphabetically first secondary on equal means.
    let mut best: Vec<(&str, &str, ScoreStats)> = Vec::new();
    for ((primary, second), stats) in pairs {
        match best.last_mut() {
            Some(current) if current.0 == primary => {
                if stats.mean > current.2.mean {
                    *current = (primary, second, stats);
                }
            }
            _ => best.push((primary, second, stats)),
        }
    }

    let mut result = MetricTable::new(&[dimension.column().name(), secondary.name()]);
    result.rows = best
        .into_iter()
        .map(|(primary, second, stats)| MetricRow {
            key: vec![primary.to_string(), second.to_string()],
            stats,
            derived: None,
        })
        .collect();

    Ok(result)
}

/// Coerce dates and pair each row with its date; errors when none parse.
fn dated_rows(table: &EventTable) -> Result<(Vec<Option<NaiveDate>>, usize), Halt> {
    let dates = table.parsed_dates().ok_or(EmptyReason::MissingColumn {
        column: Column::Date,
    })?;
    let dropped = dates.iter().filter(|d| d.is_none()).count();
    if dropped == dates.len() {
        return Err(EmptyReason::NoValidDates.into());
    }
    Ok((dates, dropped))
}

pub(crate) fn monthly_trends(
    table: &EventTable,
    dimension: Dimension,
) -> Result<(MetricTable, usize), Halt> {
    let (keys, scores) = require(table, dimension)?;
    let (dates, dropped) = dated_rows(table)?;

    let groups = finite(group_scores(scores, |i| {
        dates[i].map(|d| (keys[i].as_str(), d.year(), d.month()))
    }))?;

    let mut result = MetricTable::new(&[dimension.column().name(), "YEAR", "MONTH"]);
    result.rows = groups
        .into_iter()
        .map(|((key, year, month), stats)| MetricRow {
            key: vec![key.to_string(), year.to_string(), format!("{:02}", month)],
            stats,
            derived: None,
        })
        .collect();

    Ok((result, dropped))
}

pub(crate) fn daily_trends(table: &EventTable, dimension: Dimension) -> Result<MetricTable, Halt> {
    let (keys, scores) = require(table, dimension)?;
    let (dates, _) = dated_rows(table)?;

    let groups = finite(group_scores(scores, |i| dates[i].map(|d| (keys[i].as_str(), d))))?;

    let mut result = MetricTable::new(&[dimension.column().name(), "DATE"]);
    result.rows = groups
        .into_iter()
        .map(|((key, date), stats)| MetricRow {
            key: vec![key.to_string(), date.format("%Y-%m-%d").to_string()],
            stats,
            derived: None,
        })
        .collect();

    Ok(result)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use crate::types::{EventRecord, EventTable};

    /// The three-row example: A/Gold/Guild/100, A/Silver/Guild/50, B/Gold/Arena/200.
    pub fn small_table() -> EventTable {
        EventTable::from_records(vec![
            EventRecord::new("A", "Gold", "Guild", 100.0),
            EventRecord::new("A", "Silver", "Guild", 50.0),
            EventRecord::new("B", "Gold", "Arena", 200.0),
        ])
    }

    /// Dated rows, one with a malformed date.
    pub fn dated_table() -> EventTable {
        EventTable::from_records(vec![
            EventRecord::new("A", "Gold", "Guild", 100.0).with_date("2024-01-05"),
            EventRecord::new("A", "Silver", "Guild", 50.0).with_date("2024-01-20"),
            EventRecord::new("A", "Gold", "Arena", 30.0).with_date("2024-02-01"),
            EventRecord::new("B", "Gold", "Arena", 200.0).with_date("garbage"),
            EventRecord::new("B", "Rare", "Crypt", 10.0).with_date("2024-02-01"),
        ])
    }
}
