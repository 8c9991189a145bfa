//! Result bundles: the named views produced by one analysis run.

use super::metric_table::{MetricTable, OverviewStats, TimeTrends};
use super::outcome::Outcome;
use crate::error::Error;
use crate::types::Dimension;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

/// Which services an analysis run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisScope {
    All,
    Player,
    Chest,
    Source,
}

impl AnalysisScope {
    pub const ALL: [AnalysisScope; 4] = [
        AnalysisScope::All,
        AnalysisScope::Player,
        AnalysisScope::Chest,
        AnalysisScope::Source,
    ];

    /// Operation name used in cache keys.
    pub fn operation_name(&self) -> &'static str {
        match self {
            AnalysisScope::All => "analyze_all",
            AnalysisScope::Player => "player_only",
            AnalysisScope::Chest => "chest_only",
            AnalysisScope::Source => "source_only",
        }
    }

    /// Whether a service along `dimension` takes part in this scope.
    pub fn includes(&self, dimension: Dimension) -> bool {
        match self {
            AnalysisScope::All => true,
            AnalysisScope::Player => dimension == Dimension::Player,
            AnalysisScope::Chest => dimension == Dimension::Chest,
            AnalysisScope::Source => dimension == Dimension::Source,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisScope::All => "all",
            AnalysisScope::Player => "player",
            AnalysisScope::Chest => "chest",
            AnalysisScope::Source => "source",
        }
    }
}

impl std::fmt::Display for AnalysisScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AnalysisScope {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "analyze_all" => Ok(AnalysisScope::All),
            "player" | "players" | "player_only" => Ok(AnalysisScope::Player),
            "chest" | "chests" | "chest_only" => Ok(AnalysisScope::Chest),
            "source" | "sources" | "source_only" => Ok(AnalysisScope::Source),
            other => Err(Error::Config(format!(
                "unknown analysis scope '{}' (expected all, player, chest or source)",
                other
            ))),
        }
    }
}

/// Payload of a single view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum View {
    Overview(OverviewStats),
    Table(MetricTable),
    Trends(TimeTrends),
}

impl View {
    /// The metric table behind this view, if it has one.
    ///
    /// Trend views expose their monthly table.
    pub fn table(&self) -> Option<&MetricTable> {
        match self {
            View::Table(table) => Some(table),
            View::Trends(trends) => Some(&trends.monthly),
            View::Overview(_) => None,
        }
    }

    pub fn overview(&self) -> Option<&OverviewStats> {
        match self {
            View::Overview(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn trends(&self) -> Option<&TimeTrends> {
        match self {
            View::Trends(trends) => Some(trends),
            _ => None,
        }
    }
}

/// Named view outcomes from one analysis run.
///
/// View names follow `<service>_<operation>`, e.g. `player_distribution`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultBundle {
    pub scope: AnalysisScope,
    /// Fingerprint of the input table
    pub fingerprint: String,
    /// Rows in the input table
    pub row_count: usize,
    pub computed_at: DateTime<Utc>,
    pub views: BTreeMap<String, Outcome<View>>,
}

impl ResultBundle {
    pub fn new(scope: AnalysisScope, fingerprint: String, row_count: usize) -> Self {
        Self {
            scope,
            fingerprint,
            row_count,
            computed_at: Utc::now(),
            views: BTreeMap::new(),
        }
    }

    pub fn insert(&mut self, name: impl Into<String>, outcome: Outcome<View>) {
        self.views.insert(name.into(), outcome);
    }

    pub fn view(&self, name: &str) -> Option<&Outcome<View>> {
        self.views.get(name)
    }

    /// Metric table of a ready view (distribution, cross-effectiveness, or
    /// the monthly table of a trends view).
    pub fn table(&self, name: &str) -> Option<&MetricTable> {
        self.view(name)?.ready()?.table()
    }

    pub fn overview(&self, name: &str) -> Option<&OverviewStats> {
        self.view(name)?.ready()?.overview()
    }

    pub fn trends(&self, name: &str) -> Option<&TimeTrends> {
        self.view(name)?.ready()?.trends()
    }

    pub fn view_names(&self) -> Vec<&str> {
        self.views.keys().map(|k| k.as_str()).collect()
    }

    /// Names of views that failed, with their reasons.
    pub fn failures(&self) -> Vec<(&str, &str)> {
        self.views
            .iter()
            .filter_map(|(name, outcome)| match outcome {
                Outcome::Failed(reason) => Some((name.as_str(), reason.as_str())),
                _ => None,
            })
            .collect()
    }

    /// Whether two bundles carry the same views for the same input.
    ///
    /// Ignores `computed_at`.
    pub fn same_results(&self, other: &ResultBundle) -> bool {
        self.scope == other.scope
            && self.fingerprint == other.fingerprint
            && self.row_count == other.row_count
            && self.views == other.views
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::outcome::EmptyReason;

    #[test]
    fn test_scope_parsing() {
        assert_eq!("Player".parse::<AnalysisScope>().unwrap(), AnalysisScope::Player);
        assert_eq!("sources".parse::<AnalysisScope>().unwrap(), AnalysisScope::Source);
        assert_eq!(
            "analyze_all".parse::<AnalysisScope>().unwrap(),
            AnalysisScope::All
        );
        assert!("everything".parse::<AnalysisScope>().is_err());

        for scope in AnalysisScope::ALL {
            assert_eq!(scope.to_string().parse::<AnalysisScope>().unwrap(), scope);
        }
    }

    #[test]
    fn test_scope_operation_names_are_distinct() {
        let mut names: Vec<_> = AnalysisScope::ALL.iter().map(|s| s.operation_name()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), 4);
        assert!(AnalysisScope::Chest.includes(Dimension::Chest));
        assert!(!AnalysisScope::Chest.includes(Dimension::Player));
    }

    #[test]
    fn test_bundle_accessors() {
        let mut bundle = ResultBundle::new(AnalysisScope::Player, "abc".to_string(), 0);
        bundle.insert(
            "player_distribution",
            Outcome::Ready(View::Table(MetricTable::new(&["PLAYER"]))),
        );
        bundle.insert("player_overview", Outcome::Empty(EmptyReason::NoRows));
        bundle.insert("player_time_trends", Outcome::Failed("boom".to_string()));

        assert!(bundle.table("player_distribution").is_some());
        assert!(bundle.overview("player_overview").is_none());
        assert_eq!(bundle.failures(), vec![("player_time_trends", "boom")]);
        assert_eq!(
            bundle.view_names(),
            vec!["player_distribution", "player_overview", "player_time_trends"]
        );
    }

    #[test]
    fn test_bundle_json_round_trip() {
        let mut bundle = ResultBundle::new(AnalysisScope::All, "f00".to_string(), 3);
        bundle.insert(
            "chest_distribution",
            Outcome::Ready(View::Table(MetricTable::new(&["CHEST"]))),
        );
        let json = serde_json::to_string(&bundle).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["views"]["chest_distribution"]["data"]["kind"], "table");

        let back: ResultBundle = serde_json::from_str(&json).unwrap();
        assert!(back.same_results(&bundle));
    }
}
