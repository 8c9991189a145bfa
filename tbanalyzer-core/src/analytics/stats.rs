//! Grouped score statistics and the composite scores derived from them.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default ε added to rarity when computing efficiency.
pub const DEFAULT_EFFICIENCY_EPSILON: f64 = 0.1;

/// Sum / mean / sample standard deviation / count of a group's scores.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreStats {
    pub total: f64,
    pub mean: f64,
    /// Sample standard deviation (n - 1); 0 for groups of one
    pub std: f64,
    pub count: usize,
}

impl ScoreStats {
    pub fn from_scores(scores: &[f64]) -> Self {
        let count = scores.len();
        if count == 0 {
            return Self::default();
        }

        let total: f64 = scores.iter().sum();
        let mean = total / count as f64;
        let std = if count > 1 {
            let sq: f64 = scores.iter().map(|s| (s - mean).powi(2)).sum();
            (sq / (count - 1) as f64).sqrt()
        } else {
            0.0
        };

        Self {
            total,
            mean,
            std,
            count,
        }
    }

    /// False when an aggregate overflowed `f64`.
    pub fn is_finite(&self) -> bool {
        self.total.is_finite() && self.mean.is_finite() && self.std.is_finite()
    }
}

/// Composite scores for one distribution group.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct DerivedScores {
    /// `1 - count / total_count`, in [0, 1]
    pub rarity: f64,
    /// Mean score of the group
    pub value: f64,
    /// `clamp(1 - std / mean, 0, 1)`
    pub consistency: f64,
    /// `value / (rarity + ε)`
    pub efficiency: f64,
    /// Group total over grand total, in [0, 1]
    pub share: f64,
}

impl DerivedScores {
    pub fn compute(stats: &ScoreStats, total_count: usize, grand_total: f64, epsilon: f64) -> Self {
        let rarity = if total_count == 0 {
            0.0
        } else {
            (1.0 - stats.count as f64 / total_count as f64).clamp(0.0, 1.0)
        };
        let value = stats.mean;
        let efficiency = value / (rarity + epsilon);
        let share = if grand_total == 0.0 {
            0.0
        } else {
            stats.total / grand_total
        };

        Self {
            rarity,
            value,
            consistency: consistency(stats),
            efficiency,
            share,
        }
    }

    pub fn is_finite(&self) -> bool {
        [
            self.rarity,
            self.value,
            self.consistency,
            self.efficiency,
            self.share,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

/// Consistency of a group's scores.
///
/// A zero mean has no meaningful coefficient of variation: all-zero groups
/// are perfectly consistent, anything else is not.
pub fn consistency(stats: &ScoreStats) -> f64 {
    if stats.mean == 0.0 {
        return if stats.std == 0.0 { 1.0 } else { 0.0 };
    }
    (1.0 - stats.std / stats.mean).clamp(0.0, 1.0)
}

/// Group scores by a key and compute stats per group.
///
/// `key` returns `None` to leave a row out. Groups come back in key order.
pub fn group_scores<K: Ord>(
    scores: &[f64],
    key: impl Fn(usize) -> Option<K>,
) -> BTreeMap<K, ScoreStats> {
    let mut groups: BTreeMap<K, Vec<f64>> = BTreeMap::new();
    for (row, score) in scores.iter().enumerate() {
        if let Some(k) = key(row) {
            groups.entry(k).or_default().push(*score);
        }
    }

    groups
        .into_iter()
        .map(|(k, values)| (k, ScoreStats::from_scores(&values)))
        .collect()
}

/// First row index holding a non-finite score, if any.
pub fn first_non_finite(scores: &[f64]) -> Option<usize> {
    scores.iter().position(|s| !s.is_finite())
}
