//! Metrics registry for discovery and documentation.

use super::metric_table::MetricField;
use serde::Serialize;

/// Views whose rows carry a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricScope {
    /// Every grouped table (distribution, cross-effectiveness, trends)
    Grouped,
    /// Distribution tables only
    Distribution,
}

impl MetricScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricScope::Grouped => "grouped",
            MetricScope::Distribution => "distribution",
        }
    }
}

/// Descriptor for a metric column produced by the services.
#[derive(Debug, Clone, Serialize)]
pub struct MetricDescriptor {
    pub field: MetricField,
    pub scope: MetricScope,
    pub summary: &'static str,
    pub formula: &'static str,
}

const ALL_METRICS: &[MetricDescriptor] = &[
    MetricDescriptor {
        field: MetricField::TotalScore,
        scope: MetricScope::Grouped,
        summary: "Sum of chest scores in the group.",
        formula: "sum(SCORE)",
    },
    MetricDescriptor {
        field: MetricField::MeanScore,
        scope: MetricScope::Grouped,
        summary: "Average chest score in the group.",
        formula: "TOTAL_SCORE / COUNT",
    },
    MetricDescriptor {
        field: MetricField::StdScore,
        scope: MetricScope::Grouped,
        summary: "Sample standard deviation of scores; 0 for single-chest groups.",
        formula: "sqrt(sum((SCORE - MEAN_SCORE)^2) / (COUNT - 1))",
    },
    MetricDescriptor {
        field: MetricField::Count,
        scope: MetricScope::Grouped,
        summary: "Number of chests in the group.",
        formula: "count(*)",
    },
    MetricDescriptor {
        field: MetricField::Rarity,
        scope: MetricScope::Distribution,
        summary: "How uncommon the group is; 1 means almost no chests.",
        formula: "1 - COUNT / total_count",
    },
    MetricDescriptor {
        field: MetricField::Value,
        scope: MetricScope::Distribution,
        summary: "Typical worth of a chest from the group.",
        formula: "MEAN_SCORE",
    },
    MetricDescriptor {
        field: MetricField::Consistency,
        scope: MetricScope::Distribution,
        summary: "How steady scores are; 1 means every chest scores the same.",
        formula: "clamp(1 - STD_SCORE / MEAN_SCORE, 0, 1)",
    },
    MetricDescriptor {
        field: MetricField::Efficiency,
        scope: MetricScope::Distribution,
        summary: "Value weighted against rarity.",
        formula: "VALUE / (RARITY + epsilon)",
    },
    MetricDescriptor {
        field: MetricField::Share,
        scope: MetricScope::Distribution,
        summary: "Fraction of all points earned by the group.",
        formula: "TOTAL_SCORE / sum(SCORE)",
    },
];

/// List all registered metrics.
pub fn list_metrics() -> Vec<MetricDescriptor> {
    ALL_METRICS.to_vec()
}

/// List metrics carried by the given kind of view.
pub fn list_metrics_for_scope(scope: MetricScope) -> Vec<MetricDescriptor> {
    ALL_METRICS
        .iter()
        .filter(|m| scope == MetricScope::Distribution || m.scope == scope)
        .cloned()
        .collect()
}

/// Look up one metric by field.
pub fn describe(field: MetricField) -> Option<&'static MetricDescriptor> {
    ALL_METRICS.iter().find(|m| m.field == field)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_field_is_described() {
        for field in MetricField::ALL {
            let descriptor = describe(field).unwrap();
            assert_eq!(
                descriptor.scope == MetricScope::Distribution,
                field.is_derived()
            );
        }
        assert_eq!(list_metrics().len(), MetricField::ALL.len());
    }

    #[test]
    fn test_scope_filter() {
        assert_eq!(list_metrics_for_scope(MetricScope::Grouped).len(), 4);
        assert_eq!(list_metrics_for_scope(MetricScope::Distribution).len(), 9);
    }
}
