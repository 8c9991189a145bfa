//! Chart rendering
//!
//! Turns a [`MetricTable`] into an SVG figure. Configuration is validated up
//! front; data problems (no rows, unknown category column, a field the rows
//! don't carry) produce a "No data available" placeholder instead of an error.

pub mod svg;

use crate::analytics::{MetricField, MetricTable};
use crate::config::ChartDefaults;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

/// Label of the slice that absorbs pie categories past the maximum.
pub const OTHERS_LABEL: &str = "Others";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    HorizontalBar,
    Pie,
    Line,
    Scatter,
}

impl ChartKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChartKind::Bar => "bar",
            ChartKind::HorizontalBar => "horizontal_bar",
            ChartKind::Pie => "pie",
            ChartKind::Line => "line",
            ChartKind::Scatter => "scatter",
        }
    }
}

impl FromStr for ChartKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "bar" => Ok(ChartKind::Bar),
            "horizontal_bar" | "hbar" | "barh" => Ok(ChartKind::HorizontalBar),
            "pie" => Ok(ChartKind::Pie),
            "line" => Ok(ChartKind::Line),
            "scatter" => Ok(ChartKind::Scatter),
            other => Err(Error::Chart(format!("unknown chart kind '{}'", other))),
        }
    }
}

/// Row order before limiting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    #[default]
    Descending,
    Ascending,
    /// Keep the table's own order
    None,
}

impl FromStr for SortOrder {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "desc" | "descending" => Ok(SortOrder::Descending),
            "asc" | "ascending" => Ok(SortOrder::Ascending),
            "none" | "table" => Ok(SortOrder::None),
            other => Err(Error::Chart(format!("unknown sort order '{}'", other))),
        }
    }
}

// ============================================
// Configuration
// ============================================

/// Validated chart settings.
///
/// Build one with [`ChartConfiguration::builder`]. Deserialization runs the
/// same validation, so a stored report template can't carry a zero-sized or
/// otherwise unusable chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawChartConfiguration")]
pub struct ChartConfiguration {
    kind: ChartKind,
    title: String,
    /// Key column supplying category labels (e.g. "PLAYER")
    category_column: String,
    value_field: MetricField,
    /// Horizontal axis for scatter charts
    x_field: MetricField,
    sort: SortOrder,
    /// Keep at most this many rows after sorting
    limit: Option<usize>,
    width: u32,
    height: u32,
    /// Pie slices kept before the rest collapse into "Others"
    pie_max_categories: usize,
}

/// Unchecked wire form of [`ChartConfiguration`].
#[derive(Deserialize)]
struct RawChartConfiguration {
    kind: ChartKind,
    title: String,
    category_column: String,
    value_field: MetricField,
    x_field: MetricField,
    sort: SortOrder,
    limit: Option<usize>,
    width: u32,
    height: u32,
    pie_max_categories: usize,
}

impl TryFrom<RawChartConfiguration> for ChartConfiguration {
    type Error = Error;

    fn try_from(raw: RawChartConfiguration) -> Result<Self> {
        let config = ChartConfiguration {
            kind: raw.kind,
            title: raw.title,
            category_column: raw.category_column,
            value_field: raw.value_field,
            x_field: raw.x_field,
            sort: raw.sort,
            limit: raw.limit,
            width: raw.width,
            height: raw.height,
            pie_max_categories: raw.pie_max_categories,
        };
        config.validate()?;
        Ok(config)
    }
}

impl ChartConfiguration {
    pub fn builder(
        kind: ChartKind,
        category_column: &str,
        value_field: MetricField,
    ) -> ChartConfigurationBuilder {
        let defaults = ChartDefaults::default();
        ChartConfigurationBuilder {
            config: ChartConfiguration {
                kind,
                title: format!("{} by {}", value_field, category_column),
                category_column: category_column.to_string(),
                value_field,
                x_field: MetricField::Count,
                sort: SortOrder::Descending,
                limit: None,
                width: defaults.width,
                height: defaults.height,
                pie_max_categories: defaults.pie_max_categories,
            },
        }
    }

    pub fn kind(&self) -> ChartKind {
        self.kind
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn category_column(&self) -> &str {
        &self.category_column
    }

    pub fn value_field(&self) -> MetricField {
        self.value_field
    }

    /// Width and height in pixels.
    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn validate(&self) -> Result<()> {
        if self.width == 0 || self.height == 0 {
            return Err(Error::Chart(format!(
                "chart size must be positive, got {}x{}",
                self.width, self.height
            )));
        }
        if self.limit == Some(0) {
            return Err(Error::Chart("limit must be at least 1".to_string()));
        }
        if self.pie_max_categories == 0 {
            return Err(Error::Chart(
                "pie_max_categories must be at least 1".to_string(),
            ));
        }
        if self.category_column.trim().is_empty() {
            return Err(Error::Chart("category column is empty".to_string()));
        }
        Ok(())
    }

    /// Skip validation so rendering failures can be exercised.
    #[cfg(test)]
    pub(crate) fn with_size_unchecked(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }
}

/// Builder for [`ChartConfiguration`]; `build()` validates.
#[derive(Debug, Clone)]
pub struct ChartConfigurationBuilder {
    config: ChartConfiguration,
}

impl ChartConfigurationBuilder {
    pub fn title(mut self, title: &str) -> Self {
        self.config.title = title.to_string();
        self
    }

    pub fn x_field(mut self, field: MetricField) -> Self {
        self.config.x_field = field;
        self
    }

    pub fn sort(mut self, sort: SortOrder) -> Self {
        self.config.sort = sort;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.config.limit = Some(limit);
        self
    }

    pub fn size(mut self, width: u32, height: u32) -> Self {
        self.config.width = width;
        self.config.height = height;
        self
    }

    pub fn pie_max_categories(mut self, max: usize) -> Self {
        self.config.pie_max_categories = max;
        self
    }

    /// Take size, row limit and pie maximum from configuration defaults.
    pub fn defaults(self, defaults: &ChartDefaults) -> Self {
        self.size(defaults.width, defaults.height)
            .limit(defaults.top_n)
            .pie_max_categories(defaults.pie_max_categories)
    }

    pub fn build(self) -> Result<ChartConfiguration> {
        self.config.validate()?;
        Ok(self.config)
    }
}

// ============================================
// Data preparation
// ============================================

/// One plotted point.
#[derive(Debug, Clone, PartialEq)]
pub struct ChartPoint {
    pub label: String,
    pub value: f64,
    /// Scatter only
    pub x: Option<f64>,
}

/// Extract, sort and limit the points a chart shows.
///
/// Returns an empty vector when the table can't supply the configured
/// column or field.
pub fn chart_points(table: &MetricTable, config: &ChartConfiguration) -> Vec<ChartPoint> {
    let Some(index) = table.key_index(&config.category_column) else {
        return Vec::new();
    };
    if !table.has_field(config.value_field) {
        return Vec::new();
    }
    let scatter = config.kind == ChartKind::Scatter;
    if scatter && !table.has_field(config.x_field) {
        return Vec::new();
    }

    let mut points: Vec<ChartPoint> = table
        .rows
        .iter()
        .filter_map(|row| {
            let value = row.field(config.value_field).filter(|v| v.is_finite())?;
            let x = if scatter {
                Some(row.field(config.x_field).filter(|v| v.is_finite())?)
            } else {
                None
            };
            Some(ChartPoint {
                label: row.key.get(index)?.clone(),
                value,
                x,
            })
        })
        .collect();

    if config.kind == ChartKind::Pie {
        points.retain(|p| p.value > 0.0);
    }

    match config.sort {
        SortOrder::Descending => points.sort_by(|a, b| b.value.total_cmp(&a.value)),
        SortOrder::Ascending => points.sort_by(|a, b| a.value.total_cmp(&b.value)),
        SortOrder::None => {}
    }

    if config.kind == ChartKind::Pie {
        points = collapse_pie(points, config.pie_max_categories);
    }
    if let Some(limit) = config.limit {
        points.truncate(limit);
    }

    points
}

/// Keep the largest `max` slices and sum the rest into "Others".
fn collapse_pie(points: Vec<ChartPoint>, max: usize) -> Vec<ChartPoint> {
    if points.len() <= max {
        return points;
    }

    let mut by_value = points;
    by_value.sort_by(|a, b| b.value.total_cmp(&a.value));
    let rest: f64 = by_value[max..].iter().map(|p| p.value).sum();
    by_value.truncate(max);
    by_value.push(ChartPoint {
        label: OTHERS_LABEL.to_string(),
        value: rest,
        x: None,
    });
    by_value
}

// ============================================
// Rendering
// ============================================

/// A rendered figure.
#[derive(Debug, Clone, PartialEq)]
pub struct Chart {
    pub title: String,
    pub svg: String,
    /// True when the figure is the "No data available" placeholder
    pub placeholder: bool,
}

impl Chart {
    /// Write the SVG to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, &self.svg)?;
        tracing::info!(path = %path.display(), placeholder = self.placeholder, "Saved chart");
        Ok(())
    }
}

/// Render `table` according to `config`.
///
/// Errors on invalid configuration or when the SVG backend fails.
pub fn render_chart(table: &MetricTable, config: &ChartConfiguration) -> Result<Chart> {
    config.validate()?;

    let points = chart_points(table, config);
    if points.is_empty() {
        tracing::debug!(
            title = %config.title,
            column = %config.category_column,
            field = %config.value_field,
            "No chart data; rendering placeholder"
        );
        return Ok(Chart {
            title: config.title.clone(),
            svg: svg::placeholder(config)?,
            placeholder: true,
        });
    }

    let svg = match config.kind {
        ChartKind::Bar => svg::bar(&points, config),
        ChartKind::HorizontalBar => svg::horizontal_bar(&points, config),
        ChartKind::Pie => svg::pie(&points, config),
        ChartKind::Line => svg::line(&points, config),
        ChartKind::Scatter => svg::scatter(&points, config),
    }?;

    Ok(Chart {
        title: config.title.clone(),
        svg,
        placeholder: false,
    })
}
