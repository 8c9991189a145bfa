//! Report rendering
//!
//! A report is a title plus an ordered list of [`ReportSection`]s, rendered
//! against a [`ResultBundle`] as HTML or Markdown. Sections are independent:
//! a view that is missing, empty or failed becomes a short notice in place
//! and the rest of the report still renders.

use crate::analytics::{
    AnalysisScope, MetricField, Outcome, OverviewStats, ResultBundle, View,
};
use crate::chart::{render_chart, ChartConfiguration, ChartKind};
use crate::config::{ChartDefaults, ReportDefaults};
use crate::error::{Error, Result};
use crate::format::{escape_html, format_date_range, format_metric, format_score};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    Html,
    Markdown,
    /// Not rendered by this crate; always an [`Error::Unsupported`]
    Pdf,
}

impl ReportFormat {
    /// Pick a format from a file extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "html" | "htm" => Some(ReportFormat::Html),
            "md" | "markdown" => Some(ReportFormat::Markdown),
            "pdf" => Some(ReportFormat::Pdf),
            _ => None,
        }
    }
}

impl FromStr for ReportFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "html" | "htm" => Ok(ReportFormat::Html),
            "md" | "markdown" => Ok(ReportFormat::Markdown),
            "pdf" => Ok(ReportFormat::Pdf),
            other => Err(Error::Report(format!("unknown report format '{}'", other))),
        }
    }
}

/// One block of a report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ReportSection {
    /// Free text paragraph
    Text { heading: String, body: String },
    /// Metric table of a view
    Table {
        heading: String,
        view: String,
        /// Row cap; falls back to the generator's default
        max_rows: Option<usize>,
    },
    /// Chart of a view's metric table
    Chart {
        heading: String,
        view: String,
        config: ChartConfiguration,
    },
    /// Overview statistics as a key/value list
    Stats { heading: String, view: String },
}

impl ReportSection {
    pub fn heading(&self) -> &str {
        match self {
            ReportSection::Text { heading, .. }
            | ReportSection::Table { heading, .. }
            | ReportSection::Chart { heading, .. }
            | ReportSection::Stats { heading, .. } => heading,
        }
    }

    /// View the section reads, if any.
    pub fn view(&self) -> Option<&str> {
        match self {
            ReportSection::Text { .. } => None,
            ReportSection::Table { view, .. }
            | ReportSection::Chart { view, .. }
            | ReportSection::Stats { view, .. } => Some(view),
        }
    }
}

// ============================================
// Templates
// ============================================

/// Named list of sections.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportTemplate {
    pub name: String,
    pub sections: Vec<ReportSection>,
}

impl ReportTemplate {
    /// Overview, distribution chart and tables, and trends for every service.
    pub fn standard(charts: &ChartDefaults) -> Result<Self> {
        let mut sections = vec![ReportSection::Text {
            heading: "About this report".to_string(),
            body: "Chest scores grouped by player, chest type and source. \
                   Rarity is 1 - share of chests, consistency is 1 - std/mean \
                   clamped to [0, 1], efficiency is value / (rarity + epsilon)."
                .to_string(),
        }];

        let dimensions = [
            ("player", "Player", "PLAYER", ChartKind::Bar, MetricField::TotalScore),
            ("chest", "Chest", "CHEST", ChartKind::Pie, MetricField::TotalScore),
            ("source", "Source", "SOURCE", ChartKind::HorizontalBar, MetricField::Efficiency),
        ];

        for (service, label, column, kind, field) in dimensions {
            let chart = ChartConfiguration::builder(kind, column, field)
                .title(&format!("{} by {}", field, label.to_ascii_lowercase()))
                .defaults(charts)
                .build()?;

            sections.push(ReportSection::Stats {
                heading: format!("{} overview", label),
                view: format!("{}_overview", service),
            });
            sections.push(ReportSection::Chart {
                heading: format!("{} distribution chart", label),
                view: format!("{}_distribution", service),
                config: chart,
            });
            sections.push(ReportSection::Table {
                heading: format!("{} distribution", label),
                view: format!("{}_distribution", service),
                max_rows: None,
            });
            sections.push(ReportSection::Table {
                heading: format!("{} cross-effectiveness", label),
                view: format!("{}_cross_effectiveness", service),
                max_rows: None,
            });
            sections.push(ReportSection::Table {
                heading: format!("{} monthly trends", label),
                view: format!("{}_time_trends", service),
                max_rows: None,
            });
        }

        Ok(Self {
            name: "standard".to_string(),
            sections,
        })
    }

    /// Keep only sections whose view belongs to `scope`.
    pub fn for_scope(mut self, scope: AnalysisScope) -> Self {
        if scope != AnalysisScope::All {
            let prefix = format!("{}_", scope.as_str());
            self.sections
                .retain(|s| s.view().map_or(true, |v| v.starts_with(&prefix)));
        }
        self
    }
}

// ============================================
// Generator
// ============================================

/// Renders sections against a result bundle.
#[derive(Debug, Clone)]
pub struct ReportGenerator {
    title: String,
    sections: Vec<ReportSection>,
    table_rows: usize,
}

impl ReportGenerator {
    pub fn new(title: &str) -> Self {
        let defaults = ReportDefaults::default();
        Self {
            title: title.to_string(),
            sections: Vec::new(),
            table_rows: defaults.table_rows,
        }
    }

    pub fn from_template(template: ReportTemplate, defaults: &ReportDefaults) -> Self {
        Self {
            title: defaults.title.clone(),
            sections: template.sections,
            table_rows: defaults.table_rows.max(1),
        }
    }

    pub fn add_section(&mut self, section: ReportSection) {
        self.sections.push(section);
    }

    pub fn sections(&self) -> &[ReportSection] {
        &self.sections
    }

    /// Render the report as a string.
    pub fn generate(&self, bundle: &ResultBundle, format: ReportFormat) -> Result<String> {
        let mut out = match format {
            ReportFormat::Html => document::Document::html(&self.title, bundle),
            ReportFormat::Markdown => document::Document::markdown(&self.title, bundle),
            ReportFormat::Pdf => {
                return Err(Error::Unsupported(
                    "PDF reports are not supported; export HTML and print it instead".to_string(),
                ))
            }
        };

        for section in &self.sections {
            out.heading(section.heading());
            match section {
                ReportSection::Text { body, .. } => out.paragraph(body),
                ReportSection::Stats { view, .. } => match lookup(bundle, view) {
                    Ok(found) => match found.overview() {
                        Some(stats) => out.stats(stats),
                        None => out.notice(&format!("View `{}` has no overview.", view)),
                    },
                    Err(notice) => out.notice(&notice),
                },
                ReportSection::Table { view, max_rows, .. } => match lookup(bundle, view) {
                    Ok(found) => match found.table() {
                        Some(table) => out.table(table, max_rows.unwrap_or(self.table_rows)),
                        None => out.notice(&format!("View `{}` has no table.", view)),
                    },
                    Err(notice) => out.notice(&notice),
                },
                ReportSection::Chart { view, config, .. } => match lookup(bundle, view) {
                    Ok(found) => match found.table() {
                        Some(table) => match render_chart(table, config) {
                            Ok(chart) => out.chart(&chart.title, &chart.svg),
                            Err(e) => {
                                tracing::warn!(view = %view, error = %e, "Chart section failed");
                                out.notice(&format!("Chart could not be rendered: {}", e));
                            }
                        },
                        None => out.notice(&format!("View `{}` has no table.", view)),
                    },
                    Err(notice) => out.notice(&notice),
                },
            }
        }

        Ok(out.finish())
    }

    /// Render and write the report to `path`.
    pub fn export(&self, bundle: &ResultBundle, path: &Path, format: ReportFormat) -> Result<()> {
        let rendered = self.generate(bundle, format)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, rendered)?;

        tracing::info!(
            path = %path.display(),
            format = ?format,
            sections = self.sections.len(),
            "Exported report"
        );
        Ok(())
    }
}

/// Ready view, or the notice to show in its place.
fn lookup<'a>(bundle: &'a ResultBundle, name: &str) -> std::result::Result<&'a View, String> {
    match bundle.view(name) {
        Some(Outcome::Ready(view)) => Ok(view),
        Some(Outcome::Empty(reason)) => Err(format!("No data ({}).", reason)),
        Some(Outcome::Failed(reason)) => Err(format!("Analysis failed: {}", reason)),
        None => Err(format!("View `{}` is not part of this analysis.", name)),
    }
}

fn stats_items(stats: &OverviewStats) -> Vec<(&'static str, String)> {
    let mut items = vec![
        ("Total chests", stats.total_chests.to_string()),
        ("Total score", format_score(stats.total_score)),
        ("Mean score", format_metric(stats.mean_score)),
        ("Groups", stats.unique_groups.to_string()),
    ];
    if let Some(n) = stats.unique_players {
        items.push(("Players", n.to_string()));
    }
    if let Some(n) = stats.unique_chest_types {
        items.push(("Chest types", n.to_string()));
    }
    if let Some(n) = stats.unique_sources {
        items.push(("Sources", n.to_string()));
    }
    items.push(("Date range", format_date_range(stats.date_range)));
    if let Some(top) = &stats.top_group {
        items.push((
            "Top",
            format!("{} ({})", top.key, format_score(top.total_score)),
        ));
    }
    items
}

mod document {
    //! Incremental HTML / Markdown output.

    use super::{escape_html, stats_items};
    use crate::analytics::{MetricTable, OverviewStats, ResultBundle};

    const STYLE: &str = "body{font-family:sans-serif;max-width:960px;margin:2em auto;color:#222}\
table{border-collapse:collapse;margin:1em 0}\
th,td{border:1px solid #ccc;padding:4px 8px;text-align:left}\
th{background:#f4f4f4}.notice{color:#777;font-style:italic}";

    enum Kind {
        Html,
        Markdown,
    }

    pub(super) struct Document {
        kind: Kind,
        out: String,
    }

    impl Document {
        pub fn html(title: &str, bundle: &ResultBundle) -> Self {
            let mut out = String::new();
            out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
            out.push_str(&format!("<title>{}</title>\n", escape_html(title)));
            out.push_str(&format!("<style>{}</style>\n</head>\n<body>\n", STYLE));
            out.push_str(&format!("<h1>{}</h1>\n", escape_html(title)));
            out.push_str(&format!(
                "<p class=\"meta\">{} rows, scope {}, generated {}</p>\n",
                bundle.row_count,
                bundle.scope,
                bundle.computed_at.format("%Y-%m-%d %H:%M UTC")
            ));
            Self {
                kind: Kind::Html,
                out,
            }
        }

        pub fn markdown(title: &str, bundle: &ResultBundle) -> Self {
            let out = format!(
                "# {}\n\n_{} rows, scope {}, generated {}_\n\n",
                title,
                bundle.row_count,
                bundle.scope,
                bundle.computed_at.format("%Y-%m-%d %H:%M UTC")
            );
            Self {
                kind: Kind::Markdown,
                out,
            }
        }

        pub fn heading(&mut self, text: &str) {
            match self.kind {
                Kind::Html => self.out.push_str(&format!("<h2>{}</h2>\n", escape_html(text))),
                Kind::Markdown => self.out.push_str(&format!("## {}\n\n", text)),
            }
        }

        pub fn paragraph(&mut self, text: &str) {
            match self.kind {
                Kind::Html => self.out.push_str(&format!("<p>{}</p>\n", escape_html(text))),
                Kind::Markdown => self.out.push_str(&format!("{}\n\n", text)),
            }
        }

        pub fn notice(&mut self, text: &str) {
            match self.kind {
                Kind::Html => self
                    .out
                    .push_str(&format!("<p class=\"notice\">{}</p>\n", escape_html(text))),
                Kind::Markdown => self.out.push_str(&format!("_{}_\n\n", text)),
            }
        }

        pub fn stats(&mut self, stats: &OverviewStats) {
            let items = stats_items(stats);
            match self.kind {
                Kind::Html => {
                    self.out.push_str("<ul>\n");
                    for (label, value) in items {
                        self.out.push_str(&format!(
                            "<li><strong>{}:</strong> {}</li>\n",
                            label,
                            escape_html(&value)
                        ));
                    }
                    self.out.push_str("</ul>\n");
                }
                Kind::Markdown => {
                    for (label, value) in items {
                        self.out.push_str(&format!("- **{}:** {}\n", label, value));
                    }
                    self.out.push('\n');
                }
            }
        }

        pub fn table(&mut self, table: &MetricTable, max_rows: usize) {
            let (headers, rows) = table.cells(max_rows);
            match self.kind {
                Kind::Html => {
                    self.out.push_str("<table>\n<tr>");
                    for h in &headers {
                        self.out.push_str(&format!("<th>{}</th>", escape_html(h)));
                    }
                    self.out.push_str("</tr>\n");
                    for row in &rows {
                        self.out.push_str("<tr>");
                        for cell in row {
                            self.out.push_str(&format!("<td>{}</td>", escape_html(cell)));
                        }
                        self.out.push_str("</tr>\n");
                    }
                    self.out.push_str("</table>\n");
                }
                Kind::Markdown => {
                    let cell = |s: &str| s.replace('|', "\\|");
                    let header: Vec<String> = headers.iter().map(|h| cell(h.as_str())).collect();
                    self.out.push_str(&format!("| {} |\n", header.join(" | ")));
                    self.out
                        .push_str(&format!("|{}\n", "---|".repeat(headers.len())));
                    for row in &rows {
                        let cells: Vec<String> = row.iter().map(|c| cell(c.as_str())).collect();
                        self.out.push_str(&format!("| {} |\n", cells.join(" | ")));
                    }
                    self.out.push('\n');
                }
            }
            if table.len() > max_rows {
                let note = format!("Showing {} of {} rows.", max_rows, table.len());
                self.notice(&note);
            }
        }

        pub fn chart(&mut self, title: &str, svg: &str) {
            match self.kind {
                Kind::Html => {
                    self.out.push_str("<figure>\n");
                    self.out.push_str(svg);
                    self.out.push_str(&format!(
                        "<figcaption>{}</figcaption>\n</figure>\n",
                        escape_html(title)
                    ));
                }
                Kind::Markdown => self.out.push_str(&format!(
                    "_Chart \"{}\" is included in the HTML report._\n\n",
                    title
                )),
            }
        }

        pub fn finish(mut self) -> String {
            if let Kind::Html = self.kind {
                self.out.push_str("</body>\n</html>\n");
            }
            self.out
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analytics::create_default_manager;
    use crate::cache::NoopCache;
    use crate::types::{EventRecord, EventTable};

    fn bundle() -> ResultBundle {
        let table = EventTable::from_records(vec![
            EventRecord::new("A", "Gold", "Guild", 100.0),
            EventRecord::new("A", "Silver", "Guild", 50.0),
            EventRecord::new("<B>", "Gold", "Arena", 200.0),
        ]);
        create_default_manager(Box::new(NoopCache::new()))
            .analyze_all(&table)
            .unwrap()
    }

    fn standard() -> ReportGenerator {
        let template = ReportTemplate::standard(&ChartDefaults::default()).unwrap();
        ReportGenerator::from_template(template, &ReportDefaults::default())
    }

    #[test]
    fn test_html_report() {
        let html = standard().generate(&bundle(), ReportFormat::Html).unwrap();

        assert!(html.starts_with("<!DOCTYPE html>"));
        assert!(html.contains("<h1>Total Battle Chest Analysis</h1>"));
        assert!(html.contains("<h2>Player distribution</h2>"));
        assert!(html.contains("<svg"));
        assert!(html.contains("<td>&lt;B&gt;</td>"));
        assert!(!html.contains("<td><B></td>"));
        // No DATE column: trends sections become notices
        assert!(html.contains("No data (missing DATE column)."));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_markdown_report() {
        let md = standard().generate(&bundle(), ReportFormat::Markdown).unwrap();

        assert!(md.starts_with("# Total Battle Chest Analysis"));
        assert!(md.contains("| PLAYER | TOTAL_SCORE |"));
        assert!(md.contains("| <B> | 200 |"));
        assert!(md.contains("is included in the HTML report"));
        assert!(!md.contains("<svg"));
    }

    #[test]
    fn test_pdf_is_unsupported() {
        let err = standard().generate(&bundle(), ReportFormat::Pdf).unwrap_err();
        assert!(matches!(err, Error::Unsupported(_)));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.pdf");
        assert!(standard().export(&bundle(), &path, ReportFormat::Pdf).is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_missing_and_failed_views() {
        let mut generator = ReportGenerator::new("Custom");
        generator.add_section(ReportSection::Table {
            heading: "Nope".to_string(),
            view: "guild_distribution".to_string(),
            max_rows: None,
        });
        generator.add_section(ReportSection::Stats {
            heading: "Broken".to_string(),
            view: "player_overview".to_string(),
        });
        generator.add_section(ReportSection::Text {
            heading: "Still here".to_string(),
            body: "after the failures".to_string(),
        });

        let mut bundle = bundle();
        bundle.insert("player_overview", Outcome::Failed("bad scores".to_string()));

        let md = generator.generate(&bundle, ReportFormat::Markdown).unwrap();
        assert!(md.contains("_View `guild_distribution` is not part of this analysis._"));
        assert!(md.contains("_Analysis failed: bad scores_"));
        assert!(md.contains("after the failures"));
    }

    #[test]
    fn test_chart_failure_stays_in_its_section() {
        let broken = ChartConfiguration::builder(ChartKind::Bar, "PLAYER", MetricField::TotalScore)
            .build()
            .unwrap()
            .with_size_unchecked(0, 0);

        let mut generator = ReportGenerator::new("Partial");
        generator.add_section(ReportSection::Text {
            heading: "Intro".to_string(),
            body: "before the chart".to_string(),
        });
        generator.add_section(ReportSection::Chart {
            heading: "Broken chart".to_string(),
            view: "player_distribution".to_string(),
            config: broken,
        });
        generator.add_section(ReportSection::Table {
            heading: "Players".to_string(),
            view: "player_distribution".to_string(),
            max_rows: None,
        });

        let html = generator.generate(&bundle(), ReportFormat::Html).unwrap();
        assert!(html.contains("before the chart"));
        assert!(html.contains("Chart could not be rendered: chart error: chart size must be positive"));
        assert!(html.contains("<h2>Players</h2>"));
        assert!(html.contains("<td>A</td>"));
        assert!(html.trim_end().ends_with("</html>"));
    }

    #[test]
    fn test_row_limit() {
        let mut generator = ReportGenerator::new("Limited");
        generator.add_section(ReportSection::Table {
            heading: "Players".to_string(),
            view: "player_distribution".to_string(),
            max_rows: Some(1),
        });
        let md = generator.generate(&bundle(), ReportFormat::Markdown).unwrap();
        assert!(md.contains("Showing 1 of 2 rows."));
    }

    #[test]
    fn test_template_for_scope() {
        let template = ReportTemplate::standard(&ChartDefaults::default())
            .unwrap()
            .for_scope(AnalysisScope::Chest);
        assert!(template
            .sections
            .iter()
            .filter_map(|s| s.view())
            .all(|v| v.starts_with("chest_")));
        // The text section survives
        assert!(template.sections.iter().any(|s| s.view().is_none()));
    }

    #[test]
    fn test_export_writes_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out").join("report.html");
        standard()
            .export(&bundle(), &path, ReportFormat::Html)
            .unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("<html>"));
        assert_eq!(ReportFormat::from_path(&path), Some(ReportFormat::Html));
        assert_eq!(
            ReportFormat::from_path(Path::new("x.md")),
            Some(ReportFormat::Markdown)
        );
    }
}
