//! Formatting helpers shared by the CLI and the report renderer.

use chrono::NaiveDate;

/// Format a score compactly (e.g., "14.2M", "3.5K", "120", "0.75").
pub fn format_score(value: f64) -> String {
    let abs = value.abs();
    if abs >= 1_000_000.0 {
        format!("{:.1}M", value / 1_000_000.0)
    } else if abs >= 1_000.0 {
        format!("{:.1}K", value / 1_000.0)
    } else if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{:.2}", value)
    }
}

/// Format a metric value with fixed precision for tables.
pub fn format_metric(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{:.3}", value)
    }
}

/// Format a 0..1 ratio as a percentage (e.g., "42.5%").
pub fn format_percent(ratio: f64) -> String {
    format!("{:.1}%", ratio * 100.0)
}

/// Escape text for HTML content and attributes.
pub fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(c),
        }
    }
    out
}

/// Format an optional date range, or "n/a" if missing.
pub fn format_date_range(range: Option<(NaiveDate, NaiveDate)>) -> String {
    match range {
        Some((first, last)) if first == last => first.format("%Y-%m-%d").to_string(),
        Some((first, last)) => format!(
            "{} to {}",
            first.format("%Y-%m-%d"),
            last.format("%Y-%m-%d")
        ),
        None => "n/a".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">&'"#),
            "&lt;a href=&quot;x&quot;&gt;&amp;&#39;"
        );
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_format_score() {
        assert_eq!(format_score(14_200_000.0), "14.2M");
        assert_eq!(format_score(3_500.0), "3.5K");
        assert_eq!(format_score(120.0), "120");
        assert_eq!(format_score(0.75), "0.75");
    }

    #[test]
    fn test_format_metric_and_percent() {
        assert_eq!(format_metric(150.0), "150");
        assert_eq!(format_metric(0.6666666), "0.667");
        assert_eq!(format_percent(0.425), "42.5%");
    }

    #[test]
    fn test_format_date_range() {
        let a = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let b = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
        assert_eq!(format_date_range(Some((a, b))), "2024-01-01 to 2024-02-01");
        assert_eq!(format_date_range(Some((a, a))), "2024-01-01");
        assert_eq!(format_date_range(None), "n/a");
    }
}
