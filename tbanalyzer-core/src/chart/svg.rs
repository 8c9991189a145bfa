//! SVG drawing for each chart kind, on plotters' SVG backend.

use super::{ChartConfiguration, ChartPoint};
use crate::error::{Error, Result};
use crate::format::{format_percent, format_score};
use plotters::coord::Shift;
use plotters::element::Pie;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};

const FONT: &str = "sans-serif";

const PALETTE: [RGBColor; 10] = [
    RGBColor(0x4e, 0x79, 0xa7),
    RGBColor(0xf2, 0x8e, 0x2b),
    RGBColor(0xe1, 0x57, 0x59),
    RGBColor(0x76, 0xb7, 0xb2),
    RGBColor(0x59, 0xa1, 0x4f),
    RGBColor(0xed, 0xc9, 0x48),
    RGBColor(0xb0, 0x7a, 0xa1),
    RGBColor(0xff, 0x9d, 0xa7),
    RGBColor(0x9c, 0x75, 0x5f),
    RGBColor(0xba, 0xb0, 0xac),
];

const MUTED: RGBColor = RGBColor(0x88, 0x88, 0x88);

type Area<'a> = DrawingArea<SVGBackend<'a>, Shift>;
type DrawResult = std::result::Result<(), Box<dyn std::error::Error>>;

fn color(i: usize) -> RGBColor {
    PALETTE[i % PALETTE.len()]
}

/// Render into a fresh SVG document sized by `config`.
fn draw_into(config: &ChartConfiguration, draw: impl FnOnce(&Area) -> DrawResult) -> Result<String> {
    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, (config.width, config.height))
            .into_drawing_area();
        root.fill(&WHITE).map_err(chart_error)?;
        draw(&root).map_err(chart_error)?;
        root.present().map_err(chart_error)?;
    }
    Ok(svg)
}

fn chart_error(e: impl std::fmt::Display) -> Error {
    Error::Chart(e.to_string())
}

/// Value range padded to include zero, never degenerate.
fn value_range(values: impl Iterator<Item = f64>, include_zero: bool) -> (f64, f64) {
    let (mut lo, mut hi) = values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    });
    if include_zero {
        lo = lo.min(0.0);
        hi = hi.max(0.0);
    }
    if hi - lo <= f64::EPSILON {
        hi = lo + 1.0;
    }
    (lo, hi)
}

/// Category label for a segmented axis position.
fn segment_label(labels: &[&str], value: &SegmentValue<usize>) -> String {
    match value {
        SegmentValue::CenterOf(i) | SegmentValue::Exact(i) => {
            labels.get(*i).map(|l| l.to_string()).unwrap_or_default()
        }
        SegmentValue::Last => String::new(),
    }
}

fn labels(points: &[ChartPoint]) -> Vec<&str> {
    points.iter().map(|p| p.label.as_str()).collect()
}

pub fn bar(points: &[ChartPoint], config: &ChartConfiguration) -> Result<String> {
    let labels = labels(points);
    let (lo, hi) = value_range(points.iter().map(|p| p.value), true);

    draw_into(config, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(&config.title, (FONT, 18).into_font())
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d((0..points.len()).into_segmented(), lo..hi)?;

        chart
            .configure_mesh()
            .disable_x_mesh()
            .x_labels(points.len())
            .x_label_formatter(&|v| segment_label(&labels, v))
            .y_label_formatter(&|v| format_score(*v))
            .y_desc(config.value_field.name())
            .draw()?;

        chart.draw_series(
            Histogram::vertical(&chart)
                .style(color(0).filled())
                .margin(8)
                .data(points.iter().enumerate().map(|(i, p)| (i, p.value))),
        )?;
        Ok(())
    })
}

pub fn horizontal_bar(points: &[ChartPoint], config: &ChartConfiguration) -> Result<String> {
    let labels = labels(points);
    let (lo, hi) = value_range(points.iter().map(|p| p.value), true);

    draw_into(config, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(&config.title, (FONT, 18).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(120)
            .build_cartesian_2d(lo..hi, (0..points.len()).into_segmented())?;

        chart
            .configure_mesh()
            .disable_y_mesh()
            .y_labels(points.len())
            .y_label_formatter(&|v| segment_label(&labels, v))
            .x_label_formatter(&|v| format_score(*v))
            .x_desc(config.value_field.name())
            .draw()?;

        chart.draw_series(
            Histogram::horizontal(&chart)
                .style(color(0).filled())
                .margin(6)
                .data(points.iter().enumerate().map(|(i, p)| (i, p.value))),
        )?;
        Ok(())
    })
}

pub fn line(points: &[ChartPoint], config: &ChartConfiguration) -> Result<String> {
    let labels = labels(points);
    let (lo, hi) = value_range(points.iter().map(|p| p.value), false);
    let coords: Vec<(SegmentValue<usize>, f64)> = points
        .iter()
        .enumerate()
        .map(|(i, p)| (SegmentValue::CenterOf(i), p.value))
        .collect();

    draw_into(config, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(&config.title, (FONT, 18).into_font())
            .margin(10)
            .x_label_area_size(50)
            .y_label_area_size(70)
            .build_cartesian_2d((0..points.len()).into_segmented(), lo..hi)?;

        chart
            .configure_mesh()
            .x_labels(points.len())
            .x_label_formatter(&|v| segment_label(&labels, v))
            .y_label_formatter(&|v| format_score(*v))
            .y_desc(config.value_field.name())
            .draw()?;

        chart.draw_series(LineSeries::new(coords.iter().cloned(), color(0).stroke_width(2)))?;
        chart.draw_series(
            coords
                .iter()
                .map(|(x, y)| Circle::new((x.clone(), *y), 3, color(0).filled())),
        )?;
        Ok(())
    })
}

pub fn scatter(points: &[ChartPoint], config: &ChartConfiguration) -> Result<String> {
    let (y_lo, y_hi) = value_range(points.iter().map(|p| p.value), false);
    let (x_lo, x_hi) = value_range(points.iter().filter_map(|p| p.x), false);

    draw_into(config, |root| {
        let mut chart = ChartBuilder::on(root)
            .caption(&config.title, (FONT, 18).into_font())
            .margin(10)
            .x_label_area_size(40)
            .y_label_area_size(70)
            .build_cartesian_2d(x_lo..x_hi, y_lo..y_hi)?;

        chart
            .configure_mesh()
            .x_label_formatter(&|v| format_score(*v))
            .y_label_formatter(&|v| format_score(*v))
            .x_desc(config.x_field.name())
            .y_desc(config.value_field.name())
            .draw()?;

        chart.draw_series(points.iter().enumerate().map(|(i, p)| {
            EmptyElement::at((p.x.unwrap_or(x_lo), p.value))
                + Circle::new((0, 0), 5, color(i).mix(0.8).filled())
                + Text::new(p.label.clone(), (7, -12), (FONT, 10).into_font())
        }))?;
        Ok(())
    })
}

pub fn pie(points: &[ChartPoint], config: &ChartConfiguration) -> Result<String> {
    let total: f64 = points.iter().map(|p| p.value).sum();
    let sizes: Vec<f64> = points.iter().map(|p| p.value).collect();
    let colors: Vec<RGBColor> = (0..points.len()).map(color).collect();
    let labels: Vec<String> = points
        .iter()
        .map(|p| format!("{} ({})", p.label, format_percent(p.value / total)))
        .collect();

    draw_into(config, |root| {
        let area = root.titled(&config.title, (FONT, 18).into_font())?;
        let (width, height) = area.dim_in_pixel();
        let center = (width as i32 / 2, height as i32 / 2);
        // Leave room around the disc for slice labels
        let radius = (width.min(height) as f64 * 0.32).max(1.0);

        let mut slices = Pie::new(&center, &radius, &sizes, &colors, &labels);
        slices.start_angle(-90.0);
        slices.label_style((FONT, 12).into_font());
        area.draw(&slices)?;
        Ok(())
    })
}

/// Figure shown when there is nothing to plot.
pub fn placeholder(config: &ChartConfiguration) -> Result<String> {
    draw_into(config, |root| {
        let area = root.titled(&config.title, (FONT, 18).into_font())?;
        let (width, height) = area.dim_in_pixel();
        let style = (FONT, 14)
            .into_font()
            .color(&MUTED)
            .pos(Pos::new(HPos::Center, VPos::Center));
        area.draw(&Text::new(
            "No data available",
            (width as i32 / 2, height as i32 / 2),
            style,
        ))?;
        Ok(())
    })
}
