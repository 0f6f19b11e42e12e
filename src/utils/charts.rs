//! SVG Chart Generator for accuracy curves
//!
//! Renders accuracy-vs-epoch line charts. Train curves are drawn solid,
//! test curves dashed.

use std::fs;
use std::path::Path;

const CHART_WIDTH: f64 = 800.0;
const CHART_HEIGHT: f64 = 450.0;
const MARGIN_TOP: f64 = 60.0;
const MARGIN_RIGHT: f64 = 180.0;
const MARGIN_BOTTOM: f64 = 70.0;
const MARGIN_LEFT: f64 = 80.0;

const COLOR_GRID: &str = "#ecf0f1";
const COLOR_AXIS: &str = "#2c3e50";
const COLOR_TEXT: &str = "#2c3e50";

/// Palette cycled over models; train and test of one model share a color
pub const PALETTE: [&str; 6] = [
    "#3498db", "#2ecc71", "#e74c3c", "#9b59b6", "#f39c12", "#16a085",
];

/// A data series for the line chart
#[derive(Debug, Clone)]
pub struct DataSeries {
    pub name: String,
    pub values: Vec<f64>,
    pub color: String,
    pub dashed: bool,
}

/// Generate an accuracy line chart SVG; x is the 1-based epoch index
pub fn generate_line_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    series: &[DataSeries],
    output_path: &Path,
) -> std::io::Result<()> {
    fs::write(output_path, render_line_chart(title, x_label, y_label, series))
}

/// Build the SVG document for [`generate_line_chart`]
pub fn render_line_chart(
    title: &str,
    x_label: &str,
    y_label: &str,
    series: &[DataSeries],
) -> String {
    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let max_len = series.iter().map(|s| s.values.len()).max().unwrap_or(0);
    let x_min = 1.0;
    let x_max = (max_len as f64).max(2.0);
    let y_min = 0.0;
    let y_max = series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .fold(100.0_f64, f64::max);

    let to_x = |epoch: f64| MARGIN_LEFT + ((epoch - x_min) / (x_max - x_min)) * plot_width;
    let to_y = |acc: f64| MARGIN_TOP + plot_height - ((acc - y_min) / (y_max - y_min)) * plot_height;

    let mut svg = String::new();

    svg.push_str(&format!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}">"#,
        CHART_WIDTH, CHART_HEIGHT, CHART_WIDTH, CHART_HEIGHT
    ));
    svg.push_str(&format!(
        r#"<rect width="{}" height="{}" fill="white"/>"#,
        CHART_WIDTH, CHART_HEIGHT
    ));
    svg.push_str(&format!(
        r#"<text x="{}" y="35" text-anchor="middle" font-family="Arial, sans-serif" font-size="18" font-weight="bold" fill="{}">{}</text>"#,
        MARGIN_LEFT + plot_width / 2.0,
        COLOR_TEXT,
        escape_xml(title)
    ));

    // Horizontal grid with percentage labels
    for i in 0..=5 {
        let value = y_min + (i as f64 / 5.0) * (y_max - y_min);
        let y = to_y(value);
        svg.push_str(&format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="1"/>"#,
            MARGIN_LEFT,
            y,
            MARGIN_LEFT + plot_width,
            y,
            COLOR_GRID
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="end" font-family="Arial, sans-serif" font-size="12" fill="{}">{:.0}</text>"#,
            MARGIN_LEFT - 10.0,
            y + 4.0,
            COLOR_TEXT,
            value
        ));
    }

    // Epoch ticks
    for epoch in epoch_ticks(max_len) {
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="11" fill="{}">{}</text>"#,
            to_x(epoch as f64),
            MARGIN_TOP + plot_height + 20.0,
            COLOR_TEXT,
            epoch
        ));
    }

    // Axes
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        MARGIN_LEFT,
        MARGIN_TOP + plot_height,
        MARGIN_LEFT + plot_width,
        MARGIN_TOP + plot_height,
        COLOR_AXIS
    ));
    svg.push_str(&format!(
        r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"/>"#,
        MARGIN_LEFT,
        MARGIN_TOP,
        MARGIN_LEFT,
        MARGIN_TOP + plot_height,
        COLOR_AXIS
    ));
    svg.push_str(&format!(
        r#"<text x="{}" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}">{}</text>"#,
        MARGIN_LEFT + plot_width / 2.0,
        CHART_HEIGHT - 20.0,
        COLOR_TEXT,
        escape_xml(x_label)
    ));
    svg.push_str(&format!(
        r#"<text x="20" y="{}" text-anchor="middle" font-family="Arial, sans-serif" font-size="14" fill="{}" transform="rotate(-90 20 {})">{}</text>"#,
        CHART_HEIGHT / 2.0,
        COLOR_TEXT,
        CHART_HEIGHT / 2.0,
        escape_xml(y_label)
    ));

    for s in series {
        if s.values.is_empty() {
            continue;
        }

        let mut path = String::new();
        for (i, acc) in s.values.iter().enumerate() {
            let (x, y) = (to_x((i + 1) as f64), to_y(*acc));
            if i == 0 {
                path.push_str(&format!("M {:.2} {:.2}", x, y));
            } else {
                path.push_str(&format!(" L {:.2} {:.2}", x, y));
            }
        }

        svg.push_str(&format!(
            r#"<path d="{}" fill="none" stroke="{}" stroke-width="2"{}/>"#,
            path,
            s.color,
            dash_attr(s.dashed)
        ));
    }

    // Legend
    let legend_x = CHART_WIDTH - MARGIN_RIGHT + 20.0;
    let mut legend_y = MARGIN_TOP + 10.0;
    for s in series {
        svg.push_str(&format!(
            r#"<line x1="{}" y1="{}" x2="{}" y2="{}" stroke="{}" stroke-width="2"{}/>"#,
            legend_x,
            legend_y,
            legend_x + 30.0,
            legend_y,
            s.color,
            dash_attr(s.dashed)
        ));
        svg.push_str(&format!(
            r#"<text x="{}" y="{}" font-family="Arial, sans-serif" font-size="12" fill="{}">{}</text>"#,
            legend_x + 38.0,
            legend_y + 4.0,
            COLOR_TEXT,
            escape_xml(&s.name)
        ));
        legend_y += 22.0;
    }

    svg.push_str("</svg>");
    svg
}

fn dash_attr(dashed: bool) -> &'static str {
    if dashed {
        r#" stroke-dasharray="6 4""#
    } else {
        ""
    }
}

/// At most six evenly spread epoch ticks, always including the first and last
fn epoch_ticks(len: usize) -> Vec<usize> {
    if len == 0 {
        return Vec::new();
    }
    let step = ((len as f64) / 5.0).ceil().max(1.0) as usize;
    let mut ticks: Vec<usize> = (1..=len).step_by(step).collect();
    if ticks.last() != Some(&len) {
        ticks.push(len);
    }
    ticks
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
