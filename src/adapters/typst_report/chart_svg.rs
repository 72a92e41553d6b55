//! SVG line charts for coefficient drift and predictions.

use chrono::NaiveDate;

use crate::domain::prediction::Prediction;
use crate::domain::rolling::RollingFit;

const CHART_WIDTH: f64 = 600.0;
const CHART_HEIGHT: f64 = 300.0;
const MARGIN_LEFT: f64 = 70.0;
const MARGIN_RIGHT: f64 = 20.0;
const MARGIN_TOP: f64 = 30.0;
const MARGIN_BOTTOM: f64 = 40.0;

const PALETTE: [&str; 6] = [
    "#2563eb", "#dc2626", "#16a34a", "#9333ea", "#ea580c", "#0891b2",
];

#[derive(Debug, Clone)]
pub struct ChartSeries {
    pub label: String,
    pub values: Vec<f64>,
}

/// Draws every series against a shared date axis. Non-finite values break the
/// line. Returns an empty string when there is nothing to plot.
pub fn line_chart_svg(title: &str, dates: &[NaiveDate], series: &[ChartSeries]) -> String {
    let finite: Vec<f64> = series
        .iter()
        .flat_map(|s| s.values.iter().copied())
        .filter(|v| v.is_finite())
        .collect();
    if dates.is_empty() || finite.is_empty() {
        return String::new();
    }

    let min_v = finite.iter().copied().fold(f64::INFINITY, f64::min);
    let max_v = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let pad = if max_v > min_v {
        (max_v - min_v) * 0.05
    } else {
        min_v.abs().max(1e-6) * 0.1
    };
    let (lo, hi) = (min_v - pad, max_v + pad);

    let plot_width = CHART_WIDTH - MARGIN_LEFT - MARGIN_RIGHT;
    let plot_height = CHART_HEIGHT - MARGIN_TOP - MARGIN_BOTTOM;

    let x_scale =
        |i: usize| -> f64 { MARGIN_LEFT + (i as f64 / (dates.len() - 1).max(1) as f64) * plot_width };
    let y_scale = |v: f64| -> f64 { MARGIN_TOP + plot_height - ((v - lo) / (hi - lo)) * plot_height };

    let mut svg = String::new();
    svg.push_str(&format!(
        r##"<svg width="{}" height="{}" viewBox="0 0 {} {}" xmlns="http://www.w3.org/2000/svg">"##,
        CHART_WIDTH, CHART_HEIGHT, CHART_WIDTH, CHART_HEIGHT
    ));
    svg.push_str("\n  <rect width=\"100%\" height=\"100%\" fill=\"white\"/>\n");
    svg.push_str(&format!(
        "  <text x=\"{}\" y=\"18\" font-size=\"13\" fill=\"#333\">{}</text>\n",
        MARGIN_LEFT,
        escape(title)
    ));

    // Axes
    svg.push_str(&format!(
        "  <line x1=\"{x}\" y1=\"{}\" x2=\"{x}\" y2=\"{}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        MARGIN_TOP,
        CHART_HEIGHT - MARGIN_BOTTOM,
        x = MARGIN_LEFT,
    ));
    svg.push_str(&format!(
        "  <line x1=\"{}\" y1=\"{y}\" x2=\"{}\" y2=\"{y}\" stroke=\"#ccc\" stroke-width=\"1\"/>\n",
        MARGIN_LEFT,
        CHART_WIDTH - MARGIN_RIGHT,
        y = CHART_HEIGHT - MARGIN_BOTTOM,
    ));
    if lo < 0.0 && hi > 0.0 {
        svg.push_str(&format!(
            "  <line x1=\"{}\" y1=\"{y:.1}\" x2=\"{}\" y2=\"{y:.1}\" stroke=\"#999\" stroke-dasharray=\"4 3\"/>\n",
            MARGIN_LEFT,
            CHART_WIDTH - MARGIN_RIGHT,
            y = y_scale(0.0),
        ));
    }

    for (value, y) in [
        (hi, MARGIN_TOP + 5.0),
        ((hi + lo) / 2.0, MARGIN_TOP + plot_height / 2.0),
        (lo, CHART_HEIGHT - MARGIN_BOTTOM - 5.0),
    ] {
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{:.1}\" text-anchor=\"end\" font-size=\"10\" fill=\"#666\">{}</text>\n",
            MARGIN_LEFT - 5.0,
            y,
            fmt_axis(value)
        ));
    }

    let mid = dates.len() / 2;
    for (i, anchor) in [(0, "start"), (mid, "middle"), (dates.len() - 1, "end")] {
        svg.push_str(&format!(
            "  <text x=\"{:.1}\" y=\"{}\" text-anchor=\"{}\" font-size=\"10\" fill=\"#666\">{}</text>\n",
            x_scale(i),
            CHART_HEIGHT - 10.0,
            anchor,
            dates[i]
        ));
    }

    for (k, s) in series.iter().enumerate() {
        let color = PALETTE[k % PALETTE.len()];
        let mut path_data = String::new();
        let mut pen_down = false;
        for (i, &v) in s.values.iter().enumerate().take(dates.len()) {
            if !v.is_finite() {
                pen_down = false;
                continue;
            }
            let cmd = if pen_down { " L" } else { " M" };
            path_data.push_str(&format!("{} {:.1} {:.1}", cmd, x_scale(i), y_scale(v)));
            pen_down = true;
        }
        svg.push_str(&format!(
            "  <path d=\"{}\" fill=\"none\" stroke=\"{}\" stroke-width=\"1.5\"/>\n",
            path_data.trim_start(),
            color
        ));
        svg.push_str(&format!(
            "  <text x=\"{}\" y=\"{}\" text-anchor=\"end\" font-size=\"11\" fill=\"{}\">{}</text>\n",
            CHART_WIDTH - MARGIN_RIGHT,
            18.0 + 13.0 * k as f64,
            color,
            escape(&s.label)
        ));
    }

    svg.push_str("</svg>");
    svg
}

/// One chart per coefficient, since the intercept and the betas live on very
/// different scales.
pub fn coefficient_drift_svgs(rolling: &RollingFit) -> Vec<(String, String)> {
    let dates: Vec<NaiveDate> = rolling.points.iter().map(|p| p.date).collect();
    rolling
        .names
        .iter()
        .enumerate()
        .map(|(k, name)| {
            let values = rolling.points.iter().map(|p| p.coefficients[k]).collect();
            let title = format!(
                "{}: rolling {} ({}-period window)",
                rolling.asset, name, rolling.window
            );
            let svg = line_chart_svg(
                &title,
                &dates,
                &[ChartSeries {
                    label: name.clone(),
                    values,
                }],
            );
            (name.clone(), svg)
        })
        .collect()
}

pub fn prediction_svg(asset: &str, predictions: &[Prediction]) -> String {
    let dates: Vec<NaiveDate> = predictions.iter().map(|p| p.date).collect();
    line_chart_svg(
        &format!("{asset}: next-period return"),
        &dates,
        &[
            ChartSeries {
                label: "actual".into(),
                values: predictions.iter().map(|p| p.actual).collect(),
            },
            ChartSeries {
                label: "predicted".into(),
                values: predictions.iter().map(|p| p.predicted).collect(),
            },
        ],
    )
}

fn fmt_axis(value: f64) -> String {
    if value != 0.0 && value.abs() < 0.01 {
        format!("{:.2e}", value)
    } else {
        format!("{:.3}", value)
    }
}

fn escape(text: &str) -> String {
    text.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
