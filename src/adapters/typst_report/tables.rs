//! Typst table markup for analysis reports.

use crate::domain::analysis::AnalysisConfig;
use crate::domain::report::AssetAnalysis;
use crate::domain::rolling::RollingFit;

fn fmt_num(value: f64, decimals: usize) -> String {
    if value.is_finite() {
        format!("{:.*}", decimals, value)
    } else {
        "n/a".to_string()
    }
}

fn fmt_p(value: f64) -> String {
    if !value.is_finite() {
        "n/a".to_string()
    } else if value < 1e-4 {
        format!("{:.2e}", value)
    } else {
        format!("{:.4}", value)
    }
}

fn fmt_pct(value: f64) -> String {
    if value.is_finite() {
        format!("{:+.3}%", value * 100.0)
    } else {
        "n/a".to_string()
    }
}

/// Typst content brackets treat `#`, `[`, `]`, `*`, `_` and `$` specially.
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        if matches!(c, '#' | '[' | ']' | '*' | '_' | '$' | '\\' | '@' | '<') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}

pub fn render_analysis_summary(config: &AnalysisConfig) -> String {
    let mut out = String::from("#table(\n  columns: 2,\n  [*Property*], [*Value*],\n");
    out.push_str(&format!(
        "  [Period], [{} to {}],\n",
        config.start_date, config.end_date
    ));
    out.push_str(&format!("  [Assets], [{}],\n", escape(&config.assets.join(", "))));
    for f in &config.factors {
        out.push_str(&format!(
            "  [Factor {}], [{} ({})],\n",
            escape(&f.name),
            escape(&f.code),
            f.transform
        ));
    }
    out.push_str(&format!(
        "  [Risk-free factor], [{}],\n",
        config
            .risk_free_factor
            .as_deref()
            .map(escape)
            .unwrap_or_else(|| "none".to_string())
    ));
    out.push_str(&format!("  [Rolling window], [{} periods],\n", config.window));
    out.push_str(&format!(
        "  [Periods per year], [{}],\n",
        fmt_num(config.periods_per_year, 0)
    ));
    out.push_str(")\n");
    out
}

pub fn render_coefficient_table(analysis: &AssetAnalysis) -> String {
    let fit = &analysis.fit;
    let mut out = String::from(
        "#table(\n  columns: 5,\n  align: (left, right, right, right, right),\n",
    );
    out.push_str("  [*Coefficient*], [*Estimate*], [*Std. Error*], [*t*], [*p-value*],\n");

    for i in 0..fit.parameters {
        out.push_str(&format!(
            "  [{}], [{}], [{}], [{}], [{}],\n",
            escape(&fit.names[i]),
            fmt_num(fit.coefficients[i], 6),
            fmt_num(fit.std_errors[i], 6),
            fmt_num(fit.t_stats[i], 3),
            fmt_p(fit.p_values[i]),
        ));
    }
    out.push_str(")\n\n");

    out.push_str(&format!(
        "Observations: {} ({} to {}) · R²: {} · Adj. R²: {} · F: {} · Model p-value: {}\n",
        fit.observations,
        analysis.first_date,
        analysis.last_date,
        fmt_num(fit.r_squared, 4),
        fmt_num(fit.adj_r_squared, 4),
        fmt_num(fit.f_statistic, 3),
        fmt_p(fit.f_p_value),
    ));
    out
}

pub fn render_expected_returns(assets: &[AssetAnalysis], periods_per_year: f64) -> String {
    if assets.is_empty() {
        return "_No assets analysed._\n".to_string();
    }

    let mut out = String::from(
        "#table(\n  columns: 5,\n  align: (left, right, right, right, right),\n",
    );
    out.push_str(
        "  [*Asset*], [*Risk-free (per period)*], [*APT expected*], [*Annualized*], [*Realized mean*],\n",
    );
    for a in assets {
        let er = &a.expected;
        out.push_str(&format!(
            "  [{}], [{}], [{}], [{}], [{}],\n",
            escape(&a.asset),
            fmt_pct(er.risk_free_mean),
            fmt_pct(er.expected),
            fmt_pct(er.annualized(periods_per_year)),
            fmt_pct(er.realized_mean),
        ));
    }
    out.push_str(")\n\n");

    out.push_str("#table(\n  columns: 4,\n  align: (left, left, right, right),\n");
    out.push_str("  [*Asset*], [*Factor*], [*Beta*], [*Premium (per period)*],\n");
    for a in assets {
        for p in &a.expected.premiums {
            out.push_str(&format!(
                "  [{}], [{}], [{}], [{}],\n",
                escape(&a.asset),
                escape(&p.factor),
                fmt_num(p.beta, 4),
                fmt_pct(p.premium),
            ));
        }
    }
    out.push_str(")\n");
    out
}

pub fn render_rolling_ranges(rolling: &RollingFit) -> String {
    let mut out = format!(
        "{} windows of {} periods ({} skipped).\n\n",
        rolling.points.len(),
        rolling.window,
        rolling.skipped
    );
    out.push_str("#table(\n  columns: 4,\n  align: (left, right, right, right),\n");
    out.push_str("  [*Coefficient*], [*Min*], [*Max*], [*Spread*],\n");
    for (name, lo, hi) in rolling.ranges() {
        out.push_str(&format!(
            "  [{}], [{}], [{}], [{}],\n",
            escape(&name),
            fmt_num(lo, 4),
            fmt_num(hi, 4),
            fmt_num(hi - lo, 4),
        ));
    }
    out.push_str(")\n");
    out
}

pub fn render_prediction_summary(assets: &[AssetAnalysis]) -> String {
    let rows: Vec<&AssetAnalysis> = assets
        .iter()
        .filter(|a| a.prediction_summary.is_some())
        .collect();
    if rows.is_empty() {
        return "_Not enough observations for walk-forward predictions._\n".to_string();
    }

    let mut out = String::from(
        "#table(\n  columns: 5,\n  align: (left, right, right, right, right),\n",
    );
    out.push_str("  [*Asset*], [*Predictions*], [*MAE*], [*RMSE*], [*Hit Rate*],\n");
    for a in rows {
        if let Some(s) = &a.prediction_summary {
            out.push_str(&format!(
                "  [{}], [{}], [{}], [{}], [{:.1}%],\n",
                escape(&a.asset),
                s.count,
                fmt_pct(s.mae),
                fmt_pct(s.rmse),
                s.hit_rate * 100.0,
            ));
        }
    }
    out.push_str(")\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numbers_render_nan_as_na() {
        assert_eq!(fmt_num(f64::NAN, 2), "n/a");
        assert_eq!(fmt_num(1.23456, 2), "1.23");
        assert_eq!(fmt_p(f64::NAN), "n/a");
        assert_eq!(fmt_p(0.5), "0.5000");
        assert_eq!(fmt_p(0.00001), "1.00e-5");
        assert_eq!(fmt_pct(0.0123), "+1.230%");
    }

    #[test]
    fn escapes_typst_markup() {
        assert_eq!(escape("^GSPC"), "^GSPC");
        assert_eq!(escape("risk_free"), "risk\\_free");
        assert_eq!(escape("#1 [x]"), "\\#1 \\[x\\]");
    }

    #[test]
    fn empty_tables_have_placeholders() {
        assert!(render_expected_returns(&[], 252.0).contains("No assets"));
        assert!(render_prediction_summary(&[]).contains("Not enough observations"));
    }

    #[test]
    fn rolling_ranges_list_each_coefficient() {
        use crate::domain::rolling::RollingPoint;
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let rolling = RollingFit {
            asset: "MSFT".into(),
            window: 30,
            names: vec!["const".into(), "market".into()],
            points: vec![
                RollingPoint {
                    date,
                    coefficients: vec![0.001, 0.9],
                    r_squared: 0.4,
                },
                RollingPoint {
                    date: date.succ_opt().unwrap(),
                    coefficients: vec![0.002, 1.3],
                    r_squared: 0.5,
                },
            ],
            skipped: 1,
        };
        let out = render_rolling_ranges(&rolling);
        assert!(out.starts_with("2 windows of 30 periods (1 skipped)."));
        assert!(out.contains("[market], [0.9000], [1.3000], [0.4000]"));
    }
}
