//! Typst report generation.
//!
//! Reads a Typst template (the built-in default or a custom file), resolves
//! every `{{PLACEHOLDER}}` marker with markup from `tables` and `chart_svg`,
//! and writes the final `.typ` file.

pub mod chart_svg;
pub mod default_template;
pub mod tables;

use std::fs;
use std::path::{Path, PathBuf};

use crate::domain::error::AptError;
use crate::domain::report::AnalysisReport;
use crate::ports::report_port::ReportPort;

fn embed_svg(svg: &str, empty_note: &str) -> String {
    if svg.is_empty() {
        format!("_{empty_note}_")
    } else {
        format!(
            "#image.decode(\n\"{}\",\n  width: 100%,\n)",
            svg.replace('\\', "\\\\").replace('"', "\\\"")
        )
    }
}

fn coefficient_sections(report: &AnalysisReport) -> String {
    if report.assets.is_empty() {
        return "_No assets analysed._\n".to_string();
    }
    report
        .assets
        .iter()
        .map(|a| format!("== {}\n\n{}\n", a.asset, tables::render_coefficient_table(a)))
        .collect()
}

fn rolling_sections(report: &AnalysisReport) -> String {
    let mut out = String::new();
    for a in &report.assets {
        out.push_str(&format!("== {}\n\n", a.asset));
        match &a.rolling {
            Some(rolling) if !rolling.points.is_empty() => {
                out.push_str(&tables::render_rolling_ranges(rolling));
                out.push('\n');
                for (name, svg) in chart_svg::coefficient_drift_svgs(rolling) {
                    out.push_str(&embed_svg(&svg, &format!("No data for {name}.")));
                    out.push_str("\n\n");
                }
            }
            _ => out.push_str("_Not enough observations for a rolling fit._\n\n"),
        }
    }
    out
}

fn prediction_sections(report: &AnalysisReport) -> String {
    let mut out = tables::render_prediction_summary(&report.assets);
    out.push('\n');
    for a in report.assets.iter().filter(|a| !a.predictions.is_empty()) {
        out.push_str(&format!("== {}\n\n", a.asset));
        out.push_str(&embed_svg(
            &chart_svg::prediction_svg(&a.asset, &a.predictions),
            "No prediction data.",
        ));
        out.push_str("\n\n");
    }
    out
}

/// Resolve all `{{PLACEHOLDER}}`s in the template and return Typst markup.
pub fn resolve(template: &str, report: &AnalysisReport) -> String {
    let mut output = template.to_string();

    output = output.replace(
        "{{ANALYSIS_SUMMARY}}",
        &tables::render_analysis_summary(&report.config),
    );
    output = output.replace("{{COEFFICIENT_TABLES}}", &coefficient_sections(report));
    output = output.replace(
        "{{EXPECTED_RETURNS}}",
        &tables::render_expected_returns(&report.assets, report.config.periods_per_year),
    );
    output = output.replace("{{ROLLING_SECTION}}", &rolling_sections(report));
    output = output.replace("{{PREDICTION_SECTION}}", &prediction_sections(report));

    output
}

/// Writes analysis reports as Typst source.
pub struct TypstReportAdapter {
    template_path: Option<PathBuf>,
}

impl TypstReportAdapter {
    pub fn new() -> Self {
        Self {
            template_path: None,
        }
    }

    pub fn with_template(path: impl Into<PathBuf>) -> Self {
        Self {
            template_path: Some(path.into()),
        }
    }

    fn load_template(&self) -> Result<String, AptError> {
        match &self.template_path {
            Some(path) => fs::read_to_string(path).map_err(AptError::Io),
            None => Ok(default_template::template().to_string()),
        }
    }
}

impl Default for TypstReportAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportPort for TypstReportAdapter {
    fn write(&self, report: &AnalysisReport, output_path: &str) -> Result<(), AptError> {
        let template = self.load_template()?;
        let typst = resolve(&template, report);

        let path = Path::new(output_path);
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(AptError::Io)?;
            }
        }
        fs::write(path, typst).map_err(AptError::Io)?;
        log::info!("report written to {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::{AnalysisConfig, FactorSpec};
    use crate::domain::factor_table::FactorTable;
    use crate::domain::report::analyze_table;
    use crate::domain::returns::FactorTransform;
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn sample_config(window: usize) -> AnalysisConfig {
        AnalysisConfig {
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
            assets: vec!["MSFT".into()],
            factors: vec![
                FactorSpec {
                    name: "market".into(),
                    code: "SPY".into(),
                    transform: FactorTransform::PctChange,
                },
                FactorSpec {
                    name: "rf".into(),
                    code: "^IRX".into(),
                    transform: FactorTransform::Yield,
                },
            ],
            risk_free_factor: Some("rf".into()),
            window,
            periods_per_year: 252.0,
        }
    }

    fn sample_report(window: usize) -> AnalysisReport {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let n = 40;
        let market: Vec<f64> = (0..n).map(|i| ((i * 7 % 11) as f64 - 5.0) / 500.0).collect();
        let rf: Vec<f64> = (0..n).map(|i| 0.0002 + (i % 3) as f64 * 0.0001).collect();
        let response: Vec<f64> = (0..n)
            .map(|i| 0.0005 + 1.2 * market[i] + ((i * 5 % 7) as f64 - 3.0) / 2000.0)
            .collect();
        let table = FactorTable {
            asset: "MSFT".into(),
            factor_names: vec!["market".into(), "rf".into()],
            dates: (0..n).map(|i| start + chrono::Duration::days(i as i64)).collect(),
            response,
            factors: (0..n).map(|i| vec![market[i], rf[i]]).collect(),
        };
        let config = sample_config(window);
        let analysis = analyze_table(&table, &config).unwrap();
        AnalysisReport {
            config,
            assets: vec![analysis],
        }
    }

    #[test]
    fn resolve_default_template_no_placeholders_remain() {
        let output = resolve(default_template::template(), &sample_report(20));
        assert!(
            !output.contains("{{"),
            "unresolved placeholder in output: {output}"
        );
    }

    #[test]
    fn resolve_produces_valid_typst() {
        let output = resolve(default_template::template(), &sample_report(20));
        assert!(output.contains("#set page("));
        assert!(output.contains("= Factor Regressions"));
        assert!(output.contains("== MSFT"));
        assert!(output.contains("#table("));
        assert!(output.contains("[const]"));
        assert!(output.contains("[market]"));
        assert!(output.contains("#image.decode("));
        assert!(output.contains("MSFT: rolling market (20-period window)"));
        assert!(output.contains("[*Hit Rate*]"));
    }

    #[test]
    fn window_longer_than_sample_leaves_notes() {
        let output = resolve(default_template::template(), &sample_report(100));
        assert!(output.contains("Not enough observations for a rolling fit"));
        assert!(output.contains("Not enough observations for walk-forward predictions"));
        assert!(!output.contains("#image.decode("));
    }

    #[test]
    fn resolve_custom_template() {
        let custom = "= My Report\n{{ANALYSIS_SUMMARY}}\n{{EXPECTED_RETURNS}}";
        let output = resolve(custom, &sample_report(20));
        assert!(output.contains("= My Report"));
        assert!(output.contains("[Risk-free factor], [rf]"));
        assert!(!output.contains("{{"));
    }

    #[test]
    fn adapter_writes_file_and_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/nested/report.typ");
        TypstReportAdapter::new()
            .write(&sample_report(20), path.to_str().unwrap())
            .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("APT Expected Returns"));
    }

    #[test]
    fn adapter_uses_custom_template_file() {
        let dir = TempDir::new().unwrap();
        let template = dir.path().join("custom.typ");
        fs::write(&template, "Custom\n{{COEFFICIENT_TABLES}}").unwrap();
        let out = dir.path().join("report.typ");

        TypstReportAdapter::with_template(&template)
            .write(&sample_report(20), out.to_str().unwrap())
            .unwrap();
        let content = fs::read_to_string(&out).unwrap();
        assert!(content.starts_with("Custom\n== MSFT"));
    }

    #[test]
    fn missing_template_is_io_error() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("report.typ");
        let result = TypstReportAdapter::with_template("/nonexistent/template.typ")
            .write(&sample_report(20), out.to_str().unwrap());
        assert!(matches!(result, Err(AptError::Io(_))));
    }
}
