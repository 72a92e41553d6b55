//! Per-asset analysis results gathered for reporting.

use crate::domain::analysis::AnalysisConfig;
use crate::domain::apt::{expected_return, ExpectedReturn};
use crate::domain::error::AptError;
use crate::domain::factor_table::FactorTable;
use crate::domain::ols::{self, OlsFit};
use crate::domain::prediction::{summarize, walk_forward, Prediction, PredictionSummary};
use crate::domain::rolling::{rolling_fit, RollingFit};
use chrono::NaiveDate;

#[derive(Debug, Clone)]
pub struct AssetAnalysis {
    pub asset: String,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
    pub fit: OlsFit,
    pub expected: ExpectedReturn,
    pub rolling: Option<RollingFit>,
    pub predictions: Vec<Prediction>,
    pub prediction_summary: Option<PredictionSummary>,
}

#[derive(Debug, Clone)]
pub struct AnalysisReport {
    pub config: AnalysisConfig,
    pub assets: Vec<AssetAnalysis>,
}

/// Full-sample fit, APT expectation, rolling fit and walk-forward predictions.
/// Only the full-sample fit is mandatory; the windowed parts are left empty
/// when the sample is too short for the configured window.
pub fn analyze_table(table: &FactorTable, config: &AnalysisConfig) -> Result<AssetAnalysis, AptError> {
    let fit = ols::fit(table)?;
    let expected = expected_return(&fit, table, config.risk_free_factor.as_deref());

    let rolling = match rolling_fit(table, config.window) {
        Ok(r) => Some(r),
        Err(e) => {
            log::warn!("{}: no rolling fit ({})", table.asset, e);
            None
        }
    };

    let predictions = match walk_forward(table, config.window) {
        Ok(p) => p,
        Err(e) => {
            log::warn!("{}: no walk-forward predictions ({})", table.asset, e);
            Vec::new()
        }
    };
    let prediction_summary = summarize(&predictions);

    Ok(AssetAnalysis {
        asset: table.asset.clone(),
        first_date: table.dates[0],
        last_date: table.dates[table.len() - 1],
        fit,
        expected,
        rolling,
        predictions,
        prediction_summary,
    })
}
