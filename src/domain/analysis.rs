//! Analysis settings and assembly of factor tables from a price source.

use crate::domain::error::AptError;
use crate::domain::factor_table::FactorTable;
use crate::domain::returns::{pct_change, FactorTransform, ReturnSeries};
use crate::ports::data_port::PriceSource;
use chrono::NaiveDate;
use std::collections::HashSet;

pub const DEFAULT_WINDOW: usize = 60;
pub const DEFAULT_PERIODS_PER_YEAR: f64 = 252.0;

#[derive(Debug, Clone, PartialEq)]
pub struct FactorSpec {
    pub name: String,
    pub code: String,
    pub transform: FactorTransform,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AnalysisConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub assets: Vec<String>,
    pub factors: Vec<FactorSpec>,
    pub risk_free_factor: Option<String>,
    pub window: usize,
    pub periods_per_year: f64,
}

impl AnalysisConfig {
    pub fn factor_names(&self) -> Vec<String> {
        self.factors.iter().map(|f| f.name.clone()).collect()
    }

    /// Every price series the analysis reads, assets first.
    pub fn all_codes(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.assets
            .iter()
            .cloned()
            .chain(self.factors.iter().map(|f| f.code.clone()))
            .filter(|c| seen.insert(c.clone()))
            .collect()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum CodeListError {
    #[error("empty token in code list")]
    EmptyToken,

    #[error("duplicate code: {0}")]
    DuplicateCode(String),
}

/// Splits a comma-separated list, trimming and upper-casing each entry.
pub fn parse_codes(input: &str) -> Result<Vec<String>, CodeListError> {
    let mut codes = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(CodeListError::EmptyToken);
        }
        let code = trimmed.to_uppercase();
        if !seen.insert(code.clone()) {
            return Err(CodeListError::DuplicateCode(code));
        }
        codes.push(code);
    }

    Ok(codes)
}

/// Fetches and transforms every factor, in configuration order.
pub fn load_factor_series(
    source: &dyn PriceSource,
    config: &AnalysisConfig,
) -> Result<Vec<(String, ReturnSeries)>, AptError> {
    config
        .factors
        .iter()
        .map(|spec| {
            let bars = source.fetch_prices(&spec.code, config.start_date, config.end_date)?;
            if bars.is_empty() {
                return Err(AptError::NoData {
                    code: spec.code.clone(),
                });
            }
            log::info!(
                "Factor {} ({}): {} bars, transform {}",
                spec.name,
                spec.code,
                bars.len(),
                spec.transform
            );
            Ok((
                spec.name.clone(),
                spec.transform.apply(&bars, config.periods_per_year),
            ))
        })
        .collect()
}

/// Asset percent changes aligned against pre-loaded factor series.
pub fn load_asset_table(
    source: &dyn PriceSource,
    config: &AnalysisConfig,
    asset: &str,
    factors: &[(String, ReturnSeries)],
) -> Result<FactorTable, AptError> {
    let bars = source.fetch_prices(asset, config.start_date, config.end_date)?;
    if bars.is_empty() {
        return Err(AptError::NoData {
            code: asset.to_string(),
        });
    }

    let returns = pct_change(&bars);
    let table = FactorTable::align(asset, &returns, factors);
    log::info!(
        "{}: {} bars, {} aligned observations",
        asset,
        bars.len(),
        table.len()
    );

    if table.is_empty() {
        return Err(AptError::NoData {
            code: asset.to_string(),
        });
    }
    Ok(table)
}

/// Loads factors once, then one table per asset. Assets that fail are
/// skipped with a warning; if none succeed the last failure is returned.
pub fn load_tables(
    source: &dyn PriceSource,
    config: &AnalysisConfig,
    assets: &[String],
) -> Result<Vec<FactorTable>, AptError> {
    let factors = load_factor_series(source, config)?;
    let mut tables = Vec::with_capacity(assets.len());
    let mut last_err = None;

    for asset in assets {
        match load_asset_table(source, config, asset, &factors) {
            Ok(table) => tables.push(table),
            Err(e) => {
                log::warn!("skipping {} ({})", asset, e);
                last_err = Some(e);
            }
        }
    }

    match (tables.is_empty(), last_err) {
        (true, Some(e)) => Err(e),
        (true, None) => Err(AptError::NoData {
            code: assets.join(","),
        }),
        _ => Ok(tables),
    }
}
