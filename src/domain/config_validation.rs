//! Configuration validation.
//!
//! Checks every field an analysis reads before any price data is touched.

use crate::domain::analysis::{parse_codes, DEFAULT_PERIODS_PER_YEAR};
use crate::domain::error::AptError;
use crate::domain::returns::FactorTransform;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub fn validate_analysis_config(config: &dyn ConfigPort) -> Result<(), AptError> {
    validate_data_source(config)?;
    validate_dates(config)?;
    validate_assets(config)?;
    validate_factors(config)?;
    validate_window(config)?;
    validate_periods_per_year(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> AptError {
    AptError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn missing(section: &str, key: &str) -> AptError {
    AptError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    }
}

fn validate_data_source(config: &dyn ConfigPort) -> Result<(), AptError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string());
    match source.trim().to_lowercase().as_str() {
        "csv" => {}
        "sqlite" => {
            if config.get_string("data", "sqlite_path").is_none() {
                return Err(missing("data", "sqlite_path"));
            }
        }
        other => {
            return Err(invalid(
                "data",
                "source",
                format!("unknown source '{other}' (expected csv or sqlite)"),
            ));
        }
    }

    if let Some(col) = config.get_string("data", "price_column") {
        if col.trim().is_empty() {
            return Err(invalid("data", "price_column", "price_column must not be empty"));
        }
    }
    Ok(())
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), AptError> {
    let start_date = parse_date(config.get_string("analysis", "start_date").as_deref(), "start_date")?;
    let end_date = parse_date(config.get_string("analysis", "end_date").as_deref(), "end_date")?;

    if start_date >= end_date {
        return Err(invalid(
            "analysis",
            "start_date",
            "start_date must be before end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, AptError> {
    match value {
        None => Err(missing("analysis", field)),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "analysis",
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_assets(config: &dyn ConfigPort) -> Result<(), AptError> {
    match config.get_string("analysis", "assets") {
        Some(s) if !s.trim().is_empty() => parse_codes(&s)
            .map(|_| ())
            .map_err(|e| invalid("analysis", "assets", e.to_string())),
        _ => Err(missing("analysis", "assets")),
    }
}

fn validate_factors(config: &dyn ConfigPort) -> Result<(), AptError> {
    let names = config.get_list("analysis", "factors");
    if names.is_empty() {
        return Err(missing("analysis", "factors"));
    }

    let mut seen = std::collections::HashSet::new();
    for name in &names {
        if !seen.insert(name.as_str()) {
            return Err(invalid(
                "analysis",
                "factors",
                format!("duplicate factor '{name}'"),
            ));
        }
        if name == "const" {
            return Err(invalid(
                "analysis",
                "factors",
                "'const' is reserved for the intercept",
            ));
        }

        let section = format!("factor.{name}");
        match config.get_string(&section, "code") {
            Some(code) if !code.trim().is_empty() => {}
            _ => return Err(missing(&section, "code")),
        }
        if let Some(t) = config.get_string(&section, "transform") {
            t.parse::<FactorTransform>()
                .map_err(|reason| invalid(&section, "transform", reason))?;
        }
    }

    if let Some(rf) = config.get_string("analysis", "risk_free_factor") {
        let rf = rf.trim();
        if !rf.is_empty() && !names.iter().any(|n| n == rf) {
            return Err(invalid(
                "analysis",
                "risk_free_factor",
                format!("'{rf}' is not one of the configured factors"),
            ));
        }
    }
    Ok(())
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), AptError> {
    let Some(raw) = config.get_string("analysis", "window") else {
        return Ok(());
    };
    let window: i64 = raw
        .trim()
        .parse()
        .map_err(|_| invalid("analysis", "window", "window must be an integer"))?;

    let parameters = config.get_list("analysis", "factors").len() as i64 + 1;
    if window < parameters {
        return Err(invalid(
            "analysis",
            "window",
            format!("window must be at least {parameters} (one per coefficient)"),
        ));
    }
    Ok(())
}

fn validate_periods_per_year(config: &dyn ConfigPort) -> Result<(), AptError> {
    parse_periods_per_year(config).map(|_| ())
}

/// `[analysis] periods_per_year`, defaulting when absent. Must be a finite
/// positive number.
pub fn parse_periods_per_year(config: &dyn ConfigPort) -> Result<f64, AptError> {
    let Some(raw) = config.get_string("analysis", "periods_per_year") else {
        return Ok(DEFAULT_PERIODS_PER_YEAR);
    };
    let value: f64 = raw.trim().parse().map_err(|_| {
        invalid(
            "analysis",
            "periods_per_year",
            "periods_per_year must be a number",
        )
    })?;
    if !value.is_finite() || value <= 0.0 {
        return Err(invalid(
            "analysis",
            "periods_per_year",
            "periods_per_year must be a finite positive number",
        ));
    }
    Ok(value)
}
