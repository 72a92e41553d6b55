//! Next-period return prediction from fitted factor models.

use crate::domain::error::AptError;
use crate::domain::factor_table::FactorTable;
use crate::domain::ols::{self, OlsFit};
use crate::domain::rolling::check_window;
use chrono::NaiveDate;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Prediction {
    pub date: NaiveDate,
    pub predicted: f64,
    pub actual: f64,
}

impl Prediction {
    pub fn error(&self) -> f64 {
        self.actual - self.predicted
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PredictionSummary {
    pub count: usize,
    pub mae: f64,
    pub rmse: f64,
    /// Share of predictions whose sign matched the realised return.
    pub hit_rate: f64,
}

/// Fits rows `t - window .. t` and predicts row `t` from its factor values,
/// for every `t >= window`.
pub fn walk_forward(table: &FactorTable, window: usize) -> Result<Vec<Prediction>, AptError> {
    check_window(table, window)?;
    if window >= table.len() {
        return Err(AptError::InsufficientObservations {
            observations: table.len(),
            parameters: window + 1,
        });
    }

    let mut predictions = Vec::with_capacity(table.len() - window);
    for t in window..table.len() {
        let fit = match ols::fit(&table.slice(t - window..t)) {
            Ok(fit) => fit,
            Err(AptError::SingularDesign { .. }) => {
                log::warn!(
                    "{}: no prediction for {} (singular training window)",
                    table.asset,
                    table.dates[t]
                );
                continue;
            }
            Err(e) => return Err(e),
        };
        predictions.push(Prediction {
            date: table.dates[t],
            predicted: fit.predict(&table.factors[t]),
            actual: table.response[t],
        });
    }

    Ok(predictions)
}

pub fn summarize(predictions: &[Prediction]) -> Option<PredictionSummary> {
    if predictions.is_empty() {
        return None;
    }
    let n = predictions.len() as f64;
    let mae = predictions.iter().map(|p| p.error().abs()).sum::<f64>() / n;
    let rmse = (predictions.iter().map(|p| p.error().powi(2)).sum::<f64>() / n).sqrt();
    let hits = predictions
        .iter()
        .filter(|p| (p.predicted >= 0.0) == (p.actual >= 0.0))
        .count();

    Some(PredictionSummary {
        count: predictions.len(),
        mae,
        rmse,
        hit_rate: hits as f64 / n,
    })
}

/// Parses `market=0.01,risk_free=0.0002` into values ordered like `factor_names`.
pub fn parse_scenario(input: &str, factor_names: &[String]) -> Result<Vec<f64>, AptError> {
    let mut values: HashMap<String, f64> = HashMap::new();

    for token in input.split(',') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }
        let (name, raw) = token.split_once('=').ok_or_else(|| AptError::InvalidScenario {
            reason: format!("expected name=value, got '{token}'"),
        })?;
        let name = name.trim();
        if !factor_names.iter().any(|f| f == name) {
            return Err(AptError::InvalidScenario {
                reason: format!("unknown factor '{name}'"),
            });
        }
        let value: f64 = raw.trim().parse().map_err(|_| AptError::InvalidScenario {
            reason: format!("invalid value for {name}: '{}'", raw.trim()),
        })?;
        if values.insert(name.to_string(), value).is_some() {
            return Err(AptError::InvalidScenario {
                reason: format!("factor '{name}' given twice"),
            });
        }
    }

    factor_names
        .iter()
        .map(|name| {
            values.get(name).copied().ok_or_else(|| AptError::InvalidScenario {
                reason: format!("missing value for factor '{name}'"),
            })
        })
        .collect()
}

/// Prediction from a full-sample fit for given factor realizations.
pub fn predict_scenario(fit: &OlsFit, values: &[f64]) -> f64 {
    fit.predict(values)
}
