//! Date-aligned table of an asset's returns against its factors.
//!
//! Rows exist only for dates present in the asset series and in every factor
//! series, so the sample handed to the regression never has gaps.

use crate::domain::returns::ReturnSeries;
use chrono::NaiveDate;
use nalgebra::{DMatrix, DVector};
use std::collections::HashMap;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq)]
pub struct FactorTable {
    pub asset: String,
    pub factor_names: Vec<String>,
    pub dates: Vec<NaiveDate>,
    pub response: Vec<f64>,
    /// Row-major: `factors[row][k]` is factor `k` on `dates[row]`.
    pub factors: Vec<Vec<f64>>,
}

impl FactorTable {
    pub fn align(asset: &str, response: &ReturnSeries, factors: &[(String, ReturnSeries)]) -> Self {
        let indexes: Vec<HashMap<NaiveDate, f64>> = factors
            .iter()
            .map(|(_, series)| series.points.iter().map(|p| (p.date, p.value)).collect())
            .collect();

        let mut dates = Vec::new();
        let mut ys = Vec::new();
        let mut rows = Vec::new();

        for point in &response.points {
            if !point.value.is_finite() {
                continue;
            }
            let row: Option<Vec<f64>> = indexes
                .iter()
                .map(|idx| idx.get(&point.date).copied().filter(|v| v.is_finite()))
                .collect();
            if let Some(row) = row {
                dates.push(point.date);
                ys.push(point.value);
                rows.push(row);
            }
        }

        let dropped = response.len() - dates.len();
        if dropped > 0 {
            log::warn!(
                "{}: dropped {} of {} rows without a full set of factor values",
                asset,
                dropped,
                response.len()
            );
        }

        Self {
            asset: asset.to_string(),
            factor_names: factors.iter().map(|(name, _)| name.clone()).collect(),
            dates,
            response: ys,
            factors: rows,
        }
    }

    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    /// Intercept plus one coefficient per factor.
    pub fn parameter_count(&self) -> usize {
        self.factor_names.len() + 1
    }

    /// Coefficient labels in fit order, intercept first.
    pub fn coefficient_names(&self) -> Vec<String> {
        std::iter::once("const".to_string())
            .chain(self.factor_names.iter().cloned())
            .collect()
    }

    pub fn factor_index(&self, name: &str) -> Option<usize> {
        self.factor_names.iter().position(|n| n == name)
    }

    pub fn factor_column(&self, name: &str) -> Option<Vec<f64>> {
        let k = self.factor_index(name)?;
        Some(self.factors.iter().map(|row| row[k]).collect())
    }

    /// `n x p` design matrix with a leading column of ones.
    pub fn design_matrix(&self) -> DMatrix<f64> {
        DMatrix::from_fn(self.len(), self.parameter_count(), |i, j| {
            if j == 0 { 1.0 } else { self.factors[i][j - 1] }
        })
    }

    pub fn response_vector(&self) -> DVector<f64> {
        DVector::from_column_slice(&self.response)
    }

    pub fn slice(&self, rows: Range<usize>) -> Self {
        Self {
            asset: self.asset.clone(),
            factor_names: self.factor_names.clone(),
            dates: self.dates[rows.clone()].to_vec(),
            response: self.response[rows.clone()].to_vec(),
            factors: self.factors[rows].to_vec(),
        }
    }
}
