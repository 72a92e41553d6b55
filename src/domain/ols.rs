//! Ordinary least squares for linear factor models.
//!
//! Solves `y = X b + e` with a thin SVD of `X`, which also supplies the
//! numerical rank and `(X'X)^-1 = V S^-2 V'`. Rank-deficient designs are
//! rejected rather than regularised. Inference follows the classical homoskedastic assumptions:
//! Student-t tests on each coefficient and an F test on the whole model.

use crate::domain::error::AptError;
use crate::domain::factor_table::FactorTable;
use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ContinuousCDF, FisherSnedecor, StudentsT};

#[derive(Debug, Clone, PartialEq)]
pub struct OlsFit {
    /// Coefficient labels, intercept (`const`) first.
    pub names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub std_errors: Vec<f64>,
    pub t_stats: Vec<f64>,
    pub p_values: Vec<f64>,
    pub fitted: Vec<f64>,
    pub residuals: Vec<f64>,
    pub r_squared: f64,
    pub adj_r_squared: f64,
    pub f_statistic: f64,
    /// p-value of the F test that every slope is zero.
    pub f_p_value: f64,
    pub residual_std_error: f64,
    pub observations: usize,
    pub parameters: usize,
}

impl OlsFit {
    pub fn intercept(&self) -> f64 {
        self.coefficients[0]
    }

    /// Slope coefficients in factor order.
    pub fn betas(&self) -> &[f64] {
        &self.coefficients[1..]
    }

    pub fn coefficient(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.coefficients[i])
    }

    pub fn degrees_of_freedom(&self) -> usize {
        self.observations - self.parameters
    }

    /// Intercept plus the dot product of the betas with `factor_values`,
    /// which must follow the factor order of the fit.
    pub fn predict(&self, factor_values: &[f64]) -> f64 {
        debug_assert_eq!(factor_values.len(), self.betas().len());
        self.intercept()
            + self
                .betas()
                .iter()
                .zip(factor_values)
                .map(|(b, f)| b * f)
                .sum::<f64>()
    }
}

pub fn fit(table: &FactorTable) -> Result<OlsFit, AptError> {
    fit_matrix(
        &table.design_matrix(),
        &table.response_vector(),
        table.coefficient_names(),
    )
}

pub fn fit_matrix(
    x: &DMatrix<f64>,
    y: &DVector<f64>,
    names: Vec<String>,
) -> Result<OlsFit, AptError> {
    let n = x.nrows();
    let p = x.ncols();

    if n < p || p == 0 {
        return Err(AptError::InsufficientObservations {
            observations: n,
            parameters: p,
        });
    }

    let svd = x.clone().svd(true, true);
    let tol = rank_tolerance(n, p, &svd.singular_values);
    let rank = svd.singular_values.iter().filter(|&&s| s > tol).count();
    let singular = || AptError::SingularDesign {
        rank,
        parameters: p,
    };
    if rank < p {
        return Err(singular());
    }

    let beta = svd.solve(y, tol).map_err(|_| singular())?;
    let v_t = svd.v_t.as_ref().ok_or_else(singular)?;

    let fitted = x * &beta;
    let residuals = y - &fitted;
    let ssr = residuals.dot(&residuals);
    let y_mean = y.mean();
    let sst: f64 = y.iter().map(|v| (v - y_mean).powi(2)).sum();

    let df_resid = n - p;
    let df_model = p - 1;

    let r_squared = if sst > 0.0 { 1.0 - ssr / sst } else { f64::NAN };

    let (std_errors, residual_std_error) = if df_resid > 0 {
        let sigma2 = ssr / df_resid as f64;
        let s = &svd.singular_values;
        let se: Vec<f64> = (0..p)
            .map(|j| {
                let xtx_inv_jj: f64 = (0..p).map(|k| (v_t[(k, j)] / s[k]).powi(2)).sum();
                (sigma2 * xtx_inv_jj).sqrt()
            })
            .collect();
        (se, sigma2.sqrt())
    } else {
        (vec![f64::NAN; p], f64::NAN)
    };

    let t_stats: Vec<f64> = beta
        .iter()
        .zip(&std_errors)
        .map(|(b, se)| b / se)
        .collect();
    let p_values = t_stats
        .iter()
        .map(|&t| t_test_p_value(t, df_resid))
        .collect();

    let adj_r_squared = if df_resid > 0 {
        1.0 - (1.0 - r_squared) * (n - 1) as f64 / df_resid as f64
    } else {
        f64::NAN
    };

    let f_statistic = if df_model > 0 && df_resid > 0 {
        (r_squared / df_model as f64) / ((1.0 - r_squared) / df_resid as f64)
    } else {
        f64::NAN
    };
    let f_p_value = f_test_p_value(f_statistic, df_model, df_resid);

    Ok(OlsFit {
        names,
        coefficients: beta.iter().copied().collect(),
        std_errors,
        t_stats,
        p_values,
        fitted: fitted.iter().copied().collect(),
        residuals: residuals.iter().copied().collect(),
        r_squared,
        adj_r_squared,
        f_statistic,
        f_p_value,
        residual_std_error,
        observations: n,
        parameters: p,
    })
}

/// Count of singular values above `max(n, p) * eps * s_max`.
pub fn numerical_rank(x: &DMatrix<f64>) -> usize {
    if x.is_empty() {
        return 0;
    }
    let singular_values = x.clone().svd(false, false).singular_values;
    let tol = rank_tolerance(x.nrows(), x.ncols(), &singular_values);
    singular_values.iter().filter(|&&s| s > tol).count()
}

fn rank_tolerance(n: usize, p: usize, singular_values: &DVector<f64>) -> f64 {
    n.max(p) as f64 * f64::EPSILON * singular_values.max()
}

/// Two-sided p-value for a t statistic.
fn t_test_p_value(t: f64, df: usize) -> f64 {
    if t.is_nan() || df == 0 {
        return f64::NAN;
    }
    if t.is_infinite() {
        return 0.0;
    }
    match StudentsT::new(0.0, 1.0, df as f64) {
        Ok(dist) => (2.0 * dist.sf(t.abs())).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}

fn f_test_p_value(f: f64, df_model: usize, df_resid: usize) -> f64 {
    if f.is_nan() || df_model == 0 || df_resid == 0 {
        return f64::NAN;
    }
    if f.is_infinite() {
        return 0.0;
    }
    match FisherSnedecor::new(df_model as f64, df_resid as f64) {
        Ok(dist) => dist.sf(f.max(0.0)).clamp(0.0, 1.0),
        Err(_) => f64::NAN,
    }
}
