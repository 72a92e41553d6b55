//! APT expected returns: `E[R] = rf + sum_k beta_k * premium_k`.
//!
//! Each factor's premium is its sample mean in excess of the risk-free
//! factor's sample mean. Without a risk-free factor the rate is taken as zero
//! and premiums are the raw factor means.

use crate::domain::factor_table::FactorTable;
use crate::domain::ols::OlsFit;

#[derive(Debug, Clone, PartialEq)]
pub struct FactorPremium {
    pub factor: String,
    pub beta: f64,
    pub premium: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExpectedReturn {
    pub asset: String,
    pub risk_free_mean: f64,
    pub premiums: Vec<FactorPremium>,
    /// Per-period expected return implied by the betas.
    pub expected: f64,
    /// Mean realised return over the same sample.
    pub realized_mean: f64,
}

impl ExpectedReturn {
    /// Compounds the per-period figure over `periods_per_year`.
    pub fn annualized(&self, periods_per_year: f64) -> f64 {
        (1.0 + self.expected).powf(periods_per_year) - 1.0
    }
}

pub fn expected_return(
    fit: &OlsFit,
    table: &FactorTable,
    risk_free_factor: Option<&str>,
) -> ExpectedReturn {
    let risk_free_mean = risk_free_factor
        .and_then(|name| table.factor_column(name))
        .map(|col| mean(&col))
        .unwrap_or(0.0);

    let premiums: Vec<FactorPremium> = table
        .factor_names
        .iter()
        .zip(fit.betas())
        .map(|(name, &beta)| {
            let premium = if Some(name.as_str()) == risk_free_factor {
                0.0
            } else {
                table
                    .factor_column(name)
                    .map(|col| mean(&col) - risk_free_mean)
                    .unwrap_or(0.0)
            };
            FactorPremium {
                factor: name.clone(),
                beta,
                premium,
            }
        })
        .collect();

    let expected = risk_free_mean + premiums.iter().map(|p| p.beta * p.premium).sum::<f64>();

    ExpectedReturn {
        asset: table.asset.clone(),
        risk_free_mean,
        premiums,
        expected,
        realized_mean: mean(&table.response),
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}
