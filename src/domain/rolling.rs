//! Rolling-window OLS for tracking coefficient drift.

use crate::domain::error::AptError;
use crate::domain::factor_table::FactorTable;
use crate::domain::ols;
use chrono::NaiveDate;

#[derive(Debug, Clone, PartialEq)]
pub struct RollingPoint {
    /// Date of the last observation in the window.
    pub date: NaiveDate,
    pub coefficients: Vec<f64>,
    pub r_squared: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RollingFit {
    pub asset: String,
    pub window: usize,
    pub names: Vec<String>,
    pub points: Vec<RollingPoint>,
    /// Windows dropped because their design was singular.
    pub skipped: usize,
}

impl RollingFit {
    /// One coefficient's path over time.
    pub fn series(&self, name: &str) -> Option<Vec<(NaiveDate, f64)>> {
        let k = self.names.iter().position(|n| n == name)?;
        Some(
            self.points
                .iter()
                .map(|p| (p.date, p.coefficients[k]))
                .collect(),
        )
    }

    /// Smallest and largest value each coefficient took.
    pub fn ranges(&self) -> Vec<(String, f64, f64)> {
        self.names
            .iter()
            .enumerate()
            .map(|(k, name)| {
                let (lo, hi) = self.points.iter().fold(
                    (f64::INFINITY, f64::NEG_INFINITY),
                    |(lo, hi), p| (lo.min(p.coefficients[k]), hi.max(p.coefficients[k])),
                );
                (name.clone(), lo, hi)
            })
            .collect()
    }
}

pub fn check_window(table: &FactorTable, window: usize) -> Result<(), AptError> {
    let parameters = table.parameter_count();
    if window < parameters {
        return Err(AptError::InvalidWindow {
            window,
            reason: format!("must cover at least {parameters} observations"),
        });
    }
    Ok(())
}

/// Fits rows `i + 1 - window ..= i` for every `i >= window - 1`.
pub fn rolling_fit(table: &FactorTable, window: usize) -> Result<RollingFit, AptError> {
    check_window(table, window)?;
    if window > table.len() {
        return Err(AptError::InsufficientObservations {
            observations: table.len(),
            parameters: window,
        });
    }

    let mut points = Vec::with_capacity(table.len() + 1 - window);
    let mut skipped = 0usize;

    for end in window..=table.len() {
        let sample = table.slice(end - window..end);
        match ols::fit(&sample) {
            Ok(fit) => points.push(RollingPoint {
                date: table.dates[end - 1],
                coefficients: fit.coefficients,
                r_squared: fit.r_squared,
            }),
            Err(AptError::SingularDesign { rank, .. }) => {
                log::debug!(
                    "{}: window ending {} is singular (rank {})",
                    table.asset,
                    table.dates[end - 1],
                    rank
                );
                skipped += 1;
            }
            Err(e) => return Err(e),
        }
    }

    if skipped > 0 {
        log::warn!(
            "{}: skipped {} singular windows of {}",
            table.asset,
            skipped,
            skipped + points.len()
        );
    }

    Ok(RollingFit {
        asset: table.asset.clone(),
        window,
        names: table.coefficient_names(),
        points,
        skipped,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn linear_table(n: usize, alpha: f64, beta: f64) -> FactorTable {
        let start = NaiveDate::from_ymd_opt(2023, 1, 1).unwrap();
        let xs: Vec<f64> = (0..n).map(|i| ((i * 7) % 11) as f64 / 100.0).collect();
        FactorTable {
            asset: "MSFT".into(),
            factor_names: vec!["market".into()],
            dates: (0..n)
                .map(|i| start + chrono::Duration::days(i as i64))
                .collect(),
            response: xs.iter().map(|x| alpha + beta * x).collect(),
            factors: xs.iter().map(|&x| vec![x]).collect(),
        }
    }

    #[test]
    fn produces_one_point_per_full_window() {
        let table = linear_table(20, 0.001, 1.2);
        let rolling = rolling_fit(&table, 5).unwrap();

        assert_eq!(rolling.points.len(), 16);
        assert_eq!(rolling.skipped, 0);
        assert_eq!(rolling.points[0].date, table.dates[4]);
        assert_eq!(rolling.points.last().unwrap().date, table.dates[19]);
        for p in &rolling.points {
            assert_relative_eq!(p.coefficients[0], 0.001, epsilon = 1e-9);
            assert_relative_eq!(p.coefficients[1], 1.2, epsilon = 1e-9);
        }
    }

    #[test]
    fn window_equal_to_sample_gives_single_fit() {
        let table = linear_table(8, 0.0, 0.5);
        let rolling = rolling_fit(&table, 8).unwrap();
        assert_eq!(rolling.points.len(), 1);
    }

    #[test]
    fn window_smaller_than_parameters_is_invalid() {
        let table = linear_table(10, 0.0, 1.0);
        assert!(matches!(
            rolling_fit(&table, 1),
            Err(AptError::InvalidWindow { window: 1, .. })
        ));
    }

    #[test]
    fn window_longer_than_sample_is_insufficient() {
        let table = linear_table(4, 0.0, 1.0);
        assert!(matches!(
            rolling_fit(&table, 6),
            Err(AptError::InsufficientObservations { .. })
        ));
    }

    #[test]
    fn singular_windows_are_skipped() {
        let mut table = linear_table(10, 0.0, 1.0);
        for row in table.factors.iter_mut().take(4) {
            row[0] = 0.02;
        }
        let rolling = rolling_fit(&table, 3).unwrap();
        // Windows ending at rows 2 and 3 see a constant regressor.
        assert_eq!(rolling.skipped, 2);
        assert_eq!(rolling.points.len(), 6);
    }

    #[test]
    fn series_and_ranges_follow_names() {
        let table = linear_table(12, 0.002, 0.9);
        let rolling = rolling_fit(&table, 4).unwrap();
        let betas = rolling.series("market").unwrap();
        assert_eq!(betas.len(), rolling.points.len());
        assert!(rolling.series("value").is_none());

        let ranges = rolling.ranges();
        assert_eq!(ranges[0].0, "const");
        assert_relative_eq!(ranges[1].1, 0.9, epsilon = 1e-9);
        assert_relative_eq!(ranges[1].2, 0.9, epsilon = 1e-9);
    }
}
