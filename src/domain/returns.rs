//! Per-period return series derived from prices.

use crate::domain::price::PriceBar;
use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReturnPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Date-sorted values of one series. Never holds non-finite values.
#[derive(Debug, Clone, PartialEq)]
pub struct ReturnSeries {
    pub code: String,
    pub points: Vec<ReturnPoint>,
}

impl ReturnSeries {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.points.is_empty() {
            return None;
        }
        Some(self.points.iter().map(|p| p.value).sum::<f64>() / self.points.len() as f64)
    }
}

/// How a factor's raw price series turns into per-period values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FactorTransform {
    #[default]
    PctChange,
    Level,
    /// Annualized percentage yield, e.g. a T-bill quote of `5.1`.
    Yield,
}

impl FactorTransform {
    pub fn apply(&self, bars: &[PriceBar], periods_per_year: f64) -> ReturnSeries {
        match self {
            Self::PctChange => pct_change(bars),
            Self::Level => levels(bars),
            Self::Yield => yields(bars, periods_per_year),
        }
    }
}

impl FromStr for FactorTransform {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pct_change" | "return" | "returns" => Ok(Self::PctChange),
            "level" | "raw" => Ok(Self::Level),
            "yield" => Ok(Self::Yield),
            other => Err(format!(
                "unknown transform '{other}' (expected pct_change, level or yield)"
            )),
        }
    }
}

impl fmt::Display for FactorTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PctChange => "pct_change",
            Self::Level => "level",
            Self::Yield => "yield",
        };
        f.write_str(name)
    }
}

/// `(p_t - p_{t-1}) / p_{t-1}`, dated at `t`. The first bar yields nothing, as
/// does any bar whose predecessor is zero or non-finite.
pub fn pct_change(bars: &[PriceBar]) -> ReturnSeries {
    let points = bars
        .windows(2)
        .filter_map(|w| {
            let prev = w[0].close;
            let curr = w[1].close;
            if prev == 0.0 || !prev.is_finite() {
                return None;
            }
            let value = (curr - prev) / prev;
            value.is_finite().then_some(ReturnPoint {
                date: w[1].date,
                value,
            })
        })
        .collect();

    ReturnSeries {
        code: series_code(bars),
        points,
    }
}

pub fn levels(bars: &[PriceBar]) -> ReturnSeries {
    ReturnSeries {
        code: series_code(bars),
        points: bars
            .iter()
            .filter(|b| b.close.is_finite())
            .map(|b| ReturnPoint {
                date: b.date,
                value: b.close,
            })
            .collect(),
    }
}

/// Converts an annualized percentage into a per-period rate.
pub fn yields(bars: &[PriceBar], periods_per_year: f64) -> ReturnSeries {
    let mut series = levels(bars);
    for p in &mut series.points {
        p.value = p.value / 100.0 / periods_per_year;
    }
    series
}

fn series_code(bars: &[PriceBar]) -> String {
    bars.first().map(|b| b.code.clone()).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn bars(closes: &[f64]) -> Vec<PriceBar> {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        closes
            .iter()
            .enumerate()
            .map(|(i, &c)| PriceBar::new("SPY", start + chrono::Duration::days(i as i64), c))
            .collect()
    }

    #[test]
    fn pct_change_skips_first_bar() {
        let series = pct_change(&bars(&[100.0, 110.0, 99.0]));
        assert_eq!(series.code, "SPY");
        assert_eq!(series.len(), 2);
        assert_relative_eq!(series.points[0].value, 0.10, epsilon = 1e-12);
        assert_relative_eq!(series.points[1].value, -0.10, epsilon = 1e-12);
        assert_eq!(
            series.points[0].date,
            NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()
        );
    }

    #[test]
    fn pct_change_drops_zero_base() {
        let series = pct_change(&bars(&[0.0, 5.0, 10.0]));
        assert_eq!(series.len(), 1);
        assert_relative_eq!(series.points[0].value, 1.0);
    }

    #[test]
    fn pct_change_of_empty_is_empty() {
        let series = pct_change(&[]);
        assert!(series.is_empty());
        assert!(series.mean().is_none());
    }

    #[test]
    fn yields_divide_by_periods() {
        let series = yields(&bars(&[5.04, 2.52]), 252.0);
        assert_relative_eq!(series.points[0].value, 0.0002, epsilon = 1e-15);
        assert_relative_eq!(series.points[1].value, 0.0001, epsilon = 1e-15);
    }

    #[test]
    fn levels_keep_every_finite_bar() {
        let series = levels(&bars(&[1.0, f64::NAN, 3.0]));
        assert_eq!(series.len(), 2);
        assert_relative_eq!(series.mean().unwrap(), 2.0);
    }

    #[test]
    fn transform_parses_aliases() {
        assert_eq!("pct_change".parse(), Ok(FactorTransform::PctChange));
        assert_eq!(" Level ".parse(), Ok(FactorTransform::Level));
        assert_eq!("yield".parse(), Ok(FactorTransform::Yield));
        assert!("log".parse::<FactorTransform>().is_err());
    }

    #[test]
    fn transform_display_round_trips() {
        for t in [
            FactorTransform::PctChange,
            FactorTransform::Level,
            FactorTransform::Yield,
        ] {
            assert_eq!(t.to_string().parse::<FactorTransform>(), Ok(t));
        }
    }
}
