//! Price observations.

use chrono::NaiveDate;

/// One closing (or adjusted closing) price of one series.
#[derive(Debug, Clone, PartialEq)]
pub struct PriceBar {
    pub code: String,
    pub date: NaiveDate,
    pub close: f64,
}

impl PriceBar {
    pub fn new(code: impl Into<String>, date: NaiveDate, close: f64) -> Self {
        Self {
            code: code.into(),
            date,
            close,
        }
    }
}

/// First date, last date and bar count of a sorted slice.
pub fn date_range(bars: &[PriceBar]) -> Option<(NaiveDate, NaiveDate, usize)> {
    let first = bars.first()?;
    let last = bars.last()?;
    Some((first.date, last.date, bars.len()))
}
