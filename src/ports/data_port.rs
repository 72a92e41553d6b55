//! Price data access port.

use crate::domain::error::AptError;
use crate::domain::price::PriceBar;
use chrono::NaiveDate;

pub trait PriceSource {
    /// Bars for `code` with `start_date <= date <= end_date`, sorted by date.
    fn fetch_prices(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, AptError>;

    fn list_symbols(&self) -> Result<Vec<String>, AptError>;

    /// First date, last date and bar count, or `None` when the code is unknown.
    fn get_data_range(&self, code: &str) -> Result<Option<(NaiveDate, NaiveDate, usize)>, AptError>;
}
