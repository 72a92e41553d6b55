//! CSV directory price adapter.
//!
//! One file per series, `<dir>/<CODE>.csv`, with a header row. The `date`
//! column holds `YYYY-MM-DD` dates and the price is read from a configurable
//! column, matched case-insensitively with spaces and underscores ignored, so
//! `adj_close` finds a Yahoo-style `Adj Close` header.

use crate::domain::error::AptError;
use crate::domain::price::{date_range, PriceBar};
use crate::ports::data_port::PriceSource;
use chrono::NaiveDate;
use std::fs;
use std::path::PathBuf;

pub const DEFAULT_PRICE_COLUMN: &str = "close";

pub struct CsvAdapter {
    base_path: PathBuf,
    price_column: String,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self::with_price_column(base_path, DEFAULT_PRICE_COLUMN)
    }

    pub fn with_price_column(base_path: PathBuf, price_column: &str) -> Self {
        Self {
            base_path,
            price_column: price_column.to_string(),
        }
    }

    fn csv_path(&self, code: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", code))
    }

    fn read_all(&self, code: &str) -> Result<Vec<PriceBar>, AptError> {
        let path = self.csv_path(code);
        let content = fs::read_to_string(&path).map_err(|e| AptError::DataStore {
            reason: format!("failed to read {}: {}", path.display(), e),
        })?;
        parse_prices(code, &content, &self.price_column)
    }
}

fn normalize_header(name: &str) -> String {
    name.chars()
        .filter(|c| !c.is_whitespace() && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

fn is_missing(value: &str) -> bool {
    matches!(
        value.trim().to_lowercase().as_str(),
        "" | "null" | "na" | "nan" | "-"
    )
}

/// Parses CSV text into date-sorted bars. Rows with a missing price are skipped.
pub fn parse_prices(code: &str, content: &str, price_column: &str) -> Result<Vec<PriceBar>, AptError> {
    let mut rdr = csv::Reader::from_reader(content.as_bytes());
    let headers = rdr
        .headers()
        .map_err(|e| AptError::DataStore {
            reason: format!("{code}: CSV header error: {e}"),
        })?
        .clone();

    let wanted = normalize_header(price_column);
    let date_idx = headers
        .iter()
        .position(|h| normalize_header(h) == "date")
        .ok_or_else(|| AptError::DataStore {
            reason: format!("{code}: missing date column"),
        })?;
    let price_idx = headers
        .iter()
        .position(|h| normalize_header(h) == wanted)
        .ok_or_else(|| AptError::DataStore {
            reason: format!("{code}: missing {price_column} column"),
        })?;

    let mut bars = Vec::new();
    for (line, result) in rdr.records().enumerate() {
        let record = result.map_err(|e| AptError::DataStore {
            reason: format!("{code}: CSV parse error: {e}"),
        })?;

        let date_str = record.get(date_idx).unwrap_or_default();
        let date = NaiveDate::parse_from_str(date_str.trim(), "%Y-%m-%d").map_err(|e| {
            AptError::DataStore {
                reason: format!("{code}: invalid date '{date_str}' on row {}: {e}", line + 1),
            }
        })?;

        let raw = record.get(price_idx).unwrap_or_default();
        if is_missing(raw) {
            log::debug!("{code}: no price on {date}");
            continue;
        }
        let close: f64 = raw.trim().parse().map_err(|e| AptError::DataStore {
            reason: format!("{code}: invalid price '{raw}' on {date}: {e}"),
        })?;

        bars.push(PriceBar::new(code, date, close));
    }

    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);
    Ok(bars)
}

impl PriceSource for CsvAdapter {
    fn fetch_prices(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, AptError> {
        let mut bars = self.read_all(code)?;
        bars.retain(|b| b.date >= start_date && b.date <= end_date);
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, AptError> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| AptError::DataStore {
            reason: format!(
                "failed to read directory {}: {}",
                self.base_path.display(),
                e
            ),
        })?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| AptError::DataStore {
                reason: format!("directory entry error: {}", e),
            })?;
            let name = entry.file_name();
            if let Some(code) = name.to_string_lossy().strip_suffix(".csv") {
                symbols.push(code.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }

    fn get_data_range(&self, code: &str) -> Result<Option<(NaiveDate, NaiveDate, usize)>, AptError> {
        if !self.csv_path(code).exists() {
            return Ok(None);
        }
        Ok(date_range(&self.read_all(code)?))
    }
}
