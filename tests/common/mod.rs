#![allow(dead_code)]

use aptfit::domain::analysis::{AnalysisConfig, FactorSpec};
use aptfit::domain::error::AptError;
pub use aptfit::domain::price::PriceBar;
use aptfit::domain::price::date_range;
use aptfit::domain::returns::FactorTransform;
use aptfit::ports::data_port::PriceSource;
use chrono::NaiveDate;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub struct MockPriceSource {
    pub data: HashMap<String, Vec<PriceBar>>,
    pub errors: HashMap<String, String>,
}

impl MockPriceSource {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_bars(mut self, code: &str, bars: Vec<PriceBar>) -> Self {
        self.data.insert(code.to_string(), bars);
        self
    }

    pub fn with_error(mut self, code: &str, reason: &str) -> Self {
        self.errors.insert(code.to_string(), reason.to_string());
        self
    }
}

impl PriceSource for MockPriceSource {
    fn fetch_prices(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, AptError> {
        if let Some(reason) = self.errors.get(code) {
            return Err(AptError::DataStore {
                reason: reason.clone(),
            });
        }
        Ok(self
            .data
            .get(code)
            .map(|bars| {
                bars.iter()
                    .filter(|b| b.date >= start_date && b.date <= end_date)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn list_symbols(&self) -> Result<Vec<String>, AptError> {
        let mut codes: Vec<String> = self.data.keys().cloned().collect();
        codes.sort();
        Ok(codes)
    }

    fn get_data_range(&self, code: &str) -> Result<Option<(NaiveDate, NaiveDate, usize)>, AptError> {
        Ok(self.data.get(code).and_then(|bars| date_range(bars)))
    }
}

pub fn date(s: &str) -> NaiveDate {
    NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
}

pub fn trading_days(start: &str, n: usize) -> Vec<NaiveDate> {
    let start = date(start);
    (0..n)
        .map(|i| start + chrono::Duration::days(i as i64))
        .collect()
}

/// Deterministic pseudo-random returns in roughly [-2%, 2%].
pub fn noise(seed: u64, n: usize) -> Vec<f64> {
    let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
    (0..n)
        .map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            ((state >> 33) as f64 / (1u64 << 31) as f64 - 0.5) * 0.04
        })
        .collect()
}

/// Compounds per-period returns into a price path starting at `start_price`.
/// The first bar carries no return, so `returns.len() + 1` bars come back.
pub fn prices_from_returns(code: &str, dates: &[NaiveDate], start_price: f64, returns: &[f64]) -> Vec<PriceBar> {
    let mut bars = vec![PriceBar::new(code, dates[0], start_price)];
    let mut price = start_price;
    for (d, r) in dates[1..].iter().zip(returns) {
        price *= 1.0 + r;
        bars.push(PriceBar::new(code, *d, price));
    }
    bars
}

/// Market and asset where the asset's return is `alpha + beta * market + eps`.
pub struct SyntheticMarket {
    pub dates: Vec<NaiveDate>,
    pub market_returns: Vec<f64>,
    pub asset_returns: Vec<f64>,
}

pub fn synthetic_market(n: usize, alpha: f64, beta: f64, noise_scale: f64) -> SyntheticMarket {
    let dates = trading_days("2020-01-01", n + 1);
    let market_returns = noise(7, n);
    let eps = noise(99, n);
    let asset_returns = market_returns
        .iter()
        .zip(&eps)
        .map(|(m, e)| alpha + beta * m + noise_scale * e)
        .collect();
    SyntheticMarket {
        dates,
        market_returns,
        asset_returns,
    }
}

pub fn market_source(m: &SyntheticMarket) -> MockPriceSource {
    MockPriceSource::new()
        .with_bars("SPY", prices_from_returns("SPY", &m.dates, 300.0, &m.market_returns))
        .with_bars("MSFT", prices_from_returns("MSFT", &m.dates, 100.0, &m.asset_returns))
}

pub fn market_config(m: &SyntheticMarket, window: usize) -> AnalysisConfig {
    AnalysisConfig {
        start_date: m.dates[0],
        end_date: *m.dates.last().unwrap(),
        assets: vec!["MSFT".into()],
        factors: vec![FactorSpec {
            name: "market".into(),
            code: "SPY".into(),
            transform: FactorTransform::PctChange,
        }],
        risk_free_factor: None,
        window,
        periods_per_year: 252.0,
    }
}

pub fn write_price_csv(dir: &Path, code: &str, bars: &[PriceBar]) {
    let mut content = String::from("Date,Close\n");
    for b in bars {
        content.push_str(&format!("{},{}\n", b.date, b.close));
    }
    fs::write(dir.join(format!("{code}.csv")), content).unwrap();
}
