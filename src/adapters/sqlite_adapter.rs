//! SQLite price store adapter.

use crate::domain::error::AptError;
use crate::domain::price::PriceBar;
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::PriceSource;
use chrono::NaiveDate;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn store_error(e: r2d2::Error) -> AptError {
    AptError::DataStore {
        reason: e.to_string(),
    }
}

fn query_error(e: rusqlite::Error) -> AptError {
    AptError::DataQuery {
        reason: e.to_string(),
    }
}

fn parse_date(s: &str) -> Result<NaiveDate, AptError> {
    NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| AptError::DataQuery {
        reason: format!("invalid stored date '{s}': {e}"),
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, AptError> {
        let db_path = config
            .get_string("data", "sqlite_path")
            .ok_or_else(|| AptError::ConfigMissing {
                section: "data".into(),
                key: "sqlite_path".into(),
            })?;
        let pool_size = config.get_int("data", "pool_size", 4).max(1) as u32;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(store_error)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, AptError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder()
            .max_size(1)
            .build(manager)
            .map_err(store_error)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, AptError> {
        self.pool.get().map_err(store_error)
    }

    pub fn initialize_schema(&self) -> Result<(), AptError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS prices (
                    code TEXT NOT NULL,
                    date TEXT NOT NULL,
                    close REAL NOT NULL,
                    PRIMARY KEY (code, date)
                );
                CREATE INDEX IF NOT EXISTS idx_prices_date ON prices(date);",
            )
            .map_err(query_error)
    }

    /// Upserts bars in one transaction; returns the number written.
    pub fn insert_bars(&self, bars: &[PriceBar]) -> Result<usize, AptError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_error)?;

        for bar in bars {
            tx.execute(
                "INSERT OR REPLACE INTO prices (code, date, close) VALUES (?1, ?2, ?3)",
                params![bar.code, bar.date.format(DATE_FORMAT).to_string(), bar.close],
            )
            .map_err(query_error)?;
        }

        tx.commit().map_err(query_error)?;
        Ok(bars.len())
    }
}

impl PriceSource for SqliteAdapter {
    fn fetch_prices(
        &self,
        code: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<PriceBar>, AptError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT date, close FROM prices
                 WHERE code = ?1 AND date >= ?2 AND date <= ?3
                 ORDER BY date ASC",
            )
            .map_err(query_error)?;

        let rows = stmt
            .query_map(
                params![
                    code,
                    start_date.format(DATE_FORMAT).to_string(),
                    end_date.format(DATE_FORMAT).to_string()
                ],
                |row| Ok((row.get::<_, String>(0)?, row.get::<_, f64>(1)?)),
            )
            .map_err(query_error)?;

        let mut bars = Vec::new();
        for row in rows {
            let (date, close) = row.map_err(query_error)?;
            bars.push(PriceBar::new(code, parse_date(&date)?, close));
        }
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, AptError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare("SELECT DISTINCT code FROM prices ORDER BY code")
            .map_err(query_error)?;
        let rows = stmt
            .query_map([], |row| row.get::<_, String>(0))
            .map_err(query_error)?;

        rows.map(|r| r.map_err(query_error)).collect()
    }

    fn get_data_range(&self, code: &str) -> Result<Option<(NaiveDate, NaiveDate, usize)>, AptError> {
        let conn = self.conn()?;
        let (min, max, count): (Option<String>, Option<String>, i64) = conn
            .query_row(
                "SELECT MIN(date), MAX(date), COUNT(*) FROM prices WHERE code = ?1",
                params![code],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .map_err(query_error)?;

        match (min, max) {
            (Some(min), Some(max)) if count > 0 => {
                Ok(Some((parse_date(&min)?, parse_date(&max)?, count as usize)))
            }
            _ => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, day).unwrap()
    }

    fn seeded() -> SqliteAdapter {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter
            .insert_bars(&[
                PriceBar::new("SPY", d(2), 490.0),
                PriceBar::new("SPY", d(1), 488.0),
                PriceBar::new("SPY", d(5), 492.5),
                PriceBar::new("MSFT", d(1), 405.0),
            ])
            .unwrap();
        adapter
    }

    #[test]
    fn fetch_returns_sorted_range() {
        let adapter = seeded();
        let bars = adapter.fetch_prices("SPY", d(1), d(2)).unwrap();
        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].date, d(1));
        assert_eq!(bars[1].close, 490.0);
    }

    #[test]
    fn insert_replaces_existing_date() {
        let adapter = seeded();
        adapter
            .insert_bars(&[PriceBar::new("SPY", d(2), 491.0)])
            .unwrap();
        let bars = adapter.fetch_prices("SPY", d(2), d(2)).unwrap();
        assert_eq!(bars.len(), 1);
        assert_eq!(bars[0].close, 491.0);
    }

    #[test]
    fn list_symbols_is_distinct_and_sorted() {
        let adapter = seeded();
        assert_eq!(adapter.list_symbols().unwrap(), vec!["MSFT", "SPY"]);
    }

    #[test]
    fn data_range() {
        let adapter = seeded();
        assert_eq!(
            adapter.get_data_range("SPY").unwrap(),
            Some((d(1), d(5), 3))
        );
        assert_eq!(adapter.get_data_range("AAPL").unwrap(), None);
    }

    #[test]
    fn unknown_code_fetches_nothing() {
        let adapter = seeded();
        assert!(adapter.fetch_prices("AAPL", d(1), d(28)).unwrap().is_empty());
    }
}
