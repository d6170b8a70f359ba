#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use portdex::domain::candle::Candle;
use portdex::domain::error::PortdexError;
use portdex::domain::index::IndexPoint;
use portdex::domain::snapshot::PortfolioSnapshot;
pub use portdex::domain::trade::{Operation, Trade};
use portdex::ports::index_port::IndexStore;
use portdex::ports::market_data_port::MarketDataSource;
use portdex::ports::price_port::PriceProvider;
use portdex::ports::report_port::ReportSink;
use portdex::ports::snapshot_port::SnapshotStore;
use std::cell::RefCell;
use std::collections::HashMap;

pub fn dt(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d)
        .unwrap()
        .and_hms_opt(h, 0, 0)
        .unwrap()
}

pub fn trade(ticker: &str, date: (i32, u32, u32), price: f64, qty: i64, op: Operation) -> Trade {
    Trade {
        ticker: ticker.to_string(),
        date: NaiveDate::from_ymd_opt(date.0, date.1, date.2).unwrap(),
        price,
        quantity: qty,
        fee: 0.0,
        operation: op,
    }
}

pub fn snapshot(datetime: NaiveDateTime, total_value: f64, cash_flow: f64) -> PortfolioSnapshot {
    PortfolioSnapshot {
        datetime,
        total_value,
        cash_flow,
        positions: Vec::new(),
    }
}

/// Close prices per ticker, looked up at-or-before the requested time.
#[derive(Default)]
pub struct MockPrices {
    pub closes: HashMap<String, Vec<(NaiveDateTime, f64)>>,
}

impl MockPrices {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_close(mut self, ticker: &str, at: NaiveDateTime, close: f64) -> Self {
        let series = self.closes.entry(ticker.to_string()).or_default();
        series.push((at, close));
        series.sort_by_key(|(t, _)| *t);
        self
    }
}

impl PriceProvider for MockPrices {
    fn get_last_before(&self, ticker: &str, at: NaiveDateTime) -> Result<Option<f64>, PortdexError> {
        Ok(self.closes.get(ticker).and_then(|series| {
            series
                .iter()
                .rev()
                .find(|(t, _)| *t <= at)
                .map(|(_, close)| *close)
        }))
    }
}

#[derive(Default)]
pub struct MemorySnapshots {
    pub rows: RefCell<Vec<PortfolioSnapshot>>,
}

impl MemorySnapshots {
    pub fn with(snapshots: Vec<PortfolioSnapshot>) -> Self {
        let store = Self::default();
        for s in &snapshots {
            store.save(s).unwrap();
        }
        store
    }
}

impl SnapshotStore for MemorySnapshots {
    fn save(&self, snapshot: &PortfolioSnapshot) -> Result<bool, PortdexError> {
        let mut rows = self.rows.borrow_mut();
        if rows.iter().any(|s| s.datetime == snapshot.datetime) {
            return Ok(false);
        }
        rows.push(snapshot.clone());
        rows.sort_by_key(|s| s.datetime);
        Ok(true)
    }

    fn get_first_positive(&self) -> Result<Option<PortfolioSnapshot>, PortdexError> {
        Ok(self
            .rows
            .borrow()
            .iter()
            .find(|s| s.total_value > 0.0)
            .cloned())
    }

    fn get_last(&self) -> Result<Option<PortfolioSnapshot>, PortdexError> {
        Ok(self.rows.borrow().last().cloned())
    }

    fn get_last_before(&self, at: NaiveDateTime) -> Result<Option<PortfolioSnapshot>, PortdexError> {
        Ok(self
            .rows
            .borrow()
            .iter()
            .rev()
            .find(|s| s.datetime < at)
            .cloned())
    }

    fn get_all_ordered(&self) -> Result<Vec<PortfolioSnapshot>, PortdexError> {
        Ok(self.rows.borrow().clone())
    }
}

#[derive(Default)]
pub struct MemoryIndex {
    pub rows: RefCell<Vec<IndexPoint>>,
}

impl IndexStore for MemoryIndex {
    fn save(&self, point: &IndexPoint) -> Result<bool, PortdexError> {
        let mut rows = self.rows.borrow_mut();
        if rows.iter().any(|p| p.datetime == point.datetime) {
            return Ok(false);
        }
        rows.push(*point);
        rows.sort_by_key(|p| p.datetime);
        Ok(true)
    }

    fn get_last(&self) -> Result<Option<IndexPoint>, PortdexError> {
        Ok(self.rows.borrow().last().copied())
    }

    fn get_all_ordered(&self) -> Result<Vec<IndexPoint>, PortdexError> {
        Ok(self.rows.borrow().clone())
    }

    fn delete_all(&self) -> Result<usize, PortdexError> {
        let mut rows = self.rows.borrow_mut();
        let n = rows.len();
        rows.clear();
        Ok(n)
    }
}

pub struct MockMarketData {
    pub candles: HashMap<String, Vec<Candle>>,
    pub errors: HashMap<String, String>,
}

impl MockMarketData {
    pub fn new() -> Self {
        Self {
            candles: HashMap::new(),
            errors: HashMap::new(),
        }
    }

    pub fn with_closes(mut self, ticker: &str, interval: u32, closes: &[(NaiveDateTime, f64)]) -> Self {
        let candles = closes
            .iter()
            .map(|(datetime, close)| Candle {
                ticker: ticker.to_string(),
                datetime: *datetime,
                interval,
                open: *close,
                high: *close,
                low: *close,
                close: *close,
                volume: 100,
            })
            .collect();
        self.candles.insert(ticker.to_string(), candles);
        self
    }

    pub fn with_error(mut self, ticker: &str, reason: &str) -> Self {
        self.errors.insert(ticker.to_string(), reason.to_string());
        self
    }
}

impl MarketDataSource for MockMarketData {
    fn fetch_candles(
        &self,
        ticker: &str,
        _interval: u32,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Candle>, PortdexError> {
        if let Some(reason) = self.errors.get(ticker) {
            return Err(PortdexError::MarketData {
                ticker: ticker.to_string(),
                reason: reason.clone(),
            });
        }
        Ok(self
            .candles
            .get(ticker)
            .map(|cs| {
                cs.iter()
                    .filter(|c| c.datetime >= start && c.datetime <= end)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[derive(Default)]
pub struct CapturingSink {
    pub writes: RefCell<Vec<Vec<(NaiveDateTime, f64)>>>,
}

impl ReportSink for CapturingSink {
    fn write_index_series(&self, rows: &[(NaiveDateTime, f64)]) -> Result<(), PortdexError> {
        self.writes.borrow_mut().push(rows.to_vec());
        Ok(())
    }
}
