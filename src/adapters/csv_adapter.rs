//! CSV file adapters for the trade ledger and candle history.

use crate::domain::candle::Candle;
use crate::domain::error::PortdexError;
use crate::domain::settings::parse_datetime;
use crate::domain::trade::{Operation, Trade};
use crate::ports::market_data_port::MarketDataSource;
use crate::ports::trade_port::TradeSource;
use chrono::{NaiveDate, NaiveDateTime};
use serde::Deserialize;
use std::fs::File;
use std::path::PathBuf;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct TradeRow {
    ticker: String,
    date: String,
    price: f64,
    quantity: i64,
    #[serde(default)]
    fee: Option<f64>,
    operation: String,
}

impl TradeRow {
    fn into_trade(self) -> Result<Trade, String> {
        let ticker = self.ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err("empty ticker".into());
        }
        let date = NaiveDate::parse_from_str(self.date.trim(), "%Y-%m-%d")
            .map_err(|e| format!("invalid date {:?}: {e}", self.date))?;
        if !self.price.is_finite() || self.price < 0.0 {
            return Err(format!("invalid price {}", self.price));
        }
        if self.quantity <= 0 {
            return Err(format!("quantity must be positive, got {}", self.quantity));
        }
        let fee = self.fee.unwrap_or(0.0);
        if !fee.is_finite() {
            return Err(format!("invalid fee {fee}"));
        }
        let operation: Operation = self.operation.parse()?;

        Ok(Trade {
            ticker,
            date,
            price: self.price,
            quantity: self.quantity,
            fee,
            operation,
        })
    }
}

/// Trade ledger kept as a CSV file with header
/// `ticker,date,price,quantity,fee,operation`.
pub struct CsvTradeSource {
    path: PathBuf,
}

impl CsvTradeSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl TradeSource for CsvTradeSource {
    fn fetch_trades(&self) -> Result<Vec<Trade>, PortdexError> {
        let file = File::open(&self.path)?;
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);
        let headers = rdr
            .headers()
            .map_err(|e| PortdexError::TradeParse {
                line: 1,
                reason: e.to_string(),
            })?
            .clone();

        let mut trades = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| PortdexError::TradeParse {
                line: e.position().map(|p| p.line()).unwrap_or(0),
                reason: e.to_string(),
            })?;
            let line = record.position().map(|p| p.line()).unwrap_or(0);

            let row: TradeRow = record
                .deserialize(Some(&headers))
                .map_err(|e| PortdexError::TradeParse {
                    line,
                    reason: e.to_string(),
                })?;
            let trade = row
                .into_trade()
                .map_err(|reason| PortdexError::TradeParse { line, reason })?;
            trades.push(trade);
        }

        debug!(path = %self.path.display(), trades = trades.len(), "trade ledger loaded");
        Ok(trades)
    }
}

#[derive(Debug, Deserialize)]
struct CandleRow {
    datetime: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    volume: i64,
}

/// Candle history laid out as one `<TICKER>.csv` per ticker in `dir`,
/// with header `datetime,open,high,low,close,volume`.
pub struct CsvCandleSource {
    dir: PathBuf,
}

impl CsvCandleSource {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn csv_path(&self, ticker: &str) -> PathBuf {
        self.dir.join(format!("{ticker}.csv"))
    }
}

impl MarketDataSource for CsvCandleSource {
    fn fetch_candles(
        &self,
        ticker: &str,
        interval: u32,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Candle>, PortdexError> {
        let market_err = |reason: String| PortdexError::MarketData {
            ticker: ticker.to_string(),
            reason,
        };

        let path = self.csv_path(ticker);
        let file = File::open(&path)
            .map_err(|e| market_err(format!("failed to read {}: {e}", path.display())))?;
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(file);

        let mut candles = Vec::new();
        for result in rdr.deserialize::<CandleRow>() {
            let row = result.map_err(|e| market_err(format!("CSV parse error: {e}")))?;
            let datetime = parse_datetime(&row.datetime)
                .ok_or_else(|| market_err(format!("invalid datetime {:?}", row.datetime)))?;

            if datetime < start || datetime > end {
                continue;
            }

            candles.push(Candle {
                ticker: ticker.to_string(),
                datetime,
                interval,
                open: row.open,
                high: row.high,
                low: row.low,
                close: row.close,
                volume: row.volume,
            });
        }

        candles.sort_by_key(|c| c.datetime);
        Ok(candles)
    }
}
