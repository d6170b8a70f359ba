//! OHLCV candle representation.

use chrono::NaiveDateTime;

/// One price bar. Uniquely identified by (ticker, datetime, interval);
/// `datetime` is the bar's opening time and `interval` is in minutes.
#[derive(Debug, Clone, PartialEq)]
pub struct Candle {
    pub ticker: String,
    pub datetime: NaiveDateTime,
    pub interval: u32,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: i64,
}
