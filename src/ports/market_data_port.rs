//! Market data provider port.

use crate::domain::candle::Candle;
use crate::domain::error::PortdexError;
use chrono::NaiveDateTime;

pub trait MarketDataSource {
    /// Candles for `ticker` with opening time in `[start, end]`.
    fn fetch_candles(
        &self,
        ticker: &str,
        interval: u32,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<Candle>, PortdexError>;
}
