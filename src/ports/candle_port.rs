//! Candle persistence port.

use crate::domain::candle::Candle;
use crate::domain::error::PortdexError;
use chrono::NaiveDateTime;

pub trait CandleStore {
    /// Inserts candles, silently skipping any whose (ticker, datetime, interval)
    /// already exists. Returns the number of newly inserted rows.
    fn upsert_many(&self, candles: &[Candle]) -> Result<usize, PortdexError>;

    fn get_last_datetime(
        &self,
        ticker: &str,
        interval: u32,
    ) -> Result<Option<NaiveDateTime>, PortdexError>;
}
