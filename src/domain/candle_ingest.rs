//! Incremental candle ingestion with per-ticker failure isolation.

use chrono::NaiveDateTime;
use tracing::{error, info};

use super::error::PortdexError;
use crate::ports::candle_port::CandleStore;
use crate::ports::market_data_port::MarketDataSource;

#[derive(Debug)]
pub struct TickerOutcome {
    pub ticker: String,
    /// Newly inserted candles, or the reason the ticker failed.
    pub result: Result<usize, String>,
}

#[derive(Debug, Default)]
pub struct BatchReport {
    pub outcomes: Vec<TickerOutcome>,
}

impl BatchReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_ok()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.iter().filter(|o| o.result.is_err()).count()
    }

    pub fn total_inserted(&self) -> usize {
        self.outcomes
            .iter()
            .filter_map(|o| o.result.as_ref().ok())
            .sum()
    }
}

pub struct CandleIngestService<'a> {
    source: &'a dyn MarketDataSource,
    store: &'a dyn CandleStore,
    interval: u32,
    default_start: NaiveDateTime,
}

impl<'a> CandleIngestService<'a> {
    pub fn new(
        source: &'a dyn MarketDataSource,
        store: &'a dyn CandleStore,
        interval: u32,
        default_start: NaiveDateTime,
    ) -> Self {
        Self {
            source,
            store,
            interval,
            default_start,
        }
    }

    /// Fetches from the last stored candle (or the default start) up to `now`.
    /// The resume read and the write for one ticker happen back to back.
    pub fn ingest_ticker(&self, ticker: &str, now: NaiveDateTime) -> Result<usize, PortdexError> {
        let start = self
            .store
            .get_last_datetime(ticker, self.interval)?
            .unwrap_or(self.default_start);

        info!(ticker, from = %start, to = %now, interval = self.interval, "fetching candles");

        let candles = self.source.fetch_candles(ticker, self.interval, start, now)?;
        let inserted = self.store.upsert_many(&candles)?;

        info!(ticker, fetched = candles.len(), inserted, "candles stored");
        Ok(inserted)
    }

    pub fn ingest_many(&self, tickers: &[String], now: NaiveDateTime) -> BatchReport {
        let outcomes = tickers
            .iter()
            .map(|ticker| {
                let result = self.ingest_ticker(ticker, now).map_err(|e| {
                    error!(ticker = %ticker, error = %e, "candle ingestion failed");
                    e.to_string()
                });
                TickerOutcome {
                    ticker: ticker.clone(),
                    result,
                }
            })
            .collect();

        let report = BatchReport { outcomes };
        info!(
            succeeded = report.succeeded(),
            failed = report.failed(),
            inserted = report.total_inserted(),
            "candle ingestion finished"
        );
        report
    }
}
