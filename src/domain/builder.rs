//! Replays the trade ledger into a portfolio and values it.
//!
//! The trade cutoff is date-only and inclusive: a trade dated on the calendar
//! day of `at` is applied regardless of the time component of `at`. The
//! cash-flow window of a snapshot uses the same rule, covering trades dated
//! strictly after the previous snapshot's day and up to `at`'s day.

use chrono::{NaiveDate, NaiveDateTime};
use tracing::{debug, warn};

use super::error::PortdexError;
use super::portfolio::Portfolio;
use super::snapshot::PortfolioSnapshot;
use super::trade::Trade;
use crate::ports::price_port::PriceProvider;

pub struct PortfolioBuilder<'a> {
    prices: &'a dyn PriceProvider,
}

impl<'a> PortfolioBuilder<'a> {
    pub fn new(prices: &'a dyn PriceProvider) -> Self {
        Self { prices }
    }

    /// Ledger as of `at`: every trade dated on or before `at`'s calendar day.
    pub fn build(&self, trades: &[Trade], at: NaiveDateTime) -> Portfolio {
        let mut portfolio = Portfolio::new();
        for trade in sorted_until(trades, at.date()) {
            portfolio.apply_trade(trade);
        }
        portfolio
    }

    /// Mark-to-market value. Positions without a known price are left out.
    pub fn valuate(&self, portfolio: &Portfolio, at: NaiveDateTime) -> Result<f64, PortdexError> {
        let mut total = 0.0;

        for pos in portfolio.open_positions() {
            match self.prices.get_last_before(&pos.ticker, at)? {
                Some(price) => total += pos.market_value(price),
                None => warn!(
                    ticker = %pos.ticker,
                    at = %at,
                    quantity = pos.quantity,
                    "no price, position excluded from valuation"
                ),
            }
        }

        Ok(total)
    }

    /// Builds, values and records the external cash flow since `prev_at`.
    /// Without `prev_at` no flow is accumulated.
    pub fn snapshot(
        &self,
        trades: &[Trade],
        at: NaiveDateTime,
        prev_at: Option<NaiveDateTime>,
    ) -> Result<PortfolioSnapshot, PortdexError> {
        let mut portfolio = Portfolio::new();
        let mut cash_flow = 0.0;

        for trade in sorted_until(trades, at.date()) {
            portfolio.apply_trade(trade);

            let Some(prev_at) = prev_at else {
                continue;
            };
            if trade.date <= prev_at.date() {
                continue;
            }

            let priced_at = flow_price_time(trade.date, at);
            match self.prices.get_last_before(&trade.ticker, priced_at)? {
                Some(price) => {
                    let flow = trade.operation.sign() * price * trade.quantity as f64 + trade.fee;
                    debug!(
                        ticker = %trade.ticker,
                        date = %trade.date,
                        operation = %trade.operation,
                        price,
                        flow,
                        "cash flow"
                    );
                    cash_flow += flow;
                }
                None => warn!(
                    ticker = %trade.ticker,
                    date = %trade.date,
                    "no price for trade, cash flow contribution skipped"
                ),
            }
        }

        let total_value = self.valuate(&portfolio, at)?;

        let open = portfolio.open_positions();
        debug!(
            at = %at,
            long = open.iter().filter(|p| p.is_long()).count(),
            short = open.iter().filter(|p| p.is_short()).count(),
            invested = -portfolio.net_cash_flow(),
            total_value,
            cash_flow,
            "portfolio replayed"
        );

        Ok(PortfolioSnapshot::from_portfolio(
            at,
            &portfolio,
            total_value,
            cash_flow,
        ))
    }
}

/// Trades dated on or before `cutoff`, ascending by date. The sort is stable,
/// so same-day trades keep their ledger order.
fn sorted_until(trades: &[Trade], cutoff: NaiveDate) -> impl Iterator<Item = &Trade> {
    let mut sorted: Vec<&Trade> = trades.iter().collect();
    sorted.sort_by_key(|t| t.date);
    sorted.into_iter().take_while(move |t| t.date <= cutoff)
}

/// End of the trade's day, but never later than the snapshot itself.
fn flow_price_time(date: NaiveDate, at: NaiveDateTime) -> NaiveDateTime {
    date.and_hms_opt(23, 59, 59)
        .map_or(at, |end_of_day| end_of_day.min(at))
}
