//! Portfolio ledger: ticker → position.

use std::collections::HashMap;

use super::position::Position;
use super::trade::Trade;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Portfolio {
    pub positions: HashMap<String, Position>,
}

impl Portfolio {
    pub fn new() -> Self {
        Portfolio {
            positions: HashMap::new(),
        }
    }

    pub fn apply_trade(&mut self, trade: &Trade) {
        self.positions
            .entry(trade.ticker.clone())
            .or_insert_with(|| Position::new(&trade.ticker))
            .apply(trade);
    }

    pub fn get_position(&self, ticker: &str) -> Option<&Position> {
        self.positions.get(ticker)
    }

    pub fn position_count(&self) -> usize {
        self.positions.len()
    }

    /// Positions with nonzero quantity, ordered by ticker.
    pub fn open_positions(&self) -> Vec<&Position> {
        let mut open: Vec<&Position> = self
            .positions
            .values()
            .filter(|pos| !pos.is_flat())
            .collect();
        open.sort_by(|a, b| a.ticker.cmp(&b.ticker));
        open
    }

    /// Net cash invested across all tickers, fees included.
    pub fn net_cash_flow(&self) -> f64 {
        self.positions.values().map(|pos| pos.cash_flow).sum()
    }
}
