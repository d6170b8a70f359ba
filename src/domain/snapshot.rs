//! Point-in-time portfolio snapshot.

use chrono::NaiveDateTime;

use super::portfolio::Portfolio;

#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotPosition {
    pub ticker: String,
    pub quantity: i64,
}

/// Portfolio composition, mark-to-market value and the external cash flow
/// since the previous snapshot. One snapshot per exact datetime.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSnapshot {
    pub datetime: NaiveDateTime,
    pub total_value: f64,
    pub cash_flow: f64,
    pub positions: Vec<SnapshotPosition>,
}

impl PortfolioSnapshot {
    /// Snapshot of `portfolio` keeping only nonzero positions, ordered by ticker.
    pub fn from_portfolio(
        datetime: NaiveDateTime,
        portfolio: &Portfolio,
        total_value: f64,
        cash_flow: f64,
    ) -> Self {
        let positions = portfolio
            .open_positions()
            .into_iter()
            .map(|pos| SnapshotPosition {
                ticker: pos.ticker.clone(),
                quantity: pos.quantity,
            })
            .collect();

        PortfolioSnapshot {
            datetime,
            total_value,
            cash_flow,
            positions,
        }
    }

    pub fn has_cash_flow(&self) -> bool {
        self.cash_flow != 0.0
    }

    /// Can anchor the index chain: positive value and no flow in its window.
    pub fn is_base_candidate(&self) -> bool {
        self.total_value > 0.0 && !self.has_cash_flow()
    }
}
