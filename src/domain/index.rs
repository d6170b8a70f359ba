//! Divisor-adjusted, chain-linked performance index.
//!
//! Each point is derived from its predecessor only. Between cash-flow events
//! the divisor is constant, so the index moves exactly with portfolio value.
//! At a flow event the divisor is re-based so that the flow's dollar amount
//! does not show up as return:
//!
//! ```text
//! divisor_n = (total_value_n - cash_flow_n) / index_value_{n-1}
//! index_n   = total_value_n / divisor_n
//! ```
//!
//! When the pre-flow value `total_value_n - cash_flow_n` is not positive
//! (re-entry after the portfolio was fully closed), the divisor is re-based on
//! `total_value_n` alone and the index holds its previous level.

use chrono::NaiveDateTime;
use tracing::warn;

use super::error::PortdexError;
use super::snapshot::PortfolioSnapshot;

pub const DEFAULT_BASE_INDEX_VALUE: f64 = 1000.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexPoint {
    pub datetime: NaiveDateTime,
    pub index_value: f64,
    pub divisor: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IndexEngine {
    pub base_index_value: f64,
}

impl Default for IndexEngine {
    fn default() -> Self {
        IndexEngine {
            base_index_value: DEFAULT_BASE_INDEX_VALUE,
        }
    }
}

impl IndexEngine {
    pub fn new(base_index_value: f64) -> Self {
        IndexEngine { base_index_value }
    }

    /// First point of the chain. The snapshot must have positive value and no cash flow.
    pub fn base(&self, snapshot: &PortfolioSnapshot) -> Result<IndexPoint, PortdexError> {
        if !snapshot.is_base_candidate() {
            return Err(PortdexError::InvalidBaseSnapshot {
                datetime: snapshot.datetime.to_string(),
                reason: format!(
                    "total_value={} cash_flow={}",
                    snapshot.total_value, snapshot.cash_flow
                ),
            });
        }

        Ok(IndexPoint {
            datetime: snapshot.datetime,
            index_value: self.base_index_value,
            divisor: snapshot.total_value / self.base_index_value,
        })
    }

    /// Next point of the chain given the immediately preceding one.
    pub fn calculate(&self, snapshot: &PortfolioSnapshot, prev: &IndexPoint) -> IndexPoint {
        let carry = IndexPoint {
            datetime: snapshot.datetime,
            index_value: prev.index_value,
            divisor: prev.divisor,
        };

        if snapshot.total_value == 0.0 {
            warn!(
                datetime = %snapshot.datetime,
                "zero portfolio value, carrying previous index point forward"
            );
            return carry;
        }

        let divisor = if snapshot.has_cash_flow() {
            let pre_flow_value = snapshot.total_value - snapshot.cash_flow;
            if pre_flow_value > 0.0 {
                pre_flow_value / prev.index_value
            } else {
                // no capital before the flow: the whole value is new money
                warn!(
                    datetime = %snapshot.datetime,
                    total_value = snapshot.total_value,
                    cash_flow = snapshot.cash_flow,
                    "flow covers entire portfolio value, re-basing at previous index level"
                );
                snapshot.total_value / prev.index_value
            }
        } else {
            prev.divisor
        };

        if !divisor.is_finite() || divisor <= 0.0 {
            warn!(
                datetime = %snapshot.datetime,
                total_value = snapshot.total_value,
                cash_flow = snapshot.cash_flow,
                divisor,
                "divisor would not be positive, carrying previous index point forward"
            );
            return carry;
        }

        IndexPoint {
            datetime: snapshot.datetime,
            index_value: snapshot.total_value / divisor,
            divisor,
        }
    }
}
