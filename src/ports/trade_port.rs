//! Trade ledger source port.

use crate::domain::error::PortdexError;
use crate::domain::trade::Trade;

pub trait TradeSource {
    /// All recorded trades. Order is not guaranteed.
    fn fetch_trades(&self) -> Result<Vec<Trade>, PortdexError>;
}
