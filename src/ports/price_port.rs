//! Point-in-time price lookup port.

use crate::domain::error::PortdexError;
use chrono::NaiveDateTime;

pub trait PriceProvider {
    /// Close of the latest bar at or before `at`, or `None` when no price is known.
    /// Absence is not an error; only storage failures are.
    fn get_last_before(&self, ticker: &str, at: NaiveDateTime)
    -> Result<Option<f64>, PortdexError>;
}
