//! Index report sink port.

use crate::domain::error::PortdexError;
use chrono::NaiveDateTime;

/// Port for publishing the index series.
pub trait ReportSink {
    /// Replaces any previously written series with `rows`.
    fn write_index_series(&self, rows: &[(NaiveDateTime, f64)]) -> Result<(), PortdexError>;
}
