//! Publishes the stored index series.

use tracing::info;

use super::error::PortdexError;
use crate::ports::index_port::IndexStore;
use crate::ports::report_port::ReportSink;

/// Writes the full `(datetime, index_value)` series to `sink`, replacing
/// whatever it held. Returns the number of rows written.
pub fn export_index(store: &dyn IndexStore, sink: &dyn ReportSink) -> Result<usize, PortdexError> {
    let rows: Vec<_> = store
        .get_all_ordered()?
        .into_iter()
        .map(|p| (p.datetime, p.index_value))
        .collect();

    info!(rows = rows.len(), "exporting index series");
    sink.write_index_series(&rows)?;
    Ok(rows.len())
}
