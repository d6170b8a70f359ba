//! CSV report adapter implementing ReportSink.

use crate::domain::error::PortdexError;
use crate::ports::report_port::ReportSink;
use chrono::NaiveDateTime;
use serde::Serialize;
use std::io;
use std::path::PathBuf;

#[derive(Serialize)]
struct IndexRow {
    datetime: String,
    index_value: f64,
}

/// Writes `datetime,index_value` rows to `path`, truncating earlier output.
pub struct CsvIndexReport {
    path: PathBuf,
}

impl CsvIndexReport {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ReportSink for CsvIndexReport {
    fn write_index_series(&self, rows: &[(NaiveDateTime, f64)]) -> Result<(), PortdexError> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&self.path)
            .map_err(io::Error::from)?;

        wtr.write_record(["datetime", "index_value"])
            .map_err(io::Error::from)?;
        for (datetime, index_value) in rows {
            wtr.serialize(IndexRow {
                datetime: datetime.format("%Y-%m-%d %H:%M:%S").to_string(),
                index_value: *index_value,
            })
            .map_err(io::Error::from)?;
        }
        wtr.flush()?;
        Ok(())
    }
}
