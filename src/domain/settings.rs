//! Typed settings read from configuration, validated up front.

use crate::domain::error::PortdexError;
use crate::domain::index::DEFAULT_BASE_INDEX_VALUE;
use crate::ports::config_port::ConfigPort;
use chrono::{NaiveDate, NaiveDateTime};

pub const DEFAULT_INTERVAL_MINUTES: u32 = 60;
pub const DEFAULT_MARKET_DATA_START: &str = "2025-01-01";
pub const DEFAULT_REPORT_OUTPUT: &str = "index.csv";

#[derive(Debug, Clone, PartialEq)]
pub struct MarketDataSettings {
    pub dir: Option<String>,
    pub interval: u32,
    pub default_start: NaiveDateTime,
    /// Empty means "derive from the trade ledger".
    pub tickers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub base_index_value: f64,
    pub trades_path: Option<String>,
    pub market_data: MarketDataSettings,
    pub report_output: String,
    pub log_level: String,
    pub log_ansi: bool,
}

pub fn load_settings(config: &dyn ConfigPort) -> Result<Settings, PortdexError> {
    Ok(Settings {
        base_index_value: validate_base_value(config)?,
        trades_path: non_empty(config.get_string("trades", "path")),
        market_data: MarketDataSettings {
            dir: non_empty(config.get_string("market_data", "dir")),
            interval: validate_interval(config)?,
            default_start: validate_default_start(config)?,
            tickers: config.get_list("market_data", "tickers"),
        },
        report_output: non_empty(config.get_string("report", "output"))
            .unwrap_or_else(|| DEFAULT_REPORT_OUTPUT.to_string()),
        log_level: non_empty(config.get_string("logging", "level"))
            .unwrap_or_else(|| "info".to_string()),
        log_ansi: config.get_bool("logging", "ansi", true),
    })
}

/// Required string value; missing or blank is an error.
pub fn require(config: &dyn ConfigPort, section: &str, key: &str) -> Result<String, PortdexError> {
    non_empty(config.get_string(section, key)).ok_or_else(|| PortdexError::ConfigMissing {
        section: section.to_string(),
        key: key.to_string(),
    })
}

fn validate_base_value(config: &dyn ConfigPort) -> Result<f64, PortdexError> {
    let value = config.get_double("index", "base_value", DEFAULT_BASE_INDEX_VALUE);
    if !value.is_finite() || value <= 0.0 {
        return Err(PortdexError::ConfigInvalid {
            section: "index".to_string(),
            key: "base_value".to_string(),
            reason: "base_value must be positive".to_string(),
        });
    }
    Ok(value)
}

fn validate_interval(config: &dyn ConfigPort) -> Result<u32, PortdexError> {
    let value = config.get_int("market_data", "interval", DEFAULT_INTERVAL_MINUTES.into());
    u32::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| PortdexError::ConfigInvalid {
            section: "market_data".to_string(),
            key: "interval".to_string(),
            reason: "interval must be a positive number of minutes".to_string(),
        })
}

fn validate_default_start(config: &dyn ConfigPort) -> Result<NaiveDateTime, PortdexError> {
    let raw = non_empty(config.get_string("market_data", "default_start"))
        .unwrap_or_else(|| DEFAULT_MARKET_DATA_START.to_string());
    parse_datetime(&raw).ok_or_else(|| PortdexError::ConfigInvalid {
        section: "market_data".to_string(),
        key: "default_start".to_string(),
        reason: "invalid default_start format, expected YYYY-MM-DD".to_string(),
    })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Accepts `YYYY-MM-DD` (midnight), `YYYY-MM-DDTHH:MM[:SS]` or the same with a space.
pub fn parse_datetime(raw: &str) -> Option<NaiveDateTime> {
    let raw = raw.trim();
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(raw, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}
