//! Port traits for the collaborators the domain consumes.

pub mod candle_port;
pub mod config_port;
pub mod index_port;
pub mod market_data_port;
pub mod price_port;
pub mod report_port;
pub mod snapshot_port;
pub mod trade_port;
