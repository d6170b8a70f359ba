//! Core domain types and logic.

pub mod trade;
pub mod candle;
pub mod position;
pub mod portfolio;
pub mod snapshot;
pub mod builder;
pub mod index;
pub mod index_backfill;
pub mod snapshot_service;
pub mod candle_ingest;
pub mod export;
pub mod settings;
pub mod error;
