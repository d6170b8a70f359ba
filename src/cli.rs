//! CLI definition and dispatch.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::atomic::AtomicBool;

use chrono::{NaiveDateTime, SubsecRound, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::EnvFilter;

use crate::adapters::csv_adapter::CsvTradeSource;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::domain::candle_ingest::BatchReport;
use crate::domain::error::PortdexError;
use crate::domain::index_backfill::IndexBackfillReport;
use crate::domain::settings::{load_settings, parse_datetime, Settings};
use crate::domain::trade::Trade;
use crate::ports::trade_port::TradeSource;

#[derive(Parser, Debug)]
#[command(name = "portdex", about = "Portfolio index tracker")]
pub struct Cli {
    /// INI configuration file
    #[arg(short, long, global = true, default_value = "portdex.ini")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch new candles for the tracked tickers
    IngestCandles {
        /// Overrides the configured ticker list (repeatable)
        #[arg(long = "ticker")]
        tickers: Vec<String>,
    },
    /// Take one portfolio snapshot
    Snapshot {
        #[arg(long, value_parser = parse_cli_datetime)]
        at: Option<NaiveDateTime>,
    },
    /// Take snapshots on a fixed grid between two instants
    BackfillSnapshots {
        #[arg(long, value_parser = parse_cli_datetime)]
        start: NaiveDateTime,
        #[arg(long, value_parser = parse_cli_datetime)]
        end: NaiveDateTime,
        #[arg(long, default_value_t = 60)]
        step_minutes: i64,
    },
    /// Compute the index over every stored snapshot
    BackfillIndex {
        /// Delete existing index points first
        #[arg(long)]
        from_scratch: bool,
    },
    /// Extend the index over snapshots newer than its last point
    UpdateIndex,
    /// Write the index series to CSV
    Export {
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn parse_cli_datetime(raw: &str) -> Result<NaiveDateTime, String> {
    parse_datetime(raw)
        .ok_or_else(|| format!("invalid datetime {raw:?}, expected YYYY-MM-DD[THH:MM[:SS]]"))
}

pub fn run(cli: Cli) -> ExitCode {
    let config = match load_config(&cli.config) {
        Ok(c) => c,
        Err(code) => return code,
    };
    let settings = match load_settings(&config) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    init_logging(&settings);

    let cancel = AtomicBool::new(false);
    match execute(&cli.command, &config, &settings, &cancel) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ExitCode> {
    FileConfigAdapter::from_file(path).map_err(|err| {
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// `RUST_LOG` wins over `[logging] level`. Repeated calls are ignored.
pub fn init_logging(settings: &Settings) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&settings.log_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_ansi(settings.log_ansi)
        .with_writer(std::io::stderr)
        .try_init();
}

fn now() -> NaiveDateTime {
    Utc::now().naive_utc().trunc_subsecs(0)
}

pub fn load_trades(settings: &Settings) -> Result<Vec<Trade>, PortdexError> {
    let path = settings
        .trades_path
        .as_deref()
        .ok_or_else(|| PortdexError::ConfigMissing {
            section: "trades".into(),
            key: "path".into(),
        })?;
    CsvTradeSource::new(path).fetch_trades()
}

/// Command-line tickers, else the configured list, else every ticker in the ledger.
pub fn resolve_tickers(
    overrides: &[String],
    settings: &Settings,
) -> Result<Vec<String>, PortdexError> {
    let explicit: Vec<String> = overrides
        .iter()
        .map(|t| t.trim().to_uppercase())
        .filter(|t| !t.is_empty())
        .collect();
    if !explicit.is_empty() {
        return Ok(explicit);
    }
    if !settings.market_data.tickers.is_empty() {
        return Ok(settings.market_data.tickers.clone());
    }
    if settings.trades_path.is_none() {
        return Err(PortdexError::ConfigMissing {
            section: "market_data".into(),
            key: "tickers".into(),
        });
    }
    let tickers: BTreeSet<String> = load_trades(settings)?
        .into_iter()
        .map(|t| t.ticker)
        .collect();
    Ok(tickers.into_iter().collect())
}

/// `--step-minutes` as a duration; out-of-range values are a config error.
pub fn step_from_minutes(minutes: i64) -> Result<TimeDelta, PortdexError> {
    TimeDelta::try_minutes(minutes).ok_or_else(|| PortdexError::ConfigInvalid {
        section: "snapshot".into(),
        key: "step".into(),
        reason: format!("step of {minutes} minutes is out of range"),
    })
}

fn print_batch_report(report: &BatchReport) {
    for outcome in &report.outcomes {
        match &outcome.result {
            Ok(inserted) => println!("{}: {} new candles", outcome.ticker, inserted),
            Err(reason) => println!("{}: FAILED ({})", outcome.ticker, reason),
        }
    }
    println!(
        "{} succeeded, {} failed, {} candles inserted",
        report.succeeded(),
        report.failed(),
        report.total_inserted()
    );
}

fn print_index_report(report: &IndexBackfillReport) {
    println!(
        "computed {} points ({} saved, {} already stored)",
        report.computed, report.saved, report.duplicates
    );
    if let Some(last) = &report.last {
        println!(
            "last: {} index={:.4} divisor={:.6}",
            last.datetime, last.index_value, last.divisor
        );
    }
}

/// Runs one subcommand. `cancel` is checked between steps of the snapshot and
/// index backfills; the `portdex` binary passes a flag that is never set, so
/// only callers embedding the library can stop a run early.
#[cfg(feature = "sqlite")]
pub fn execute(
    command: &Command,
    config: &FileConfigAdapter,
    settings: &Settings,
    cancel: &AtomicBool,
) -> Result<(), PortdexError> {
    use crate::adapters::csv_adapter::CsvCandleSource;
    use crate::adapters::csv_report_adapter::CsvIndexReport;
    use crate::adapters::sqlite_adapter::SqliteAdapter;
    use crate::domain::candle_ingest::CandleIngestService;
    use crate::domain::export::export_index;
    use crate::domain::index::IndexEngine;
    use crate::domain::index_backfill::BackfillOrchestrator;
    use crate::domain::snapshot_service::SnapshotService;
    let db = SqliteAdapter::from_config(config)?;
    let orchestrator =
        BackfillOrchestrator::new(&db, &db, IndexEngine::new(settings.base_index_value));

    match command {
        Command::IngestCandles { tickers } => {
            let dir = settings.market_data.dir.as_deref().ok_or_else(|| {
                PortdexError::ConfigMissing {
                    section: "market_data".into(),
                    key: "dir".into(),
                }
            })?;
            let tickers = resolve_tickers(tickers, settings)?;
            let source = CsvCandleSource::new(dir);
            let service = CandleIngestService::new(
                &source,
                &db,
                settings.market_data.interval,
                settings.market_data.default_start,
            );
            print_batch_report(&service.ingest_many(&tickers, now()));
        }
        Command::Snapshot { at } => {
            let trades = load_trades(settings)?;
            let at = at.unwrap_or_else(now);
            if SnapshotService::new(&db, &db).take_snapshot(&trades, at)? {
                println!("snapshot saved at {at}");
            } else {
                println!("snapshot at {at} already exists");
            }
        }
        Command::BackfillSnapshots {
            start,
            end,
            step_minutes,
        } => {
            let step = step_from_minutes(*step_minutes)?;
            let trades = load_trades(settings)?;
            let report =
                SnapshotService::new(&db, &db).backfill(&trades, *start, *end, step, cancel)?;
            println!(
                "{} snapshots saved, {} already existed",
                report.saved, report.duplicates
            );
        }
        Command::BackfillIndex { from_scratch } => {
            let report = if *from_scratch {
                orchestrator.rebuild(cancel)?
            } else {
                orchestrator.backfill(cancel)?
            };
            print_index_report(&report);
        }
        Command::UpdateIndex => {
            print_index_report(&orchestrator.update(cancel)?);
        }
        Command::Export { output } => {
            let path = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(&settings.report_output));
            let rows = export_index(&db, &CsvIndexReport::new(&path))?;
            println!("wrote {} index points to {}", rows, path.display());
        }
    }
    Ok(())
}

#[cfg(not(feature = "sqlite"))]
pub fn execute(
    _command: &Command,
    _config: &FileConfigAdapter,
    _settings: &Settings,
    _cancel: &AtomicBool,
) -> Result<(), PortdexError> {
    Err(PortdexError::Database {
        reason: "sqlite feature is required".into(),
    })
}
