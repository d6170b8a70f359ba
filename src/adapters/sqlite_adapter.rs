//! SQLite storage adapter for candles, snapshots and index points.

use crate::domain::candle::Candle;
use crate::domain::error::PortdexError;
use crate::domain::index::IndexPoint;
use crate::domain::snapshot::{PortfolioSnapshot, SnapshotPosition};
use crate::domain::settings::require;
use crate::ports::candle_port::CandleStore;
use crate::ports::config_port::ConfigPort;
use crate::ports::index_port::IndexStore;
use crate::ports::price_port::PriceProvider;
use crate::ports::snapshot_port::SnapshotStore;
use chrono::NaiveDateTime;
use r2d2::{Pool, PooledConnection};
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};
use std::collections::HashMap;

/// Stored as text; lexical order equals chronological order.
const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct SqliteAdapter {
    pool: Pool<SqliteConnectionManager>,
}

fn pool_err(e: r2d2::Error) -> PortdexError {
    PortdexError::Database {
        reason: e.to_string(),
    }
}

fn query_err(e: rusqlite::Error) -> PortdexError {
    PortdexError::DatabaseQuery {
        reason: e.to_string(),
    }
}

fn format_dt(dt: NaiveDateTime) -> String {
    dt.format(DATETIME_FORMAT).to_string()
}

fn parse_dt(raw: String) -> rusqlite::Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(&raw, DATETIME_FORMAT).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(
            raw.len(),
            rusqlite::types::Type::Text,
            Box::new(e),
        )
    })
}

impl SqliteAdapter {
    pub fn from_config(config: &dyn ConfigPort) -> Result<Self, PortdexError> {
        let db_path = require(config, "sqlite", "path")?;
        let pool_size = u32::try_from(config.get_int("sqlite", "pool_size", 4))
            .ok()
            .filter(|n| *n > 0)
            .ok_or_else(|| PortdexError::ConfigInvalid {
                section: "sqlite".into(),
                key: "pool_size".into(),
                reason: "pool_size must be a positive integer".into(),
            })?;

        let manager = SqliteConnectionManager::file(&db_path);
        let pool = Pool::builder()
            .max_size(pool_size)
            .build(manager)
            .map_err(pool_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    pub fn in_memory() -> Result<Self, PortdexError> {
        let manager = SqliteConnectionManager::memory();
        let pool = Pool::builder().max_size(1).build(manager).map_err(pool_err)?;

        let adapter = Self { pool };
        adapter.initialize_schema()?;
        Ok(adapter)
    }

    fn conn(&self) -> Result<PooledConnection<SqliteConnectionManager>, PortdexError> {
        self.pool.get().map_err(pool_err)
    }

    pub fn initialize_schema(&self) -> Result<(), PortdexError> {
        self.conn()?
            .execute_batch(
                "CREATE TABLE IF NOT EXISTS candles (
                    ticker TEXT NOT NULL,
                    datetime TEXT NOT NULL,
                    interval_min INTEGER NOT NULL,
                    open REAL NOT NULL,
                    high REAL NOT NULL,
                    low REAL NOT NULL,
                    close REAL NOT NULL,
                    volume INTEGER NOT NULL,
                    PRIMARY KEY (ticker, datetime, interval_min)
                );
                CREATE INDEX IF NOT EXISTS idx_candles_ticker_datetime ON candles(ticker, datetime);
                CREATE TABLE IF NOT EXISTS portfolio_snapshots (
                    datetime TEXT PRIMARY KEY,
                    total_value REAL NOT NULL,
                    cash_flow REAL NOT NULL
                );
                CREATE TABLE IF NOT EXISTS portfolio_snapshot_positions (
                    snapshot_datetime TEXT NOT NULL REFERENCES portfolio_snapshots(datetime),
                    ticker TEXT NOT NULL,
                    quantity INTEGER NOT NULL,
                    PRIMARY KEY (snapshot_datetime, ticker)
                );
                CREATE TABLE IF NOT EXISTS portfolio_index (
                    datetime TEXT PRIMARY KEY,
                    index_value REAL NOT NULL,
                    divisor REAL NOT NULL
                );",
            )
            .map_err(query_err)
    }

    pub fn candle_count(&self) -> Result<usize, PortdexError> {
        let count: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM candles", [], |row| row.get(0))
            .map_err(query_err)?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Snapshot rows matching `where_clause` (with `?1` bound to `arg`), positions attached.
    fn load_snapshots(
        &self,
        where_clause: &str,
        arg: Option<String>,
        order_limit: &str,
    ) -> Result<Vec<PortfolioSnapshot>, PortdexError> {
        let conn = self.conn()?;

        let query = format!(
            "SELECT datetime, total_value, cash_flow FROM portfolio_snapshots {where_clause} {order_limit}"
        );
        let mut stmt = conn.prepare(&query).map_err(query_err)?;
        let map_row = |row: &rusqlite::Row<'_>| -> rusqlite::Result<PortfolioSnapshot> {
            Ok(PortfolioSnapshot {
                datetime: parse_dt(row.get(0)?)?,
                total_value: row.get(1)?,
                cash_flow: row.get(2)?,
                positions: Vec::new(),
            })
        };
        let rows = match &arg {
            Some(a) => stmt.query_map(params![a], map_row),
            None => stmt.query_map([], map_row),
        }
        .map_err(query_err)?;

        let mut snapshots = Vec::new();
        for row in rows {
            snapshots.push(row.map_err(query_err)?);
        }
        if snapshots.is_empty() {
            return Ok(snapshots);
        }

        let single = match snapshots.as_slice() {
            [only] => Some(format_dt(only.datetime)),
            _ => None,
        };
        let pos_query = if single.is_some() {
            "SELECT snapshot_datetime, ticker, quantity FROM portfolio_snapshot_positions
             WHERE snapshot_datetime = ?1 ORDER BY ticker"
        } else {
            "SELECT snapshot_datetime, ticker, quantity FROM portfolio_snapshot_positions
             ORDER BY snapshot_datetime, ticker"
        };
        let mut pos_stmt = conn.prepare(pos_query).map_err(query_err)?;
        let map_pos = |row: &rusqlite::Row<'_>| -> rusqlite::Result<(String, SnapshotPosition)> {
            Ok((
                row.get(0)?,
                SnapshotPosition {
                    ticker: row.get(1)?,
                    quantity: row.get(2)?,
                },
            ))
        };
        let pos_rows = match &single {
            Some(dt) => pos_stmt.query_map(params![dt], map_pos),
            None => pos_stmt.query_map([], map_pos),
        }
        .map_err(query_err)?;

        let mut by_datetime: HashMap<String, Vec<SnapshotPosition>> = HashMap::new();
        for row in pos_rows {
            let (dt, pos) = row.map_err(query_err)?;
            by_datetime.entry(dt).or_default().push(pos);
        }

        for snapshot in &mut snapshots {
            if let Some(positions) = by_datetime.remove(&format_dt(snapshot.datetime)) {
                snapshot.positions = positions;
            }
        }
        Ok(snapshots)
    }

    fn load_one_snapshot(
        &self,
        where_clause: &str,
        arg: Option<String>,
        order: &str,
    ) -> Result<Option<PortfolioSnapshot>, PortdexError> {
        Ok(self
            .load_snapshots(where_clause, arg, &format!("{order} LIMIT 1"))?
            .into_iter()
            .next())
    }
}

impl PriceProvider for SqliteAdapter {
    fn get_last_before(
        &self,
        ticker: &str,
        at: NaiveDateTime,
    ) -> Result<Option<f64>, PortdexError> {
        self.conn()?
            .query_row(
                "SELECT close FROM candles
                 WHERE ticker = ?1 AND datetime <= ?2
                 ORDER BY datetime DESC, interval_min ASC
                 LIMIT 1",
                params![ticker, format_dt(at)],
                |row| row.get(0),
            )
            .optional()
            .map_err(query_err)
    }
}

impl CandleStore for SqliteAdapter {
    fn upsert_many(&self, candles: &[Candle]) -> Result<usize, PortdexError> {
        if candles.is_empty() {
            return Ok(0);
        }

        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;

        let mut inserted = 0;
        for candle in candles {
            inserted += tx
                .execute(
                    "INSERT OR IGNORE INTO candles
                     (ticker, datetime, interval_min, open, high, low, close, volume)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
                    params![
                        candle.ticker,
                        format_dt(candle.datetime),
                        candle.interval,
                        candle.open,
                        candle.high,
                        candle.low,
                        candle.close,
                        candle.volume
                    ],
                )
                .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(inserted)
    }

    fn get_last_datetime(
        &self,
        ticker: &str,
        interval: u32,
    ) -> Result<Option<NaiveDateTime>, PortdexError> {
        let raw: Option<String> = self
            .conn()?
            .query_row(
                "SELECT MAX(datetime) FROM candles WHERE ticker = ?1 AND interval_min = ?2",
                params![ticker, interval],
                |row| row.get(0),
            )
            .map_err(query_err)?;

        raw.map(parse_dt).transpose().map_err(query_err)
    }
}

impl SnapshotStore for SqliteAdapter {
    fn save(&self, snapshot: &PortfolioSnapshot) -> Result<bool, PortdexError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction().map_err(query_err)?;
        let datetime = format_dt(snapshot.datetime);

        let inserted = tx
            .execute(
                "INSERT OR IGNORE INTO portfolio_snapshots (datetime, total_value, cash_flow)
                 VALUES (?1, ?2, ?3)",
                params![datetime, snapshot.total_value, snapshot.cash_flow],
            )
            .map_err(query_err)?;
        if inserted == 0 {
            return Ok(false);
        }

        for pos in &snapshot.positions {
            tx.execute(
                "INSERT INTO portfolio_snapshot_positions (snapshot_datetime, ticker, quantity)
                 VALUES (?1, ?2, ?3)",
                params![datetime, pos.ticker, pos.quantity],
            )
            .map_err(query_err)?;
        }

        tx.commit().map_err(query_err)?;
        Ok(true)
    }

    fn get_first_positive(&self) -> Result<Option<PortfolioSnapshot>, PortdexError> {
        self.load_one_snapshot("WHERE total_value > 0", None, "ORDER BY datetime ASC")
    }

    fn get_last(&self) -> Result<Option<PortfolioSnapshot>, PortdexError> {
        self.load_one_snapshot("", None, "ORDER BY datetime DESC")
    }

    fn get_last_before(
        &self,
        at: NaiveDateTime,
    ) -> Result<Option<PortfolioSnapshot>, PortdexError> {
        self.load_one_snapshot(
            "WHERE datetime < ?1",
            Some(format_dt(at)),
            "ORDER BY datetime DESC",
        )
    }

    fn get_all_ordered(&self) -> Result<Vec<PortfolioSnapshot>, PortdexError> {
        self.load_snapshots("", None, "ORDER BY datetime ASC")
    }
}

impl IndexStore for SqliteAdapter {
    fn save(&self, point: &IndexPoint) -> Result<bool, PortdexError> {
        let inserted = self
            .conn()?
            .execute(
                "INSERT OR IGNORE INTO portfolio_index (datetime, index_value, divisor)
                 VALUES (?1, ?2, ?3)",
                params![format_dt(point.datetime), point.index_value, point.divisor],
            )
            .map_err(query_err)?;
        Ok(inserted > 0)
    }

    fn get_last(&self) -> Result<Option<IndexPoint>, PortdexError> {
        self.conn()?
            .query_row(
                "SELECT datetime, index_value, divisor FROM portfolio_index
                 ORDER BY datetime DESC LIMIT 1",
                [],
                |row| {
                    Ok(IndexPoint {
                        datetime: parse_dt(row.get(0)?)?,
                        index_value: row.get(1)?,
                        divisor: row.get(2)?,
                    })
                },
            )
            .optional()
            .map_err(query_err)
    }

    fn get_all_ordered(&self) -> Result<Vec<IndexPoint>, PortdexError> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(
                "SELECT datetime, index_value, divisor FROM portfolio_index ORDER BY datetime ASC",
            )
            .map_err(query_err)?;

        let rows = stmt
            .query_map([], |row| {
                Ok(IndexPoint {
                    datetime: parse_dt(row.get(0)?)?,
                    index_value: row.get(1)?,
                    divisor: row.get(2)?,
                })
            })
            .map_err(query_err)?;

        let mut points = Vec::new();
        for row in rows {
            points.push(row.map_err(query_err)?);
        }
        Ok(points)
    }

    fn delete_all(&self) -> Result<usize, PortdexError> {
        self.conn()?
            .execute("DELETE FROM portfolio_index", [])
            .map_err(query_err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    struct EmptyConfig;

    impl ConfigPort for EmptyConfig {
        fn get_string(&self, _section: &str, _key: &str) -> Option<String> {
            None
        }
        fn get_int(&self, _section: &str, _key: &str, default: i64) -> i64 {
            default
        }
        fn get_double(&self, _section: &str, _key: &str, default: f64) -> f64 {
            default
        }
        fn get_bool(&self, _section: &str, _key: &str, default: bool) -> bool {
            default
        }
    }

    fn dt(d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn candle(ticker: &str, at: NaiveDateTime, close: f64) -> Candle {
        Candle {
            ticker: ticker.to_string(),
            datetime: at,
            interval: 60,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume: 1000,
        }
    }

    fn snapshot(at: NaiveDateTime, total_value: f64, cash_flow: f64) -> PortfolioSnapshot {
        PortfolioSnapshot {
            datetime: at,
            total_value,
            cash_flow,
            positions: vec![
                SnapshotPosition {
                    ticker: "GAZP".into(),
                    quantity: -3,
                },
                SnapshotPosition {
                    ticker: "SBER".into(),
                    quantity: 10,
                },
            ],
        }
    }

    #[test]
    fn from_config_missing_path() {
        let config = EmptyConfig;
        let result = SqliteAdapter::from_config(&config);
        match result {
            Err(PortdexError::ConfigMissing { section, key }) => {
                assert_eq!(section, "sqlite");
                assert_eq!(key, "path");
            }
            Err(other) => panic!("expected ConfigMissing, got: {other}"),
            Ok(_) => panic!("expected error, got Ok"),
        }
    }

    #[test]
    fn schema_initialization_is_repeatable() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter.initialize_schema().unwrap();
    }

    #[test]
    fn candle_upsert_ignores_duplicates() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        let c = candle("SBER", dt(1, 10), 100.0);

        assert_eq!(adapter.upsert_many(&[c.clone()]).unwrap(), 1);
        let changed = Candle {
            close: 999.0,
            ..c.clone()
        };
        assert_eq!(adapter.upsert_many(&[changed]).unwrap(), 0);

        assert_eq!(adapter.candle_count().unwrap(), 1);
        // first write wins
        assert_eq!(
            PriceProvider::get_last_before(&adapter, "SBER", dt(1, 10)).unwrap(),
            Some(100.0)
        );
    }

    #[test]
    fn candle_upsert_empty_slice() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        assert_eq!(adapter.upsert_many(&[]).unwrap(), 0);
    }

    #[test]
    fn last_datetime_per_ticker_and_interval() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        let mut other_interval = candle("SBER", dt(3, 10), 1.0);
        other_interval.interval = 10;
        adapter
            .upsert_many(&[
                candle("SBER", dt(1, 10), 1.0),
                candle("SBER", dt(2, 10), 1.0),
                candle("GAZP", dt(5, 10), 1.0),
                other_interval,
            ])
            .unwrap();

        assert_eq!(adapter.get_last_datetime("SBER", 60).unwrap(), Some(dt(2, 10)));
        assert_eq!(adapter.get_last_datetime("SBER", 10).unwrap(), Some(dt(3, 10)));
        assert_eq!(adapter.get_last_datetime("LKOH", 60).unwrap(), None);
    }

    #[test]
    fn price_is_last_close_at_or_before() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        adapter
            .upsert_many(&[
                candle("SBER", dt(1, 10), 100.0),
                candle("SBER", dt(1, 11), 101.0),
                candle("SBER", dt(1, 12), 102.0),
            ])
            .unwrap();

        assert_eq!(PriceProvider::get_last_before(&adapter, "SBER", dt(1, 9)).unwrap(), None);
        assert_eq!(
            PriceProvider::get_last_before(&adapter, "SBER", dt(1, 11)).unwrap(),
            Some(101.0)
        );
        assert_eq!(
            PriceProvider::get_last_before(&adapter, "SBER", dt(2, 0)).unwrap(),
            Some(102.0)
        );
        assert_eq!(PriceProvider::get_last_before(&adapter, "GAZP", dt(2, 0)).unwrap(), None);
    }

    #[test]
    fn snapshot_round_trip_with_positions() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        let snap = snapshot(dt(1, 12), 1234.5, -10.25);

        assert!(SnapshotStore::save(&adapter, &snap).unwrap());
        let loaded = SnapshotStore::get_last(&adapter).unwrap().unwrap();
        assert_eq!(loaded, snap);
    }

    #[test]
    fn snapshot_duplicate_datetime_rejected() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        assert!(SnapshotStore::save(&adapter, &snapshot(dt(1, 12), 100.0, 0.0)).unwrap());
        assert!(!SnapshotStore::save(&adapter, &snapshot(dt(1, 12), 555.0, 5.0)).unwrap());

        let all = SnapshotStore::get_all_ordered(&adapter).unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].total_value, 100.0);
        assert_eq!(all[0].positions.len(), 2);
    }

    #[test]
    fn snapshot_queries() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        for snap in [
            snapshot(dt(3, 12), 300.0, 0.0),
            snapshot(dt(1, 12), 0.0, 0.0),
            snapshot(dt(2, 12), 200.0, 50.0),
        ] {
            SnapshotStore::save(&adapter, &snap).unwrap();
        }

        let all = SnapshotStore::get_all_ordered(&adapter).unwrap();
        let datetimes: Vec<_> = all.iter().map(|s| s.datetime).collect();
        assert_eq!(datetimes, vec![dt(1, 12), dt(2, 12), dt(3, 12)]);

        let first = adapter.get_first_positive().unwrap().unwrap();
        assert_eq!(first.datetime, dt(2, 12));

        let before = SnapshotStore::get_last_before(&adapter, dt(3, 12)).unwrap().unwrap();
        assert_eq!(before.datetime, dt(2, 12));
        assert!(SnapshotStore::get_last_before(&adapter, dt(1, 12)).unwrap().is_none());
    }

    #[test]
    fn index_save_get_delete() {
        let adapter = SqliteAdapter::in_memory().unwrap();
        let p1 = IndexPoint {
            datetime: dt(1, 12),
            index_value: 1000.0,
            divisor: 10.0,
        };
        let p2 = IndexPoint {
            datetime: dt(2, 12),
            index_value: 1181.8181818181818,
            divisor: 11.0,
        };

        assert!(IndexStore::save(&adapter, &p2).unwrap());
        assert!(IndexStore::save(&adapter, &p1).unwrap());
        assert!(!IndexStore::save(&adapter, &p1).unwrap());

        assert_eq!(IndexStore::get_all_ordered(&adapter).unwrap(), vec![p1, p2]);
        assert_eq!(IndexStore::get_last(&adapter).unwrap(), Some(p2));

        assert_eq!(adapter.delete_all().unwrap(), 2);
        assert!(IndexStore::get_last(&adapter).unwrap().is_none());
    }
}
