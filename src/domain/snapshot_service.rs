//! Takes and persists portfolio snapshots.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{NaiveDateTime, TimeDelta};
use tracing::{debug, info, warn};

use super::builder::PortfolioBuilder;
use super::error::PortdexError;
use super::trade::Trade;
use crate::ports::price_port::PriceProvider;
use crate::ports::snapshot_port::SnapshotStore;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SnapshotBackfillReport {
    pub saved: usize,
    pub duplicates: usize,
}

pub struct SnapshotService<'a> {
    builder: PortfolioBuilder<'a>,
    store: &'a dyn SnapshotStore,
}

impl<'a> SnapshotService<'a> {
    pub fn new(prices: &'a dyn PriceProvider, store: &'a dyn SnapshotStore) -> Self {
        Self {
            builder: PortfolioBuilder::new(prices),
            store,
        }
    }

    /// Snapshot at `at` whose cash-flow window starts at the latest stored
    /// snapshot before it. Returns `false` if one already exists at `at`.
    pub fn take_snapshot(&self, trades: &[Trade], at: NaiveDateTime) -> Result<bool, PortdexError> {
        let prev_at = self.store.get_last_before(at)?.map(|s| s.datetime);
        let snapshot = self.builder.snapshot(trades, at, prev_at)?;

        let saved = self.store.save(&snapshot)?;
        if saved {
            debug!(
                datetime = %at,
                total_value = snapshot.total_value,
                cash_flow = snapshot.cash_flow,
                positions = snapshot.positions.len(),
                "snapshot saved"
            );
        } else {
            warn!(datetime = %at, "snapshot already exists, not overwritten");
        }
        Ok(saved)
    }

    /// Snapshots at `start`, `start + step`, ... up to and including `end`.
    pub fn backfill(
        &self,
        trades: &[Trade],
        start: NaiveDateTime,
        end: NaiveDateTime,
        step: TimeDelta,
        cancel: &AtomicBool,
    ) -> Result<SnapshotBackfillReport, PortdexError> {
        if step <= TimeDelta::zero() {
            return Err(PortdexError::ConfigInvalid {
                section: "snapshot".into(),
                key: "step".into(),
                reason: "step must be positive".into(),
            });
        }

        let mut report = SnapshotBackfillReport::default();
        let mut at = start;
        while at <= end {
            if cancel.load(Ordering::Relaxed) {
                return Err(PortdexError::Cancelled {
                    completed: report.saved + report.duplicates,
                });
            }
            if self.take_snapshot(trades, at)? {
                report.saved += 1;
            } else {
                report.duplicates += 1;
            }
            match at.checked_add_signed(step) {
                Some(next) => at = next,
                None => break,
            }
        }

        info!(
            saved = report.saved,
            duplicates = report.duplicates,
            "snapshot backfill complete"
        );
        Ok(report)
    }
}
