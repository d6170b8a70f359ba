//! Rebuilds and extends the index chain from persisted snapshots.
//!
//! The chain is a strict left fold over snapshots in datetime order; every
//! step needs the point computed immediately before it, so nothing here runs
//! in parallel. A failure at any step aborts the rest of the fold.

use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{info, warn};

use super::error::PortdexError;
use super::index::{IndexEngine, IndexPoint};
use super::snapshot::PortfolioSnapshot;
use crate::ports::index_port::IndexStore;
use crate::ports::snapshot_port::SnapshotStore;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexBackfillReport {
    /// Points computed, the base point included.
    pub computed: usize,
    pub saved: usize,
    /// Points that already existed and were left untouched.
    pub duplicates: usize,
    pub last: Option<IndexPoint>,
}

pub struct BackfillOrchestrator<'a> {
    snapshots: &'a dyn SnapshotStore,
    index: &'a dyn IndexStore,
    engine: IndexEngine,
}

impl<'a> BackfillOrchestrator<'a> {
    pub fn new(
        snapshots: &'a dyn SnapshotStore,
        index: &'a dyn IndexStore,
        engine: IndexEngine,
    ) -> Self {
        Self {
            snapshots,
            index,
            engine,
        }
    }

    /// Full chain from the first snapshot with positive value and no cash flow.
    pub fn backfill(&self, cancel: &AtomicBool) -> Result<IndexBackfillReport, PortdexError> {
        let snapshots = self.snapshots.get_all_ordered()?;

        let base_pos = snapshots
            .iter()
            .position(PortfolioSnapshot::is_base_candidate)
            .ok_or(PortdexError::NoBaseSnapshot)?;
        let base_snapshot = &snapshots[base_pos];
        let base = self.engine.base(base_snapshot)?;

        info!(
            datetime = %base.datetime,
            total_value = base_snapshot.total_value,
            divisor = base.divisor,
            skipped = base_pos,
            "index base selected"
        );

        let mut report = IndexBackfillReport::default();
        self.persist(&base, &mut report)?;

        let rest: Vec<&PortfolioSnapshot> = snapshots[base_pos + 1..]
            .iter()
            .filter(|s| s.datetime > base.datetime)
            .collect();
        self.extend(base, &rest, cancel, report)
    }

    /// Deletes every stored point, then runs [`Self::backfill`].
    pub fn rebuild(&self, cancel: &AtomicBool) -> Result<IndexBackfillReport, PortdexError> {
        let deleted = self.index.delete_all()?;
        info!(deleted, "index cleared");
        self.backfill(cancel)
    }

    /// Extends the chain from the last stored point over newer snapshots.
    /// Falls back to a full backfill when no point exists yet.
    pub fn update(&self, cancel: &AtomicBool) -> Result<IndexBackfillReport, PortdexError> {
        let Some(last) = self.index.get_last()? else {
            info!("index empty, running full backfill");
            return self.backfill(cancel);
        };

        let snapshots = self.snapshots.get_all_ordered()?;
        let rest: Vec<&PortfolioSnapshot> = snapshots
            .iter()
            .filter(|s| s.datetime > last.datetime)
            .collect();

        info!(from = %last.datetime, pending = rest.len(), "updating index");
        self.extend(last, &rest, cancel, IndexBackfillReport::default())
    }

    fn extend(
        &self,
        seed: IndexPoint,
        rest: &[&PortfolioSnapshot],
        cancel: &AtomicBool,
        mut report: IndexBackfillReport,
    ) -> Result<IndexBackfillReport, PortdexError> {
        let last = rest
            .iter()
            .try_fold(seed, |prev, snapshot| {
                if cancel.load(Ordering::Relaxed) {
                    return Err(PortdexError::Cancelled {
                        completed: report.computed,
                    });
                }
                let next = self.engine.calculate(snapshot, &prev);
                self.persist(&next, &mut report)?;
                Ok(next)
            })?;

        report.last = Some(last);
        info!(
            computed = report.computed,
            saved = report.saved,
            duplicates = report.duplicates,
            index_value = last.index_value,
            "index chain complete"
        );
        Ok(report)
    }

    fn persist(
        &self,
        point: &IndexPoint,
        report: &mut IndexBackfillReport,
    ) -> Result<(), PortdexError> {
        report.computed += 1;
        if self.index.save(point)? {
            report.saved += 1;
        } else {
            report.duplicates += 1;
            warn!(datetime = %point.datetime, "index point already exists, kept stored value");
        }
        Ok(())
    }
}
