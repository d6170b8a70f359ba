//! Portfolio snapshot persistence port.

use crate::domain::error::PortdexError;
use crate::domain::snapshot::PortfolioSnapshot;
use chrono::NaiveDateTime;

pub trait SnapshotStore {
    /// Returns `false` when a snapshot already exists at the same datetime.
    /// Existing rows are never overwritten.
    fn save(&self, snapshot: &PortfolioSnapshot) -> Result<bool, PortdexError>;

    /// Earliest snapshot with `total_value > 0`.
    fn get_first_positive(&self) -> Result<Option<PortfolioSnapshot>, PortdexError>;

    fn get_last(&self) -> Result<Option<PortfolioSnapshot>, PortdexError>;

    /// Latest snapshot strictly before `at`.
    fn get_last_before(&self, at: NaiveDateTime)
    -> Result<Option<PortfolioSnapshot>, PortdexError>;

    /// All snapshots, ascending by datetime.
    fn get_all_ordered(&self) -> Result<Vec<PortfolioSnapshot>, PortdexError>;
}
