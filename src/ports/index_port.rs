//! Index point persistence port.

use crate::domain::error::PortdexError;
use crate::domain::index::IndexPoint;

pub trait IndexStore {
    /// Returns `false` when a point already exists at the same datetime.
    fn save(&self, point: &IndexPoint) -> Result<bool, PortdexError>;

    fn get_last(&self) -> Result<Option<IndexPoint>, PortdexError>;

    /// All points, ascending by datetime.
    fn get_all_ordered(&self) -> Result<Vec<IndexPoint>, PortdexError>;

    /// Removes every point. Only used before a full rebuild.
    fn delete_all(&self) -> Result<usize, PortdexError>;
}
