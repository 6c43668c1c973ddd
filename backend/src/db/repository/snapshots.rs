//! Snapshot repository trait: cumulative view-count observations.

use async_trait::async_trait;

use super::error::RepositoryResult;
use crate::api::{DateRange, ItemId, Snapshot, SourceTable};

/// Repository trait for reading cumulative view snapshots.
///
/// The two tables use different column names and semantics; implementations
/// normalise both into [`Snapshot`] so the reconciler never sees the
/// difference.
#[async_trait]
pub trait SnapshotRepository: Send + Sync {
    /// Fetch every snapshot of `item_ids` observed in `range` from `table`.
    ///
    /// # Arguments
    /// * `table` - Which historical table to read
    /// * `item_ids` - Items to include
    /// * `range` - Inclusive observation-date range
    ///
    /// # Returns
    /// * `Ok(Vec<Snapshot>)` - Snapshots ordered by `observed_at` ascending
    /// * `Err(RepositoryError)` - If the table is unavailable or the query fails
    async fn fetch_snapshots(
        &self,
        table: SourceTable,
        item_ids: &[ItemId],
        range: DateRange,
    ) -> RepositoryResult<Vec<Snapshot>>;
}
