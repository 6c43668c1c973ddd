//! Content registry trait: which items belong to an owner.

use async_trait::async_trait;
use std::collections::BTreeSet;

use super::error::RepositoryResult;
use crate::api::{DateRange, ItemId, OwnerId, SourceTable};

/// Repository trait for resolving an owner's content items.
///
/// The legacy and current tables each keep their own owner/item
/// association, so a lookup is always scoped to one table and the date
/// sub-range that table serves.
///
/// # Thread Safety
/// Implementations must be `Send + Sync` to work with async Rust.
#[async_trait]
pub trait ContentRegistry: Send + Sync {
    /// Resolve the item identifiers an owner had in `table` during `range`.
    ///
    /// # Arguments
    /// * `owner_id` - The content owner
    /// * `table` - Which historical table to consult
    /// * `range` - Date predicate applied to the table's rows
    ///
    /// # Returns
    /// * `Ok(BTreeSet<ItemId>)` - Possibly empty set of items
    /// * `Err(RepositoryError::NotFound)` - If the owner is unknown
    /// * `Err(RepositoryError)` - If the lookup fails
    async fn resolve_item_ids(
        &self,
        owner_id: OwnerId,
        table: SourceTable,
        range: DateRange,
    ) -> RepositoryResult<BTreeSet<ItemId>>;
}
