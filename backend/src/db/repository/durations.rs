//! Duration repository trait used by category splits.

use async_trait::async_trait;
use std::collections::HashMap;

use super::error::RepositoryResult;
use crate::api::{DurationRecord, ItemId};

/// Repository trait for item durations.
#[async_trait]
pub trait DurationRepository: Send + Sync {
    /// Look up duration data for `item_ids`.
    ///
    /// Items with no duration data at all are simply absent from the map.
    ///
    /// # Returns
    /// * `Ok(HashMap<ItemId, DurationRecord>)` - Known durations
    /// * `Err(RepositoryError)` - If the lookup fails
    async fn resolve_durations(
        &self,
        item_ids: &[ItemId],
    ) -> RepositoryResult<HashMap<ItemId, DurationRecord>>;
}
