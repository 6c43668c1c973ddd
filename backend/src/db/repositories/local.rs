//! In-memory local repository implementation.
//!
//! This module provides a local implementation of all repository traits
//! suitable for unit testing and local development. All data is stored in
//! memory, providing fast, deterministic, and isolated execution. Each
//! snapshot table, the registry and the duration lookup can be switched
//! off independently to exercise the reconciler's fallback paths.

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::NaiveDate;

use crate::api::{DateRange, DurationRecord, ItemId, OwnerId, Snapshot, SourceTable};
use crate::db::repository::*;

/// In-memory local repository.
///
/// # Example
/// ```
/// use chrono::NaiveDate;
/// use writer_analytics::api::{OwnerId, Snapshot, SourceTable};
/// use writer_analytics::db::repositories::LocalRepository;
///
/// let repo = LocalRepository::new();
/// let day = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();
/// repo.insert_snapshot(SourceTable::Current, OwnerId::new(7), Snapshot::new("vid-1", day, 1200));
/// assert_eq!(repo.snapshot_count(SourceTable::Current), 1);
/// ```
#[derive(Clone)]
pub struct LocalRepository {
    data: Arc<RwLock<LocalData>>,
}

#[derive(Default)]
struct LocalData {
    owners: HashSet<OwnerId>,
    item_owner: HashMap<ItemId, OwnerId>,
    snapshots: HashMap<SourceTable, Vec<Snapshot>>,
    durations: HashMap<ItemId, DurationRecord>,

    // Failure injection
    unavailable_tables: HashSet<SourceTable>,
    registry_down: bool,
    durations_down: bool,
    fetch_delay: Option<Duration>,
}

impl LocalRepository {
    /// Create a new empty local repository.
    pub fn new() -> Self {
        Self {
            data: Arc::new(RwLock::new(LocalData::default())),
        }
    }

    /// Register an owner with no content yet.
    pub fn add_owner(&self, owner_id: OwnerId) {
        self.data.write().owners.insert(owner_id);
    }

    /// Store a snapshot in `table`, registering its item under `owner_id`.
    pub fn insert_snapshot(&self, table: SourceTable, owner_id: OwnerId, snapshot: Snapshot) {
        let mut data = self.data.write();
        data.owners.insert(owner_id);
        data.item_owner
            .insert(snapshot.item_id.clone(), owner_id);
        data.snapshots.entry(table).or_default().push(snapshot);
    }

    /// Store many snapshots at once.
    pub fn insert_snapshots(
        &self,
        table: SourceTable,
        owner_id: OwnerId,
        snapshots: impl IntoIterator<Item = Snapshot>,
    ) {
        for snapshot in snapshots {
            self.insert_snapshot(table, owner_id, snapshot);
        }
    }

    /// Set the duration data for an item.
    pub fn set_duration(&self, item_id: impl Into<ItemId>, record: DurationRecord) {
        self.data.write().durations.insert(item_id.into(), record);
    }

    /// Make a snapshot table fail (`false`) or serve again (`true`).
    pub fn set_table_available(&self, table: SourceTable, available: bool) {
        let mut data = self.data.write();
        if available {
            data.unavailable_tables.remove(&table);
        } else {
            data.unavailable_tables.insert(table);
        }
    }

    /// Set the health status of the content registry.
    pub fn set_registry_healthy(&self, healthy: bool) {
        self.data.write().registry_down = !healthy;
    }

    /// Set the health status of the duration lookup.
    pub fn set_durations_healthy(&self, healthy: bool) {
        self.data.write().durations_down = !healthy;
    }

    /// Delay every snapshot fetch, to simulate a slow warehouse.
    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        self.data.write().fetch_delay = delay;
    }

    /// Clear all data, keeping failure-injection settings.
    pub fn clear(&self) {
        let mut data = self.data.write();
        data.owners.clear();
        data.item_owner.clear();
        data.snapshots.clear();
        data.durations.clear();
    }

    /// Number of snapshots stored in `table`.
    pub fn snapshot_count(&self, table: SourceTable) -> usize {
        self.data
            .read()
            .snapshots
            .get(&table)
            .map(Vec::len)
            .unwrap_or(0)
    }

    /// Build a repository from a JSON fixture.
    ///
    /// ```json
    /// {"owners": [{"owner_id": 7, "items": [{
    ///     "item_id": "vid-1",
    ///     "duration": {"seconds": 95.0},
    ///     "snapshots": [{"table": "current", "date": "2025-06-01", "views": 1200}]
    /// }]}]}
    /// ```
    pub fn from_json(json: &str) -> RepositoryResult<Self> {
        let fixture: LocalFixture = serde_json::from_str(json).map_err(|e| {
            RepositoryError::validation(format!("Failed to parse local fixture: {}", e))
        })?;

        let repo = Self::new();
        for owner in fixture.owners {
            let owner_id = OwnerId::new(owner.owner_id);
            repo.add_owner(owner_id);
            for item in owner.items {
                if let Some(duration) = item.duration {
                    repo.set_duration(ItemId::new(item.item_id.clone()), duration);
                }
                for row in item.snapshots {
                    let snapshot = Snapshot {
                        item_id: ItemId::new(item.item_id.clone()),
                        observed_at: row.date,
                        cumulative_views: row.views,
                        published_at: row.published_at.or(item.published_at),
                    };
                    repo.insert_snapshot(row.table, owner_id, snapshot);
                }
            }
        }
        Ok(repo)
    }

    async fn simulate_latency(&self) {
        let delay = self.data.read().fetch_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
    }
}

impl Default for LocalRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Deserialize)]
struct LocalFixture {
    owners: Vec<OwnerFixture>,
}

#[derive(Debug, Deserialize)]
struct OwnerFixture {
    owner_id: i64,
    #[serde(default)]
    items: Vec<ItemFixture>,
}

#[derive(Debug, Deserialize)]
struct ItemFixture {
    item_id: String,
    #[serde(default)]
    published_at: Option<NaiveDate>,
    #[serde(default)]
    duration: Option<DurationRecord>,
    #[serde(default)]
    snapshots: Vec<SnapshotRow>,
}

#[derive(Debug, Deserialize)]
struct SnapshotRow {
    table: SourceTable,
    date: NaiveDate,
    views: u64,
    #[serde(default)]
    published_at: Option<NaiveDate>,
}

#[async_trait]
impl ContentRegistry for LocalRepository {
    async fn resolve_item_ids(
        &self,
        owner_id: OwnerId,
        table: SourceTable,
        range: DateRange,
    ) -> RepositoryResult<BTreeSet<ItemId>> {
        let data = self.data.read();
        let context = ErrorContext::new("resolve_item_ids")
            .with_entity("owner")
            .with_entity_id(owner_id)
            .with_table(table);

        if data.registry_down {
            return Err(RepositoryError::connection_with_context(
                "Content registry is not reachable",
                context,
            ));
        }
        if !data.owners.contains(&owner_id) {
            return Err(RepositoryError::not_found_with_context(
                format!("Owner {} not found", owner_id),
                context,
            ));
        }

        let items = data
            .snapshots
            .get(&table)
            .into_iter()
            .flatten()
            .filter(|s| range.contains(s.observed_at))
            .filter(|s| data.item_owner.get(&s.item_id) == Some(&owner_id))
            .map(|s| s.item_id.clone())
            .collect();
        Ok(items)
    }
}

#[async_trait]
impl SnapshotRepository for LocalRepository {
    async fn fetch_snapshots(
        &self,
        table: SourceTable,
        item_ids: &[ItemId],
        range: DateRange,
    ) -> RepositoryResult<Vec<Snapshot>> {
        self.simulate_latency().await;

        let data = self.data.read();
        if data.unavailable_tables.contains(&table) {
            return Err(RepositoryError::connection_with_context(
                format!("Snapshot table '{}' is unavailable", table),
                ErrorContext::new("fetch_snapshots").with_table(table),
            ));
        }

        let wanted: HashSet<&ItemId> = item_ids.iter().collect();
        let mut rows: Vec<Snapshot> = data
            .snapshots
            .get(&table)
            .into_iter()
            .flatten()
            .filter(|s| wanted.contains(&s.item_id) && range.contains(s.observed_at))
            .cloned()
            .collect();
        rows.sort_by(|a, b| {
            a.observed_at
                .cmp(&b.observed_at)
                .then_with(|| a.item_id.cmp(&b.item_id))
        });
        Ok(rows)
    }
}

#[async_trait]
impl DurationRepository for LocalRepository {
    async fn resolve_durations(
        &self,
        item_ids: &[ItemId],
    ) -> RepositoryResult<HashMap<ItemId, DurationRecord>> {
        let data = self.data.read();
        if data.durations_down {
            return Err(RepositoryError::connection_with_context(
                "Duration lookup is not reachable",
                ErrorContext::new("resolve_durations").with_entity("item"),
            ));
        }

        Ok(item_ids
            .iter()
            .filter_map(|id| data.durations.get(id).map(|d| (id.clone(), d.clone())))
            .collect())
    }
}
