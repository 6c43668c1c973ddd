//! Daily view delta reconciliation.
//!
//! Turns cumulative view-count snapshots into per-day increments. Snapshots
//! live in two tables split by a cutoff date; the reconciler resolves the
//! owner's items from both sides, fetches the window plus a lookback so the
//! first in-window day has a baseline, walks each item chronologically and
//! sums the per-item deltas by date.
//!
//! A snapshot table that cannot be read does not fail the request. The
//! report is assembled from whatever the other table returned and carries a
//! [`SourceFailure`] entry so the caller can warn the user.

use chrono::NaiveDate;
use futures::future::{join_all, try_join_all};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::collections::btree_map::Entry;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use super::category::partition_items;
use super::error::ReconcileError;
use super::gap_fill::{fill_dates, fill_gaps, legacy_totals};
use crate::api::{
    CategorySeries, ContentCategory, DailyIncrement, DataAnomaly, DateRange, ItemId, OwnerId,
    ReconcileReport, Snapshot, SourceFailure, SourceTable,
};
use crate::config::{ReconcilerConfig, MAX_LOOKBACK_DAYS};
use crate::db::repository::{
    ContentRegistry, DurationRepository, FullRepository, SnapshotRepository,
};

/// Parameters of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReconcileRequest {
    pub owner_id: OwnerId,
    pub window: DateRange,
    /// Overrides the configured lookback when set.
    #[serde(default)]
    pub lookback_days: Option<u32>,
    #[serde(default)]
    pub split_by_category: bool,
}

impl ReconcileRequest {
    /// Request the combined series for `[start, end]`.
    pub fn new(owner_id: OwnerId, start: NaiveDate, end: NaiveDate) -> Result<Self, ReconcileError> {
        let window = DateRange::new(start, end).map_err(ReconcileError::InvalidWindow)?;
        Ok(Self {
            owner_id,
            window,
            lookback_days: None,
            split_by_category: false,
        })
    }

    pub fn with_lookback(mut self, days: u32) -> Self {
        self.lookback_days = Some(days);
        self
    }

    /// Also produce short-form and long-form series.
    pub fn with_category_split(mut self) -> Self {
        self.split_by_category = true;
        self
    }
}

/// The reconciliation engine.
///
/// Holds only injected collaborators and configuration; every call to
/// [`reconcile`](Self::reconcile) works on freshly fetched data.
#[derive(Clone)]
pub struct ViewDeltaReconciler {
    registry: Arc<dyn ContentRegistry>,
    snapshots: Arc<dyn SnapshotRepository>,
    durations: Arc<dyn DurationRepository>,
    config: ReconcilerConfig,
}

impl ViewDeltaReconciler {
    /// Create a reconciler backed by one repository serving every lookup.
    pub fn new<R: FullRepository + 'static>(repo: Arc<R>, config: ReconcilerConfig) -> Self {
        Self {
            registry: repo.clone(),
            snapshots: repo.clone(),
            durations: repo,
            config,
        }
    }

    /// Create a reconciler from separately provided collaborators.
    pub fn from_parts(
        registry: Arc<dyn ContentRegistry>,
        snapshots: Arc<dyn SnapshotRepository>,
        durations: Arc<dyn DurationRepository>,
        config: ReconcilerConfig,
    ) -> Self {
        Self {
            registry,
            snapshots,
            durations,
            config,
        }
    }

    pub fn config(&self) -> &ReconcilerConfig {
        &self.config
    }

    /// Compute the daily increments for `request`.
    ///
    /// # Errors
    /// * [`ReconcileError::InvalidWindow`] if the window is reversed or the
    ///   lookback reaches outside the calendar
    /// * [`ReconcileError::LookupFailure`] if the registry or duration lookup fails
    /// * [`ReconcileError::Cancelled`] if `cancel` fires first; in-flight
    ///   fetches are dropped
    pub async fn reconcile(
        &self,
        request: &ReconcileRequest,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, ReconcileError> {
        if request.window.start > request.window.end {
            return Err(ReconcileError::InvalidWindow(format!(
                "start date {} is after end date {}",
                request.window.start, request.window.end
            )));
        }
        if let Some(days) = request.lookback_days.filter(|&d| d > MAX_LOOKBACK_DAYS) {
            return Err(ReconcileError::InvalidWindow(format!(
                "lookback of {} days exceeds the maximum of {}",
                days, MAX_LOOKBACK_DAYS
            )));
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                warn!("Reconciliation for owner {} cancelled", request.owner_id);
                Err(ReconcileError::Cancelled)
            }
            result = self.run(request) => result,
        }
    }

    async fn run(&self, request: &ReconcileRequest) -> Result<ReconcileReport, ReconcileError> {
        let owner_id = request.owner_id;
        let window = request.window;
        let lookback = request.lookback_days.unwrap_or(self.config.lookback_days);
        let fetch_range = window
            .extend_back(lookback)
            .map_err(ReconcileError::InvalidWindow)?;
        let sources = fetch_range.split_at_cutoff(self.config.cutoff_date);

        let items = self.resolve_items(owner_id, &sources).await?;
        if items.is_empty() {
            info!("Owner {} has no items in {}", owner_id, fetch_range);
            return Ok(ReconcileReport::empty(
                owner_id,
                window,
                request.split_by_category,
            ));
        }
        let item_ids: Vec<ItemId> = items.iter().cloned().collect();

        let fetches = join_all(sources.iter().map(|&(table, range)| {
            let ids = &item_ids;
            async move { (table, self.snapshots.fetch_snapshots(table, ids, range).await) }
        }));
        let durations = async {
            if request.split_by_category {
                self.durations.resolve_durations(&item_ids).await.map(Some)
            } else {
                Ok(None)
            }
        };
        let (fetched, durations) = tokio::join!(fetches, durations);
        let durations = durations.map_err(|e| {
            ReconcileError::lookup(owner_id, e.with_operation("resolve_durations"))
        })?;

        let mut report = ReconcileReport::empty(owner_id, window, false);
        let mut anomalies = Vec::new();
        let mut batches = Vec::with_capacity(fetched.len());
        for (table, result) in fetched {
            match result {
                Ok(rows) => {
                    debug!(
                        "Fetched {} snapshots from {} for owner {}",
                        rows.len(),
                        table,
                        owner_id
                    );
                    batches.push((table, rows));
                }
                Err(e) => {
                    warn!(
                        "Snapshot source {} failed for owner {}, continuing without it: {}",
                        table, owner_id, e
                    );
                    let e = e.with_table(table);
                    report.source_failures.push(SourceFailure {
                        table,
                        message: e.to_string(),
                    });
                }
            }
        }

        let legacy: Vec<Snapshot> = batches
            .iter()
            .filter(|(table, _)| *table == SourceTable::Legacy)
            .flat_map(|(_, rows)| rows.iter().cloned())
            .collect();
        let merged = merge_sources(batches, &mut anomalies);

        let tolerance = self.config.bootstrap_tolerance_days;
        let per_item: BTreeMap<ItemId, Vec<DailyIncrement>> = merged
            .iter()
            .map(|(item_id, snapshots)| {
                let increments = walk_item(snapshots, window, tolerance, &mut anomalies);
                (item_id.clone(), increments)
            })
            .collect();

        let mut combined = sum_by_date(per_item.values().flatten(), window);
        let filled = if window.spans_cutoff(self.config.cutoff_date) {
            let totals = legacy_totals(&legacy, window);
            fill_gaps(&mut combined, &totals, self.config.gap_fill, &mut anomalies)
        } else {
            BTreeSet::new()
        };
        if !filled.is_empty() {
            info!(
                "Filled {} day(s) for owner {} using {:?}",
                filled.len(),
                owner_id,
                self.config.gap_fill
            );
        }
        report.combined = into_series(combined);

        if let Some(durations) = durations {
            let categories = partition_items(
                &items,
                &durations,
                self.config.short_form_max_seconds,
                &mut anomalies,
            );
            let mut series = CategorySeries::default();
            for category in [ContentCategory::ShortForm, ContentCategory::LongForm] {
                let in_category = |id: &ItemId| categories.get(id) == Some(&category);
                let mut daily = sum_by_date(
                    per_item
                        .iter()
                        .filter(|(id, _)| in_category(*id))
                        .flat_map(|(_, increments)| increments),
                    window,
                );
                if !filled.is_empty() {
                    let rows: Vec<Snapshot> = legacy
                        .iter()
                        .filter(|s| in_category(&s.item_id))
                        .cloned()
                        .collect();
                    fill_dates(
                        &mut daily,
                        &filled,
                        &legacy_totals(&rows, window),
                        self.config.gap_fill,
                    );
                }
                match category {
                    ContentCategory::ShortForm => series.short_form = into_series(daily),
                    ContentCategory::LongForm => series.long_form = into_series(daily),
                }
            }
            report.categories = Some(series);
        }

        report.anomalies = anomalies;
        info!(
            "Reconciled owner {} over {}: {} items, {} days, {} views{}",
            owner_id,
            window,
            items.len(),
            report.combined.len(),
            report.total_views(),
            if report.is_partial() { " (partial)" } else { "" }
        );
        Ok(report)
    }

    /// Union of the owner's items over every source sub-range.
    async fn resolve_items(
        &self,
        owner_id: OwnerId,
        sources: &[(SourceTable, DateRange)],
    ) -> Result<BTreeSet<ItemId>, ReconcileError> {
        let sets = try_join_all(
            sources
                .iter()
                .map(|&(table, range)| self.registry.resolve_item_ids(owner_id, table, range)),
        )
        .await
        .map_err(|e| ReconcileError::lookup(owner_id, e.with_operation("resolve_item_ids")))?;

        Ok(sets.into_iter().flatten().collect())
    }
}

/// Merge per-source batches into one date-ordered snapshot list per item.
///
/// When both tables hold the same item and date the current table wins and a
/// [`DataAnomaly::DuplicateSnapshot`] is recorded.
pub fn merge_sources(
    batches: Vec<(SourceTable, Vec<Snapshot>)>,
    anomalies: &mut Vec<DataAnomaly>,
) -> BTreeMap<ItemId, Vec<Snapshot>> {
    let mut by_item: BTreeMap<ItemId, BTreeMap<NaiveDate, (SourceTable, Snapshot)>> =
        BTreeMap::new();

    for (table, rows) in batches {
        for snapshot in rows {
            let dates = by_item.entry(snapshot.item_id.clone()).or_default();
            match dates.entry(snapshot.observed_at) {
                Entry::Vacant(slot) => {
                    slot.insert((table, snapshot));
                }
                Entry::Occupied(mut slot) => {
                    anomalies.push(DataAnomaly::DuplicateSnapshot {
                        item_id: snapshot.item_id.clone(),
                        date: snapshot.observed_at,
                    });
                    if table == SourceTable::Current || slot.get().0 == table {
                        slot.insert((table, snapshot));
                    }
                }
            }
        }
    }

    by_item
        .into_iter()
        .map(|(item_id, dates)| (item_id, dates.into_values().map(|(_, s)| s).collect()))
        .collect()
}

/// Walk one item's date-ordered snapshots and emit its in-window increments.
///
/// The cursor starts unknown. The first snapshot is a bootstrap day only when
/// the item's publish date is at most `bootstrap_tolerance_days` before it;
/// otherwise nothing is emitted for it. Later snapshots emit the clamped
/// difference to the previous one. Every snapshot moves the cursor, including
/// those in the lookback before the window. Anomalies are recorded only for
/// in-window dates.
pub fn walk_item(
    snapshots: &[Snapshot],
    window: DateRange,
    bootstrap_tolerance_days: i64,
    anomalies: &mut Vec<DataAnomaly>,
) -> Vec<DailyIncrement> {
    let published_at = snapshots.iter().find_map(|s| s.published_at);
    let mut cursor: Option<u64> = None;
    let mut increments = Vec::new();

    for snapshot in snapshots {
        let date = snapshot.observed_at;
        let current = snapshot.cumulative_views;
        let in_window = window.contains(date);

        let views = match cursor {
            None => match bootstrap(snapshot, published_at, bootstrap_tolerance_days) {
                Ok(views) => Some(views),
                Err(anomaly) => {
                    if in_window {
                        anomalies.push(anomaly);
                    }
                    None
                }
            },
            Some(previous) => {
                if current < previous && in_window {
                    anomalies.push(DataAnomaly::NegativeDelta {
                        item_id: snapshot.item_id.clone(),
                        date,
                        previous,
                        current,
                    });
                }
                Some(current.saturating_sub(previous))
            }
        };
        cursor = Some(current);

        if let (true, Some(views)) = (in_window, views) {
            increments.push(DailyIncrement { date, views });
        }
    }
    increments
}

fn bootstrap(
    snapshot: &Snapshot,
    published_at: Option<NaiveDate>,
    tolerance_days: i64,
) -> Result<u64, DataAnomaly> {
    let Some(published_at) = published_at else {
        return Err(DataAnomaly::MissingPublishDate {
            item_id: snapshot.item_id.clone(),
            date: snapshot.observed_at,
        });
    };

    let gap_days = (snapshot.observed_at - published_at).num_days();
    if gap_days <= tolerance_days {
        Ok(snapshot.cumulative_views)
    } else {
        Err(DataAnomaly::BootstrapSkipped {
            item_id: snapshot.item_id.clone(),
            date: snapshot.observed_at,
            gap_days,
        })
    }
}

/// Sum increments by date, keeping only dates inside `window`.
pub fn sum_by_date<'a>(
    increments: impl IntoIterator<Item = &'a DailyIncrement>,
    window: DateRange,
) -> BTreeMap<NaiveDate, u64> {
    let mut totals = BTreeMap::new();
    for increment in increments {
        if window.contains(increment.date) {
            *totals.entry(increment.date).or_insert(0u64) += increment.views;
        }
    }
    totals
}

fn into_series(daily: BTreeMap<NaiveDate, u64>) -> Vec<DailyIncrement> {
    daily
        .into_iter()
        .map(|(date, views)| DailyIncrement { date, views })
        .collect()
}

#[cfg(test)]
#[path = "reconcile_tests.rs"]
mod reconcile_tests;
