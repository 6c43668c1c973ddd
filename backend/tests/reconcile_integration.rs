//! End-to-end reconciliation against the in-memory repository fixture.

mod support;

use std::sync::Arc;

use support::{date, fixture_config, fixture_repository};
use tokio_util::sync::CancellationToken;
use writer_analytics::api::{DailyIncrement, DataAnomaly, ItemId, OwnerId, SourceTable};
use writer_analytics::services::{
    CachedReconciler, InMemoryReportCache, Milestone, ReconcileError, ReconcileRequest,
    ReconcilerBuilder, ViewDeltaReconciler, ViewSummary,
};

const WRITER: OwnerId = OwnerId(7);
const EMPTY_WRITER: OwnerId = OwnerId(8);

fn june(pairs: &[(u32, u64)]) -> Vec<DailyIncrement> {
    pairs
        .iter()
        .map(|&(day, views)| DailyIncrement {
            date: date(2025, 6, day),
            views,
        })
        .collect()
}

fn request(owner: OwnerId, start: u32, end: u32) -> ReconcileRequest {
    ReconcileRequest::new(owner, date(2025, 6, start), date(2025, 6, end)).unwrap()
}

fn reconciler() -> ViewDeltaReconciler {
    ViewDeltaReconciler::new(Arc::new(fixture_repository()), fixture_config())
}

#[tokio::test]
async fn combined_series_across_cutoff() {
    let report = reconciler()
        .reconcile(&request(WRITER, 5, 8), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(
        report.combined,
        june(&[(5, 4500), (6, 3950), (7, 2000), (8, 1220)])
    );
    assert_eq!(report.total_views(), 11_670);
    assert!(!report.is_partial());
}

#[tokio::test]
async fn split_series_partition_combined() {
    let report = reconciler()
        .reconcile(
            &request(WRITER, 5, 8).with_category_split(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let categories = report.categories.clone().unwrap();
    assert_eq!(
        categories.short_form,
        june(&[(5, 4000), (6, 3800), (7, 2000), (8, 800)])
    );
    assert_eq!(
        categories.long_form,
        june(&[(5, 500), (6, 150), (7, 0), (8, 420)])
    );

    for (day, combined) in report.combined.iter().enumerate() {
        assert_eq!(
            categories.short_form[day].views + categories.long_form[day].views,
            combined.views
        );
    }
}

#[tokio::test]
async fn anomalies_are_reported_not_raised() {
    let report = reconciler()
        .reconcile(&request(WRITER, 5, 8), &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.anomalies.contains(&DataAnomaly::NegativeDelta {
        item_id: ItemId::new("long-1"),
        date: date(2025, 6, 7),
        previous: 40_650,
        current: 40_600,
    }));
    assert!(report.anomalies.contains(&DataAnomaly::MissingPublishDate {
        item_id: ItemId::new("long-2"),
        date: date(2025, 6, 7),
    }));
}

#[tokio::test]
async fn bootstrap_day_inside_window() {
    let report = reconciler()
        .reconcile(&request(WRITER, 4, 4), &CancellationToken::new())
        .await
        .unwrap();
    // short-1 was published on the 4th; long-1 has no baseline before the 5th.
    assert_eq!(report.combined, june(&[(4, 1200)]));
}

#[tokio::test]
async fn current_outage_falls_back_to_legacy() {
    let repo = fixture_repository();
    repo.set_table_available(SourceTable::Current, false);
    let reconciler = ViewDeltaReconciler::new(Arc::new(repo), fixture_config());

    let report = reconciler
        .reconcile(&request(WRITER, 5, 8), &CancellationToken::new())
        .await
        .unwrap();

    assert!(report.is_partial());
    assert_eq!(report.source_failures[0].table, SourceTable::Current);
    assert_eq!(report.combined, june(&[(5, 4500), (6, 3950)]));
}

#[tokio::test]
async fn writer_without_content_is_empty_not_error() {
    let report = reconciler()
        .reconcile(&request(EMPTY_WRITER, 1, 30), &CancellationToken::new())
        .await
        .unwrap();
    assert!(report.combined.is_empty());
    assert_eq!(report.total_views(), 0);
}

#[tokio::test]
async fn unknown_writer_is_an_error() {
    let err = reconciler()
        .reconcile(&request(OwnerId::new(999), 1, 30), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(err.is_unknown_owner());
    assert!(matches!(err, ReconcileError::LookupFailure { .. }));
}

#[tokio::test]
async fn concurrent_requests_do_not_interfere() {
    let reconciler = reconciler();
    let cancel = CancellationToken::new();

    let a = request(WRITER, 5, 8);
    let b = request(EMPTY_WRITER, 5, 8);
    let c = request(WRITER, 7, 8).with_category_split();
    let (ra, rb, rc) = tokio::join!(
        reconciler.reconcile(&a, &cancel),
        reconciler.reconcile(&b, &cancel),
        reconciler.reconcile(&c, &cancel),
    );

    assert_eq!(ra.unwrap().total_views(), 11_670);
    assert!(rb.unwrap().combined.is_empty());
    assert_eq!(rc.unwrap().combined, june(&[(7, 2000), (8, 1220)]));
}

#[tokio::test]
async fn builder_from_fixture() {
    let reconciler = ReconcilerBuilder::new()
        .config(fixture_config())
        .local_fixture(support::FIXTURE)
        .unwrap()
        .build()
        .unwrap();

    let report = reconciler
        .reconcile(&request(WRITER, 8, 8), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.combined, june(&[(8, 1220)]));
}

#[tokio::test]
async fn cached_reconciler_serves_hits_until_invalidated() {
    let repo = fixture_repository();
    let inner = ViewDeltaReconciler::new(Arc::new(repo.clone()), fixture_config());
    let cache = Arc::new(InMemoryReportCache::new());
    let cached = CachedReconciler::new(inner, cache.clone());
    let cancel = CancellationToken::new();
    let req = request(WRITER, 5, 8);

    let first = cached.reconcile(&req, &cancel).await.unwrap();
    assert_eq!(cache.len(), 1);

    // Data changes are invisible until the owner's entries are dropped.
    repo.clear();
    let second = cached.reconcile(&req, &cancel).await.unwrap();
    assert_eq!(first, second);

    assert_eq!(cached.invalidate_owner(WRITER).await, 1);
    let err = cached.reconcile(&req, &cancel).await.unwrap_err();
    assert!(err.is_unknown_owner());
}

#[tokio::test]
async fn cached_reconciler_skips_partial_and_cancelled() {
    let repo = fixture_repository();
    repo.set_table_available(SourceTable::Legacy, false);
    let inner = ViewDeltaReconciler::new(Arc::new(repo), fixture_config());
    let cache = Arc::new(InMemoryReportCache::new());
    let cached = CachedReconciler::new(inner, cache.clone());

    let report = cached
        .reconcile(&request(WRITER, 5, 8), &CancellationToken::new())
        .await
        .unwrap();
    assert!(report.is_partial());
    assert!(cache.is_empty());

    let cancel = CancellationToken::new();
    cancel.cancel();
    let err = cached
        .reconcile(&request(WRITER, 1, 8), &cancel)
        .await
        .unwrap_err();
    assert!(err.is_cancelled());
    assert!(cache.is_empty());
}

#[tokio::test]
async fn summary_and_milestones_over_report() {
    let report = reconciler()
        .reconcile(&request(WRITER, 5, 8), &CancellationToken::new())
        .await
        .unwrap();

    let summary = ViewSummary::from_series(&report.combined);
    assert_eq!(summary.total_views, 11_670);
    assert_eq!(summary.days, 4);
    assert_eq!(summary.average_daily_views, 2918);
    assert_eq!(summary.peak_date(), Some(date(2025, 6, 5)));
    assert_eq!(Milestone::highest_reached(summary.total_views), None);
    assert_eq!(
        Milestone::next_after(summary.total_views),
        Some(Milestone::OneMillion)
    );
}
