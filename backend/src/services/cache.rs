//! Caller-side caching of reconciliation reports.
//!
//! The reconciler itself never looks at a cache. [`CachedReconciler`] wraps
//! it for callers that want memoization: a hit returns the stored report, a
//! miss recomputes from the sources. Partial reports, errors and cancelled
//! requests are never stored.

use async_trait::async_trait;
use log::{debug, warn};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;

use super::error::ReconcileError;
use super::reconcile::{ReconcileRequest, ViewDeltaReconciler};
use crate::api::{OwnerId, ReconcileReport};

/// Storage for finished reports.
#[async_trait]
pub trait ReportCache: Send + Sync {
    /// Fresh report stored under `key`, if any.
    async fn get(&self, key: &str) -> Option<ReconcileReport>;

    async fn set(&self, key: &str, report: ReconcileReport, ttl: Duration);

    /// Drop every entry for `owner_id`. Returns the number removed.
    async fn invalidate_owner(&self, owner_id: OwnerId) -> usize;
}

fn owner_prefix(owner_id: OwnerId) -> String {
    format!("analytics:{}:", owner_id)
}

/// Cache key for `request`, resolving the lookback the reconciler will use.
pub fn cache_key(request: &ReconcileRequest, default_lookback_days: u32) -> String {
    format!(
        "{}{}:{}:{}:{}",
        owner_prefix(request.owner_id),
        request.window.start,
        request.window.end,
        request.lookback_days.unwrap_or(default_lookback_days),
        if request.split_by_category { "split" } else { "combined" }
    )
}

struct CachedReport {
    report: ReconcileReport,
    stored_at: Instant,
    ttl: Duration,
}

impl CachedReport {
    fn is_fresh(&self) -> bool {
        self.stored_at.elapsed() < self.ttl
    }
}

/// Process-local [`ReportCache`] with per-entry expiry.
#[derive(Default)]
pub struct InMemoryReportCache {
    entries: RwLock<HashMap<String, CachedReport>>,
}

impl InMemoryReportCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored entries, fresh or not.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Remove expired entries. Returns the number removed.
    pub fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|_, cached| cached.is_fresh());
        before - entries.len()
    }
}

#[async_trait]
impl ReportCache for InMemoryReportCache {
    async fn get(&self, key: &str) -> Option<ReconcileReport> {
        let entries = self.entries.read();
        entries
            .get(key)
            .filter(|cached| cached.is_fresh())
            .map(|cached| cached.report.clone())
    }

    async fn set(&self, key: &str, report: ReconcileReport, ttl: Duration) {
        self.entries.write().insert(
            key.to_string(),
            CachedReport {
                report,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    async fn invalidate_owner(&self, owner_id: OwnerId) -> usize {
        let prefix = owner_prefix(owner_id);
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(&prefix));
        before - entries.len()
    }
}

/// A reconciler fronted by a [`ReportCache`].
#[derive(Clone)]
pub struct CachedReconciler {
    inner: ViewDeltaReconciler,
    cache: Arc<dyn ReportCache>,
    ttl: Duration,
}

impl CachedReconciler {
    /// Wrap `inner`, using its configured cache TTL.
    pub fn new(inner: ViewDeltaReconciler, cache: Arc<dyn ReportCache>) -> Self {
        let ttl = Duration::from_secs(inner.config().cache_ttl_seconds);
        Self { inner, cache, ttl }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    pub fn inner(&self) -> &ViewDeltaReconciler {
        &self.inner
    }

    pub async fn reconcile(
        &self,
        request: &ReconcileRequest,
        cancel: &CancellationToken,
    ) -> Result<ReconcileReport, ReconcileError> {
        let key = cache_key(request, self.inner.config().lookback_days);
        if let Some(report) = self.cache.get(&key).await {
            debug!("Cache hit for {}", key);
            return Ok(report);
        }

        let report = self.inner.reconcile(request, cancel).await?;
        if report.is_partial() {
            warn!("Not caching partial report for {}", key);
        } else {
            self.cache.set(&key, report.clone(), self.ttl).await;
        }
        Ok(report)
    }

    /// Forget every cached report for `owner_id`.
    pub async fn invalidate_owner(&self, owner_id: OwnerId) -> usize {
        self.cache.invalidate_owner(owner_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::DateRange;
    use chrono::NaiveDate;

    fn d(day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2025, 6, day).unwrap()
    }

    fn report(owner: i64) -> ReconcileReport {
        ReconcileReport::empty(OwnerId::new(owner), DateRange::new(d(1), d(7)).unwrap(), false)
    }

    #[test]
    fn test_cache_key_layout() {
        let request = ReconcileRequest::new(OwnerId::new(12), d(1), d(7)).unwrap();
        assert_eq!(cache_key(&request, 7), "analytics:12:2025-06-01:2025-06-07:7:combined");

        let request = request.with_lookback(3).with_category_split();
        assert_eq!(cache_key(&request, 7), "analytics:12:2025-06-01:2025-06-07:3:split");
    }

    #[tokio::test]
    async fn test_get_set_and_expiry() {
        let cache = InMemoryReportCache::new();
        cache.set("k", report(1), Duration::from_secs(60)).await;
        assert_eq!(cache.get("k").await, Some(report(1)));
        assert_eq!(cache.get("missing").await, None);

        cache.set("stale", report(1), Duration::ZERO).await;
        assert_eq!(cache.get("stale").await, None);
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_owner_matches_prefix_exactly() {
        let cache = InMemoryReportCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("analytics:1:a", report(1), ttl).await;
        cache.set("analytics:1:b", report(1), ttl).await;
        cache.set("analytics:11:a", report(11), ttl).await;

        assert_eq!(cache.invalidate_owner(OwnerId::new(1)).await, 2);
        assert_eq!(cache.len(), 1);
        assert!(cache.get("analytics:11:a").await.is_some());
    }
}
