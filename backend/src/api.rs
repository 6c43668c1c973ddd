//! Public API surface for the analytics backend.
//!
//! This file consolidates the DTO types exchanged between the reconciler,
//! its data collaborators and callers. All types derive Serialize/Deserialize
//! so the request handler can return them as JSON unchanged.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};

/// Content owner (writer) identifier.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct OwnerId(pub i64);

/// Content item (video) identifier, opaque to the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ItemId(pub String);

impl OwnerId {
    pub fn new(value: i64) -> Self {
        OwnerId(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl ItemId {
    pub fn new(value: impl Into<String>) -> Self {
        ItemId(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for OwnerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for ItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for ItemId {
    fn from(value: &str) -> Self {
        ItemId(value.to_string())
    }
}

/// Inclusive calendar date range `[start, end]`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Create a range, rejecting `start > end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, String> {
        if start > end {
            return Err(format!(
                "start date {} is after end date {}",
                start, end
            ));
        }
        Ok(Self { start, end })
    }

    /// Whether `date` falls inside the range (both ends inclusive).
    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start && date <= self.end
    }

    /// Number of calendar days covered, counting both ends.
    pub fn num_days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// The same range with its start moved `days` earlier.
    ///
    /// Fails when the new start falls outside the supported calendar.
    pub fn extend_back(&self, days: u32) -> Result<Self, String> {
        let start = self
            .start
            .checked_sub_signed(Duration::days(i64::from(days)))
            .ok_or_else(|| {
                format!("lookback of {} days before {} is out of range", days, self.start)
            })?;
        Ok(Self {
            start,
            end: self.end,
        })
    }

    /// Every date of the range in ascending order.
    pub fn days(&self) -> impl Iterator<Item = NaiveDate> {
        let start = self.start;
        (0..self.num_days()).map(move |offset| start + Duration::days(offset))
    }

    /// Split the range into the sub-ranges served by each source table.
    ///
    /// The legacy table covers dates up to and including `cutoff`, the current
    /// table covers dates after it. Sub-ranges are returned in chronological
    /// order and empty sides are omitted.
    pub fn split_at_cutoff(&self, cutoff: NaiveDate) -> Vec<(SourceTable, DateRange)> {
        let mut parts = Vec::with_capacity(2);
        if self.start <= cutoff {
            parts.push((
                SourceTable::Legacy,
                DateRange {
                    start: self.start,
                    end: self.end.min(cutoff),
                },
            ));
        }
        if self.end > cutoff {
            parts.push((
                SourceTable::Current,
                DateRange {
                    start: self.start.max(cutoff + Duration::days(1)),
                    end: self.end,
                },
            ));
        }
        parts
    }

    /// Whether the range has dates on both sides of `cutoff`.
    pub fn spans_cutoff(&self, cutoff: NaiveDate) -> bool {
        self.start <= cutoff && self.end > cutoff
    }
}

impl std::fmt::Display for DateRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

/// The two historical snapshot tables, split by the cutoff date.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceTable {
    /// Dates up to and including the cutoff.
    Legacy,
    /// Dates after the cutoff.
    Current,
}

impl std::fmt::Display for SourceTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SourceTable::Legacy => write!(f, "legacy"),
            SourceTable::Current => write!(f, "current"),
        }
    }
}

/// Point-in-time observation of an item's cumulative view count.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub item_id: ItemId,
    pub observed_at: NaiveDate,
    pub cumulative_views: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published_at: Option<NaiveDate>,
}

impl Snapshot {
    pub fn new(item_id: impl Into<String>, observed_at: NaiveDate, cumulative_views: u64) -> Self {
        Self {
            item_id: ItemId::new(item_id),
            observed_at,
            cumulative_views,
            published_at: None,
        }
    }

    pub fn published(mut self, published_at: NaiveDate) -> Self {
        self.published_at = Some(published_at);
        self
    }
}

/// New views attributed to one calendar day.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyIncrement {
    pub date: NaiveDate,
    pub views: u64,
}

/// Short-form / long-form split of the content catalogue.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentCategory {
    ShortForm,
    LongForm,
}

impl std::fmt::Display for ContentCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ContentCategory::ShortForm => write!(f, "shorts"),
            ContentCategory::LongForm => write!(f, "content"),
        }
    }
}

/// Raw duration data for an item as stored by the duration source.
///
/// `seconds` comes from the analytics warehouse; `text` is the relational
/// store's display string (`"HH:MM:SS"`, `"MM:SS"` or ISO-8601 `"PT3M3S"`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DurationRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl DurationRecord {
    pub fn from_seconds(seconds: f64) -> Self {
        Self {
            seconds: Some(seconds),
            text: None,
        }
    }

    pub fn from_text(text: impl Into<String>) -> Self {
        Self {
            seconds: None,
            text: Some(text.into()),
        }
    }
}

/// Per-category daily series of a split request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CategorySeries {
    pub short_form: Vec<DailyIncrement>,
    pub long_form: Vec<DailyIncrement>,
}

impl CategorySeries {
    pub fn get(&self, category: ContentCategory) -> &[DailyIncrement] {
        match category {
            ContentCategory::ShortForm => &self.short_form,
            ContentCategory::LongForm => &self.long_form,
        }
    }
}

/// A snapshot source that could not be read during a reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceFailure {
    pub table: SourceTable,
    pub message: String,
}

/// Non-fatal data irregularities absorbed by the reconciler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataAnomaly {
    /// Cumulative views went down; the delta was clamped to zero.
    NegativeDelta {
        item_id: ItemId,
        date: NaiveDate,
        previous: u64,
        current: u64,
    },
    /// First snapshot of an item had no publish date to bootstrap from.
    MissingPublishDate { item_id: ItemId, date: NaiveDate },
    /// First snapshot of an item was too far from its publish date.
    BootstrapSkipped {
        item_id: ItemId,
        date: NaiveDate,
        gap_days: i64,
    },
    /// No usable duration; the item was counted as long-form.
    MissingDuration { item_id: ItemId },
    /// Both tables held a snapshot for the same item and date.
    DuplicateSnapshot { item_id: ItemId, date: NaiveDate },
    /// An in-window day was filled with a legacy absolute total.
    LegacyTotalFill { date: NaiveDate, views: u64 },
}

/// Output of one reconciliation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReconcileReport {
    pub owner_id: OwnerId,
    pub window: DateRange,
    /// Daily increments across all items, ascending by date.
    pub combined: Vec<DailyIncrement>,
    /// Present only when a category split was requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<CategorySeries>,
    #[serde(default)]
    pub source_failures: Vec<SourceFailure>,
    #[serde(default)]
    pub anomalies: Vec<DataAnomaly>,
}

impl ReconcileReport {
    /// Empty, complete report (no items for the owner).
    pub fn empty(owner_id: OwnerId, window: DateRange, split: bool) -> Self {
        Self {
            owner_id,
            window,
            combined: Vec::new(),
            categories: split.then(CategorySeries::default),
            source_failures: Vec::new(),
            anomalies: Vec::new(),
        }
    }

    /// True when at least one snapshot source failed.
    pub fn is_partial(&self) -> bool {
        !self.source_failures.is_empty()
    }

    /// Sum of the combined series.
    pub fn total_views(&self) -> u64 {
        self.combined.iter().map(|d| d.views).sum()
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod api_tests;
