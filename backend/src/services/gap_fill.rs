//! Gap filling for windows that straddle the legacy/current cutoff.
//!
//! The dashboard historically filled an in-window day that had no reconciled
//! increment with the legacy table's absolute total for that date. That mixes
//! a cumulative total into a series of deltas, so the behaviour is kept only
//! as the default policy for output compatibility and can be switched to
//! zero-filling or omission.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::str::FromStr;

use crate::api::{DataAnomaly, DateRange, Snapshot};

/// How a day with legacy data but no reconciled increment is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapFillPolicy {
    /// Use the legacy absolute total as the day's increment.
    #[default]
    LegacyTotal,
    /// Report the day with zero views.
    ZeroFill,
    /// Leave the day out of the series.
    Omit,
}

impl FromStr for GapFillPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy_total" | "legacy" => Ok(Self::LegacyTotal),
            "zero_fill" | "zero" => Ok(Self::ZeroFill),
            "omit" | "none" => Ok(Self::Omit),
            other => Err(format!(
                "Unknown gap fill policy '{}'. Use legacy_total, zero_fill, or omit.",
                other
            )),
        }
    }
}

/// Sum of legacy cumulative views per date, restricted to `window`.
pub fn legacy_totals(snapshots: &[Snapshot], window: DateRange) -> BTreeMap<NaiveDate, u64> {
    let mut totals: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for snapshot in snapshots.iter().filter(|s| window.contains(s.observed_at)) {
        *totals.entry(snapshot.observed_at).or_insert(0) += snapshot.cumulative_views;
    }
    totals
}

/// Fill days present in `totals` but missing from `increments`.
///
/// Returns the dates that were added to `increments`.
pub fn fill_gaps(
    increments: &mut BTreeMap<NaiveDate, u64>,
    totals: &BTreeMap<NaiveDate, u64>,
    policy: GapFillPolicy,
    anomalies: &mut Vec<DataAnomaly>,
) -> BTreeSet<NaiveDate> {
    let mut filled = BTreeSet::new();
    for (&date, &total) in totals {
        if increments.contains_key(&date) {
            continue;
        }
        match policy {
            GapFillPolicy::LegacyTotal => {
                increments.insert(date, total);
                anomalies.push(DataAnomaly::LegacyTotalFill { date, views: total });
                filled.insert(date);
            }
            GapFillPolicy::ZeroFill => {
                increments.insert(date, 0);
                filled.insert(date);
            }
            GapFillPolicy::Omit => {}
        }
    }
    filled
}

/// Apply fills already chosen for a combined series to one subset of its
/// items.
///
/// `filled` comes from [`fill_gaps`] on the combined series and `totals` holds
/// the subset's own legacy totals. A date is added only when the subset has
/// legacy rows on it, so the subsets of a partition add up to the combined
/// fill.
pub fn fill_dates(
    increments: &mut BTreeMap<NaiveDate, u64>,
    filled: &BTreeSet<NaiveDate>,
    totals: &BTreeMap<NaiveDate, u64>,
    policy: GapFillPolicy,
) {
    for date in filled {
        let Some(&total) = totals.get(date) else {
            continue;
        };
        let views = match policy {
            GapFillPolicy::LegacyTotal => total,
            GapFillPolicy::ZeroFill => 0,
            GapFillPolicy::Omit => continue,
        };
        increments.entry(*date).or_insert(views);
    }
}
