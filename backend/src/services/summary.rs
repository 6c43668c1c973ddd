//! Summary statistics over a reconciled series and view-count milestones.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::api::DailyIncrement;

/// Headline numbers for a daily series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ViewSummary {
    pub total_views: u64,
    pub days: usize,
    /// Rounded to the nearest whole view.
    pub average_daily_views: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub peak_day: Option<DailyIncrement>,
}

impl ViewSummary {
    pub fn from_series(series: &[DailyIncrement]) -> Self {
        let total_views: u64 = series.iter().map(|d| d.views).sum();
        let days = series.len();
        let average_daily_views = if days == 0 {
            0
        } else {
            (total_views as f64 / days as f64).round() as u64
        };
        // Earliest date wins a tie.
        let peak_day = series
            .iter()
            .copied()
            .max_by(|a, b| a.views.cmp(&b.views).then_with(|| b.date.cmp(&a.date)));

        Self {
            total_views,
            days,
            average_daily_views,
            peak_day,
        }
    }

    pub fn peak_date(&self) -> Option<NaiveDate> {
        self.peak_day.map(|d| d.date)
    }
}

/// Cumulative view milestones, lowest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Milestone {
    #[serde(rename = "1M_VIEWS")]
    OneMillion,
    #[serde(rename = "5M_VIEWS")]
    FiveMillion,
    #[serde(rename = "10M_VIEWS")]
    TenMillion,
    #[serde(rename = "50M_VIEWS")]
    FiftyMillion,
    #[serde(rename = "100M_VIEWS")]
    HundredMillion,
}

impl Milestone {
    pub const ALL: [Milestone; 5] = [
        Milestone::OneMillion,
        Milestone::FiveMillion,
        Milestone::TenMillion,
        Milestone::FiftyMillion,
        Milestone::HundredMillion,
    ];

    pub fn views(self) -> u64 {
        match self {
            Milestone::OneMillion => 1_000_000,
            Milestone::FiveMillion => 5_000_000,
            Milestone::TenMillion => 10_000_000,
            Milestone::FiftyMillion => 50_000_000,
            Milestone::HundredMillion => 100_000_000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Milestone::OneMillion => "1M_VIEWS",
            Milestone::FiveMillion => "5M_VIEWS",
            Milestone::TenMillion => "10M_VIEWS",
            Milestone::FiftyMillion => "50M_VIEWS",
            Milestone::HundredMillion => "100M_VIEWS",
        }
    }

    /// Highest milestone at or below `total`.
    pub fn highest_reached(total: u64) -> Option<Milestone> {
        Self::ALL.into_iter().rev().find(|m| total >= m.views())
    }

    /// First milestone strictly above `total`.
    pub fn next_after(total: u64) -> Option<Milestone> {
        Self::ALL.into_iter().find(|m| total < m.views())
    }
}

impl std::fmt::Display for Milestone {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Percentage of `target` covered by `total`, capped at 100.
pub fn progress_to_target(total: u64, target: u64) -> f64 {
    if target == 0 {
        return 100.0;
    }
    (total as f64 / target as f64 * 100.0).min(100.0)
}
