//! Short-form / long-form classification by item duration.
//!
//! Duration data comes from two places with different shapes: the analytics
//! warehouse reports numeric seconds, the relational store keeps a display
//! string. Numeric seconds win when usable; the string is parsed otherwise.
//! Items with no usable duration are counted as long-form so they are never
//! dropped from a split.

use std::collections::{BTreeSet, HashMap};

use crate::api::{ContentCategory, DataAnomaly, DurationRecord, ItemId};

/// Default short-form cutoff: strictly less than 3 minutes 3 seconds.
pub const DEFAULT_SHORT_FORM_MAX_SECONDS: u32 = 183;

/// Parse a duration display string into whole seconds.
///
/// Accepts `"HH:MM:SS"`, `"MM:SS"` and ISO-8601 durations such as
/// `"PT1H2M3S"` or `"P1DT5M"`. Returns `None` for anything else.
pub fn parse_duration_text(text: &str) -> Option<u32> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }
    if text.starts_with('P') || text.starts_with('p') {
        return parse_iso8601(text);
    }

    let parts: Vec<u32> = text
        .split(':')
        .map(|p| p.trim().parse::<u32>().ok())
        .collect::<Option<Vec<_>>>()?;

    match parts.as_slice() {
        [hours, minutes, seconds] => hours
            .checked_mul(3600)?
            .checked_add(minutes.checked_mul(60)?)?
            .checked_add(*seconds),
        [minutes, seconds] => minutes.checked_mul(60)?.checked_add(*seconds),
        _ => None,
    }
}

fn parse_iso8601(text: &str) -> Option<u32> {
    let upper = text.to_ascii_uppercase();
    let body = upper.strip_prefix('P')?;
    let (date_part, time_part) = match body.split_once('T') {
        Some((date, time)) => (date, time),
        None => (body, ""),
    };

    let mut total: u32 = 0;
    let mut seen_any = false;

    let mut number = String::new();
    for ch in date_part.chars() {
        if ch.is_ascii_digit() {
            number.push(ch);
        } else if ch == 'D' {
            total = total.checked_add(number.parse::<u32>().ok()?.checked_mul(86_400)?)?;
            number.clear();
            seen_any = true;
        } else {
            return None;
        }
    }
    if !number.is_empty() {
        return None;
    }

    for ch in time_part.chars() {
        if ch.is_ascii_digit() {
            number.push(ch);
            continue;
        }
        let unit = match ch {
            'H' => 3600,
            'M' => 60,
            'S' => 1,
            _ => return None,
        };
        total = total.checked_add(number.parse::<u32>().ok()?.checked_mul(unit)?)?;
        number.clear();
        seen_any = true;
    }
    if !number.is_empty() || !seen_any {
        return None;
    }
    Some(total)
}

/// Usable duration in seconds, following the numeric-then-text priority.
pub fn duration_seconds(record: &DurationRecord) -> Option<f64> {
    if let Some(seconds) = record.seconds {
        if seconds.is_finite() && seconds > 0.0 {
            return Some(seconds);
        }
    }
    record
        .text
        .as_deref()
        .and_then(parse_duration_text)
        .filter(|s| *s > 0)
        .map(f64::from)
}

/// Classify one item. Unknown durations fall into [`ContentCategory::LongForm`].
pub fn classify(record: Option<&DurationRecord>, short_form_max_seconds: u32) -> ContentCategory {
    match record.and_then(duration_seconds) {
        Some(seconds) if seconds < f64::from(short_form_max_seconds) => ContentCategory::ShortForm,
        _ => ContentCategory::LongForm,
    }
}

/// Assign every item to a category, recording items without usable durations.
pub fn partition_items(
    items: &BTreeSet<ItemId>,
    durations: &HashMap<ItemId, DurationRecord>,
    short_form_max_seconds: u32,
    anomalies: &mut Vec<DataAnomaly>,
) -> HashMap<ItemId, ContentCategory> {
    items
        .iter()
        .map(|item_id| {
            let record = durations.get(item_id);
            if record.and_then(duration_seconds).is_none() {
                anomalies.push(DataAnomaly::MissingDuration {
                    item_id: item_id.clone(),
                });
            }
            (item_id.clone(), classify(record, short_form_max_seconds))
        })
        .collect()
}
