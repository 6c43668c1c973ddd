use std::collections::HashSet;
use std::sync::Mutex;

use chrono::NaiveDate;
use writer_analytics::config::ReconcilerConfig;
use writer_analytics::db::LocalRepository;

static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Runs `f` with environment variables temporarily modified.
///
/// Restores the previous values on unwind and serializes access to the
/// process environment across parallel tests.
///
/// `Some(v)` sets a variable, `None` removes it.
#[allow(dead_code)]
pub fn with_scoped_env<F, R>(changes: &[(&str, Option<&str>)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _lock = ENV_LOCK.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
    let _guard = ScopedEnv::new(changes);
    f()
}

struct ScopedEnv {
    saved: Vec<(String, Option<String>)>,
}

impl ScopedEnv {
    fn new(changes: &[(&str, Option<&str>)]) -> Self {
        let keys: HashSet<&str> = changes.iter().map(|(k, _)| *k).collect();
        let saved = keys
            .into_iter()
            .map(|k| (k.to_string(), std::env::var(k).ok()))
            .collect();

        for (key, value) in changes {
            match value {
                Some(v) => std::env::set_var(key, v),
                None => std::env::remove_var(key),
            }
        }
        Self { saved }
    }
}

impl Drop for ScopedEnv {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..) {
            match value {
                Some(v) => std::env::set_var(&key, v),
                None => std::env::remove_var(&key),
            }
        }
    }
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Settings matching the fixture below: legacy rows end on 2025-06-06.
#[allow(dead_code)]
pub fn fixture_config() -> ReconcilerConfig {
    ReconcilerConfig {
        cutoff_date: date(2025, 6, 6),
        ..ReconcilerConfig::default()
    }
}

/// Two writers. Writer 7 has a short, a long and an undated video spanning
/// the cutoff; writer 8 is registered without content.
#[allow(dead_code)]
pub const FIXTURE: &str = r#"{"owners": [
  {"owner_id": 7, "items": [
    {"item_id": "short-1", "published_at": "2025-06-04", "duration": {"seconds": 58.0},
     "snapshots": [
       {"table": "legacy",  "date": "2025-06-04", "views": 1200},
       {"table": "legacy",  "date": "2025-06-05", "views": 5200},
       {"table": "legacy",  "date": "2025-06-06", "views": 9000},
       {"table": "current", "date": "2025-06-07", "views": 11000},
       {"table": "current", "date": "2025-06-08", "views": 11800}
     ]},
    {"item_id": "long-1", "published_at": "2025-03-01", "duration": {"text": "PT12M30S"},
     "snapshots": [
       {"table": "legacy",  "date": "2025-06-01", "views": 40000},
       {"table": "legacy",  "date": "2025-06-05", "views": 40500},
       {"table": "legacy",  "date": "2025-06-06", "views": 40650},
       {"table": "current", "date": "2025-06-07", "views": 40600},
       {"table": "current", "date": "2025-06-08", "views": 40900}
     ]},
    {"item_id": "long-2", "duration": {"text": "14:05"},
     "snapshots": [
       {"table": "current", "date": "2025-06-07", "views": 300},
       {"table": "current", "date": "2025-06-08", "views": 420}
     ]}
  ]},
  {"owner_id": 8}
]}"#;

#[allow(dead_code)]
pub fn fixture_repository() -> LocalRepository {
    LocalRepository::from_json(FIXTURE).unwrap()
}
