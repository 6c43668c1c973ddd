mod support;

use support::{date, with_scoped_env};
use writer_analytics::config::ReconcilerConfig;
use writer_analytics::services::GapFillPolicy;

const KEYS: [&str; 7] = [
    "ANALYTICS_CUTOFF_DATE",
    "ANALYTICS_LOOKBACK_DAYS",
    "ANALYTICS_BOOTSTRAP_TOLERANCE_DAYS",
    "ANALYTICS_SHORT_FORM_MAX_SECONDS",
    "ANALYTICS_GAP_FILL",
    "ANALYTICS_CACHE_TTL_SECONDS",
    "ANALYTICS_CONFIG",
];

fn cleared<'a>() -> Vec<(&'a str, Option<&'a str>)> {
    KEYS.iter().map(|k| (*k, None)).collect()
}

#[test]
fn from_env_defaults_when_unset() {
    let config = with_scoped_env(&cleared(), ReconcilerConfig::from_env).unwrap();
    assert_eq!(config, ReconcilerConfig::default());
}

#[test]
fn from_env_reads_every_setting() {
    let mut env = cleared();
    env.extend([
        ("ANALYTICS_CUTOFF_DATE", Some("2025-08-31")),
        ("ANALYTICS_LOOKBACK_DAYS", Some("10")),
        ("ANALYTICS_BOOTSTRAP_TOLERANCE_DAYS", Some("3")),
        ("ANALYTICS_SHORT_FORM_MAX_SECONDS", Some("193")),
        ("ANALYTICS_GAP_FILL", Some("omit")),
        ("ANALYTICS_CACHE_TTL_SECONDS", Some("120")),
    ]);

    let config = with_scoped_env(&env, ReconcilerConfig::from_env).unwrap();
    assert_eq!(config.cutoff_date, date(2025, 8, 31));
    assert_eq!(config.lookback_days, 10);
    assert_eq!(config.bootstrap_tolerance_days, 3);
    assert_eq!(config.short_form_max_seconds, 193);
    assert_eq!(config.gap_fill, GapFillPolicy::Omit);
    assert_eq!(config.cache_ttl_seconds, 120);
}

#[test]
fn from_env_rejects_bad_values() {
    let mut env = cleared();
    env.push(("ANALYTICS_LOOKBACK_DAYS", Some("a week")));
    let err = with_scoped_env(&env, ReconcilerConfig::from_env).unwrap_err();
    assert!(err.contains("ANALYTICS_LOOKBACK_DAYS"));

    let mut env = cleared();
    env.push(("ANALYTICS_CUTOFF_DATE", Some("06/06/2025")));
    assert!(with_scoped_env(&env, ReconcilerConfig::from_env).is_err());

    let mut env = cleared();
    env.push(("ANALYTICS_BOOTSTRAP_TOLERANCE_DAYS", Some("-1")));
    assert!(with_scoped_env(&env, ReconcilerConfig::from_env).is_err());
}

#[test]
fn from_env_rejects_unbounded_lookback() {
    let mut env = cleared();
    env.push(("ANALYTICS_LOOKBACK_DAYS", Some("4294967295")));
    let err = with_scoped_env(&env, ReconcilerConfig::from_env).unwrap_err();
    assert!(err.contains("lookback_days must be at most"));

    let mut env = cleared();
    env.push(("ANALYTICS_LOOKBACK_DAYS", Some("3660")));
    let config = with_scoped_env(&env, ReconcilerConfig::from_env).unwrap();
    assert_eq!(config.lookback_days, 3660);
}

#[test]
fn load_prefers_explicit_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("custom.toml");
    std::fs::write(&path, "[reconciler]\nlookback_days = 21\n[cache]\nttl_seconds = 5\n").unwrap();
    let path_str = path.to_string_lossy().to_string();

    let mut env = cleared();
    env.push(("ANALYTICS_CONFIG", Some(path_str.as_str())));
    env.push(("ANALYTICS_LOOKBACK_DAYS", Some("3")));

    let config = with_scoped_env(&env, ReconcilerConfig::load).unwrap();
    assert_eq!(config.lookback_days, 21);
    assert_eq!(config.cache_ttl_seconds, 5);
}

#[test]
fn load_reports_missing_explicit_file() {
    let mut env = cleared();
    env.push(("ANALYTICS_CONFIG", Some("/nonexistent/analytics.toml")));
    let err = with_scoped_env(&env, ReconcilerConfig::load).unwrap_err();
    assert!(format!("{:#}", err).contains("/nonexistent/analytics.toml"));
}
