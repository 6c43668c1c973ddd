//! Reconciler configuration from environment variables or a TOML file.
//!
//! Defaults match the dashboard's production behaviour: a 7-day lookback,
//! a 2-day bootstrap tolerance, a 183 s short-form cutoff, legacy-total gap
//! filling and a 30 minute cache TTL.

use anyhow::Context;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::db::repository::RepositoryError;
use crate::services::category::DEFAULT_SHORT_FORM_MAX_SECONDS;
use crate::services::gap_fill::GapFillPolicy;

pub const DEFAULT_LOOKBACK_DAYS: u32 = 7;
pub const DEFAULT_BOOTSTRAP_TOLERANCE_DAYS: i64 = 2;
pub const DEFAULT_CACHE_TTL_SECONDS: u64 = 1800;
/// Largest accepted lookback, from config or a request override.
pub const MAX_LOOKBACK_DAYS: u32 = 3660;

/// Settings consumed by the reconciler and its caller-side cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconcilerConfig {
    /// Last date served by the legacy snapshot table
    pub cutoff_date: NaiveDate,
    /// Days fetched before the window start to seed each item's baseline
    pub lookback_days: u32,
    /// Maximum days between publish date and first snapshot for a bootstrap
    pub bootstrap_tolerance_days: i64,
    /// Items strictly shorter than this are short-form
    pub short_form_max_seconds: u32,
    pub gap_fill: GapFillPolicy,
    pub cache_ttl_seconds: u64,
}

/// Last day served by the legacy table in the production deployment.
fn default_cutoff_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 6, 6).unwrap_or_default()
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            cutoff_date: default_cutoff_date(),
            lookback_days: DEFAULT_LOOKBACK_DAYS,
            bootstrap_tolerance_days: DEFAULT_BOOTSTRAP_TOLERANCE_DAYS,
            short_form_max_seconds: DEFAULT_SHORT_FORM_MAX_SECONDS,
            gap_fill: GapFillPolicy::default(),
            cache_ttl_seconds: DEFAULT_CACHE_TTL_SECONDS,
        }
    }
}

fn parse_env<T: std::str::FromStr>(key: &str) -> Result<Option<T>, String> {
    match env::var(key) {
        Ok(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| format!("{} has an invalid value '{}'", key, raw)),
        _ => Ok(None),
    }
}

impl ReconcilerConfig {
    /// Create a configuration from environment variables.
    ///
    /// # Environment Variables
    /// - `ANALYTICS_CUTOFF_DATE` (optional, `YYYY-MM-DD`): last legacy-table date
    /// - `ANALYTICS_LOOKBACK_DAYS` (optional, default: 7)
    /// - `ANALYTICS_BOOTSTRAP_TOLERANCE_DAYS` (optional, default: 2)
    /// - `ANALYTICS_SHORT_FORM_MAX_SECONDS` (optional, default: 183)
    /// - `ANALYTICS_GAP_FILL` (optional): `legacy_total` | `zero_fill` | `omit`
    /// - `ANALYTICS_CACHE_TTL_SECONDS` (optional, default: 1800)
    ///
    /// # Errors
    /// Returns an error if a variable is set but cannot be parsed.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();

        if let Some(raw) = parse_env::<String>("ANALYTICS_CUTOFF_DATE")? {
            config.cutoff_date = NaiveDate::parse_from_str(&raw, "%Y-%m-%d").map_err(|_| {
                format!("ANALYTICS_CUTOFF_DATE must be YYYY-MM-DD, got '{}'", raw)
            })?;
        }
        if let Some(v) = parse_env("ANALYTICS_LOOKBACK_DAYS")? {
            config.lookback_days = v;
        }
        if let Some(v) = parse_env("ANALYTICS_BOOTSTRAP_TOLERANCE_DAYS")? {
            config.bootstrap_tolerance_days = v;
        }
        if let Some(v) = parse_env("ANALYTICS_SHORT_FORM_MAX_SECONDS")? {
            config.short_form_max_seconds = v;
        }
        if let Ok(raw) = env::var("ANALYTICS_GAP_FILL") {
            if !raw.trim().is_empty() {
                config.gap_fill = raw.parse()?;
            }
        }
        if let Some(v) = parse_env("ANALYTICS_CACHE_TTL_SECONDS")? {
            config.cache_ttl_seconds = v;
        }

        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Returns
    /// * `Ok(ReconcilerConfig)` if successful
    /// * `Err(RepositoryError::ConfigurationError)` if the file cannot be read,
    ///   parsed or fails validation
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, RepositoryError> {
        let content = fs::read_to_string(path.as_ref()).map_err(|e| {
            RepositoryError::configuration(format!("Failed to read config file: {}", e))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, RepositoryError> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| {
            RepositoryError::configuration(format!("Failed to parse config file: {}", e))
        })?;
        let config = Self::from(file);
        config
            .validate()
            .map_err(RepositoryError::configuration)?;
        Ok(config)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `analytics.toml` in:
    /// 1. Current directory
    /// 2. `backend/` directory
    /// 3. Parent directory
    pub fn from_default_location() -> Result<Self, RepositoryError> {
        let search_paths = [
            PathBuf::from("analytics.toml"),
            PathBuf::from("backend/analytics.toml"),
            PathBuf::from("../analytics.toml"),
        ];

        for path in search_paths {
            if path.exists() {
                return Self::from_file(&path);
            }
        }

        Err(RepositoryError::configuration(
            "No analytics.toml found in standard locations",
        ))
    }

    /// Resolve configuration the way the server does at startup.
    ///
    /// `ANALYTICS_CONFIG` names an explicit file; otherwise the default
    /// locations are searched; otherwise environment variables are used.
    pub fn load() -> anyhow::Result<Self> {
        if let Ok(path) = env::var("ANALYTICS_CONFIG") {
            return Self::from_file(&path)
                .with_context(|| format!("Failed to load analytics config from {}", path));
        }
        match Self::from_default_location() {
            Ok(config) => Ok(config),
            Err(_) => Self::from_env()
                .map_err(anyhow::Error::msg)
                .context("Failed to load analytics config from environment"),
        }
    }

    /// Reject settings the reconciler cannot work with.
    pub fn validate(&self) -> Result<(), String> {
        if self.bootstrap_tolerance_days < 0 {
            return Err("bootstrap_tolerance_days must not be negative".to_string());
        }
        if self.short_form_max_seconds == 0 {
            return Err("short_form_max_seconds must be greater than zero".to_string());
        }
        if self.lookback_days > MAX_LOOKBACK_DAYS {
            return Err(format!(
                "lookback_days must be at most {}, got {}",
                MAX_LOOKBACK_DAYS, self.lookback_days
            ));
        }
        Ok(())
    }
}

/// On-disk layout of `analytics.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub reconciler: ReconcilerSettings,
    #[serde(default)]
    pub cache: CacheSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconcilerSettings {
    #[serde(default = "default_cutoff_date")]
    pub cutoff_date: NaiveDate,
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
    #[serde(default = "default_bootstrap_tolerance_days")]
    pub bootstrap_tolerance_days: i64,
    #[serde(default = "default_short_form_max_seconds")]
    pub short_form_max_seconds: u32,
    #[serde(default)]
    pub gap_fill: GapFillPolicy,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    #[serde(default = "default_cache_ttl_seconds")]
    pub ttl_seconds: u64,
}

fn default_lookback_days() -> u32 {
    DEFAULT_LOOKBACK_DAYS
}

fn default_bootstrap_tolerance_days() -> i64 {
    DEFAULT_BOOTSTRAP_TOLERANCE_DAYS
}

fn default_short_form_max_seconds() -> u32 {
    DEFAULT_SHORT_FORM_MAX_SECONDS
}

fn default_cache_ttl_seconds() -> u64 {
    DEFAULT_CACHE_TTL_SECONDS
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            cutoff_date: default_cutoff_date(),
            lookback_days: default_lookback_days(),
            bootstrap_tolerance_days: default_bootstrap_tolerance_days(),
            short_form_max_seconds: default_short_form_max_seconds(),
            gap_fill: GapFillPolicy::default(),
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_seconds: default_cache_ttl_seconds(),
        }
    }
}

impl From<ConfigFile> for ReconcilerConfig {
    fn from(file: ConfigFile) -> Self {
        Self {
            cutoff_date: file.reconciler.cutoff_date,
            lookback_days: file.reconciler.lookback_days,
            bootstrap_tolerance_days: file.reconciler.bootstrap_tolerance_days,
            short_form_max_seconds: file.reconciler.short_form_max_seconds,
            gap_fill: file.reconciler.gap_fill,
            cache_ttl_seconds: file.cache.ttl_seconds,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ReconcilerConfig::default();
        assert_eq!(config.cutoff_date, NaiveDate::from_ymd_opt(2025, 6, 6).unwrap());
        assert_eq!(config.lookback_days, 7);
        assert_eq!(config.bootstrap_tolerance_days, 2);
        assert_eq!(config.short_form_max_seconds, 183);
        assert_eq!(config.gap_fill, GapFillPolicy::LegacyTotal);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_config() {
        let toml = r#"
[reconciler]
cutoff_date = "2025-07-01"
lookback_days = 14
bootstrap_tolerance_days = 1
short_form_max_seconds = 193
gap_fill = "zero_fill"

[cache]
ttl_seconds = 60
"#;

        let config = ReconcilerConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.cutoff_date, NaiveDate::from_ymd_opt(2025, 7, 1).unwrap());
        assert_eq!(config.lookback_days, 14);
        assert_eq!(config.bootstrap_tolerance_days, 1);
        assert_eq!(config.short_form_max_seconds, 193);
        assert_eq!(config.gap_fill, GapFillPolicy::ZeroFill);
        assert_eq!(config.cache_ttl_seconds, 60);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = ReconcilerConfig::from_toml_str("[reconciler]\nlookback_days = 3\n").unwrap();
        assert_eq!(config.lookback_days, 3);
        assert_eq!(config.short_form_max_seconds, 183);
        assert_eq!(config.cache_ttl_seconds, 1800);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = ReconcilerConfig::from_toml_str("[reconciler]\nshort_form_max_seconds = 0\n");
        assert!(matches!(result, Err(RepositoryError::ConfigurationError { .. })));

        let result = ReconcilerConfig::from_toml_str("[reconciler]\ngap_fill = \"guess\"\n");
        assert!(result.is_err());
    }

    #[test]
    fn test_lookback_upper_bound() {
        let config = ReconcilerConfig {
            lookback_days: MAX_LOOKBACK_DAYS,
            ..ReconcilerConfig::default()
        };
        assert!(config.validate().is_ok());

        let result = ReconcilerConfig::from_toml_str("[reconciler]\nlookback_days = 4294967295\n");
        let err = result.unwrap_err();
        assert!(err.to_string().contains("lookback_days must be at most"));
    }

    #[test]
    fn test_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("analytics.toml");
        fs::write(&path, "[reconciler]\ncutoff_date = \"2025-01-31\"\n").unwrap();

        let config = ReconcilerConfig::from_file(&path).unwrap();
        assert_eq!(config.cutoff_date, NaiveDate::from_ymd_opt(2025, 1, 31).unwrap());
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let result = ReconcilerConfig::from_file(dir.path().join("nope.toml"));
        assert!(matches!(result, Err(RepositoryError::ConfigurationError { .. })));
    }
}
