//! Builder for wiring a reconciler from configuration and collaborators.

use std::path::Path;
use std::sync::Arc;

use super::error::ReconcileError;
use super::reconcile::ViewDeltaReconciler;
use crate::config::ReconcilerConfig;
use crate::db::repositories::LocalRepository;
use crate::db::repository::{ContentRegistry, DurationRepository, FullRepository, SnapshotRepository};

/// Fluent API for configuring and creating a [`ViewDeltaReconciler`].
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use writer_analytics::db::repositories::LocalRepository;
/// use writer_analytics::services::ReconcilerBuilder;
///
/// let reconciler = ReconcilerBuilder::new()
///     .repository(Arc::new(LocalRepository::new()))
///     .lookback_days(14)
///     .build()
///     .unwrap();
/// assert_eq!(reconciler.config().lookback_days, 14);
/// ```
#[derive(Default)]
pub struct ReconcilerBuilder {
    config: ReconcilerConfig,
    registry: Option<Arc<dyn ContentRegistry>>,
    snapshots: Option<Arc<dyn SnapshotRepository>>,
    durations: Option<Arc<dyn DurationRepository>>,
}

impl ReconcilerBuilder {
    /// Create a builder with default configuration and no collaborators.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use one repository for the registry, snapshot and duration lookups.
    pub fn repository<R: FullRepository + 'static>(mut self, repo: Arc<R>) -> Self {
        self.registry = Some(repo.clone());
        self.snapshots = Some(repo.clone());
        self.durations = Some(repo);
        self
    }

    /// Use an in-memory repository loaded from a JSON fixture.
    pub fn local_fixture(self, json: &str) -> Result<Self, ReconcileError> {
        let repo = LocalRepository::from_json(json)
            .map_err(|e| ReconcileError::Configuration(e.to_string()))?;
        Ok(self.repository(Arc::new(repo)))
    }

    pub fn registry(mut self, registry: Arc<dyn ContentRegistry>) -> Self {
        self.registry = Some(registry);
        self
    }

    pub fn snapshots(mut self, snapshots: Arc<dyn SnapshotRepository>) -> Self {
        self.snapshots = Some(snapshots);
        self
    }

    pub fn durations(mut self, durations: Arc<dyn DurationRepository>) -> Self {
        self.durations = Some(durations);
        self
    }

    pub fn config(mut self, config: ReconcilerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn lookback_days(mut self, days: u32) -> Self {
        self.config.lookback_days = days;
        self
    }

    /// Load configuration from environment variables.
    pub fn from_env(mut self) -> Result<Self, ReconcileError> {
        self.config = ReconcilerConfig::from_env().map_err(ReconcileError::Configuration)?;
        Ok(self)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Arguments
    /// * `config_path` - Path to the analytics.toml configuration file
    pub fn from_config_file<P: AsRef<Path>>(mut self, config_path: P) -> Result<Self, ReconcileError> {
        self.config = ReconcilerConfig::from_file(config_path)
            .map_err(|e| ReconcileError::Configuration(e.to_string()))?;
        Ok(self)
    }

    /// Load configuration from the default location.
    ///
    /// Searches for `analytics.toml` in standard locations.
    pub fn from_default_config(mut self) -> Result<Self, ReconcileError> {
        self.config = ReconcilerConfig::from_default_location()
            .map_err(|e| ReconcileError::Configuration(e.to_string()))?;
        Ok(self)
    }

    /// Build the reconciler.
    ///
    /// # Errors
    /// Returns [`ReconcileError::Configuration`] if a collaborator is missing
    /// or the configuration is invalid.
    pub fn build(self) -> Result<ViewDeltaReconciler, ReconcileError> {
        self.config
            .validate()
            .map_err(ReconcileError::Configuration)?;

        let registry = self
            .registry
            .ok_or_else(|| ReconcileError::Configuration("content registry not set".to_string()))?;
        let snapshots = self
            .snapshots
            .ok_or_else(|| ReconcileError::Configuration("snapshot source not set".to_string()))?;
        let durations = self
            .durations
            .ok_or_else(|| ReconcileError::Configuration("duration lookup not set".to_string()))?;

        Ok(ViewDeltaReconciler::from_parts(
            registry,
            snapshots,
            durations,
            self.config,
        ))
    }
}
