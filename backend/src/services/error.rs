//! Errors surfaced by the reconciliation service.

use crate::api::OwnerId;
use crate::db::repository::RepositoryError;

/// Hard failures of a reconciliation.
///
/// Snapshot-source outages are not errors: they are recorded on the report
/// and the result is marked partial.
#[derive(Debug, thiserror::Error)]
pub enum ReconcileError {
    /// Content registry or duration lookup failed.
    #[error("Lookup failed for owner {owner_id}: {source}")]
    LookupFailure {
        owner_id: OwnerId,
        #[source]
        source: RepositoryError,
    },

    #[error("Invalid window: {0}")]
    InvalidWindow(String),

    /// The caller abandoned the request.
    #[error("Reconciliation cancelled")]
    Cancelled,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl ReconcileError {
    pub fn lookup(owner_id: OwnerId, source: RepositoryError) -> Self {
        Self::LookupFailure { owner_id, source }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True when the owner does not exist, a caller mistake rather than an outage.
    pub fn is_unknown_owner(&self) -> bool {
        matches!(self, Self::LookupFailure { source, .. } if source.is_not_found())
    }
}
