//! Service layer: the reconciliation engine and the helpers around it.
//!
//! Services orchestrate repository calls and implement the business logic.
//! [`ViewDeltaReconciler`] is the single entry point; category splitting,
//! gap filling, summaries and caching live in their own modules.

pub mod builder;
pub mod cache;
pub mod category;
pub mod error;
pub mod gap_fill;
pub mod reconcile;
pub mod summary;

pub use builder::ReconcilerBuilder;
pub use cache::{cache_key, CachedReconciler, InMemoryReportCache, ReportCache};
pub use category::{classify, parse_duration_text, DEFAULT_SHORT_FORM_MAX_SECONDS};
pub use error::ReconcileError;
pub use gap_fill::GapFillPolicy;
pub use reconcile::{ReconcileRequest, ViewDeltaReconciler};
pub use summary::{progress_to_target, Milestone, ViewSummary};
