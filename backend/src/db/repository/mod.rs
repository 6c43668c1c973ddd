//! Repository trait definitions for the reconciler's data collaborators.
//!
//! # Module Organization
//!
//! - [`error`]: Error types for repository operations
//! - [`registry`]: Owner to item resolution per source table
//! - [`snapshots`]: Cumulative view snapshots per source table
//! - [`durations`]: Item durations for short-form / long-form splits
//!
//! # Convenience Trait Bound
//!
//! A backend that serves all three concerns gets [`FullRepository`] for free:
//!
//! ```ignore
//! async fn item_count<R: FullRepository>(repo: &R, owner: OwnerId, range: DateRange) -> usize {
//!     repo.resolve_item_ids(owner, SourceTable::Current, range)
//!         .await
//!         .map(|ids| ids.len())
//!         .unwrap_or(0)
//! }
//! ```

pub mod durations;
pub mod error;
pub mod registry;
pub mod snapshots;

pub use error::{ErrorContext, RepositoryError, RepositoryResult};

pub use durations::DurationRepository;
pub use registry::ContentRegistry;
pub use snapshots::SnapshotRepository;

/// Composite trait bound for a backend implementing every collaborator.
pub trait FullRepository: ContentRegistry + SnapshotRepository + DurationRepository {}

// Blanket implementation: any type implementing all three traits is a FullRepository
impl<T> FullRepository for T where T: ContentRegistry + SnapshotRepository + DurationRepository {}
