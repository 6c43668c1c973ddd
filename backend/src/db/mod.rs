//! Data access for the reconciler's collaborators.
//!
//! The reconciler talks to three external lookups through the Repository
//! pattern, so a warehouse-backed implementation and the in-memory one used
//! in tests can be swapped freely.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Caller (request handler, cache wrapper)                │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Service Layer (services::reconcile)                    │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//! ┌───────────────────▼─────────────────────────────────────┐
//! │  Repository Traits (repository/) - Abstract Interface   │
//! │  ContentRegistry · SnapshotRepository ·                 │
//! │  DurationRepository                                     │
//! └───────────────────┬─────────────────────────────────────┘
//!                     │
//!     ┌───────────────▼──────────────────────────────┐
//!     │             Local Repository                  │
//!     │               (in-memory)                     │
//!     └──────────────────────────────────────────────┘
//! ```
//!
//! Clients are constructed explicitly and injected; nothing here is global.

#[cfg(not(feature = "local-repo"))]
compile_error!("Enable at least one repository backend feature.");

pub mod repositories;
pub mod repository;

pub use repositories::LocalRepository;
pub use repository::{
    ContentRegistry, DurationRepository, ErrorContext, FullRepository, RepositoryError,
    RepositoryResult, SnapshotRepository,
};
