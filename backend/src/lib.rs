//! # Writer Analytics Backend
//!
//! Daily view reconciliation for the writer analytics dashboard.
//!
//! Cumulative view-count snapshots are collected into two historical tables
//! split by a cutoff date. This crate turns them into per-day "new views"
//! series for a writer, optionally split into short-form and long-form
//! content, and reports source outages and data irregularities alongside the
//! result instead of failing on them.
//!
//! ## Architecture
//!
//! - [`api`]: Data Transfer Objects shared with callers
//! - [`config`]: Reconciler settings from the environment or `analytics.toml`
//! - [`db`]: Collaborator traits, errors and the in-memory repository
//! - [`services`]: The reconciler, category and gap-fill policies, summaries
//!   and the caller-side cache
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use tokio_util::sync::CancellationToken;
//! use writer_analytics::api::{OwnerId, Snapshot, SourceTable};
//! use writer_analytics::config::ReconcilerConfig;
//! use writer_analytics::db::LocalRepository;
//! use writer_analytics::services::{ReconcileRequest, ViewDeltaReconciler};
//!
//! # tokio_test_block(async {
//! let day = |d| NaiveDate::from_ymd_opt(2025, 7, d).unwrap();
//! let repo = LocalRepository::new();
//! repo.insert_snapshots(SourceTable::Current, OwnerId::new(1), vec![
//!     Snapshot::new("vid", day(1), 100).published(day(1)),
//!     Snapshot::new("vid", day(2), 160),
//! ]);
//!
//! let reconciler = ViewDeltaReconciler::new(Arc::new(repo), ReconcilerConfig::default());
//! let request = ReconcileRequest::new(OwnerId::new(1), day(1), day(2)).unwrap();
//! let report = reconciler.reconcile(&request, &CancellationToken::new()).await.unwrap();
//! assert_eq!(report.total_views(), 160);
//! # });
//! # fn tokio_test_block<F: std::future::Future>(f: F) -> F::Output {
//! #     tokio::runtime::Runtime::new().unwrap().block_on(f)
//! # }
//! ```

// Allow large error types - RepositoryError contains rich context for debugging
#![allow(clippy::result_large_err)]

pub mod api;
pub mod config;
pub mod db;
pub mod services;
