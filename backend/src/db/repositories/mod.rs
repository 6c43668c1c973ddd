//! Repository implementations module.
//!
//! - `local`: In-memory implementation for unit testing and local development
//!
//! Warehouse-backed implementations live with the services that own the
//! warehouse clients and only need to implement the traits in
//! [`crate::db::repository`].

pub mod local;

pub use local::LocalRepository;
