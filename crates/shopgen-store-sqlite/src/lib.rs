//! SQLite backend for shopgen datasets.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated thread
//! without blocking the async runtime. Every table is keyed by `run_pk`, so
//! many generation runs can share one database file.

mod encode;
mod queries;
mod schema;
mod store;

pub mod error;

pub use error::{Error, Result};
pub use schema::TABLES;
pub use store::SqliteStore;
