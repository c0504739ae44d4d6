//! Core types and the deterministic dataset generator for shopgen.
//!
//! This crate is deliberately free of database dependencies. Backends
//! (`shopgen-store-sqlite`, `shopgen-store-graph`) implement the sink traits
//! defined in [`sink`]; the generator and lifecycle logic only ever talk to
//! those traits.

// Trait methods return `impl Future + Send`; implementors may still write
// plain `async fn`.
#![allow(async_fn_in_trait)]

pub mod build;
pub mod catalog;
pub mod error;
pub mod generate;
pub mod lifecycle;
pub mod model;
pub mod partition;
pub mod query;
pub mod sink;

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
