//! In-process property-graph backend for shopgen datasets.
//!
//! Vertices are keyed by `(run_pk, id)` and carry a label plus JSON
//! properties; edges are labelled and may carry a numeric property. Reads go
//! through [`Traversal`], a small step language whose results come back as
//! [`GraphRecord`]s. Partitions are emptied in bounded batches, the way a
//! remote graph service would require.

mod encode;
mod queries;
mod store;

pub mod error;
pub mod traversal;

pub use error::{Error, Result};
pub use store::GraphStore;
pub use traversal::{GraphRecord, Order, Step, Traversal};

#[cfg(test)]
mod tests;
