//! Error type for `shopgen-store-graph`.

use shopgen_core::{model::RelationKind, partition::PartitionKey};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  /// An edge referenced a vertex that does not exist in its partition.
  #[error("{label} edge in partition {run_pk}: vertex {vertex:?} not found")]
  MissingEndpoint {
    run_pk: PartitionKey,
    label:  &'static str,
    vertex: String,
  },

  /// A scored relation arrived without its score.
  #[error("{} edge {src} -> {dst} has no weight", .kind.label())]
  MissingWeight {
    kind: RelationKind,
    src:  String,
    dst:  String,
  },

  /// A traversal step was applied to the wrong kind of element, e.g. `inV`
  /// on a vertex.
  #[error("step {step} cannot follow a {found} element")]
  InvalidStep {
    step:  &'static str,
    found: &'static str,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
