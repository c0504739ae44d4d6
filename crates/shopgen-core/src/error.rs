//! Error types for `shopgen-core`.

use thiserror::Error;

use crate::partition::PartitionKey;

#[derive(Debug, Error)]
pub enum Error {
  /// The batched reset loop ran out of rounds before the partition emptied.
  #[error(
    "partition reset for run_pk={run_pk} did not converge after {rounds} rounds"
  )]
  SafetyCapExceeded { run_pk: PartitionKey, rounds: usize },

  #[error("sink error: {0}")]
  Sink(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  /// Box an arbitrary backend error into [`Error::Sink`].
  pub fn sink<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Sink(Box::new(err))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
