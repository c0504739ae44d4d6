//! Error type for `shopgen-store-sqlite`.

use shopgen_core::model::RelationKind;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  /// A scored relation arrived without its score.
  #[error("{} edge {src} -> {dst} has no weight", .kind.label())]
  MissingWeight {
    kind: RelationKind,
    src:  String,
    dst:  String,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
