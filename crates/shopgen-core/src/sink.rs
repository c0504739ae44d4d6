//! Backend sink traits.
//!
//! The traits are implemented by storage backends (`shopgen-store-sqlite`,
//! `shopgen-store-graph`). The generator and lifecycle code depend only on
//! these abstractions; every operation takes the sink as an explicit
//! argument.

use std::future::Future;

use crate::{
  lifecycle::{ResetOptions, ResetReport},
  model::{EntityBatch, RelationBatch},
  partition::PartitionKey,
};

// ─── Persistence ─────────────────────────────────────────────────────────────

/// Accepts a generated dataset, one homogeneous batch at a time.
///
/// Inserts must tolerate duplicate keys: a duplicate row is skipped, not an
/// error, since re-running the same seed regenerates identical rows. How a
/// backend groups rows into round trips is its own business.
pub trait DatasetSink: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Persist a batch of entities under `run_pk`. Returns the number of rows
  /// actually written (skipped duplicates are not counted).
  fn insert_entities<'a>(
    &'a self,
    run_pk: &'a PartitionKey,
    batch: EntityBatch,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Persist a batch of edges under `run_pk`. Both endpoints of every edge
  /// must already exist in the same partition.
  fn insert_relations<'a>(
    &'a self,
    run_pk: &'a PartitionKey,
    batch: RelationBatch,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Remove everything stored under `run_pk`, using whichever strategy from
  /// [`crate::lifecycle`] suits the backend. Calling this on an empty
  /// partition is a no-op.
  fn reset_partition<'a>(
    &'a self,
    run_pk: &'a PartitionKey,
    options: &'a ResetOptions,
  ) -> impl Future<Output = crate::Result<ResetReport>> + Send + 'a;
}

// ─── Partition deletion primitives ───────────────────────────────────────────

/// Backends that can only delete a bounded number of entities per request
/// (graph stores). Deleting an entity also removes its incident relations.
pub trait BatchedPartitionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Number of entities remaining under `run_pk`.
  fn count_under_partition<'a>(
    &'a self,
    run_pk: &'a PartitionKey,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Delete at most `limit` entities under `run_pk`; returns how many went.
  fn delete_batch_under_partition<'a>(
    &'a self,
    run_pk: &'a PartitionKey,
    limit: usize,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;
}

/// Backends that can clear a partition atomically (relational stores).
pub trait TransactionalPartitionStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Delete every row under `run_pk` in one transaction, dependent tables
  /// first. Returns the number of rows removed.
  fn delete_all_under_partition<'a>(
    &'a self,
    run_pk: &'a PartitionKey,
  ) -> impl Future<Output = Result<usize, Self::Error>> + Send + 'a;

  /// Clear every table regardless of partition. Only for full environment
  /// resets; never call this between benchmark runs.
  fn truncate_all(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
