//! Partition lifecycle: emptying a `run_pk` before it is regenerated.
//!
//! Datasets are write-once per run. Nothing is ever updated in place; a run
//! targeting an existing key first wipes the key, then writes from scratch.

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  partition::PartitionKey,
  sink::{BatchedPartitionStore, TransactionalPartitionStore},
};

pub const DEFAULT_BATCH_SIZE: usize = 200;
pub const DEFAULT_MAX_ROUNDS: usize = 1_000_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResetOptions {
  /// Entities deleted per round by the batched strategy.
  pub batch_size: usize,
  /// Rounds the batched strategy may run before giving up.
  pub max_rounds: usize,
}

impl Default for ResetOptions {
  fn default() -> Self {
    Self { batch_size: DEFAULT_BATCH_SIZE, max_rounds: DEFAULT_MAX_ROUNDS }
  }
}

/// What a reset did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResetReport {
  /// Delete requests issued (batches, or 1 for a transactional reset).
  pub rounds:  usize,
  /// Entities (batched) or rows (transactional) removed.
  pub deleted: usize,
}

/// Count-then-delete loop for backends that delete in bounded batches.
///
/// Stops as soon as the partition is empty, so a key with no data costs one
/// count and zero deletes. Fails with [`Error::SafetyCapExceeded`] if the
/// partition is still non-empty after `options.max_rounds` deletes.
pub async fn reset_batched<S>(
  store: &S,
  run_pk: &PartitionKey,
  options: &ResetOptions,
) -> Result<ResetReport>
where
  S: BatchedPartitionStore,
{
  let batch_size = options.batch_size.max(1);
  let mut report = ResetReport::default();

  while report.rounds < options.max_rounds {
    let remaining = store
      .count_under_partition(run_pk)
      .await
      .map_err(Error::sink)?;
    if remaining == 0 {
      return Ok(report);
    }

    let deleted = store
      .delete_batch_under_partition(run_pk, batch_size)
      .await
      .map_err(Error::sink)?;
    report.rounds += 1;
    report.deleted += deleted;
    tracing::debug!(%run_pk, round = report.rounds, deleted, remaining, "deleted batch");
  }

  let remaining = store
    .count_under_partition(run_pk)
    .await
    .map_err(Error::sink)?;
  if remaining == 0 {
    return Ok(report);
  }

  Err(Error::SafetyCapExceeded { run_pk: run_pk.clone(), rounds: report.rounds })
}

/// Single-transaction delete for relational backends.
pub async fn reset_transactional<S>(store: &S, run_pk: &PartitionKey) -> Result<ResetReport>
where
  S: TransactionalPartitionStore,
{
  let deleted = store
    .delete_all_under_partition(run_pk)
    .await
    .map_err(Error::sink)?;
  tracing::debug!(%run_pk, deleted, "cleared partition");
  Ok(ResetReport { rounds: 1, deleted })
}
