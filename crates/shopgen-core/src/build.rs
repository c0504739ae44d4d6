//! Build orchestration: reset, generate, persist.
//!
//! [`build`] is the single entry point a caller needs. It resets the target
//! partition, generates the dataset in memory, then hands entities and
//! relations to the sink in dependency order.

use std::{collections::BTreeMap, time::Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  generate::{Dataset, GeneratorConfig, generate},
  lifecycle::ResetOptions,
  model::RelationKind,
  partition::{PartitionKey, normalize_product_count},
  sink::DatasetSink,
};

/// What to do when a single sink insert fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
  /// Log the failed operation and keep going.
  #[default]
  Continue,
  /// Abort the build on the first failed operation.
  FailFast,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildOptions {
  pub generator:    GeneratorConfig,
  pub reset:        ResetOptions,
  pub error_policy: ErrorPolicy,
}

/// Wall-clock duration of each phase, in seconds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PhaseTimings {
  pub reset_secs:    f64,
  pub generate_secs: f64,
  pub insert_secs:   f64,
  pub total_secs:    f64,
}

/// Result of one [`build`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildSummary {
  pub run_pk:                   PartitionKey,
  pub product_count:            usize,
  pub user_count:               usize,
  pub category_count:           usize,
  pub brand_count:              usize,
  pub tag_count:                usize,
  /// `users × interactions_per_user`: the number of views, before
  /// probabilistic purchases and likes.
  pub approx_interaction_count: usize,
  pub interactions_per_user:    usize,
  pub relation_counts:          BTreeMap<RelationKind, usize>,
  pub rows_inserted:            usize,
  /// Sink operations that failed and were skipped under
  /// [`ErrorPolicy::Continue`].
  pub failed_operations:        usize,
  pub reset_rounds:             usize,
  pub rows_deleted:             usize,
  pub started_at:               DateTime<Utc>,
  pub timings:                  PhaseTimings,
}

impl BuildSummary {
  /// Compact JSON rendering, as printed by the CLI.
  pub fn to_json(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }
}

/// Reset `run_pk` (derived from the count when `None`), generate the dataset
/// and persist it into `sink`.
///
/// Only a failed reset, or a failed insert under [`ErrorPolicy::FailFast`],
/// aborts the build.
pub async fn build<S>(
  sink: &S,
  total_products: usize,
  run_pk: Option<PartitionKey>,
  options: &BuildOptions,
) -> Result<BuildSummary>
where
  S: DatasetSink,
{
  let started_at = Utc::now();
  let t_total = Instant::now();

  let product_count = normalize_product_count(total_products);
  let run_pk = run_pk.unwrap_or_else(|| PartitionKey::for_product_count(product_count));

  tracing::info!(%run_pk, "resetting partition");
  let t0 = Instant::now();
  let reset = sink.reset_partition(&run_pk, &options.reset).await?;
  let reset_secs = t0.elapsed().as_secs_f64();
  tracing::info!(%run_pk, rounds = reset.rounds, deleted = reset.deleted, "partition cleared");

  let t0 = Instant::now();
  let dataset = generate(product_count, Some(run_pk.clone()), &options.generator);
  let generate_secs = t0.elapsed().as_secs_f64();

  let m = &dataset.master;
  let mut summary = BuildSummary {
    run_pk: run_pk.clone(),
    product_count: m.products.len(),
    user_count: m.users.len(),
    category_count: m.categories.len(),
    brand_count: m.brands.len(),
    tag_count: m.tags.len(),
    approx_interaction_count: m.users.len() * dataset.interactions_per_user,
    interactions_per_user: dataset.interactions_per_user,
    relation_counts: dataset.relations.counts(),
    rows_inserted: 0,
    failed_operations: 0,
    reset_rounds: reset.rounds,
    rows_deleted: reset.deleted,
    started_at,
    timings: PhaseTimings::default(),
  };
  tracing::info!(
    %run_pk,
    users = summary.user_count,
    interactions_per_user = summary.interactions_per_user,
    "dataset generated"
  );

  let t0 = Instant::now();
  let tally = persist(sink, dataset, options.error_policy).await?;
  let insert_secs = t0.elapsed().as_secs_f64();

  summary.rows_inserted = tally.inserted;
  summary.failed_operations = tally.failed;
  summary.timings = PhaseTimings {
    reset_secs,
    generate_secs,
    insert_secs,
    total_secs: t_total.elapsed().as_secs_f64(),
  };

  if tally.failed > 0 {
    tracing::warn!(%run_pk, failed = tally.failed, "build finished with failed operations");
  } else {
    tracing::info!(%run_pk, rows = tally.inserted, "build finished");
  }
  Ok(summary)
}

#[derive(Debug, Default)]
struct Tally {
  inserted: usize,
  failed:   usize,
}

impl Tally {
  fn record<E>(
    &mut self,
    outcome: std::result::Result<usize, E>,
    policy: ErrorPolicy,
    run_pk: &PartitionKey,
    what: &str,
    rows: usize,
  ) -> Result<()>
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    match outcome {
      Ok(n) => {
        self.inserted += n;
        Ok(())
      }
      Err(e) if policy == ErrorPolicy::FailFast => Err(Error::sink(e)),
      Err(e) => {
        tracing::warn!(%run_pk, what, rows, error = %e, "insert failed; skipping");
        self.failed += 1;
        Ok(())
      }
    }
  }
}

async fn persist<S>(sink: &S, dataset: Dataset, policy: ErrorPolicy) -> Result<Tally>
where
  S: DatasetSink,
{
  let Dataset { run_pk, master, relations, .. } = dataset;
  let mut tally = Tally::default();

  for batch in master.into_batches() {
    let (label, rows) = (batch.kind().label(), batch.len());
    let outcome = sink.insert_entities(&run_pk, batch).await;
    tally.record(outcome, policy, &run_pk, label, rows)?;
  }

  for batch in relations.into_batches() {
    let (label, rows) = (batch.kind.label(), batch.edges.len());
    let outcome = sink.insert_relations(&run_pk, batch).await;
    tally.record(outcome, policy, &run_pk, label, rows)?;
  }

  Ok(tally)
}
