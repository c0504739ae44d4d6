//! Build and lifecycle tests against an in-memory sink.

use std::{
  collections::{BTreeSet, HashMap},
  sync::Mutex,
};

use crate::{
  Error,
  build::{BuildOptions, ErrorPolicy, build},
  generate::{GeneratorConfig, InteractionRule},
  lifecycle::{ResetOptions, ResetReport, reset_batched},
  model::{EntityBatch, EntityKind, RelationBatch, RelationKind},
  partition::PartitionKey,
  sink::{BatchedPartitionStore, DatasetSink},
};

#[derive(Debug, thiserror::Error)]
#[error("injected failure: {0}")]
struct Injected(&'static str);

type EntityKey = (EntityKind, String);
type EdgeKey = (RelationKind, String, String);

#[derive(Default)]
struct Partition {
  entities:  BTreeSet<EntityKey>,
  relations: BTreeSet<EdgeKey>,
}

/// Graph-like sink: deletes in bounded batches, deleting an entity drops its
/// incident relations.
#[derive(Default)]
struct MemorySink {
  partitions:    Mutex<HashMap<PartitionKey, Partition>>,
  delete_calls:  Mutex<usize>,
  /// Relation kinds whose inserts always fail.
  failing:       Vec<RelationKind>,
  /// Deletes report success but remove nothing.
  never_deletes: bool,
}

impl MemorySink {
  fn failing(kinds: &[RelationKind]) -> Self {
    Self { failing: kinds.to_vec(), ..Default::default() }
  }

  fn stuck() -> Self { Self { never_deletes: true, ..Default::default() } }

  fn entity_count(&self, run_pk: &PartitionKey) -> usize {
    let parts = self.partitions.lock().unwrap();
    parts.get(run_pk).map_or(0, |p| p.entities.len())
  }

  fn relation_count(&self, run_pk: &PartitionKey, kind: RelationKind) -> usize {
    let parts = self.partitions.lock().unwrap();
    parts
      .get(run_pk)
      .map_or(0, |p| p.relations.iter().filter(|(k, ..)| *k == kind).count())
  }

  fn delete_calls(&self) -> usize { *self.delete_calls.lock().unwrap() }
}

fn entity_keys(batch: EntityBatch) -> Vec<EntityKey> {
  let kind = batch.kind();
  let ids: Vec<String> = match batch {
    EntityBatch::Categories(rows) => rows.into_iter().map(|r| r.id).collect(),
    EntityBatch::Brands(rows) => rows.into_iter().map(|r| r.id).collect(),
    EntityBatch::Tags(rows) => rows.into_iter().map(|r| r.id).collect(),
    EntityBatch::Users(rows) => rows.into_iter().map(|r| r.id).collect(),
    EntityBatch::Products(rows) => rows.into_iter().map(|r| r.id).collect(),
  };
  ids.into_iter().map(|id| (kind, id)).collect()
}

impl DatasetSink for MemorySink {
  type Error = Injected;

  async fn insert_entities(
    &self,
    run_pk: &PartitionKey,
    batch: EntityBatch,
  ) -> Result<usize, Injected> {
    let mut parts = self.partitions.lock().unwrap();
    let part = parts.entry(run_pk.clone()).or_default();
    Ok(entity_keys(batch).into_iter().filter(|k| part.entities.insert(k.clone())).count())
  }

  async fn insert_relations(
    &self,
    run_pk: &PartitionKey,
    batch: RelationBatch,
  ) -> Result<usize, Injected> {
    if self.failing.contains(&batch.kind) {
      return Err(Injected(batch.kind.label()));
    }
    let mut parts = self.partitions.lock().unwrap();
    let part = parts.entry(run_pk.clone()).or_default();
    Ok(
      batch
        .edges
        .into_iter()
        .filter(|e| part.relations.insert((batch.kind, e.src.clone(), e.dst.clone())))
        .count(),
    )
  }

  async fn reset_partition(
    &self,
    run_pk: &PartitionKey,
    options: &ResetOptions,
  ) -> crate::Result<ResetReport> {
    reset_batched(self, run_pk, options).await
  }
}

impl BatchedPartitionStore for MemorySink {
  type Error = Injected;

  async fn count_under_partition(&self, run_pk: &PartitionKey) -> Result<usize, Injected> {
    Ok(self.entity_count(run_pk))
  }

  async fn delete_batch_under_partition(
    &self,
    run_pk: &PartitionKey,
    limit: usize,
  ) -> Result<usize, Injected> {
    *self.delete_calls.lock().unwrap() += 1;
    if self.never_deletes {
      return Ok(0);
    }

    let mut parts = self.partitions.lock().unwrap();
    let Some(part) = parts.get_mut(run_pk) else { return Ok(0) };

    let doomed: Vec<EntityKey> = part.entities.iter().take(limit).cloned().collect();
    for key in &doomed {
      part.entities.remove(key);
      part.relations.retain(|(_, src, dst)| *src != key.1 && *dst != key.1);
    }
    Ok(doomed.len())
  }
}

fn options() -> BuildOptions { BuildOptions::default() }

#[test]
fn entity_kinds_sort_in_insertion_order() {
  let mut shuffled = EntityKind::ALL;
  shuffled.reverse();
  shuffled.sort();
  assert_eq!(shuffled, EntityKind::ALL);
}

// ─── Build ───────────────────────────────────────────────────────────────────

#[tokio::test]
async fn build_ten_products_summary() {
  let sink = MemorySink::default();
  let summary = build(&sink, 10, None, &options()).await.unwrap();

  assert_eq!(summary.run_pk.as_str(), "bench_N10");
  assert_eq!(summary.product_count, 10);
  assert_eq!(summary.user_count, 10);
  assert_eq!(summary.category_count, 8);
  assert_eq!(summary.brand_count, 5);
  assert_eq!(summary.tag_count, 7);
  assert_eq!(summary.interactions_per_user, 5);
  assert_eq!(summary.approx_interaction_count, 50);
  assert_eq!(summary.failed_operations, 0);
  assert_eq!(summary.relation_counts[&RelationKind::Viewed], 50);
  assert_eq!(sink.entity_count(&summary.run_pk), 10 + 10 + 8 + 5 + 7);
}

#[tokio::test]
async fn summary_renders_as_json() {
  let sink = MemorySink::default();
  let summary = build(&sink, 10, None, &options()).await.unwrap();

  let json: serde_json::Value = serde_json::from_str(&summary.to_json().unwrap()).unwrap();
  assert_eq!(json["run_pk"], "bench_N10");
  assert_eq!(json["relation_counts"]["VIEWED"], 50);
  assert!(json["timings"]["total_secs"].as_f64().unwrap() >= 0.0);
}

#[tokio::test]
async fn build_normalizes_small_requests() {
  let sink = MemorySink::default();
  let summary = build(&sink, 1, None, &options()).await.unwrap();
  assert_eq!(summary.product_count, 10);
  assert_eq!(summary.run_pk, PartitionKey::for_product_count(10));
}

#[tokio::test]
async fn scaled_rule_reaches_the_summary() {
  let sink = MemorySink::default();
  let mut opts = options();
  opts.generator = GeneratorConfig { interaction_rule: InteractionRule::Scaled, ..Default::default() };

  let summary = build(&sink, 500, None, &opts).await.unwrap();
  assert_eq!(summary.user_count, 100);
  assert_eq!(summary.interactions_per_user, 8);
  assert_eq!(summary.approx_interaction_count, 800);
}

#[tokio::test]
async fn rebuild_same_key_does_not_accumulate() {
  let sink = MemorySink::default();
  let first = build(&sink, 60, None, &options()).await.unwrap();
  let entities_after_first = sink.entity_count(&first.run_pk);
  let viewed_after_first = sink.relation_count(&first.run_pk, RelationKind::Viewed);

  let second = build(&sink, 60, None, &options()).await.unwrap();
  assert_eq!(first.run_pk, second.run_pk);
  assert_eq!(first.relation_counts, second.relation_counts);
  assert_eq!(first.rows_inserted, second.rows_inserted);
  assert_eq!(sink.entity_count(&second.run_pk), entities_after_first);
  assert_eq!(sink.relation_count(&second.run_pk, RelationKind::Viewed), viewed_after_first);
  assert!(second.rows_deleted > 0);
}

#[tokio::test]
async fn continue_policy_skips_failed_operation() {
  let sink = MemorySink::failing(&[RelationKind::SimilarTo]);
  let summary = build(&sink, 40, None, &options()).await.unwrap();

  assert_eq!(summary.failed_operations, 1);
  assert_eq!(sink.relation_count(&summary.run_pk, RelationKind::SimilarTo), 0);
  assert_eq!(
    sink.relation_count(&summary.run_pk, RelationKind::BoughtTogether),
    summary.relation_counts[&RelationKind::BoughtTogether]
  );
}

#[tokio::test]
async fn fail_fast_policy_aborts() {
  let sink = MemorySink::failing(&[RelationKind::Viewed]);
  let mut opts = options();
  opts.error_policy = ErrorPolicy::FailFast;

  let err = build(&sink, 40, None, &opts).await.unwrap_err();
  assert!(matches!(err, Error::Sink(_)));
  assert_eq!(sink.relation_count(&PartitionKey::for_product_count(40), RelationKind::Bought), 0);
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn reset_empty_partition_is_a_noop() {
  let sink = MemorySink::default();
  let run_pk = PartitionKey::new("nothing_here");

  let report = reset_batched(&sink, &run_pk, &ResetOptions::default()).await.unwrap();
  assert_eq!(report, ResetReport { rounds: 0, deleted: 0 });
  assert_eq!(sink.delete_calls(), 0);
}

#[tokio::test]
async fn reset_twice_leaves_zero_entities() {
  let sink = MemorySink::default();
  let summary = build(&sink, 30, None, &options()).await.unwrap();
  let opts = ResetOptions { batch_size: 7, ..Default::default() };

  let first = reset_batched(&sink, &summary.run_pk, &opts).await.unwrap();
  assert_eq!(sink.entity_count(&summary.run_pk), 0);
  assert_eq!(sink.relation_count(&summary.run_pk, RelationKind::Viewed), 0);
  assert_eq!(first.deleted, 30 + 10 + 8 + 5 + 7);
  assert_eq!(first.rounds, first.deleted.div_ceil(7));

  let second = reset_batched(&sink, &summary.run_pk, &opts).await.unwrap();
  assert_eq!(second.rounds, 0);
  assert_eq!(sink.entity_count(&summary.run_pk), 0);
}

#[tokio::test]
async fn reset_leaves_other_partitions_alone() {
  let sink = MemorySink::default();
  let a = build(&sink, 10, Some("run_a".into()), &options()).await.unwrap();
  let b = build(&sink, 10, Some("run_b".into()), &options()).await.unwrap();
  let before = sink.entity_count(&b.run_pk);

  reset_batched(&sink, &a.run_pk, &ResetOptions::default()).await.unwrap();
  assert_eq!(sink.entity_count(&a.run_pk), 0);
  assert_eq!(sink.entity_count(&b.run_pk), before);
}

#[tokio::test]
async fn non_converging_backend_hits_safety_cap() {
  let sink = MemorySink::stuck();
  let run_pk = PartitionKey::new("stuck_run");
  sink
    .insert_entities(&run_pk, EntityBatch::Tags(vec![crate::model::Tag {
      id:   "t".into(),
      name: "t".into(),
    }]))
    .await
    .unwrap();

  let opts = ResetOptions { batch_size: 10, max_rounds: 5 };
  let err = reset_batched(&sink, &run_pk, &opts).await.unwrap_err();

  match err {
    Error::SafetyCapExceeded { run_pk: key, rounds } => {
      assert_eq!(key, run_pk);
      assert_eq!(rounds, 5);
    }
    other => panic!("unexpected error: {other}"),
  }
  assert_eq!(sink.delete_calls(), 5);
  assert!(err_message_names_key(&run_pk));
}

fn err_message_names_key(run_pk: &PartitionKey) -> bool {
  Error::SafetyCapExceeded { run_pk: run_pk.clone(), rounds: 1 }
    .to_string()
    .contains(run_pk.as_str())
}

#[tokio::test]
async fn safety_cap_fails_the_build() {
  let sink = MemorySink::stuck();
  let run_pk = PartitionKey::for_product_count(10);
  sink
    .insert_entities(&run_pk, EntityBatch::Users(vec![crate::model::User {
      id:   "u1".into(),
      name: "User 1".into(),
    }]))
    .await
    .unwrap();

  let mut opts = options();
  opts.reset.max_rounds = 3;
  let err = build(&sink, 10, None, &opts).await.unwrap_err();
  assert!(matches!(err, Error::SafetyCapExceeded { rounds: 3, .. }));
}
