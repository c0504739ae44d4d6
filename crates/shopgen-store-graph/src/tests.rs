//! Integration tests for `GraphStore`.

use serde_json::json;
use shopgen_core::{
  Error as CoreError,
  build::{BuildOptions, build},
  lifecycle::{ResetOptions, reset_batched},
  model::{Brand, Category, Edge, EntityBatch, Product, RelationBatch, RelationKind, User},
  partition::PartitionKey,
  query::{BenchmarkQuery, RESULT_LIMIT, RecommendationQueries, run_benchmark},
  sink::{BatchedPartitionStore, DatasetSink},
};

use crate::{Error, GraphRecord, GraphStore, Order, Traversal};

fn pk(s: &str) -> PartitionKey { PartitionKey::new(s) }

/// Two users, three products in one category; u1 bought p1 and p2, u2
/// bought p1 and p3.
async fn fixture(store: &GraphStore, run_pk: &PartitionKey) {
  let batches = vec![
    EntityBatch::Categories(vec![Category { id: "c1".into(), name: "C1".into(), parent_id: None }]),
    EntityBatch::Brands(vec![Brand { id: "b1".into(), name: "B1".into() }]),
    EntityBatch::Users(vec![
      User { id: "u1".into(), name: "User 1".into() },
      User { id: "u2".into(), name: "User 2".into() },
    ]),
    EntityBatch::Products(
      ["p1", "p2", "p3"]
        .into_iter()
        .map(|id| Product {
          id:          id.into(),
          name:        format!("Product {id}"),
          price:       10.0,
          brand_id:    "b1".into(),
          category_id: "c1".into(),
          tag_ids:     vec![],
        })
        .collect(),
    ),
  ];
  for batch in batches {
    store.insert_entities(run_pk, batch).await.unwrap();
  }

  let relations = [
    (RelationKind::InCategory, vec![
      Edge::plain("p1", "c1"),
      Edge::plain("p2", "c1"),
      Edge::plain("p3", "c1"),
    ]),
    (RelationKind::Bought, vec![
      Edge::plain("u1", "p1"),
      Edge::plain("u1", "p2"),
      Edge::plain("u2", "p1"),
      Edge::plain("u2", "p3"),
    ]),
    (RelationKind::SimilarTo, vec![
      Edge::weighted("p1", "p2", 0.61),
      Edge::weighted("p1", "p3", 0.93),
    ]),
    (RelationKind::SimilarUser, vec![Edge::weighted("u1", "u2", 0.5)]),
  ];
  for (kind, edges) in relations {
    store.insert_relations(run_pk, RelationBatch { kind, edges }).await.unwrap();
  }
}

fn ids(records: &[GraphRecord]) -> Vec<&str> {
  records
    .iter()
    .filter_map(|r| match r {
      GraphRecord::Vertex { id, .. } => Some(id.as_str()),
      _ => None,
    })
    .collect()
}

// ─── Storage ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn vertices_carry_partition_and_product_properties() {
  let store = GraphStore::new();
  let run = pk("props");
  fixture(&store, &run).await;

  let Some(GraphRecord::Vertex { label, id, properties }) = store.get_vertex(&run, "p2").await else {
    panic!("p2 missing");
  };
  assert_eq!(label, "product");
  assert_eq!(id, "p2");
  assert_eq!(properties["pk"], "props");
  assert_eq!(properties["price"], json!(10.0));
  assert_eq!(properties["brandId"], "b1");
  assert_eq!(properties["categoryId"], "c1");

  assert!(store.get_vertex(&pk("elsewhere"), "p2").await.is_none());
  assert_eq!(store.count_by_label("product").await, 3);
  assert_eq!(store.count_by_label("user").await, 2);
}

#[tokio::test]
async fn duplicates_are_skipped() {
  let store = GraphStore::new();
  let run = pk("dupes");
  fixture(&store, &run).await;
  let (vertices, edges) = (store.vertex_count().await, store.edge_count().await);

  let again = store
    .insert_entities(&run, EntityBatch::Brands(vec![Brand { id: "b1".into(), name: "B1".into() }]))
    .await
    .unwrap();
  let batch = RelationBatch { kind: RelationKind::Bought, edges: vec![Edge::plain("u1", "p1")] };
  let again_edges = store.insert_relations(&run, batch).await.unwrap();

  assert_eq!((again, again_edges), (0, 0));
  assert_eq!(store.vertex_count().await, vertices);
  assert_eq!(store.edge_count().await, edges);
}

#[tokio::test]
async fn edge_endpoints_must_share_the_partition() {
  let store = GraphStore::new();
  fixture(&store, &pk("a")).await;
  store
    .insert_entities(&pk("b"), EntityBatch::Users(vec![User { id: "u9".into(), name: "U".into() }]))
    .await
    .unwrap();
  let before = store.edge_count().await;

  let batch = RelationBatch {
    kind:  RelationKind::Viewed,
    edges: vec![Edge::plain("u9", "p9"), Edge::plain("u9", "p1")],
  };
  let err = store.insert_relations(&pk("b"), batch).await.unwrap_err();
  assert!(matches!(err, Error::MissingEndpoint { ref vertex, .. } if vertex == "p9"));
  assert_eq!(store.edge_count().await, before);
}

#[tokio::test]
async fn scored_edge_without_weight_is_rejected() {
  let store = GraphStore::new();
  let run = pk("w");
  fixture(&store, &run).await;

  let batch = RelationBatch { kind: RelationKind::BoughtTogether, edges: vec![Edge::plain("p2", "p3")] };
  let err = store.insert_relations(&run, batch).await.unwrap_err();
  assert!(matches!(err, Error::MissingWeight { kind: RelationKind::BoughtTogether, .. }));
}

#[tokio::test]
async fn dropping_a_vertex_drops_its_edges() {
  let store = GraphStore::new();
  let run = pk("drop");
  fixture(&store, &run).await;

  assert!(store.drop_vertex(&run, "p1").await);
  assert!(!store.drop_vertex(&run, "p1").await);

  // p1 had IN_CATEGORY, two BOUGHT and two SIMILAR_TO edges.
  assert_eq!(store.edge_count().await, 3 + 4 + 2 + 1 - 5);
  let bought = store.submit(&Traversal::vertex(&run, "u2").out("BOUGHT")).await.unwrap();
  assert_eq!(ids(&bought), ["p3"]);
}

// ─── Traversals ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn out_edges_order_and_endpoints() {
  let store = GraphStore::new();
  let run = pk("t");
  fixture(&store, &run).await;

  let edges = store
    .submit(&Traversal::vertex(&run, "p1").out_e("SIMILAR_TO").order_by("score", Order::Desc))
    .await
    .unwrap();
  let targets: Vec<_> = edges
    .iter()
    .map(|r| match r {
      GraphRecord::Edge { out_v, in_v, properties, .. } => {
        assert_eq!(out_v, "p1");
        (in_v.as_str(), properties["score"].as_f64().unwrap())
      }
      other => panic!("expected edge, got {other:?}"),
    })
    .collect();
  assert_eq!(targets, [("p3", 0.93), ("p2", 0.61)]);

  let asc = store
    .submit(&Traversal::vertex(&run, "p1").out_e("SIMILAR_TO").order_by("score", Order::Asc).in_v())
    .await
    .unwrap();
  assert_eq!(ids(&asc), ["p2", "p3"]);

  let back = store
    .submit(&Traversal::vertex(&run, "p3").in_e("SIMILAR_TO").out_v())
    .await
    .unwrap();
  assert_eq!(ids(&back), ["p1"]);
}

#[tokio::test]
async fn start_sets_dedup_and_count() {
  let store = GraphStore::new();
  let run = pk("s");
  fixture(&store, &run).await;
  fixture(&store, &pk("other")).await;

  let users = store.submit(&Traversal::label(&run, "user")).await.unwrap();
  assert_eq!(ids(&users), ["u1", "u2"]);

  let all = store.submit(&Traversal::partition(&run).count()).await.unwrap();
  assert_eq!(all, [GraphRecord::Count { value: 7 }]);

  let raw = store.submit(&Traversal::vertex(&run, "p1").in_("BOUGHT").out("BOUGHT").count()).await.unwrap();
  let unique = store
    .submit(&Traversal::vertex(&run, "p1").in_("BOUGHT").out("BOUGHT").dedup().count())
    .await
    .unwrap();
  assert_eq!(raw, [GraphRecord::Count { value: 4 }]);
  assert_eq!(unique, [GraphRecord::Count { value: 3 }]);

  let none = store.submit(&Traversal::vertex(&run, "nope").out("BOUGHT")).await.unwrap();
  assert!(none.is_empty());
}

#[tokio::test]
async fn step_on_wrong_element_is_an_error() {
  let store = GraphStore::new();
  let run = pk("bad");
  fixture(&store, &run).await;

  let err = store.submit(&Traversal::vertex(&run, "p1").in_v()).await.unwrap_err();
  assert!(matches!(err, Error::InvalidStep { step: "inV", found: "vertex" }));
}

#[tokio::test]
async fn path_records_the_route_taken() {
  let store = GraphStore::new();
  let run = pk("path");
  fixture(&store, &run).await;

  let paths = store
    .submit(&Traversal::vertex(&run, "u1").out("BOUGHT").out("IN_CATEGORY").path())
    .await
    .unwrap();
  let routes: Vec<Vec<&str>> = paths
    .iter()
    .map(|r| match r {
      GraphRecord::Path { objects } => ids(objects),
      other => panic!("expected path, got {other:?}"),
    })
    .collect();
  assert_eq!(routes, [["u1", "p1", "c1"], ["u1", "p2", "c1"]]);

  let json = serde_json::to_value(&paths[0]).unwrap();
  assert_eq!(json["type"], "path");
  assert_eq!(json["objects"].as_array().unwrap().len(), 3);
  assert_eq!(json["objects"][2]["label"], "category");

  // Edges show up in the route too, and filters keep it intact.
  let via_edges = store
    .submit(
      &Traversal::vertex(&run, "p1")
        .out_e("SIMILAR_TO")
        .order_by("score", Order::Desc)
        .in_v()
        .limit(1)
        .path(),
    )
    .await
    .unwrap();
  let [GraphRecord::Path { objects }] = via_edges.as_slice() else {
    panic!("expected one path, got {via_edges:?}");
  };
  assert_eq!(objects.len(), 3);
  assert!(matches!(&objects[1], GraphRecord::Edge { in_v, .. } if in_v == "p3"));
  assert_eq!(ids(objects), ["p1", "p3"]);

  let err = store.submit(&Traversal::vertex(&run, "u1").path().out("BOUGHT")).await.unwrap_err();
  assert!(matches!(err, Error::InvalidStep { step: "out", found: "path" }));
}

// ─── Lifecycle ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn batched_reset_empties_only_the_target_partition() {
  let store = GraphStore::new();
  let opts = BuildOptions::default();
  let a = build(&store, 30, Some(pk("run_a")), &opts).await.unwrap();
  let b = build(&store, 30, Some(pk("run_b")), &opts).await.unwrap();
  let b_count = store.count_under_partition(&b.run_pk).await.unwrap();

  let reset = ResetOptions { batch_size: 8, ..Default::default() };
  let report = reset_batched(&store, &a.run_pk, &reset).await.unwrap();

  assert_eq!(report.deleted, 30 + 10 + 8 + 5 + 7);
  assert_eq!(report.rounds, report.deleted.div_ceil(8));
  assert_eq!(store.count_under_partition(&a.run_pk).await.unwrap(), 0);
  assert_eq!(store.count_under_partition(&b.run_pk).await.unwrap(), b_count);

  // run_b keeps its interaction edges.
  let left = store.submit(&Traversal::label(&b.run_pk, "user").out("VIEWED").count()).await.unwrap();
  assert_ne!(left, [GraphRecord::Count { value: 0 }]);
  let second = reset_batched(&store, &a.run_pk, &reset).await.unwrap();
  assert_eq!((second.rounds, second.deleted), (0, 0));
}

#[tokio::test]
async fn rebuild_leaves_identical_graph() {
  let store = GraphStore::new();
  let opts = BuildOptions::default();

  let first = build(&store, 50, None, &opts).await.unwrap();
  let (v1, e1) = (store.vertex_count().await, store.edge_count().await);
  let second = build(&store, 50, None, &opts).await.unwrap();

  assert_eq!(first.run_pk, second.run_pk);
  assert_eq!(second.rows_deleted, v1);
  assert_eq!(store.vertex_count().await, v1);
  assert_eq!(store.edge_count().await, e1);
  assert_eq!(first.rows_inserted, second.rows_inserted);
  assert_eq!(second.failed_operations, 0);
}

#[tokio::test]
async fn tiny_safety_cap_fails_reset() {
  let store = GraphStore::new();
  let summary = build(&store, 10, None, &BuildOptions::default()).await.unwrap();

  let opts = ResetOptions { batch_size: 1, max_rounds: 3 };
  let err = store.reset_partition(&summary.run_pk, &opts).await.unwrap_err();
  assert!(matches!(err, CoreError::SafetyCapExceeded { rounds: 3, .. }));
}

// ─── Queries ─────────────────────────────────────────────────────────────────

#[tokio::test]
async fn recommendation_queries_on_fixture() {
  let store = GraphStore::new();
  let run = pk("q");
  fixture(&store, &run).await;

  let same_cat = store.similar_by_category(&run, "p1").await.unwrap();
  let mut cat_ids: Vec<_> = same_cat.iter().map(|p| p.id.as_str()).collect();
  cat_ids.sort();
  assert_eq!(cat_ids, ["p2", "p3"]);

  let scored = store.similar_by_score(&run, "p1").await.unwrap();
  assert_eq!(scored.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), ["p3", "p2"]);
  assert_eq!(scored[0].category_id, "c1");
  assert_eq!(scored[0].name, "Product p3");

  let mut also: Vec<_> = store
    .customers_also_bought(&run, "p1")
    .await
    .unwrap()
    .into_iter()
    .map(|p| p.id)
    .collect();
  also.sort();
  assert_eq!(also, ["p2", "p3"]);

  let recs = store.recommend_for_user(&run, "u1").await.unwrap();
  assert_eq!(recs.iter().map(|p| p.id.as_str()).collect::<Vec<_>>(), ["p3"]);

  assert!(store.bought_together(&run, "p1").await.unwrap().is_empty());

  let similar = store.similar_users(&run, "u1").await.unwrap();
  assert_eq!(similar, [User { id: "u2".into(), name: "User 2".into() }]);
}

#[tokio::test]
async fn benchmark_runs_against_built_dataset() {
  let store = GraphStore::new();
  let summary = build(&store, 200, None, &BuildOptions::default()).await.unwrap();

  let timings = run_benchmark(&store, &summary.run_pk, "p1", "u1").await.unwrap();
  assert_eq!(timings.len(), BenchmarkQuery::ALL.len());
  assert!(timings.iter().all(|t| t.rows <= RESULT_LIMIT));

  let similar_users = timings.iter().find(|t| t.query == BenchmarkQuery::SimilarUsers).unwrap();
  assert_eq!(similar_users.rows, 2);
}
