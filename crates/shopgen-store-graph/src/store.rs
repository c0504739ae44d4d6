//! [`GraphStore`], the property-graph implementation of the shopgen sink
//! traits.

use std::{
  collections::{BTreeMap, BTreeSet, HashMap, HashSet},
  sync::Arc,
};

use shopgen_core::{
  lifecycle::{self, ResetOptions, ResetReport},
  model::{EntityBatch, RelationBatch},
  partition::PartitionKey,
  sink::{BatchedPartitionStore, DatasetSink},
};
use tokio::sync::RwLock;

use crate::{
  Error, GraphRecord, Result, Traversal,
  encode::{Properties, edge_properties, entity_vertices},
  traversal,
};

pub(crate) type VertexKey = (PartitionKey, String);
pub(crate) type EdgeId = u64;

#[derive(Debug, Clone)]
pub(crate) struct Vertex {
  pub label:      String,
  pub properties: Properties,
}

#[derive(Debug, Clone)]
pub(crate) struct StoredEdge {
  pub label:      String,
  /// Source vertex.
  pub out_v:      VertexKey,
  /// Target vertex.
  pub in_v:       VertexKey,
  pub properties: Properties,
}

/// Uniqueness key of an edge: `(pk, label, outV, inV)`.
type EdgeKey = (PartitionKey, String, String, String);

// ─── Graph state ─────────────────────────────────────────────────────────────

/// Adjacency-list graph. Edge ids only increase, so iterating an adjacency
/// list visits edges in insertion order.
#[derive(Debug, Default)]
pub(crate) struct Graph {
  vertices:   HashMap<VertexKey, Vertex>,
  edges:      BTreeMap<EdgeId, StoredEdge>,
  edge_keys:  HashSet<EdgeKey>,
  outgoing:   HashMap<VertexKey, Vec<EdgeId>>,
  incoming:   HashMap<VertexKey, Vec<EdgeId>>,
  /// Vertex ids per partition, ordered so batch deletes are deterministic.
  partitions: HashMap<PartitionKey, BTreeSet<String>>,
  next_edge:  EdgeId,
}

impl Graph {
  pub fn vertex(&self, key: &VertexKey) -> Option<&Vertex> { self.vertices.get(key) }

  pub fn edge(&self, id: EdgeId) -> Option<&StoredEdge> { self.edges.get(&id) }

  pub fn out_edges(&self, key: &VertexKey) -> &[EdgeId] {
    self.outgoing.get(key).map_or(&[], Vec::as_slice)
  }

  pub fn in_edges(&self, key: &VertexKey) -> &[EdgeId] {
    self.incoming.get(key).map_or(&[], Vec::as_slice)
  }

  /// Ids of every vertex under `run_pk`, in id order.
  pub fn partition_ids(&self, run_pk: &PartitionKey) -> impl Iterator<Item = &String> {
    self.partitions.get(run_pk).into_iter().flatten()
  }

  /// Returns false if the vertex already existed.
  fn add_vertex(&mut self, run_pk: &PartitionKey, label: &str, id: String, properties: Properties) -> bool {
    let key = (run_pk.clone(), id);
    if self.vertices.contains_key(&key) {
      return false;
    }
    self.partitions.entry(run_pk.clone()).or_default().insert(key.1.clone());
    self.vertices.insert(key, Vertex { label: label.to_owned(), properties });
    true
  }

  /// Returns false if an identical `(pk, label, outV, inV)` edge existed.
  fn add_edge(&mut self, run_pk: &PartitionKey, label: &str, out_v: String, in_v: String, properties: Properties) -> bool {
    let edge_key = (run_pk.clone(), label.to_owned(), out_v, in_v);
    if self.edge_keys.contains(&edge_key) {
      return false;
    }
    let (_, _, out_v, in_v) = edge_key.clone();
    self.edge_keys.insert(edge_key);

    let id = self.next_edge;
    self.next_edge += 1;
    let out_key = (run_pk.clone(), out_v);
    let in_key = (run_pk.clone(), in_v);
    self.outgoing.entry(out_key.clone()).or_default().push(id);
    self.incoming.entry(in_key.clone()).or_default().push(id);
    self.edges.insert(id, StoredEdge { label: label.to_owned(), out_v: out_key, in_v: in_key, properties });
    true
  }

  fn remove_edge(&mut self, id: EdgeId) {
    let Some(edge) = self.edges.remove(&id) else { return };
    if let Some(ids) = self.outgoing.get_mut(&edge.out_v) {
      ids.retain(|e| *e != id);
    }
    if let Some(ids) = self.incoming.get_mut(&edge.in_v) {
      ids.retain(|e| *e != id);
    }
    let (pk, out_v) = edge.out_v;
    self.edge_keys.remove(&(pk, edge.label, out_v, edge.in_v.1));
  }

  /// Drop a vertex and every edge touching it.
  fn drop_vertex(&mut self, key: &VertexKey) -> bool {
    if self.vertices.remove(key).is_none() {
      return false;
    }
    let incident: Vec<EdgeId> = self
      .outgoing
      .remove(key)
      .into_iter()
      .flatten()
      .chain(self.incoming.remove(key).into_iter().flatten())
      .collect();
    for id in incident {
      self.remove_edge(id);
    }
    if let Some(ids) = self.partitions.get_mut(&key.0) {
      ids.remove(&key.1);
      if ids.is_empty() {
        self.partitions.remove(&key.0);
      }
    }
    true
  }

  pub fn vertex_record(&self, key: &VertexKey) -> Option<GraphRecord> {
    self.vertices.get(key).map(|v| GraphRecord::Vertex {
      label:      v.label.clone(),
      id:         key.1.clone(),
      properties: v.properties.clone(),
    })
  }

  pub fn edge_record(&self, id: EdgeId) -> Option<GraphRecord> {
    self.edges.get(&id).map(|e| GraphRecord::Edge {
      label:      e.label.clone(),
      out_v:      e.out_v.1.clone(),
      in_v:       e.in_v.1.clone(),
      properties: e.properties.clone(),
    })
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A shopgen dataset store holding an in-process property graph.
///
/// Cloning is cheap and clones share the same graph.
#[derive(Debug, Clone, Default)]
pub struct GraphStore {
  graph: Arc<RwLock<Graph>>,
}

impl GraphStore {
  pub fn new() -> Self { Self::default() }

  /// Point read of one vertex.
  pub async fn get_vertex(&self, run_pk: &PartitionKey, id: &str) -> Option<GraphRecord> {
    let graph = self.graph.read().await;
    graph.vertex_record(&(run_pk.clone(), id.to_owned()))
  }

  /// Number of vertices with `label`, across every partition.
  pub async fn count_by_label(&self, label: &str) -> usize {
    let graph = self.graph.read().await;
    graph.vertices.values().filter(|v| v.label == label).count()
  }

  pub async fn vertex_count(&self) -> usize { self.graph.read().await.vertices.len() }

  pub async fn edge_count(&self) -> usize { self.graph.read().await.edges.len() }

  /// Drop one vertex and its incident edges. Returns false if it was absent.
  pub async fn drop_vertex(&self, run_pk: &PartitionKey, id: &str) -> bool {
    let mut graph = self.graph.write().await;
    graph.drop_vertex(&(run_pk.clone(), id.to_owned()))
  }

  /// Evaluate a traversal against the current graph.
  pub async fn submit(&self, traversal: &Traversal) -> Result<Vec<GraphRecord>> {
    let graph = self.graph.read().await;
    traversal::evaluate(&graph, traversal)
  }
}

// ─── DatasetSink impl ────────────────────────────────────────────────────────

impl DatasetSink for GraphStore {
  type Error = Error;

  async fn insert_entities(&self, run_pk: &PartitionKey, batch: EntityBatch) -> Result<usize> {
    let (kind, vertices) = entity_vertices(run_pk, batch);
    let total = vertices.len();

    let mut graph = self.graph.write().await;
    let mut written = 0;
    for (id, props) in vertices {
      if graph.add_vertex(run_pk, kind.label(), id, props) {
        written += 1;
      }
    }
    drop(graph);

    if written < total {
      tracing::warn!(label = kind.label(), skipped = total - written, "duplicate vertices skipped");
    }
    tracing::debug!(label = kind.label(), vertices = written, "vertices added");
    Ok(written)
  }

  async fn insert_relations(&self, run_pk: &PartitionKey, batch: RelationBatch) -> Result<usize> {
    let RelationBatch { kind, edges } = batch;
    let label = kind.label();
    let total = edges.len();

    let mut graph = self.graph.write().await;

    // Validate the whole batch first so a bad edge leaves the graph untouched.
    let mut prepared = Vec::with_capacity(total);
    for edge in edges {
      for endpoint in [&edge.src, &edge.dst] {
        if graph.vertex(&(run_pk.clone(), endpoint.clone())).is_none() {
          return Err(Error::MissingEndpoint { run_pk: run_pk.clone(), label, vertex: endpoint.clone() });
        }
      }
      let props = edge_properties(run_pk, kind, &edge)?;
      prepared.push((edge.src, edge.dst, props));
    }

    let mut written = 0;
    for (src, dst, props) in prepared {
      if graph.add_edge(run_pk, label, src, dst, props) {
        written += 1;
      }
    }
    drop(graph);

    if written < total {
      tracing::warn!(label, skipped = total - written, "duplicate edges skipped");
    }
    tracing::debug!(label, edges = written, "edges added");
    Ok(written)
  }

  async fn reset_partition(
    &self,
    run_pk: &PartitionKey,
    options: &ResetOptions,
  ) -> shopgen_core::Result<ResetReport> {
    lifecycle::reset_batched(self, run_pk, options).await
  }
}

// ─── BatchedPartitionStore impl ──────────────────────────────────────────────

impl BatchedPartitionStore for GraphStore {
  type Error = Error;

  async fn count_under_partition(&self, run_pk: &PartitionKey) -> Result<usize> {
    let graph = self.graph.read().await;
    Ok(graph.partition_ids(run_pk).count())
  }

  async fn delete_batch_under_partition(&self, run_pk: &PartitionKey, limit: usize) -> Result<usize> {
    let mut graph = self.graph.write().await;
    let doomed: Vec<VertexKey> = graph
      .partition_ids(run_pk)
      .take(limit)
      .map(|id| (run_pk.clone(), id.clone()))
      .collect();

    let mut deleted = 0;
    for key in &doomed {
      if graph.drop_vertex(key) {
        deleted += 1;
      }
    }
    Ok(deleted)
  }
}
