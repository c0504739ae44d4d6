//! A small traversal language over the property graph.
//!
//! A [`Traversal`] names a start set and a list of [`Step`]s. Each step maps
//! the current list of elements (vertices, edges, paths or a single count)
//! to the next; the final list is returned as [`GraphRecord`]s. Every
//! element remembers the route it took, which [`Step::Path`] emits. Ordering
//! is stable, so ties keep edge insertion order.
//!
//! ```ignore
//! let top = Traversal::vertex(&run_pk, "p1")
//!   .out_e("SIMILAR_TO")
//!   .order_by("score", Order::Desc)
//!   .in_v()
//!   .limit(20);
//! let records = store.submit(&top).await?;
//! ```

use std::{
  cmp::Ordering,
  collections::{BTreeSet, HashSet},
};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shopgen_core::partition::PartitionKey;

use crate::{
  Error, Result,
  store::{EdgeId, Graph, VertexKey},
};

// ─── Records ─────────────────────────────────────────────────────────────────

/// One element of a traversal result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum GraphRecord {
  Vertex {
    label:      String,
    id:         String,
    properties: Map<String, Value>,
  },
  Edge {
    label:      String,
    #[serde(rename = "outV")]
    out_v:      String,
    #[serde(rename = "inV")]
    in_v:       String,
    properties: Map<String, Value>,
  },
  Count {
    value: usize,
  },
  /// The elements a result passed through, from the start vertex on.
  Path {
    objects: Vec<GraphRecord>,
  },
}

impl GraphRecord {
  pub fn properties(&self) -> Option<&Map<String, Value>> {
    match self {
      GraphRecord::Vertex { properties, .. } | GraphRecord::Edge { properties, .. } => {
        Some(properties)
      }
      GraphRecord::Count { .. } | GraphRecord::Path { .. } => None,
    }
  }
}

// ─── Traversal ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Order {
  Asc,
  #[default]
  Desc,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Start {
  /// A single vertex.
  Vertex { run_pk: PartitionKey, id: String },
  /// Every vertex with `label` in the partition.
  Label { run_pk: PartitionKey, label: String },
  /// Every vertex in the partition.
  Partition { run_pk: PartitionKey },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
  /// Vertex → targets of its outgoing edges with this label.
  Out(String),
  /// Vertex → sources of its incoming edges with this label.
  In(String),
  /// Vertex → its outgoing edges with this label.
  OutE(String),
  /// Vertex → its incoming edges with this label.
  InE(String),
  /// Edge → its target vertex.
  InV,
  /// Edge → its source vertex.
  OutV,
  /// Sort by a property; elements lacking it go last.
  OrderBy { property: String, order: Order },
  /// Drop vertices with any of these ids.
  Exclude(BTreeSet<String>),
  Dedup,
  Limit(usize),
  Count,
  /// Element → the route it took.
  Path,
}

impl Step {
  fn name(&self) -> &'static str {
    match self {
      Step::Out(_) => "out",
      Step::In(_) => "in",
      Step::OutE(_) => "outE",
      Step::InE(_) => "inE",
      Step::InV => "inV",
      Step::OutV => "outV",
      Step::OrderBy { .. } => "order",
      Step::Exclude(_) => "exclude",
      Step::Dedup => "dedup",
      Step::Limit(_) => "limit",
      Step::Count => "count",
      Step::Path => "path",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Traversal {
  pub start: Start,
  pub steps: Vec<Step>,
}

impl Traversal {
  pub fn vertex(run_pk: &PartitionKey, id: impl Into<String>) -> Self {
    Self::from_start(Start::Vertex { run_pk: run_pk.clone(), id: id.into() })
  }

  pub fn label(run_pk: &PartitionKey, label: impl Into<String>) -> Self {
    Self::from_start(Start::Label { run_pk: run_pk.clone(), label: label.into() })
  }

  pub fn partition(run_pk: &PartitionKey) -> Self {
    Self::from_start(Start::Partition { run_pk: run_pk.clone() })
  }

  fn from_start(start: Start) -> Self { Self { start, steps: Vec::new() } }

  fn step(mut self, step: Step) -> Self {
    self.steps.push(step);
    self
  }

  pub fn out(self, label: impl Into<String>) -> Self { self.step(Step::Out(label.into())) }

  pub fn in_(self, label: impl Into<String>) -> Self { self.step(Step::In(label.into())) }

  pub fn out_e(self, label: impl Into<String>) -> Self { self.step(Step::OutE(label.into())) }

  pub fn in_e(self, label: impl Into<String>) -> Self { self.step(Step::InE(label.into())) }

  pub fn in_v(self) -> Self { self.step(Step::InV) }

  pub fn out_v(self) -> Self { self.step(Step::OutV) }

  pub fn order_by(self, property: impl Into<String>, order: Order) -> Self {
    self.step(Step::OrderBy { property: property.into(), order })
  }

  pub fn exclude<I, S>(self, ids: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.step(Step::Exclude(ids.into_iter().map(Into::into).collect()))
  }

  pub fn dedup(self) -> Self { self.step(Step::Dedup) }

  pub fn limit(self, n: usize) -> Self { self.step(Step::Limit(n)) }

  pub fn count(self) -> Self { self.step(Step::Count) }

  pub fn path(self) -> Self { self.step(Step::Path) }
}

// ─── Evaluation ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Item {
  Vertex(VertexKey),
  Edge(EdgeId),
  Count(usize),
  Path(Vec<Item>),
}

impl Item {
  fn kind(&self) -> &'static str {
    match self {
      Item::Vertex(_) => "vertex",
      Item::Edge(_) => "edge",
      Item::Count(_) => "count",
      Item::Path(_) => "path",
    }
  }

  fn record(&self, graph: &Graph) -> Option<GraphRecord> {
    match self {
      Item::Vertex(key) => graph.vertex_record(key),
      Item::Edge(id) => graph.edge_record(*id),
      Item::Count(value) => Some(GraphRecord::Count { value: *value }),
      Item::Path(items) => Some(GraphRecord::Path {
        objects: items.iter().filter_map(|item| item.record(graph)).collect(),
      }),
    }
  }
}

/// An element in flight, with every element visited to reach it (itself
/// included).
#[derive(Debug, Clone)]
struct Traverser {
  item: Item,
  path: Vec<Item>,
}

impl Traverser {
  fn new(item: Item) -> Self { Self { path: vec![item.clone()], item } }

  fn extend(&self, item: Item) -> Self {
    let mut path = self.path.clone();
    path.push(item.clone());
    Self { item, path }
  }
}

pub(crate) fn evaluate(graph: &Graph, traversal: &Traversal) -> Result<Vec<GraphRecord>> {
  let mut items = start(graph, &traversal.start);
  for step in &traversal.steps {
    items = apply(graph, step, items)?;
  }
  Ok(items.iter().filter_map(|t| t.item.record(graph)).collect())
}

fn start(graph: &Graph, start: &Start) -> Vec<Traverser> {
  let vertices: Vec<VertexKey> = match start {
    Start::Vertex { run_pk, id } => {
      let key = (run_pk.clone(), id.clone());
      graph.vertex(&key).map(|_| key).into_iter().collect()
    }
    Start::Label { run_pk, label } => graph
      .partition_ids(run_pk)
      .map(|id| (run_pk.clone(), id.clone()))
      .filter(|key| graph.vertex(key).is_some_and(|v| v.label == *label))
      .collect(),
    Start::Partition { run_pk } => graph
      .partition_ids(run_pk)
      .map(|id| (run_pk.clone(), id.clone()))
      .collect(),
  };
  vertices.into_iter().map(|key| Traverser::new(Item::Vertex(key))).collect()
}

fn apply(graph: &Graph, step: &Step, items: Vec<Traverser>) -> Result<Vec<Traverser>> {
  let invalid = |item: &Item| Error::InvalidStep { step: step.name(), found: item.kind() };

  let out = match step {
    Step::Out(label) | Step::In(label) | Step::OutE(label) | Step::InE(label) => {
      let mut out = Vec::new();
      for t in &items {
        let Item::Vertex(key) = &t.item else { return Err(invalid(&t.item)) };
        let ids = match step {
          Step::Out(_) | Step::OutE(_) => graph.out_edges(key),
          _ => graph.in_edges(key),
        };
        for &id in ids {
          let Some(edge) = graph.edge(id).filter(|e| e.label == *label) else { continue };
          out.push(t.extend(match step {
            Step::Out(_) => Item::Vertex(edge.in_v.clone()),
            Step::In(_) => Item::Vertex(edge.out_v.clone()),
            _ => Item::Edge(id),
          }));
        }
      }
      out
    }
    Step::InV | Step::OutV => {
      let mut out = Vec::with_capacity(items.len());
      for t in &items {
        let Item::Edge(id) = &t.item else { return Err(invalid(&t.item)) };
        let Some(edge) = graph.edge(*id) else { continue };
        out.push(t.extend(Item::Vertex(if *step == Step::InV { edge.in_v.clone() } else { edge.out_v.clone() })));
      }
      out
    }
    Step::OrderBy { property, order } => {
      let mut keyed: Vec<(Option<Value>, Traverser)> = items
        .into_iter()
        .map(|t| (property_of(graph, &t.item, property), t))
        .collect();
      keyed.sort_by(|(a, _), (b, _)| order_values(a.as_ref(), b.as_ref(), *order));
      keyed.into_iter().map(|(_, t)| t).collect()
    }
    Step::Exclude(ids) => items
      .into_iter()
      .filter(|t| !matches!(&t.item, Item::Vertex((_, id)) if ids.contains(id)))
      .collect(),
    Step::Dedup => {
      let mut seen = HashSet::new();
      items.into_iter().filter(|t| seen.insert(t.item.clone())).collect()
    }
    Step::Limit(n) => {
      let mut items = items;
      items.truncate(*n);
      items
    }
    Step::Count => vec![Traverser::new(Item::Count(items.len()))],
    Step::Path => items
      .into_iter()
      .map(|t| Traverser { item: Item::Path(t.path.clone()), path: t.path })
      .collect(),
  };
  Ok(out)
}

fn property_of(graph: &Graph, item: &Item, property: &str) -> Option<Value> {
  let props = match item {
    Item::Vertex(key) => &graph.vertex(key)?.properties,
    Item::Edge(id) => &graph.edge(*id)?.properties,
    Item::Count(_) | Item::Path(_) => return None,
  };
  props.get(property).cloned()
}

/// Numbers compare numerically, anything else by its string form. Missing
/// values sort after present ones regardless of direction.
fn order_values(a: Option<&Value>, b: Option<&Value>, order: Order) -> Ordering {
  match (a, b) {
    (Some(a), Some(b)) => {
      let ord = match (a.as_f64(), b.as_f64()) {
        (Some(x), Some(y)) => x.total_cmp(&y),
        _ => a.to_string().cmp(&b.to_string()),
      };
      match order {
        Order::Asc => ord,
        Order::Desc => ord.reverse(),
      }
    }
    (Some(_), None) => Ordering::Less,
    (None, Some(_)) => Ordering::Greater,
    (None, None) => Ordering::Equal,
  }
}
