//! Conversions between shopgen domain types and graph elements.

use serde_json::{Map, Value, json};
use shopgen_core::{
  model::{Edge, EntityBatch, EntityKind, RelationKind, User},
  partition::PartitionKey,
  query::ProductRow,
};

use crate::{Error, GraphRecord, Result};

pub type Properties = Map<String, Value>;

fn base(run_pk: &PartitionKey, id: &str, name: &str) -> Properties {
  let mut props = Properties::new();
  props.insert("pk".into(), json!(run_pk.as_str()));
  props.insert("id".into(), json!(id));
  props.insert("name".into(), json!(name));
  props
}

/// Vertex label plus `(id, properties)` for every entity in the batch.
pub fn entity_vertices(run_pk: &PartitionKey, batch: EntityBatch) -> (EntityKind, Vec<(String, Properties)>) {
  let kind = batch.kind();
  let vertices: Vec<(String, Properties)> = match batch {
    EntityBatch::Categories(rows) => rows
      .into_iter()
      .map(|c| {
        let props = base(run_pk, &c.id, &c.name);
        (c.id, props)
      })
      .collect(),
    EntityBatch::Brands(rows) => rows
      .into_iter()
      .map(|b| {
        let props = base(run_pk, &b.id, &b.name);
        (b.id, props)
      })
      .collect(),
    EntityBatch::Tags(rows) => rows
      .into_iter()
      .map(|t| {
        let props = base(run_pk, &t.id, &t.name);
        (t.id, props)
      })
      .collect(),
    EntityBatch::Users(rows) => rows
      .into_iter()
      .map(|u| {
        let props = base(run_pk, &u.id, &u.name);
        (u.id, props)
      })
      .collect(),
    EntityBatch::Products(rows) => rows
      .into_iter()
      .map(|p| {
        let mut props = base(run_pk, &p.id, &p.name);
        props.insert("price".into(), json!(p.price));
        props.insert("brandId".into(), json!(p.brand_id));
        props.insert("categoryId".into(), json!(p.category_id));
        (p.id, props)
      })
      .collect(),
  };
  (kind, vertices)
}

/// Edge properties: the partition key, plus the weight for scored kinds.
pub fn edge_properties(run_pk: &PartitionKey, kind: RelationKind, edge: &Edge) -> Result<Properties> {
  let mut props = Properties::new();
  props.insert("pk".into(), json!(run_pk.as_str()));

  if let Some(name) = kind.weight_property() {
    let Some(weight) = edge.weight else {
      return Err(Error::MissingWeight { kind, src: edge.src.clone(), dst: edge.dst.clone() });
    };
    props.insert(name.into(), json!(weight));
  }
  Ok(props)
}

fn text(props: &Properties, key: &str) -> String {
  props.get(key).and_then(Value::as_str).unwrap_or_default().to_owned()
}

/// A product vertex record as a query row. Non-vertex records yield `None`.
pub fn product_row(record: GraphRecord) -> Option<ProductRow> {
  let GraphRecord::Vertex { id, properties, .. } = record else { return None };
  Some(ProductRow {
    id,
    name: text(&properties, "name"),
    price: properties.get("price").and_then(Value::as_f64).unwrap_or_default(),
    brand_id: text(&properties, "brandId"),
    category_id: text(&properties, "categoryId"),
  })
}

pub fn user(record: GraphRecord) -> Option<User> {
  let GraphRecord::Vertex { id, properties, .. } = record else { return None };
  Some(User { id, name: text(&properties, "name") })
}
