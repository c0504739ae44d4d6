//! Conversions between shopgen domain types and SQLite rows.

use shopgen_core::{
  model::{Edge, RelationKind, User},
  query::ProductRow,
};

use crate::{Error, Result};

/// Column list matching [`product_row`].
pub const PRODUCT_COLUMNS: &str = "product_id, name, price, brand_id, category_id";

pub fn product_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ProductRow> {
  Ok(ProductRow {
    id:          row.get(0)?,
    name:        row.get::<_, Option<String>>(1)?.unwrap_or_default(),
    price:       row.get::<_, Option<f64>>(2)?.unwrap_or_default(),
    brand_id:    row.get(3)?,
    category_id: row.get(4)?,
  })
}

pub fn user_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
  Ok(User { id: row.get(0)?, name: row.get(1)? })
}

/// `(src, dst)` pairs for unweighted kinds.
pub fn plain_pairs(edges: Vec<Edge>) -> Vec<(String, String)> {
  edges.into_iter().map(|e| (e.src, e.dst)).collect()
}

/// `(src, dst, weight)` triples; every edge must carry a weight.
pub fn weighted_triples(kind: RelationKind, edges: Vec<Edge>) -> Result<Vec<(String, String, f64)>> {
  edges
    .into_iter()
    .map(|e| match e.weight {
      Some(w) => Ok((e.src, e.dst, w)),
      None => Err(Error::MissingWeight { kind, src: e.src, dst: e.dst }),
    })
    .collect()
}
