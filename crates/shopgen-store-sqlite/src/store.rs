//! [`SqliteStore`], the SQLite implementation of the shopgen sink traits.

use std::path::Path;

use rusqlite::types::Value;
use shopgen_core::{
  lifecycle::{self, ResetOptions, ResetReport},
  model::{EntityBatch, RelationBatch, RelationKind},
  partition::PartitionKey,
  sink::{DatasetSink, TransactionalPartitionStore},
};

use crate::{
  Result,
  encode::{plain_pairs, weighted_triples},
  schema::{DROP_SCHEMA, SCHEMA, STALE_LAYOUT_PROBE, TABLES},
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A shopgen dataset store backed by a single SQLite file.
///
/// Clones share one background connection.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open a private in-memory store.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Create missing tables, replacing a stale pre-partition layout.
  async fn init_schema(&self) -> Result<()> {
    let recreated = self
      .conn
      .call(|conn| {
        let stale: bool = conn.query_row(STALE_LAYOUT_PROBE, [], |r| r.get(0))?;
        if stale {
          conn.execute_batch(DROP_SCHEMA)?;
        }
        conn.execute_batch(SCHEMA)?;
        Ok(stale)
      })
      .await?;

    if recreated {
      tracing::warn!("dropped tables without run_pk column and recreated schema");
    }
    Ok(())
  }

  /// Drop every table and recreate the schema from scratch.
  pub async fn recreate_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(DROP_SCHEMA)?;
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    tracing::warn!("schema dropped and recreated");
    Ok(())
  }

  /// Row count of every table under `run_pk`, in [`TABLES`] order.
  pub async fn row_counts(&self, run_pk: &PartitionKey) -> Result<Vec<(&'static str, usize)>> {
    let pk = run_pk.as_str().to_owned();

    let counts = self
      .conn
      .call(move |conn| {
        let mut out = Vec::with_capacity(TABLES.len());
        for table in TABLES {
          let n: i64 = conn.query_row(
            &format!("SELECT COUNT(*) FROM {table} WHERE run_pk = ?1"),
            rusqlite::params![pk],
            |r| r.get(0),
          )?;
          out.push((table, n as usize));
        }
        Ok(out)
      })
      .await?;
    Ok(counts)
  }

  /// Execute `sql` once per row inside one transaction. Returns the number of
  /// rows the statement reported as changed.
  async fn execute_rows(&self, sql: &'static str, rows: Vec<Vec<Value>>) -> Result<usize> {
    let written = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut written = 0;
        {
          let mut stmt = tx.prepare_cached(sql)?;
          for row in &rows {
            written += stmt.execute(rusqlite::params_from_iter(row.iter()))?;
          }
        }
        tx.commit()?;
        Ok(written)
      })
      .await?;
    Ok(written)
  }

  /// Like [`Self::execute_rows`], for `INSERT OR IGNORE` statements: logs
  /// how many duplicates were skipped.
  async fn insert_ignoring_duplicates(
    &self,
    table: &'static str,
    sql: &'static str,
    rows: Vec<Vec<Value>>,
  ) -> Result<usize> {
    let total = rows.len();
    let written = self.execute_rows(sql, rows).await?;
    if written < total {
      tracing::warn!(table, skipped = total - written, "duplicate rows skipped");
    }
    tracing::debug!(table, rows = written, "bulk insert");
    Ok(written)
  }

  /// Like [`Self::execute_rows`], for `UPDATE` statements that set columns
  /// on rows already written. No new rows exist afterwards, so this returns
  /// zero.
  async fn update_columns(&self, table: &'static str, sql: &'static str, rows: Vec<Vec<Value>>) -> Result<usize> {
    let updated = self.execute_rows(sql, rows).await?;
    tracing::debug!(table, rows = updated, "columns updated");
    Ok(0)
  }
}

fn text(s: impl Into<String>) -> Value { Value::Text(s.into()) }

fn pk_pairs(run_pk: &PartitionKey, pairs: Vec<(String, String)>) -> Vec<Vec<Value>> {
  pairs
    .into_iter()
    .map(|(src, dst)| vec![text(run_pk.as_str()), text(src), text(dst)])
    .collect()
}

fn pk_triples(run_pk: &PartitionKey, triples: Vec<(String, String, f64)>) -> Vec<Vec<Value>> {
  triples
    .into_iter()
    .map(|(src, dst, w)| vec![text(run_pk.as_str()), text(src), text(dst), Value::Real(w)])
    .collect()
}

// ─── DatasetSink impl ────────────────────────────────────────────────────────

impl DatasetSink for SqliteStore {
  type Error = crate::Error;

  async fn insert_entities(&self, run_pk: &PartitionKey, batch: EntityBatch) -> Result<usize> {
    let pk = || text(run_pk.as_str());

    match batch {
      EntityBatch::Categories(rows) => {
        let rows = rows
          .into_iter()
          .map(|c| vec![pk(), text(c.id), text(c.name), c.parent_id.map_or(Value::Null, text)])
          .collect();
        self
          .insert_ignoring_duplicates(
            "categories",
            "INSERT OR IGNORE INTO categories (run_pk, category_id, name, parent_id)
             VALUES (?1, ?2, ?3, ?4)",
            rows,
          )
          .await
      }
      EntityBatch::Brands(rows) => {
        let rows = rows.into_iter().map(|b| vec![pk(), text(b.id), text(b.name)]).collect();
        self
          .insert_ignoring_duplicates(
            "brands",
            "INSERT OR IGNORE INTO brands (run_pk, brand_id, name) VALUES (?1, ?2, ?3)",
            rows,
          )
          .await
      }
      EntityBatch::Tags(rows) => {
        let rows = rows.into_iter().map(|t| vec![pk(), text(t.id), text(t.name)]).collect();
        self
          .insert_ignoring_duplicates(
            "tags",
            "INSERT OR IGNORE INTO tags (run_pk, tag_id, name) VALUES (?1, ?2, ?3)",
            rows,
          )
          .await
      }
      EntityBatch::Users(rows) => {
        let rows = rows.into_iter().map(|u| vec![pk(), text(u.id), text(u.name)]).collect();
        self
          .insert_ignoring_duplicates(
            "users",
            "INSERT OR IGNORE INTO users (run_pk, user_id, name) VALUES (?1, ?2, ?3)",
            rows,
          )
          .await
      }
      // Tags are written by the HAS_TAG relation batch, not here.
      EntityBatch::Products(rows) => {
        let rows = rows
          .into_iter()
          .map(|p| {
            vec![
              pk(),
              text(p.id),
              text(p.name),
              Value::Real(p.price),
              text(p.brand_id),
              text(p.category_id),
            ]
          })
          .collect();
        self
          .insert_ignoring_duplicates(
            "products",
            "INSERT OR IGNORE INTO products
               (run_pk, product_id, name, price, brand_id, category_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            rows,
          )
          .await
      }
    }
  }

  async fn insert_relations(&self, run_pk: &PartitionKey, batch: RelationBatch) -> Result<usize> {
    let RelationBatch { kind, edges } = batch;

    match kind {
      // The relational layout stores these as columns of the entity rows
      // written earlier; re-assert them rather than duplicating.
      RelationKind::ParentOf => {
        self
          .update_columns(
            "categories",
            "UPDATE categories SET parent_id = ?2 WHERE run_pk = ?1 AND category_id = ?3",
            pk_pairs(run_pk, plain_pairs(edges)),
          )
          .await
      }
      RelationKind::InCategory => {
        self
          .update_columns(
            "products",
            "UPDATE products SET category_id = ?3 WHERE run_pk = ?1 AND product_id = ?2",
            pk_pairs(run_pk, plain_pairs(edges)),
          )
          .await
      }
      RelationKind::HasBrand => {
        self
          .update_columns(
            "products",
            "UPDATE products SET brand_id = ?3 WHERE run_pk = ?1 AND product_id = ?2",
            pk_pairs(run_pk, plain_pairs(edges)),
          )
          .await
      }
      RelationKind::HasTag => {
        self
          .insert_ignoring_duplicates(
            "product_tags",
            "INSERT OR IGNORE INTO product_tags (run_pk, product_id, tag_id) VALUES (?1, ?2, ?3)",
            pk_pairs(run_pk, plain_pairs(edges)),
          )
          .await
      }
      RelationKind::Viewed | RelationKind::Bought | RelationKind::Liked => {
        let rows = pk_pairs(run_pk, plain_pairs(edges))
          .into_iter()
          .map(|mut row| {
            row.push(text(kind.label()));
            row
          })
          .collect();
        self
          .execute_rows(
            "INSERT INTO user_interactions (run_pk, user_id, product_id, interaction_type)
             VALUES (?1, ?2, ?3, ?4)",
            rows,
          )
          .await
      }
      RelationKind::SimilarTo => {
        self
          .insert_ignoring_duplicates(
            "product_similarity",
            "INSERT OR IGNORE INTO product_similarity
               (run_pk, src_product_id, dst_product_id, score)
             VALUES (?1, ?2, ?3, ?4)",
            pk_triples(run_pk, weighted_triples(kind, edges)?),
          )
          .await
      }
      RelationKind::BoughtTogether => {
        self
          .insert_ignoring_duplicates(
            "product_bought_together",
            "INSERT OR IGNORE INTO product_bought_together
               (run_pk, src_product_id, dst_product_id, support)
             VALUES (?1, ?2, ?3, ?4)",
            pk_triples(run_pk, weighted_triples(kind, edges)?),
          )
          .await
      }
      RelationKind::SimilarUser => {
        self
          .insert_ignoring_duplicates(
            "user_similarity",
            "INSERT OR IGNORE INTO user_similarity (run_pk, src_user_id, dst_user_id, score)
             VALUES (?1, ?2, ?3, ?4)",
            pk_triples(run_pk, weighted_triples(kind, edges)?),
          )
          .await
      }
    }
  }

  async fn reset_partition(
    &self,
    run_pk: &PartitionKey,
    _options: &ResetOptions,
  ) -> shopgen_core::Result<ResetReport> {
    lifecycle::reset_transactional(self, run_pk).await
  }
}

// ─── TransactionalPartitionStore impl ────────────────────────────────────────

impl TransactionalPartitionStore for SqliteStore {
  type Error = crate::Error;

  async fn delete_all_under_partition(&self, run_pk: &PartitionKey) -> Result<usize> {
    let pk = run_pk.as_str().to_owned();

    let deleted = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction()?;
        let mut deleted = 0;
        for table in TABLES {
          deleted += tx.execute(
            &format!("DELETE FROM {table} WHERE run_pk = ?1"),
            rusqlite::params![pk],
          )?;
        }
        tx.commit()?;
        Ok(deleted)
      })
      .await?;
    Ok(deleted)
  }

  async fn truncate_all(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        let tx = conn.transaction()?;
        for table in TABLES {
          tx.execute(&format!("DELETE FROM {table}"), [])?;
        }
        tx.execute("DELETE FROM sqlite_sequence WHERE name = 'user_interactions'", [])?;
        tx.commit()?;
        Ok(())
      })
      .await?;
    tracing::warn!("all tables truncated");
    Ok(())
  }
}
