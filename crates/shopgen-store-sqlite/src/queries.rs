//! Recommendation queries over the relational layout.

use shopgen_core::{
  model::User,
  partition::PartitionKey,
  query::{ProductRow, RESULT_LIMIT, RecommendationQueries},
};

use crate::{
  Result, SqliteStore,
  encode::{PRODUCT_COLUMNS, product_row, user_row},
};

impl SqliteStore {
  /// Run a product-returning query bound to `(run_pk, id, limit)`.
  async fn product_query(&self, sql: String, run_pk: &PartitionKey, id: &str) -> Result<Vec<ProductRow>> {
    let (pk, id) = (run_pk.as_str().to_owned(), id.to_owned());

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params![pk, id, RESULT_LIMIT as i64], product_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }
}

impl RecommendationQueries for SqliteStore {
  type Error = crate::Error;

  async fn similar_by_category(&self, run_pk: &PartitionKey, product_id: &str) -> Result<Vec<ProductRow>> {
    let cols = prefixed("p2");
    let sql = format!(
      "SELECT {cols}
       FROM products p1
       JOIN products p2
         ON p1.run_pk = p2.run_pk
        AND p1.category_id = p2.category_id
       WHERE p1.run_pk = ?1
         AND p1.product_id = ?2
         AND p2.product_id <> ?2
       LIMIT ?3"
    );
    self.product_query(sql, run_pk, product_id).await
  }

  async fn similar_by_score(&self, run_pk: &PartitionKey, product_id: &str) -> Result<Vec<ProductRow>> {
    let cols = prefixed("p");
    let sql = format!(
      "SELECT {cols}
       FROM product_similarity s
       JOIN products p
         ON p.run_pk = s.run_pk
        AND p.product_id = s.dst_product_id
       WHERE s.run_pk = ?1
         AND s.src_product_id = ?2
       ORDER BY s.score DESC
       LIMIT ?3"
    );
    self.product_query(sql, run_pk, product_id).await
  }

  async fn customers_also_bought(&self, run_pk: &PartitionKey, product_id: &str) -> Result<Vec<ProductRow>> {
    let cols = prefixed("p2");
    let sql = format!(
      "SELECT DISTINCT {cols}
       FROM user_interactions ui1
       JOIN user_interactions ui2
         ON ui1.run_pk = ui2.run_pk
        AND ui1.user_id = ui2.user_id
       JOIN products p2
         ON p2.run_pk = ui2.run_pk
        AND p2.product_id = ui2.product_id
       WHERE ui1.run_pk = ?1
         AND ui1.product_id = ?2
         AND ui1.interaction_type = 'BOUGHT'
         AND ui2.interaction_type = 'BOUGHT'
         AND ui2.product_id <> ui1.product_id
       LIMIT ?3"
    );
    self.product_query(sql, run_pk, product_id).await
  }

  async fn recommend_for_user(&self, run_pk: &PartitionKey, user_id: &str) -> Result<Vec<ProductRow>> {
    let cols = prefixed("p3");
    let sql = format!(
      "SELECT DISTINCT {cols}
       FROM user_interactions ui_u
       JOIN user_interactions ui_others
         ON ui_u.run_pk = ui_others.run_pk
        AND ui_u.product_id = ui_others.product_id
       JOIN user_interactions ui_rec
         ON ui_others.run_pk = ui_rec.run_pk
        AND ui_others.user_id = ui_rec.user_id
       JOIN products p3
         ON p3.run_pk = ui_rec.run_pk
        AND p3.product_id = ui_rec.product_id
       WHERE ui_u.run_pk = ?1
         AND ui_u.user_id = ?2
         AND ui_u.interaction_type = 'BOUGHT'
         AND ui_others.interaction_type = 'BOUGHT'
         AND ui_rec.interaction_type = 'BOUGHT'
         AND ui_rec.product_id NOT IN (
             SELECT product_id
             FROM user_interactions
             WHERE run_pk = ?1 AND user_id = ?2 AND interaction_type = 'BOUGHT'
         )
       LIMIT ?3"
    );
    self.product_query(sql, run_pk, user_id).await
  }

  async fn bought_together(&self, run_pk: &PartitionKey, product_id: &str) -> Result<Vec<ProductRow>> {
    let cols = prefixed("p");
    let sql = format!(
      "SELECT {cols}
       FROM product_bought_together bt
       JOIN products p
         ON p.run_pk = bt.run_pk
        AND p.product_id = bt.dst_product_id
       WHERE bt.run_pk = ?1
         AND bt.src_product_id = ?2
       ORDER BY bt.support DESC
       LIMIT ?3"
    );
    self.product_query(sql, run_pk, product_id).await
  }

  async fn similar_users(&self, run_pk: &PartitionKey, user_id: &str) -> Result<Vec<User>> {
    let (pk, id) = (run_pk.as_str().to_owned(), user_id.to_owned());

    let rows = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare_cached(
          "SELECT u2.user_id, u2.name
           FROM user_similarity us
           JOIN users u2
             ON u2.run_pk = us.run_pk
            AND u2.user_id = us.dst_user_id
           WHERE us.run_pk = ?1
             AND us.src_user_id = ?2
           ORDER BY us.score DESC
           LIMIT ?3",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![pk, id, RESULT_LIMIT as i64], user_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;
    Ok(rows)
  }
}

/// [`PRODUCT_COLUMNS`] qualified with a table alias.
fn prefixed(alias: &str) -> String {
  PRODUCT_COLUMNS
    .split(", ")
    .map(|col| format!("{alias}.{col}"))
    .collect::<Vec<_>>()
    .join(", ")
}
