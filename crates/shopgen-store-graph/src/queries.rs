//! Recommendation queries expressed as traversals.

use shopgen_core::{
  model::{RelationKind, User},
  partition::PartitionKey,
  query::{ProductRow, RESULT_LIMIT, RecommendationQueries},
};

use crate::{
  GraphRecord, GraphStore, Order, Result, Traversal,
  encode::{product_row, user},
};

impl GraphStore {
  async fn products(&self, traversal: Traversal) -> Result<Vec<ProductRow>> {
    Ok(self.submit(&traversal).await?.into_iter().filter_map(product_row).collect())
  }

  /// `kind` targets of `id`, best weight first.
  fn ranked(run_pk: &PartitionKey, id: &str, kind: RelationKind) -> Traversal {
    let property = kind.weight_property().unwrap_or("score");
    Traversal::vertex(run_pk, id)
      .out_e(kind.label())
      .order_by(property, Order::Desc)
      .in_v()
      .limit(RESULT_LIMIT)
  }
}

impl RecommendationQueries for GraphStore {
  type Error = crate::Error;

  async fn similar_by_category(&self, run_pk: &PartitionKey, product_id: &str) -> Result<Vec<ProductRow>> {
    let in_category = RelationKind::InCategory.label();
    let t = Traversal::vertex(run_pk, product_id)
      .out(in_category)
      .in_(in_category)
      .exclude([product_id])
      .dedup()
      .limit(RESULT_LIMIT);
    self.products(t).await
  }

  async fn similar_by_score(&self, run_pk: &PartitionKey, product_id: &str) -> Result<Vec<ProductRow>> {
    self.products(Self::ranked(run_pk, product_id, RelationKind::SimilarTo)).await
  }

  async fn customers_also_bought(&self, run_pk: &PartitionKey, product_id: &str) -> Result<Vec<ProductRow>> {
    let bought = RelationKind::Bought.label();
    let t = Traversal::vertex(run_pk, product_id)
      .in_(bought)
      .out(bought)
      .exclude([product_id])
      .dedup()
      .limit(RESULT_LIMIT);
    self.products(t).await
  }

  async fn recommend_for_user(&self, run_pk: &PartitionKey, user_id: &str) -> Result<Vec<ProductRow>> {
    let bought = RelationKind::Bought.label();

    let owned = self.submit(&Traversal::vertex(run_pk, user_id).out(bought)).await?;
    let owned: Vec<String> = owned
      .into_iter()
      .filter_map(|r| match r {
        GraphRecord::Vertex { id, .. } => Some(id),
        _ => None,
      })
      .collect();

    let t = Traversal::vertex(run_pk, user_id)
      .out(bought)
      .in_(bought)
      .out(bought)
      .exclude(owned)
      .dedup()
      .limit(RESULT_LIMIT);
    self.products(t).await
  }

  async fn bought_together(&self, run_pk: &PartitionKey, product_id: &str) -> Result<Vec<ProductRow>> {
    self.products(Self::ranked(run_pk, product_id, RelationKind::BoughtTogether)).await
  }

  async fn similar_users(&self, run_pk: &PartitionKey, user_id: &str) -> Result<Vec<User>> {
    let records = self.submit(&Self::ranked(run_pk, user_id, RelationKind::SimilarUser)).await?;
    Ok(records.into_iter().filter_map(user).collect())
  }
}
