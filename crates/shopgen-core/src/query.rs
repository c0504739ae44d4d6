//! Recommendation queries run against a populated partition.
//!
//! Both backends answer the same six questions so their latencies can be
//! compared. Every query is read-only, scoped to one `run_pk`, and returns at
//! most [`RESULT_LIMIT`] rows.

use std::{future::Future, time::Instant};

use serde::{Deserialize, Serialize};

use crate::{model::User, partition::PartitionKey};

pub const RESULT_LIMIT: usize = 20;

/// A product as returned by a recommendation query (tags are not joined).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
  pub id:          String,
  pub name:        String,
  pub price:       f64,
  pub brand_id:    String,
  pub category_id: String,
}

pub trait RecommendationQueries: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Other products in the same category as `product_id`.
  fn similar_by_category<'a>(
    &'a self,
    run_pk: &'a PartitionKey,
    product_id: &'a str,
  ) -> impl Future<Output = Result<Vec<ProductRow>, Self::Error>> + Send + 'a;

  /// `SIMILAR_TO` targets of `product_id`, highest score first.
  fn similar_by_score<'a>(
    &'a self,
    run_pk: &'a PartitionKey,
    product_id: &'a str,
  ) -> impl Future<Output = Result<Vec<ProductRow>, Self::Error>> + Send + 'a;

  /// Distinct products bought by users who also bought `product_id`.
  fn customers_also_bought<'a>(
    &'a self,
    run_pk: &'a PartitionKey,
    product_id: &'a str,
  ) -> impl Future<Output = Result<Vec<ProductRow>, Self::Error>> + Send + 'a;

  /// Products bought by users who share a purchase with `user_id`, excluding
  /// everything `user_id` already bought.
  fn recommend_for_user<'a>(
    &'a self,
    run_pk: &'a PartitionKey,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Vec<ProductRow>, Self::Error>> + Send + 'a;

  /// `BOUGHT_TOGETHER` targets of `product_id`, highest support first.
  fn bought_together<'a>(
    &'a self,
    run_pk: &'a PartitionKey,
    product_id: &'a str,
  ) -> impl Future<Output = Result<Vec<ProductRow>, Self::Error>> + Send + 'a;

  /// `SIMILAR_USER` targets of `user_id`, highest score first.
  fn similar_users<'a>(
    &'a self,
    run_pk: &'a PartitionKey,
    user_id: &'a str,
  ) -> impl Future<Output = Result<Vec<User>, Self::Error>> + Send + 'a;
}

/// The six benchmark queries by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenchmarkQuery {
  SimilarByCategory,
  SimilarByScore,
  CustomersAlsoBought,
  RecommendForUser,
  BoughtTogether,
  SimilarUsers,
}

impl BenchmarkQuery {
  pub const ALL: [BenchmarkQuery; 6] = [
    BenchmarkQuery::SimilarByCategory,
    BenchmarkQuery::SimilarByScore,
    BenchmarkQuery::CustomersAlsoBought,
    BenchmarkQuery::RecommendForUser,
    BenchmarkQuery::BoughtTogether,
    BenchmarkQuery::SimilarUsers,
  ];
}

/// One timed query execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryTiming {
  pub query:        BenchmarkQuery,
  pub rows:         usize,
  pub elapsed_secs: f64,
}

/// Await `fut` and measure how long it took.
pub async fn timed<F, T>(fut: F) -> (T, f64)
where
  F: Future<Output = T>,
{
  let t0 = Instant::now();
  let out = fut.await;
  (out, t0.elapsed().as_secs_f64())
}

/// Run every [`BenchmarkQuery`] once, in order, and time each.
pub async fn run_benchmark<Q>(
  queries: &Q,
  run_pk: &PartitionKey,
  product_id: &str,
  user_id: &str,
) -> Result<Vec<QueryTiming>, Q::Error>
where
  Q: RecommendationQueries,
{
  let mut out = Vec::with_capacity(BenchmarkQuery::ALL.len());

  for query in BenchmarkQuery::ALL {
    let (rows, elapsed_secs) = match query {
      BenchmarkQuery::SimilarByCategory => {
        let (r, t) = timed(queries.similar_by_category(run_pk, product_id)).await;
        (r?.len(), t)
      }
      BenchmarkQuery::SimilarByScore => {
        let (r, t) = timed(queries.similar_by_score(run_pk, product_id)).await;
        (r?.len(), t)
      }
      BenchmarkQuery::CustomersAlsoBought => {
        let (r, t) = timed(queries.customers_also_bought(run_pk, product_id)).await;
        (r?.len(), t)
      }
      BenchmarkQuery::RecommendForUser => {
        let (r, t) = timed(queries.recommend_for_user(run_pk, user_id)).await;
        (r?.len(), t)
      }
      BenchmarkQuery::BoughtTogether => {
        let (r, t) = timed(queries.bought_together(run_pk, product_id)).await;
        (r?.len(), t)
      }
      BenchmarkQuery::SimilarUsers => {
        let (r, t) = timed(queries.similar_users(run_pk, user_id)).await;
        (r?.len(), t)
      }
    };
    tracing::debug!(?query, rows, elapsed_secs, "query finished");
    out.push(QueryTiming { query, rows, elapsed_secs });
  }

  Ok(out)
}
