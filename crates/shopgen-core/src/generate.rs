//! The deterministic dataset generator.
//!
//! Two phases share one seeded [`StdRng`]:
//!
//! 1. [`expand_master_data`] grows the seed catalog to the requested product
//!    count and derives the user population.
//! 2. [`synthesize_relations`] derives structural, behavioral and analytic
//!    edges from those entities, continuing the same random stream.
//!
//! Same seed and same count give the same dataset, bit for bit, within this
//! implementation.

use std::collections::{BTreeMap, HashMap};

use rand::{Rng, SeedableRng, rngs::StdRng, seq::index};
use serde::{Deserialize, Serialize};

use crate::{
  catalog::SeedCatalog,
  model::{
    Brand, Category, Edge, EntityBatch, Product, RelationBatch, RelationKind,
    Tag, User,
  },
  partition::{PartitionKey, normalize_product_count},
};

pub const DEFAULT_SEED: u64 = 42;

const MIN_USERS: usize = 10;
const USERS_PER_PRODUCT_DIVISOR: usize = 5;
const MIN_INTERACTIONS_PER_USER: usize = 5;
const INTERACTION_SCALE_DIVISOR: usize = 60;

const BULK_PRICE_MIN: f64 = 5.0;
const BULK_PRICE_MAX: f64 = 300.0;

const BUY_THRESHOLD: f64 = 0.5;
const LIKE_THRESHOLD: f64 = 0.7;

const SIMILARITY_SAMPLE: usize = 4;
const MAX_PRODUCT_NEIGHBORS: usize = 3;
const PRODUCT_SCORE_MIN: f64 = 0.6;
const PRODUCT_SCORE_MAX: f64 = 0.95;

const SIMILAR_USERS_PER_USER: usize = 2;
const USER_SCORE_MIN: f64 = 0.2;
const USER_SCORE_MAX: f64 = 0.9;

// ─── Configuration ───────────────────────────────────────────────────────────

/// How many products each user views.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionRule {
  /// Always 5. Historical benchmark data was produced with a formula that
  /// collapses to this constant, so it stays the default for comparability.
  #[default]
  Constant,
  /// `max(5, N div 60)`.
  Scaled,
}

impl InteractionRule {
  pub fn interactions_per_user(self, product_count: usize) -> usize {
    match self {
      InteractionRule::Constant => MIN_INTERACTIONS_PER_USER,
      InteractionRule::Scaled => {
        MIN_INTERACTIONS_PER_USER.max(product_count / INTERACTION_SCALE_DIVISOR)
      }
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneratorConfig {
  pub seed:             u64,
  pub interaction_rule: InteractionRule,
}

impl Default for GeneratorConfig {
  fn default() -> Self {
    Self { seed: DEFAULT_SEED, interaction_rule: InteractionRule::default() }
  }
}

// ─── Output ──────────────────────────────────────────────────────────────────

/// Entity sets of one run.
#[derive(Debug, Clone, PartialEq)]
pub struct MasterData {
  pub categories: Vec<Category>,
  pub brands:     Vec<Brand>,
  pub tags:       Vec<Tag>,
  pub products:   Vec<Product>,
  pub users:      Vec<User>,
}

impl MasterData {
  /// Entity batches in dependency order: everything a product references
  /// comes before the products themselves.
  pub fn into_batches(self) -> Vec<EntityBatch> {
    vec![
      EntityBatch::Categories(self.categories),
      EntityBatch::Brands(self.brands),
      EntityBatch::Tags(self.tags),
      EntityBatch::Users(self.users),
      EntityBatch::Products(self.products),
    ]
  }
}

/// All synthesized edges of one run, grouped by kind.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Relations {
  edges: BTreeMap<RelationKind, Vec<Edge>>,
}

impl Relations {
  fn push(&mut self, kind: RelationKind, edge: Edge) {
    self.edges.entry(kind).or_default().push(edge);
  }

  pub fn edges(&self, kind: RelationKind) -> &[Edge] {
    self.edges.get(&kind).map(Vec::as_slice).unwrap_or(&[])
  }

  pub fn count(&self, kind: RelationKind) -> usize { self.edges(kind).len() }

  pub fn total(&self) -> usize { self.edges.values().map(Vec::len).sum() }

  /// Per-kind counts in [`RelationKind::ALL`] order.
  pub fn counts(&self) -> BTreeMap<RelationKind, usize> {
    RelationKind::ALL.into_iter().map(|k| (k, self.count(k))).collect()
  }

  /// Non-empty batches in [`RelationKind::ALL`] order.
  pub fn into_batches(mut self) -> Vec<RelationBatch> {
    RelationKind::ALL
      .into_iter()
      .filter_map(|kind| {
        self
          .edges
          .remove(&kind)
          .filter(|edges| !edges.is_empty())
          .map(|edges| RelationBatch { kind, edges })
      })
      .collect()
  }
}

/// Everything one generation run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
  pub run_pk:                PartitionKey,
  pub interactions_per_user: usize,
  pub master:                MasterData,
  pub relations:             Relations,
}

// ─── Entry point ─────────────────────────────────────────────────────────────

/// Generate the full dataset for `requested_products` products.
///
/// The count is normalized first; `run_pk` defaults to the key derived from
/// the normalized count.
pub fn generate(
  requested_products: usize,
  run_pk: Option<PartitionKey>,
  config: &GeneratorConfig,
) -> Dataset {
  let product_count = normalize_product_count(requested_products);
  let run_pk = run_pk.unwrap_or_else(|| PartitionKey::for_product_count(product_count));
  let mut rng = StdRng::seed_from_u64(config.seed);

  let master = expand_master_data(product_count, &mut rng);
  let interactions_per_user = config.interaction_rule.interactions_per_user(product_count);
  let relations = synthesize_relations(&master, interactions_per_user, &mut rng);

  Dataset { run_pk, interactions_per_user, master, relations }
}

// ─── Master data ─────────────────────────────────────────────────────────────

/// Number of users for a normalized product count.
pub fn user_count_for(product_count: usize) -> usize {
  MIN_USERS.max(product_count / USERS_PER_PRODUCT_DIVISOR)
}

/// Expand the seed catalog to `product_count` products (floored at the base
/// catalog size) and build the user population.
pub fn expand_master_data<R: Rng>(product_count: usize, rng: &mut R) -> MasterData {
  let product_count = normalize_product_count(product_count);
  let SeedCatalog { categories, brands, tags, mut products } = SeedCatalog::load();

  let bulk = product_count.saturating_sub(products.len());
  products.reserve(bulk);
  for i in 0..bulk {
    let brand = &brands[rng.gen_range(0..brands.len())];
    let category = &categories[rng.gen_range(0..categories.len())];
    let tag = &tags[rng.gen_range(0..tags.len())];
    let price = round2(rng.gen_range(BULK_PRICE_MIN..=BULK_PRICE_MAX));

    products.push(Product {
      id:          format!("p_bulk_{i}"),
      name:        format!("Bulk Product {i}"),
      price,
      brand_id:    brand.id.clone(),
      category_id: category.id.clone(),
      tag_ids:     vec![tag.id.clone()],
    });
  }

  let users = (1..=user_count_for(product_count))
    .map(|i| User { id: format!("u{i}"), name: format!("User {i}") })
    .collect();

  MasterData { categories, brands, tags, products, users }
}

// ─── Relations ───────────────────────────────────────────────────────────────

/// Derive every relation kind from `master`.
///
/// Draw order is fixed (structural, behavioral, product-analytic,
/// user-analytic) so a given RNG state always produces the same edges.
pub fn synthesize_relations<R: Rng>(
  master: &MasterData,
  interactions_per_user: usize,
  rng: &mut R,
) -> Relations {
  let mut relations = Relations::default();
  structural_edges(master, &mut relations);
  interaction_edges(master, interactions_per_user, rng, &mut relations);
  product_similarity_edges(&master.products, rng, &mut relations);
  user_similarity_edges(&master.users, rng, &mut relations);
  relations
}

fn structural_edges(master: &MasterData, out: &mut Relations) {
  for p in &master.products {
    out.push(RelationKind::InCategory, Edge::plain(&p.id, &p.category_id));
    out.push(RelationKind::HasBrand, Edge::plain(&p.id, &p.brand_id));
    for tag_id in &p.tag_ids {
      out.push(RelationKind::HasTag, Edge::plain(&p.id, tag_id));
    }
  }

  for c in &master.categories {
    if let Some(parent_id) = &c.parent_id {
      out.push(RelationKind::ParentOf, Edge::plain(parent_id, &c.id));
    }
  }
}

fn interaction_edges<R: Rng>(
  master: &MasterData,
  interactions_per_user: usize,
  rng: &mut R,
  out: &mut Relations,
) {
  let products = &master.products;
  let k = interactions_per_user.min(products.len());

  for user in &master.users {
    for idx in index::sample(rng, products.len(), k).into_iter() {
      let product_id = &products[idx].id;
      out.push(RelationKind::Viewed, Edge::plain(&user.id, product_id));

      if rng.r#gen::<f64>() > BUY_THRESHOLD {
        out.push(RelationKind::Bought, Edge::plain(&user.id, product_id));

        if rng.r#gen::<f64>() > LIKE_THRESHOLD {
          out.push(RelationKind::Liked, Edge::plain(&user.id, product_id));
        }
      }
    }
  }
}

/// Group product ids by category, keeping first-seen category order so the
/// draw sequence does not depend on hash iteration order.
fn products_by_category(products: &[Product]) -> Vec<Vec<&str>> {
  let mut slot: HashMap<&str, usize> = HashMap::new();
  let mut groups: Vec<Vec<&str>> = Vec::new();

  for p in products {
    let idx = *slot.entry(p.category_id.as_str()).or_insert_with(|| {
      groups.push(Vec::new());
      groups.len() - 1
    });
    groups[idx].push(p.id.as_str());
  }
  groups
}

fn product_similarity_edges<R: Rng>(products: &[Product], rng: &mut R, out: &mut Relations) {
  for group in products_by_category(products) {
    if group.len() < 2 {
      continue;
    }

    let sample_size = SIMILARITY_SAMPLE.min(group.len());
    for &product_id in &group {
      let neighbors: Vec<&str> = index::sample(rng, group.len(), sample_size)
        .into_iter()
        .map(|i| group[i])
        .filter(|&candidate| candidate != product_id)
        .take(MAX_PRODUCT_NEIGHBORS)
        .collect();

      for neighbor in neighbors {
        // One draw, shared by both edges of the pair.
        let score = round2(rng.gen_range(PRODUCT_SCORE_MIN..=PRODUCT_SCORE_MAX));
        out.push(RelationKind::SimilarTo, Edge::weighted(product_id, neighbor, score));
        out.push(RelationKind::BoughtTogether, Edge::weighted(product_id, neighbor, score));
      }
    }
  }
}

fn user_similarity_edges<R: Rng>(users: &[User], rng: &mut R, out: &mut Relations) {
  if users.len() < 2 {
    return;
  }

  // Sample from the other `len - 1` users by skipping over the user's own slot.
  let others = users.len() - 1;
  let k = SIMILAR_USERS_PER_USER.min(others);

  for (pos, user) in users.iter().enumerate() {
    for idx in index::sample(rng, others, k).into_iter() {
      let other = if idx >= pos { &users[idx + 1] } else { &users[idx] };
      let score = round2(rng.gen_range(USER_SCORE_MIN..=USER_SCORE_MAX));
      out.push(RelationKind::SimilarUser, Edge::weighted(&user.id, &other.id, score));
    }
  }
}

fn round2(x: f64) -> f64 { (x * 100.0).round() / 100.0 }
