//! Entity and relation types shared by the generator and every backend.
//!
//! Entities and edges do not carry their partition key themselves; a
//! [`Dataset`](crate::generate::Dataset) owns exactly one key and every sink
//! call passes it alongside the rows.

use serde::{Deserialize, Serialize};

// ─── Entities ────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
  pub id:        String,
  pub name:      String,
  /// `None` for root categories.
  pub parent_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Brand {
  pub id:   String,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
  pub id:   String,
  pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
  pub id:          String,
  pub name:        String,
  /// Positive, two decimal places.
  pub price:       f64,
  pub brand_id:    String,
  pub category_id: String,
  /// Never empty.
  pub tag_ids:     Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
  pub id:   String,
  pub name: String,
}

/// The five entity kinds, in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
  Category,
  Brand,
  Tag,
  User,
  Product,
}

impl EntityKind {
  pub const ALL: [EntityKind; 5] = [
    EntityKind::Category,
    EntityKind::Brand,
    EntityKind::Tag,
    EntityKind::User,
    EntityKind::Product,
  ];

  /// Vertex label used by graph backends.
  pub fn label(self) -> &'static str {
    match self {
      EntityKind::Category => "category",
      EntityKind::Brand => "brand",
      EntityKind::Tag => "tag",
      EntityKind::User => "user",
      EntityKind::Product => "product",
    }
  }
}

/// A homogeneous group of entities handed to a sink in one call.
#[derive(Debug, Clone, PartialEq)]
pub enum EntityBatch {
  Categories(Vec<Category>),
  Brands(Vec<Brand>),
  Tags(Vec<Tag>),
  Users(Vec<User>),
  Products(Vec<Product>),
}

impl EntityBatch {
  pub fn kind(&self) -> EntityKind {
    match self {
      EntityBatch::Categories(_) => EntityKind::Category,
      EntityBatch::Brands(_) => EntityKind::Brand,
      EntityBatch::Tags(_) => EntityKind::Tag,
      EntityBatch::Users(_) => EntityKind::User,
      EntityBatch::Products(_) => EntityKind::Product,
    }
  }

  pub fn len(&self) -> usize {
    match self {
      EntityBatch::Categories(rows) => rows.len(),
      EntityBatch::Brands(rows) => rows.len(),
      EntityBatch::Tags(rows) => rows.len(),
      EntityBatch::Users(rows) => rows.len(),
      EntityBatch::Products(rows) => rows.len(),
    }
  }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

// ─── Relations ───────────────────────────────────────────────────────────────

/// The ten directed relation kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelationKind {
  ParentOf,
  InCategory,
  HasBrand,
  HasTag,
  Viewed,
  Bought,
  Liked,
  SimilarTo,
  BoughtTogether,
  SimilarUser,
}

impl RelationKind {
  /// Every kind, in the order the generator emits and sinks persist them.
  pub const ALL: [RelationKind; 10] = [
    RelationKind::InCategory,
    RelationKind::HasBrand,
    RelationKind::HasTag,
    RelationKind::ParentOf,
    RelationKind::Viewed,
    RelationKind::Bought,
    RelationKind::Liked,
    RelationKind::SimilarTo,
    RelationKind::BoughtTogether,
    RelationKind::SimilarUser,
  ];

  /// Edge label used by graph backends.
  pub fn label(self) -> &'static str {
    match self {
      RelationKind::ParentOf => "PARENT_OF",
      RelationKind::InCategory => "IN_CATEGORY",
      RelationKind::HasBrand => "HAS_BRAND",
      RelationKind::HasTag => "HAS_TAG",
      RelationKind::Viewed => "VIEWED",
      RelationKind::Bought => "BOUGHT",
      RelationKind::Liked => "LIKED",
      RelationKind::SimilarTo => "SIMILAR_TO",
      RelationKind::BoughtTogether => "BOUGHT_TOGETHER",
      RelationKind::SimilarUser => "SIMILAR_USER",
    }
  }

  pub fn from_label(label: &str) -> Option<Self> {
    Self::ALL.into_iter().find(|k| k.label() == label)
  }

  /// `(source, target)` entity kinds.
  pub fn endpoints(self) -> (EntityKind, EntityKind) {
    match self {
      RelationKind::ParentOf => (EntityKind::Category, EntityKind::Category),
      RelationKind::InCategory => (EntityKind::Product, EntityKind::Category),
      RelationKind::HasBrand => (EntityKind::Product, EntityKind::Brand),
      RelationKind::HasTag => (EntityKind::Product, EntityKind::Tag),
      RelationKind::Viewed | RelationKind::Bought | RelationKind::Liked => {
        (EntityKind::User, EntityKind::Product)
      }
      RelationKind::SimilarTo | RelationKind::BoughtTogether => {
        (EntityKind::Product, EntityKind::Product)
      }
      RelationKind::SimilarUser => (EntityKind::User, EntityKind::User),
    }
  }

  /// Name of the numeric edge property, for the attributed kinds.
  pub fn weight_property(self) -> Option<&'static str> {
    match self {
      RelationKind::SimilarTo | RelationKind::SimilarUser => Some("score"),
      RelationKind::BoughtTogether => Some("support"),
      _ => None,
    }
  }

  /// True for the user→product interaction kinds.
  pub fn is_interaction(self) -> bool {
    matches!(self, RelationKind::Viewed | RelationKind::Bought | RelationKind::Liked)
  }
}

/// One directed edge. `weight` is set exactly for kinds with a
/// [`RelationKind::weight_property`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge {
  pub src:    String,
  pub dst:    String,
  pub weight: Option<f64>,
}

impl Edge {
  pub fn plain(src: impl Into<String>, dst: impl Into<String>) -> Self {
    Self { src: src.into(), dst: dst.into(), weight: None }
  }

  pub fn weighted(src: impl Into<String>, dst: impl Into<String>, weight: f64) -> Self {
    Self { src: src.into(), dst: dst.into(), weight: Some(weight) }
  }
}

/// A homogeneous group of edges handed to a sink in one call.
#[derive(Debug, Clone, PartialEq)]
pub struct RelationBatch {
  pub kind:  RelationKind,
  pub edges: Vec<Edge>,
}
