//! Partition keys: the `run_pk` that scopes one generation run.
//!
//! A key is a pure function of the normalized product count, so asking for the
//! same dataset size twice lands in the same partition and the second run
//! replaces the first instead of accumulating next to it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Smallest product count a run will ever generate.
pub const MIN_PRODUCTS: usize = 10;

/// Raise `requested` to [`MIN_PRODUCTS`]. Counts are never rejected.
pub fn normalize_product_count(requested: usize) -> usize {
  requested.max(MIN_PRODUCTS)
}

/// Identifier shared by every entity and relation of one generation run.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartitionKey(String);

impl PartitionKey {
  /// Wrap a caller-supplied key verbatim.
  pub fn new(key: impl Into<String>) -> Self { Self(key.into()) }

  /// Derive the stable key for a requested product count.
  pub fn for_product_count(requested: usize) -> Self {
    Self(format!("bench_N{}", normalize_product_count(requested)))
  }

  pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for PartitionKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

impl AsRef<str> for PartitionKey {
  fn as_ref(&self) -> &str { &self.0 }
}

impl From<&str> for PartitionKey {
  fn from(s: &str) -> Self { Self::new(s) }
}

impl From<String> for PartitionKey {
  fn from(s: String) -> Self { Self(s) }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn counts_below_floor_are_raised() {
    assert_eq!(normalize_product_count(0), 10);
    assert_eq!(normalize_product_count(1), 10);
    assert_eq!(normalize_product_count(9), 10);
    assert_eq!(normalize_product_count(10), 10);
    assert_eq!(normalize_product_count(11), 11);
    assert_eq!(normalize_product_count(500), 500);
  }

  #[test]
  fn key_depends_only_on_normalized_count() {
    assert_eq!(PartitionKey::for_product_count(3), PartitionKey::for_product_count(10));
    assert_eq!(PartitionKey::for_product_count(1), PartitionKey::for_product_count(7));
    assert_ne!(PartitionKey::for_product_count(10), PartitionKey::for_product_count(11));
    assert_eq!(PartitionKey::for_product_count(1000).as_str(), "bench_N1000");
  }

  #[test]
  fn serializes_as_plain_string() {
    let key = PartitionKey::new("custom_run");
    assert_eq!(serde_json::to_string(&key).unwrap(), "\"custom_run\"");
    assert_eq!(key.to_string(), "custom_run");
  }
}
