//! The hand-authored seed catalog every run starts from.
//!
//! The tables are `'static` and immutable; [`SeedCatalog::load`] hands out
//! owned copies so nothing a run does can leak into the next one.

use crate::model::{Brand, Category, Product, Tag};

struct SeedCategory {
  id:     &'static str,
  name:   &'static str,
  parent: Option<&'static str>,
}

struct SeedNamed {
  id:   &'static str,
  name: &'static str,
}

struct SeedProduct {
  id:       &'static str,
  name:     &'static str,
  brand:    &'static str,
  category: &'static str,
  price:    f64,
  tags:     &'static [&'static str],
}

const CATEGORIES: &[SeedCategory] = &[
  SeedCategory { id: "c_electronics",  name: "Electronics",    parent: None },
  SeedCategory { id: "c_sports",       name: "Sports",         parent: None },
  SeedCategory { id: "c_fashion",      name: "Fashion",        parent: None },
  SeedCategory { id: "c_home_kitchen", name: "Home & Kitchen", parent: Some("c_electronics") },
  SeedCategory { id: "c_gaming",       name: "Gaming",         parent: Some("c_electronics") },
  SeedCategory { id: "c_books",        name: "Books",          parent: None },
  SeedCategory { id: "c_beauty",       name: "Beauty",         parent: None },
  SeedCategory { id: "c_toys",         name: "Toys",           parent: None },
];

const BRANDS: &[SeedNamed] = &[
  SeedNamed { id: "b_nike",     name: "Nike" },
  SeedNamed { id: "b_adidas",   name: "Adidas" },
  SeedNamed { id: "b_sony",     name: "Sony" },
  SeedNamed { id: "b_logitech", name: "Logitech" },
  SeedNamed { id: "b_samsung",  name: "Samsung" },
];

const TAGS: &[SeedNamed] = &[
  SeedNamed { id: "t_gaming",   name: "gaming" },
  SeedNamed { id: "t_wireless", name: "wireless" },
  SeedNamed { id: "t_fitness",  name: "fitness" },
  SeedNamed { id: "t_kids",     name: "kids" },
  SeedNamed { id: "t_reading",  name: "reading" },
  SeedNamed { id: "t_home",     name: "home" },
  SeedNamed { id: "t_beauty",   name: "beauty" },
];

const PRODUCTS: &[SeedProduct] = &[
  SeedProduct { id: "p1",  name: "Wireless Mouse",  brand: "b_logitech", category: "c_electronics", price: 29.99,  tags: &["t_wireless"] },
  SeedProduct { id: "p2",  name: "Gaming Keyboard", brand: "b_logitech", category: "c_gaming",      price: 59.99,  tags: &["t_gaming"] },
  SeedProduct { id: "p3",  name: "4K TV",           brand: "b_sony",     category: "c_electronics", price: 799.99, tags: &["t_home"] },
  SeedProduct { id: "p4",  name: "Running Shoes",   brand: "b_nike",     category: "c_sports",      price: 79.99,  tags: &["t_fitness"] },
  SeedProduct { id: "p5",  name: "Football",        brand: "b_adidas",   category: "c_sports",      price: 25.99,  tags: &["t_fitness"] },
  SeedProduct { id: "p6",  name: "Perfume Set",     brand: "b_adidas",   category: "c_beauty",      price: 45.00,  tags: &["t_beauty"] },
  SeedProduct { id: "p7",  name: "Novel Book",      brand: "b_samsung",  category: "c_books",       price: 14.99,  tags: &["t_reading"] },
  SeedProduct { id: "p8",  name: "Toy Car",         brand: "b_samsung",  category: "c_toys",        price: 9.99,   tags: &["t_kids"] },
  SeedProduct { id: "p9",  name: "AirMax Shoes",    brand: "b_nike",     category: "c_fashion",     price: 120.00, tags: &["t_fitness"] },
  SeedProduct { id: "p10", name: "Sports Watch",    brand: "b_samsung",  category: "c_electronics", price: 199.99, tags: &["t_fitness"] },
];

/// Owned copy of the seed catalog.
#[derive(Debug, Clone, PartialEq)]
pub struct SeedCatalog {
  pub categories: Vec<Category>,
  pub brands:     Vec<Brand>,
  pub tags:       Vec<Tag>,
  pub products:   Vec<Product>,
}

impl SeedCatalog {
  pub fn load() -> Self {
    Self {
      categories: CATEGORIES
        .iter()
        .map(|c| Category {
          id:        c.id.to_owned(),
          name:      c.name.to_owned(),
          parent_id: c.parent.map(str::to_owned),
        })
        .collect(),
      brands:     BRANDS
        .iter()
        .map(|b| Brand { id: b.id.to_owned(), name: b.name.to_owned() })
        .collect(),
      tags:       TAGS
        .iter()
        .map(|t| Tag { id: t.id.to_owned(), name: t.name.to_owned() })
        .collect(),
      products:   PRODUCTS
        .iter()
        .map(|p| Product {
          id:          p.id.to_owned(),
          name:        p.name.to_owned(),
          price:       p.price,
          brand_id:    p.brand.to_owned(),
          category_id: p.category.to_owned(),
          tag_ids:     p.tags.iter().map(|t| (*t).to_owned()).collect(),
        })
        .collect(),
    }
  }

  /// Number of base products, i.e. the size of the smallest dataset.
  pub fn base_product_count() -> usize { PRODUCTS.len() }
}
