//! SQL schema for the shopgen SQLite store.
//!
//! Executed once at connection startup. A database created by an older
//! layout (tables without a `run_pk` column) is dropped and recreated, since
//! its rows cannot be attributed to any partition.

/// All tables, dependent tables first. Deleting in this order never trips a
/// foreign key.
pub const TABLES: [&str; 10] = [
  "user_interactions",
  "user_similarity",
  "product_bought_together",
  "product_similarity",
  "product_tags",
  "products",
  "users",
  "tags",
  "categories",
  "brands",
];

/// Full schema DDL; idempotent thanks to `CREATE ... IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS brands (
    run_pk   TEXT NOT NULL,
    brand_id TEXT NOT NULL,
    name     TEXT NOT NULL,
    PRIMARY KEY (run_pk, brand_id)
);

CREATE TABLE IF NOT EXISTS categories (
    run_pk      TEXT NOT NULL,
    category_id TEXT NOT NULL,
    name        TEXT NOT NULL,
    parent_id   TEXT,           -- NULL for root categories
    PRIMARY KEY (run_pk, category_id)
);

CREATE TABLE IF NOT EXISTS tags (
    run_pk TEXT NOT NULL,
    tag_id TEXT NOT NULL,
    name   TEXT NOT NULL,
    PRIMARY KEY (run_pk, tag_id)
);

CREATE TABLE IF NOT EXISTS users (
    run_pk  TEXT NOT NULL,
    user_id TEXT NOT NULL,
    name    TEXT NOT NULL,
    PRIMARY KEY (run_pk, user_id)
);

CREATE TABLE IF NOT EXISTS products (
    run_pk      TEXT NOT NULL,
    product_id  TEXT NOT NULL,
    name        TEXT,
    price       REAL CHECK (price > 0),
    brand_id    TEXT NOT NULL,
    category_id TEXT NOT NULL,
    PRIMARY KEY (run_pk, product_id),
    FOREIGN KEY (run_pk, brand_id)    REFERENCES brands(run_pk, brand_id),
    FOREIGN KEY (run_pk, category_id) REFERENCES categories(run_pk, category_id)
);

CREATE TABLE IF NOT EXISTS product_tags (
    run_pk     TEXT NOT NULL,
    product_id TEXT NOT NULL,
    tag_id     TEXT NOT NULL,
    PRIMARY KEY (run_pk, product_id, tag_id),
    FOREIGN KEY (run_pk, product_id) REFERENCES products(run_pk, product_id),
    FOREIGN KEY (run_pk, tag_id)     REFERENCES tags(run_pk, tag_id)
);

-- VIEWED / BOUGHT / LIKED share one table; no natural key.
CREATE TABLE IF NOT EXISTS user_interactions (
    id               INTEGER PRIMARY KEY AUTOINCREMENT,
    run_pk           TEXT NOT NULL,
    user_id          TEXT NOT NULL,
    product_id       TEXT NOT NULL,
    interaction_type TEXT NOT NULL,   -- 'VIEWED' | 'BOUGHT' | 'LIKED'
    interaction_ts   TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP,
    FOREIGN KEY (run_pk, user_id)    REFERENCES users(run_pk, user_id),
    FOREIGN KEY (run_pk, product_id) REFERENCES products(run_pk, product_id)
);

CREATE TABLE IF NOT EXISTS product_similarity (
    run_pk         TEXT NOT NULL,
    src_product_id TEXT NOT NULL,
    dst_product_id TEXT NOT NULL,
    score          REAL NOT NULL,
    PRIMARY KEY (run_pk, src_product_id, dst_product_id),
    FOREIGN KEY (run_pk, src_product_id) REFERENCES products(run_pk, product_id),
    FOREIGN KEY (run_pk, dst_product_id) REFERENCES products(run_pk, product_id)
);

CREATE TABLE IF NOT EXISTS product_bought_together (
    run_pk         TEXT NOT NULL,
    src_product_id TEXT NOT NULL,
    dst_product_id TEXT NOT NULL,
    support        REAL NOT NULL,
    PRIMARY KEY (run_pk, src_product_id, dst_product_id),
    FOREIGN KEY (run_pk, src_product_id) REFERENCES products(run_pk, product_id),
    FOREIGN KEY (run_pk, dst_product_id) REFERENCES products(run_pk, product_id)
);

CREATE TABLE IF NOT EXISTS user_similarity (
    run_pk      TEXT NOT NULL,
    src_user_id TEXT NOT NULL,
    dst_user_id TEXT NOT NULL,
    score       REAL NOT NULL,
    PRIMARY KEY (run_pk, src_user_id, dst_user_id),
    FOREIGN KEY (run_pk, src_user_id) REFERENCES users(run_pk, user_id),
    FOREIGN KEY (run_pk, dst_user_id) REFERENCES users(run_pk, user_id)
);

CREATE INDEX IF NOT EXISTS idx_products_run_cat  ON products(run_pk, category_id);
CREATE INDEX IF NOT EXISTS idx_ui_run_prod_type  ON user_interactions(run_pk, product_id, interaction_type);
CREATE INDEX IF NOT EXISTS idx_ui_run_user_type  ON user_interactions(run_pk, user_id, interaction_type);
CREATE INDEX IF NOT EXISTS idx_sim_run_src       ON product_similarity(run_pk, src_product_id, score);
CREATE INDEX IF NOT EXISTS idx_bt_run_src        ON product_bought_together(run_pk, src_product_id, support);
CREATE INDEX IF NOT EXISTS idx_us_run_src        ON user_similarity(run_pk, src_user_id, score);

PRAGMA user_version = 1;
";

/// Drops every table, dependents first.
pub const DROP_SCHEMA: &str = "
DROP TABLE IF EXISTS user_interactions;
DROP TABLE IF EXISTS user_similarity;
DROP TABLE IF EXISTS product_bought_together;
DROP TABLE IF EXISTS product_similarity;
DROP TABLE IF EXISTS product_tags;
DROP TABLE IF EXISTS products;
DROP TABLE IF EXISTS users;
DROP TABLE IF EXISTS tags;
DROP TABLE IF EXISTS categories;
DROP TABLE IF EXISTS brands;
";

/// True when `brands` exists but predates partition keys.
pub const STALE_LAYOUT_PROBE: &str = "
SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'brands')
   AND NOT EXISTS (SELECT 1 FROM pragma_table_info('brands') WHERE name = 'run_pk')
";
