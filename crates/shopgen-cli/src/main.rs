//! shopgen binary.
//!
//! Builds synthetic e-commerce datasets into the SQLite store (or the
//! in-process graph store), clears partitions, and benchmarks the
//! recommendation queries across both backends. Every command prints JSON
//! on stdout.
//!
//! ```text
//! shopgen build --products 5000
//! shopgen bench --products 5000 --product-id p1 --user-id u1
//! ```

mod settings;

use std::path::PathBuf;

use anyhow::Context as _;
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use shopgen_core::{
  build::{BuildOptions, BuildSummary, ErrorPolicy, build},
  generate::InteractionRule,
  partition::PartitionKey,
  query::{QueryTiming, run_benchmark},
  sink::{DatasetSink, TransactionalPartitionStore},
};
use shopgen_store_graph::GraphStore;
use shopgen_store_sqlite::SqliteStore;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::settings::AppConfig;

#[derive(Parser)]
#[command(author, version, about = "Synthetic e-commerce dataset generator")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "shopgen.toml")]
  config: PathBuf,

  /// SQLite database file; overrides `store_path`.
  #[arg(long, global = true)]
  store: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Backend {
  Sqlite,
  Graph,
}

#[derive(clap::Args)]
struct GenerateArgs {
  /// Requested product count (raised to 10 if lower).
  #[arg(short = 'n', long, default_value_t = 10)]
  products: usize,

  /// Partition key; derived from the product count when omitted.
  #[arg(long)]
  run_pk: Option<String>,

  #[arg(long)]
  seed: Option<u64>,

  /// Entities deleted per reset round on the graph backend.
  #[arg(long)]
  batch_size: Option<usize>,

  /// Scale interactions per user with the product count.
  #[arg(long)]
  scaled_interactions: bool,

  /// Abort on the first failed insert instead of skipping it.
  #[arg(long)]
  fail_fast: bool,
}

impl GenerateArgs {
  fn options(&self, cfg: &AppConfig) -> BuildOptions {
    let mut opts = cfg.build_options();
    if let Some(seed) = self.seed {
      opts.generator.seed = seed;
    }
    if let Some(batch_size) = self.batch_size {
      opts.reset.batch_size = batch_size;
    }
    if self.scaled_interactions {
      opts.generator.interaction_rule = InteractionRule::Scaled;
    }
    if self.fail_fast {
      opts.error_policy = ErrorPolicy::FailFast;
    }
    opts
  }

  fn run_pk(&self) -> Option<PartitionKey> { self.run_pk.clone().map(PartitionKey::from) }
}

#[derive(Subcommand)]
enum Command {
  /// Reset the partition, generate a dataset and persist it.
  Build {
    #[command(flatten)]
    args:    GenerateArgs,
    #[arg(long, value_enum, default_value_t = Backend::Sqlite)]
    backend: Backend,
  },
  /// Delete everything stored under one partition of the SQLite store.
  Reset {
    /// Partition key; derived from `--products` when omitted.
    #[arg(long)]
    run_pk:   Option<String>,
    #[arg(short = 'n', long, default_value_t = 10)]
    products: usize,
  },
  /// Clear every table of the SQLite store, across all partitions.
  Truncate,
  /// Build the same dataset into both backends and time the six
  /// recommendation queries on each.
  Bench {
    #[command(flatten)]
    args:       GenerateArgs,
    #[arg(long, default_value = "p1")]
    product_id: String,
    #[arg(long, default_value = "u1")]
    user_id:    String,
  },
}

#[derive(Serialize)]
struct BackendReport {
  build:   BuildSummary,
  queries: Vec<QueryTiming>,
}

#[derive(Serialize)]
struct BenchReport {
  sqlite: BackendReport,
  graph:  BackendReport,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_writer(std::io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let mut cfg = AppConfig::load(&cli.config)?;
  if let Some(store) = cli.store {
    cfg.store_path = store;
  }

  match cli.command {
    Command::Build { args, backend } => {
      let opts = args.options(&cfg);
      let summary = match backend {
        Backend::Sqlite => run_build(&open_sqlite(&cfg).await?, &args, &opts).await?,
        Backend::Graph => run_build(&GraphStore::new(), &args, &opts).await?,
      };
      println!("{}", summary.to_json()?);
    }
    Command::Reset { run_pk, products } => {
      let run_pk = run_pk.map_or_else(|| PartitionKey::for_product_count(products), PartitionKey::from);
      let store = open_sqlite(&cfg).await?;
      let report = store
        .reset_partition(&run_pk, &cfg.build_options().reset)
        .await
        .with_context(|| format!("failed to reset partition {run_pk}"))?;
      tracing::info!(%run_pk, deleted = report.deleted, "partition reset");
      print_json(&report)?;
    }
    Command::Truncate => {
      let store = open_sqlite(&cfg).await?;
      store.truncate_all().await.context("failed to truncate tables")?;
      print_json(&serde_json::json!({ "truncated": shopgen_store_sqlite::TABLES }))?;
    }
    Command::Bench { args, product_id, user_id } => {
      let opts = args.options(&cfg);

      let sqlite = open_sqlite(&cfg).await?;
      let sqlite_build = run_build(&sqlite, &args, &opts).await?;
      let sqlite_queries = run_benchmark(&sqlite, &sqlite_build.run_pk, &product_id, &user_id)
        .await
        .context("sqlite benchmark failed")?;

      let graph = GraphStore::new();
      let graph_build = run_build(&graph, &args, &opts).await?;
      let graph_queries = run_benchmark(&graph, &graph_build.run_pk, &product_id, &user_id)
        .await
        .context("graph benchmark failed")?;

      print_json(&BenchReport {
        sqlite: BackendReport { build: sqlite_build, queries: sqlite_queries },
        graph:  BackendReport { build: graph_build, queries: graph_queries },
      })?;
    }
  }

  Ok(())
}

async fn open_sqlite(cfg: &AppConfig) -> anyhow::Result<SqliteStore> {
  let store = SqliteStore::open(&cfg.store_path)
    .await
    .with_context(|| format!("failed to open store at {:?}", cfg.store_path))?;
  if cfg.force_recreate_schema {
    store.recreate_schema().await.context("failed to recreate schema")?;
  }
  Ok(store)
}

async fn run_build<S>(sink: &S, args: &GenerateArgs, opts: &BuildOptions) -> anyhow::Result<BuildSummary>
where
  S: DatasetSink,
{
  build(sink, args.products, args.run_pk(), opts)
    .await
    .context("dataset build failed")
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  println!("{}", serde_json::to_string(value)?);
  Ok(())
}
