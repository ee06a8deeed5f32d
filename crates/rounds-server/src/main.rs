//! rounds server binary.
//!
//! Reads `rounds.toml` (or the path specified with `--config`), opens an
//! in-process SQLite store, and either serves the JSON API over HTTP or runs
//! a one-off generation pass, the latter being what a daily cron job calls.
//!
//! ```text
//! rounds generate --date 2024-01-01
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chrono::{NaiveDate, Utc};
use clap::{Parser, Subcommand};
use rounds_core::{Engine, notify::NoopNotifier};
use rounds_server::{ServerConfig, Webhook, spawn_notifier};
use rounds_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Rounds delivery engine")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "rounds.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
  /// Serve the JSON API (the default).
  Serve,
  /// Generate obligations for a date, or a range with `--until`, and exit.
  Generate {
    /// Defaults to today (UTC).
    #[arg(long)]
    date:  Option<NaiveDate>,
    /// Inclusive end of a backfill range.
    #[arg(long)]
    until: Option<NaiveDate>,
  },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config).required(false))
    .add_source(config::Environment::with_prefix("ROUNDS"))
    .build()
    .context("failed to read config file")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command.unwrap_or(Command::Serve) {
    Command::Serve => serve(server_cfg, store).await,
    Command::Generate { date, until } => {
      let from = date.unwrap_or_else(|| Utc::now().date_naive());
      generate(store, from, until.unwrap_or(from)).await
    }
  }
}

async fn serve(server_cfg: ServerConfig, store: SqliteStore) -> anyhow::Result<()> {
  let webhook = server_cfg
    .notify_webhook_url
    .as_deref()
    .map(Webhook::new)
    .transpose()?;
  let (notifier, _worker) = spawn_notifier(server_cfg.notify_queue_capacity, webhook);

  let engine = Arc::new(Engine::new(store, notifier));
  let app = rounds_server::router(engine);
  let address = format!("{}:{}", server_cfg.host, server_cfg.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

  Ok(())
}

async fn generate(store: SqliteStore, from: NaiveDate, to: NaiveDate) -> anyhow::Result<()> {
  let engine = Engine::new(store, NoopNotifier);
  let created = engine
    .generate_for_range(from, to)
    .await
    .with_context(|| format!("generation failed for {from}..={to}"))?;

  for date in rounds_core::schedule::dates_between(from, to) {
    let counts = engine
      .store()
      .status_counts(date)
      .await
      .with_context(|| format!("failed to summarise {date}"))?;
    let summary: Vec<String> = counts.iter().map(|(s, n)| format!("{s}={n}")).collect();
    println!("{date}: {}", summary.join(" "));
  }
  println!("created {created} obligation(s)");
  Ok(())
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
