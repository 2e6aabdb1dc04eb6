//! shelfmark server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) plus `SHELFMARK_*`
//! environment variables, opens the SQLite store, serves the JSON API and runs
//! the fine and availability sweeps on an interval.
//!
//! ```sh
//! SHELFMARK_PORT=9000 shelfmark --config /etc/shelfmark.toml
//! shelfmark --once   # one maintenance pass, e.g. from cron
//! ```

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use axum::Router;
use clap::Parser;
use shelfmark_server::{ServerConfig, maintenance};
use shelfmark_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Shelfmark lending-library server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run one maintenance pass and exit instead of serving.
  #[arg(long)]
  once: bool,
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
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("SHELFMARK"))
    .build()
    .with_context(|| format!("failed to read config from {:?}", cli.config))?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;
  server_cfg.validate().context("invalid configuration")?;

  let store_path = expand_tilde(&server_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?
    .with_policy(server_cfg.policy());
  let store = Arc::new(store);

  if cli.once {
    let report = maintenance::run_once(store.as_ref())
      .await
      .context("maintenance pass failed")?;
    tracing::info!(
      examined = report.fines.examined,
      fined = report.fines.fined,
      notified = report.notified,
      "maintenance pass finished"
    );
    return Ok(());
  }

  let sweeper = {
    let store = Arc::clone(&store);
    let every = server_cfg.maintenance_interval();
    tokio::spawn(async move { maintenance::run_forever(store.as_ref(), every).await })
  };

  let app = Router::new().nest("/api", shelfmark_api::api_router(store));
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  let served = axum::serve(listener, app).await.context("server error");
  sweeper.abort();
  served
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
