//! pulse server binary.
//!
//! Reads `config.toml` (or the path specified with `--config`), overlays
//! `PULSE_*` environment variables, opens the SQLite store and the Redis
//! cache, and serves the JSON API over HTTP.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use clap::Parser;
use pulse_api::AppState;
use pulse_cache_redis::RedisCache;
use pulse_server::ServerConfig;
use pulse_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Pulse ingestion server")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing.
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let server_cfg = ServerConfig::load(cli.config, ServerConfig::environment())
    .context("failed to load configuration")?;

  // Expand `~` in store path.
  let store_path = expand_tilde(&server_cfg.store_path);

  // Open SQLite store.
  let store = SqliteStore::open_with(&store_path, server_cfg.store_options())
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  // The cache connects lazily, so a Redis that is down at boot only delays
  // the first cache call.
  let cache = RedisCache::new(server_cfg.redis_options())
    .with_context(|| format!("invalid redis url {:?}", server_cfg.redis_url))?;

  if server_cfg.clear_cache_on_start {
    pulse_server::clear_cache(&cache).await;
  }

  // Build application state.
  let state = AppState::new(
    Arc::new(store),
    Arc::new(cache),
    &server_cfg.ingest,
    server_cfg.posts_per_page,
  );

  let app = pulse_server::router(state);
  let address = server_cfg.address();

  tracing::info!("Listening on http://{address}{}", pulse_server::API_PREFIX);
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app).await.context("server error")?;

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
