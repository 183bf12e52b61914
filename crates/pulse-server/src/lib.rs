//! HTTP server wiring for Pulse.
//!
//! Loads [`ServerConfig`], builds the backends it names, and mounts the
//! [`pulse_api`] router under [`API_PREFIX`].

use std::{path::PathBuf, time::Duration};

use axum::Router;
use pulse_api::{AppState, api_router};
use pulse_cache_redis::RedisOptions;
use pulse_core::{cache::FastCache, settings::IngestSettings, store::TimestampStore};
use pulse_store_sqlite::StoreOptions;
use serde::Deserialize;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Path under which the JSON API is served.
pub const API_PREFIX: &str = "/api/v0.1";

/// Prefix of environment variables that override the config file, e.g.
/// `PULSE_PORT` or `PULSE_INGEST__MAX_WINDOW_SECS`.
pub const ENV_PREFIX: &str = "PULSE";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and the
/// environment. Every field has a default.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                      String,
  pub port:                      u16,
  pub store_path:                PathBuf,
  pub redis_url:                 String,
  pub cache_key_prefix:          String,
  pub cache_connect_timeout_ms:  u64,
  pub cache_response_timeout_ms: u64,
  pub store_timeout_ms:          u64,
  pub slow_query_ms:             u64,
  /// Clear the cache namespace at boot.
  pub clear_cache_on_start:      bool,
  pub posts_per_page:            usize,
  pub ingest:                    IngestSettings,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                      "127.0.0.1".to_owned(),
      port:                      8080,
      store_path:                PathBuf::from("pulse.db"),
      redis_url:                 "redis://127.0.0.1:6379".to_owned(),
      cache_key_prefix:          String::new(),
      cache_connect_timeout_ms:  250,
      cache_response_timeout_ms: 500,
      store_timeout_ms:          5_000,
      slow_query_ms:             50,
      clear_cache_on_start:      true,
      posts_per_page:            20,
      ingest:                    IngestSettings::default(),
    }
  }
}

impl ServerConfig {
  /// Layer `env` over the TOML file at `path` (which may be absent) and over
  /// the defaults.
  pub fn load(path: PathBuf, env: config::Environment) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(env)
      .build()?
      .try_deserialize()
  }

  /// The environment source used by the server binary.
  pub fn environment() -> config::Environment {
    config::Environment::with_prefix(ENV_PREFIX)
      .prefix_separator("_")
      .separator("__")
      .try_parsing(true)
  }

  pub fn store_options(&self) -> StoreOptions {
    StoreOptions {
      timeout:    Duration::from_millis(self.store_timeout_ms),
      slow_query: Duration::from_millis(self.slow_query_ms),
    }
  }

  pub fn redis_options(&self) -> RedisOptions {
    RedisOptions {
      url:              self.redis_url.clone(),
      key_prefix:       self.cache_key_prefix.clone(),
      connect_timeout:  Duration::from_millis(self.cache_connect_timeout_ms),
      response_timeout: Duration::from_millis(self.cache_response_timeout_ms),
    }
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }
}

// ─── Startup ──────────────────────────────────────────────────────────────────

/// Drop cached entries left over from a previous run. An unreachable cache
/// is not fatal: ingestion falls back to the store until it returns.
pub async fn clear_cache<C: FastCache>(cache: &C) {
  match cache.clear().await {
    Ok(()) => info!("cache cleared"),
    Err(e) => warn!(error = %e, "cache unreachable at startup; continuing without clearing it"),
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the full application router: the API under [`API_PREFIX`], with
/// request tracing.
pub fn router<S, C>(state: AppState<S, C>) -> Router
where
  S: TimestampStore + 'static,
  C: FastCache + 'static,
{
  Router::new()
    .nest(API_PREFIX, api_router(state))
    .layer(TraceLayer::new_for_http())
}
