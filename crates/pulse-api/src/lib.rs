//! JSON REST API for Pulse.
//!
//! Exposes an axum [`Router`] backed by any [`TimestampStore`] and
//! [`FastCache`]. TLS, auth, and transport concerns are the caller's
//! responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api/v0.1", pulse_api::api_router(state))
//! ```

pub mod error;
pub mod posts;
pub mod watchdog;


use std::sync::Arc;

use axum::{Router, routing::get};
use pulse_core::{
  cache::FastCache,
  ingest::IngestionGate,
  settings::IngestSettings,
  store::TimestampStore,
  watchdog::Watchdog,
  window::WindowReader,
};

pub use error::ApiError;

/// Everything the handlers share. Cloning is cheap.
pub struct AppState<S, C> {
  pub store:          Arc<S>,
  pub gate:           Arc<IngestionGate<S, C>>,
  pub reader:         Arc<WindowReader<S, C>>,
  pub watchdog:       Arc<Watchdog<C>>,
  /// Separator used to flatten nested submissions.
  pub separator:      Arc<str>,
  pub posts_per_page: usize,
}

impl<S, C> Clone for AppState<S, C> {
  fn clone(&self) -> Self {
    Self {
      store:          self.store.clone(),
      gate:           self.gate.clone(),
      reader:         self.reader.clone(),
      watchdog:       self.watchdog.clone(),
      separator:      self.separator.clone(),
      posts_per_page: self.posts_per_page,
    }
  }
}

impl<S, C> AppState<S, C>
where
  S: TimestampStore,
  C: FastCache,
{
  /// Wire the ingestion gate, window reader, and watchdog over one store and
  /// one cache.
  pub fn new(store: Arc<S>, cache: Arc<C>, settings: &IngestSettings, posts_per_page: usize) -> Self {
    let watchdog = Arc::new(Watchdog::new(
      cache.clone(),
      settings.watchdog_timeout(),
      settings.reading_ttl(),
    ));
    let gate = IngestionGate::new(store.clone(), cache.clone(), watchdog.clone(), settings);
    let reader = WindowReader::new(store.clone(), cache, settings);

    Self {
      store,
      gate: Arc::new(gate),
      reader: Arc::new(reader),
      watchdog,
      separator: Arc::from(settings.separator.as_str()),
      posts_per_page: posts_per_page.max(1),
    }
  }
}

/// Build a fully-materialised API router for `state`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S, C>(state: AppState<S, C>) -> Router<()>
where
  S: TimestampStore + 'static,
  C: FastCache + 'static,
{
  Router::new()
    // Readings
    .route("/posts/", get(posts::list::<S, C>).post(posts::create::<S, C>))
    .route("/posts/{start}/{end}", get(posts::window::<S, C>))
    // Liveness
    .route("/watchdog", get(watchdog::status::<S, C>))
    .with_state(state)
}
