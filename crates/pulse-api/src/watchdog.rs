//! `GET /watchdog`: the liveness signal shared by every replica.

use axum::{Json, extract::State};
use pulse_core::{cache::FastCache, store::TimestampStore, watchdog::Liveness};

use crate::AppState;

pub async fn status<S, C>(State(state): State<AppState<S, C>>) -> Json<Liveness>
where
  S: TimestampStore,
  C: FastCache,
{
  Json(state.watchdog.status().await)
}
