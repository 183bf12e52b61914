//! Handlers for `/posts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/posts/` | Newest first; optional `?page=N` (1-based) |
//! | `POST` | `/posts/` | Body: one JSON reading or a heartbeat; 201 on store |
//! | `GET`  | `/posts/{start}/{end}` | One element per second, inclusive |

use axum::{
  Json,
  extract::{OriginalUri, Path, Query, State},
  http::{HeaderMap, StatusCode, header},
  response::IntoResponse,
};
use bytes::Bytes;
use pulse_core::{
  cache::FastCache,
  ingest::Accepted,
  reading::{FlattenedMessage, Reading},
  store::TimestampStore,
  timestamp::Timestamp,
  window::WindowEntry,
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::warn;

use crate::{AppState, error::ApiError};

// ─── List ─────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  #[serde(default = "first_page")]
  pub page: usize,
}

fn first_page() -> usize { 1 }

#[derive(Debug, Serialize)]
pub struct PageBody {
  pub data:  Vec<Reading>,
  /// Link to the previous page, if there is one.
  pub prev:  Option<String>,
  pub next:  Option<String>,
  pub count: u64,
}

/// `GET /posts/[?page=<n>]`
pub async fn list<S, C>(
  State(state): State<AppState<S, C>>,
  OriginalUri(uri): OriginalUri,
  Query(params): Query<ListParams>,
) -> Result<Json<PageBody>, ApiError>
where
  S: TimestampStore,
  C: FastCache,
{
  let page = state
    .store
    .page(params.page, state.posts_per_page)
    .await
    .map_err(|e| ApiError::Unavailable(e.to_string()))?;

  let link = |n: usize| format!("{}?page={n}", uri.path());
  Ok(Json(PageBody {
    prev:  page.has_prev().then(|| link(page.page - 1)),
    next:  page.has_next().then(|| link(page.page + 1)),
    count: page.total,
    data:  page.items,
  }))
}

// ─── Create ───────────────────────────────────────────────────────────────────

/// Decode a submission body. Only a JSON object sent as `application/json`
/// is accepted.
fn decode(headers: &HeaderMap, body: &[u8], separator: &str) -> Result<FlattenedMessage, &'static str> {
  let content_type = headers
    .get(header::CONTENT_TYPE)
    .ok_or("missing Content-Type: application/json header")?
    .to_str()
    .map_err(|_| "unreadable Content-Type header")?;
  let essence = content_type.split(';').next().unwrap_or_default().trim();
  if !essence.eq_ignore_ascii_case("application/json") {
    return Err("Content-Type: application/json not found");
  }

  let value: Value = serde_json::from_slice(body).map_err(|_| "body is not valid JSON")?;
  FlattenedMessage::from_json(&value, separator).ok_or("JSON root is not an object")
}

/// `POST /posts/`
pub async fn create<S, C>(
  State(state): State<AppState<S, C>>,
  headers: HeaderMap,
  body: Bytes,
) -> Result<impl IntoResponse, ApiError>
where
  S: TimestampStore,
  C: FastCache,
{
  let message = match decode(&headers, &body, &state.separator) {
    Ok(message) => message,
    Err(reason) => {
      // Malformed traffic is still traffic.
      state.watchdog.pet().await;
      warn!(reason, "malformed submission");
      return Err(ApiError::BadRequest(format!("Malformed JSON: {reason}")));
    }
  };

  Ok(match state.gate.submit(&message).await? {
    Accepted::Heartbeat => (
      StatusCode::OK,
      Json(json!({ "response": "200 OK", "message": "Heartbeat received." })),
    ),
    Accepted::Stored(_) => (
      StatusCode::CREATED,
      Json(json!({ "response": "201 data created", "message": "Data was successfully posted!" })),
    ),
  })
}

// ─── Window ───────────────────────────────────────────────────────────────────

/// Wire form of a [`WindowEntry`]: the reading itself, or a placeholder that
/// keeps the element's position.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum WindowItem {
  Found(Reading),
  Missing {
    datetime: Timestamp,
    #[serde(rename = "Error")]
    error:    &'static str,
  },
}

impl From<WindowEntry> for WindowItem {
  fn from(entry: WindowEntry) -> Self {
    match entry {
      WindowEntry::Found(reading) => Self::Found(reading),
      WindowEntry::NotFound(datetime) => Self::Missing { datetime, error: "Could not find data." },
    }
  }
}

/// `GET /posts/{start}/{end}`
pub async fn window<S, C>(
  State(state): State<AppState<S, C>>,
  Path((start, end)): Path<(String, String)>,
) -> Result<Json<Vec<WindowItem>>, ApiError>
where
  S: TimestampStore,
  C: FastCache,
{
  let entries = state.reader.read(&start, &end).await.map_err(ApiError::window)?;
  Ok(Json(entries.into_iter().map(WindowItem::from).collect()))
}
