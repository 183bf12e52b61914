//! API error type and [`axum::response::IntoResponse`] implementation.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use pulse_core::Rejection;
use serde_json::json;
use thiserror::Error;
use tracing::error;

/// An error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
  /// The request envelope or its parameters could not be understood.
  #[error("bad request: {0}")]
  BadRequest(String),

  /// A well-formed submission that was refused.
  #[error("not acceptable: {0}")]
  NotAcceptable(Rejection),

  #[error("too many requests: {0}")]
  TooManyRequests(String),

  /// The store failed; the client should retry.
  #[error("store unavailable: {0}")]
  Unavailable(String),

  #[error("internal error: {0}")]
  Internal(String),
}

impl ApiError {
  /// Map a window-query rejection. Bad bounds are the client's mistake (400);
  /// an oversized span is a quota (429).
  pub fn window(rejection: Rejection) -> Self {
    match rejection {
      Rejection::WindowTooLarge { .. } => Self::TooManyRequests(rejection.to_string()),
      Rejection::InvalidTimestamp(_) | Rejection::EndBeforeStart { .. } => Self::BadRequest(rejection.to_string()),
      other => Self::NotAcceptable(other),
    }
  }

  pub fn status(&self) -> StatusCode {
    match self {
      Self::BadRequest(_) => StatusCode::BAD_REQUEST,
      Self::NotAcceptable(_) => StatusCode::NOT_ACCEPTABLE,
      Self::TooManyRequests(_) => StatusCode::TOO_MANY_REQUESTS,
      Self::Unavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
      Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
  }
}

impl From<pulse_core::Error> for ApiError {
  fn from(e: pulse_core::Error) -> Self {
    match e {
      pulse_core::Error::Rejected(r) => Self::NotAcceptable(r),
      pulse_core::Error::StoreUnavailable(e) => Self::Unavailable(e.to_string()),
      pulse_core::Error::Serialization(e) => Self::Internal(e.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    let message = match &self {
      ApiError::BadRequest(m) | ApiError::TooManyRequests(m) => m.clone(),
      ApiError::NotAcceptable(r) => r.to_string(),
      ApiError::Unavailable(m) | ApiError::Internal(m) => {
        error!(status = status.as_u16(), error = %m, "request failed");
        m.clone()
      }
    };
    (status, Json(json!({ "error": status.to_string(), "message": message }))).into_response()
  }
}
