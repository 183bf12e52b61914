//! Error type for `pulse-store-sqlite`.

use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  /// A row holds a timestamp that is not in canonical form.
  #[error("corrupt timestamp in store: {0}")]
  Timestamp(#[from] pulse_core::Rejection),

  #[error("{op} did not complete within {after:?}")]
  Timeout { op: &'static str, after: Duration },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
