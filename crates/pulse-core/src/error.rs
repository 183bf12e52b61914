//! Error types for `pulse-core`.

use thiserror::Error;

use crate::timestamp::Timestamp;

/// A deterministic refusal of a submission or query.
///
/// Rejections are expected outcomes: retrying the same input yields the same
/// rejection, so callers must change the input rather than back off.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Rejection {
  #[error("timestamp is missing or not RFC 3339 (YYYY-MM-DDTHH:MM:SSZ): {0:?}")]
  InvalidTimestamp(Option<String>),

  #[error("sensor data missing for: {}", .0.join(", "))]
  MissingSensors(Vec<String>),

  #[error("sensors not in the accepted schema: {}", .0.join(", "))]
  UnexpectedSensors(Vec<String>),

  #[error("{0} is already in the cache")]
  DuplicateInCache(Timestamp),

  #[error("{0} is already in the store")]
  DuplicateInStore(Timestamp),

  #[error("end time {end} is before start time {start}")]
  EndBeforeStart { start: Timestamp, end: Timestamp },

  #[error("window of {span_secs}s exceeds the maximum of {max_secs}s")]
  WindowTooLarge { span_secs: i64, max_secs: u64 },
}

impl Rejection {
  /// `true` for the idempotency outcomes, which replays produce routinely.
  pub fn is_duplicate(&self) -> bool {
    matches!(self, Self::DuplicateInCache(_) | Self::DuplicateInStore(_))
  }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("rejected: {0}")]
  Rejected(#[from] Rejection),

  /// The durable store could not be reached or failed mid-call. Retryable.
  #[error("store unavailable: {0}")]
  StoreUnavailable(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("serialization error: {0}")]
  Serialization(#[from] serde_json::Error),
}

impl Error {
  pub(crate) fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::StoreUnavailable(Box::new(err))
  }

  /// The rejection carried by this error, if it is one.
  pub fn rejection(&self) -> Option<&Rejection> {
    match self {
      Self::Rejected(r) => Some(r),
      _ => None,
    }
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
