//! Tunables consumed by the ingestion, window and liveness components.

use std::time::Duration;

use serde::Deserialize;

use crate::{cache::Expiry, flatten::DEFAULT_SEPARATOR, schema::AcceptedSchema};

/// Deserialised from the `[ingest]` table of the server configuration.
/// Every field has a default, so an absent table is valid.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
  /// Cache lifetime of readings and of the watchdog key. `0` means the
  /// entries never expire.
  pub reading_ttl_secs:      u64,
  /// Silence longer than this marks the producer as dead.
  pub watchdog_timeout_secs: u64,
  /// Widest window a single range query may span.
  pub max_window_secs:       u64,
  /// Flattened field names a reading must carry.
  pub accepted_fields:       Vec<String>,
  pub separator:             String,
  /// Presence of this field marks a message as a heartbeat.
  pub heartbeat_field:       String,
}

impl Default for IngestSettings {
  fn default() -> Self {
    Self {
      reading_ttl_secs:      3600 * 24 * 3,
      watchdog_timeout_secs: 10,
      max_window_secs:       1800,
      accepted_fields:       vec!["datetime".to_owned(), "sensor_1".to_owned()],
      separator:             DEFAULT_SEPARATOR.to_owned(),
      heartbeat_field:       "heartbeat".to_owned(),
    }
  }
}

impl IngestSettings {
  pub fn reading_ttl(&self) -> Expiry {
    match self.reading_ttl_secs {
      0 => Expiry::Never,
      secs => Expiry::After(Duration::from_secs(secs)),
    }
  }

  pub fn watchdog_timeout(&self) -> Duration { Duration::from_secs(self.watchdog_timeout_secs) }

  pub fn schema(&self) -> AcceptedSchema { AcceptedSchema::new(self.accepted_fields.iter().cloned()) }
}
