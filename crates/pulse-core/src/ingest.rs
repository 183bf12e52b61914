//! At-most-once ingestion of readings.
//!
//! The cache is the primary uniqueness gate: a reading is only written to the
//! durable store by the submission that atomically created its cache entry.
//! The store's own uniqueness constraint backs that up for entries lost to a
//! cache flush and for submissions made while the cache is unreachable.

use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
  Error, Rejection, Result,
  cache::{Expiry, FastCache},
  reading::{FlattenedMessage, Reading, TIMESTAMP_FIELD},
  schema::AcceptedSchema,
  settings::IngestSettings,
  store::{InsertOutcome, TimestampStore},
  timestamp::Timestamp,
  watchdog::Watchdog,
};

/// Successful outcome of [`IngestionGate::submit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Accepted {
  /// A new reading was persisted.
  Stored(Timestamp),
  /// A heartbeat; nothing was persisted.
  Heartbeat,
}

pub struct IngestionGate<S, C> {
  store:           Arc<S>,
  cache:           Arc<C>,
  watchdog:        Arc<Watchdog<C>>,
  schema:          AcceptedSchema,
  expiry:          Expiry,
  heartbeat_field: String,
}

impl<S, C> IngestionGate<S, C>
where
  S: TimestampStore,
  C: FastCache,
{
  pub fn new(
    store: Arc<S>,
    cache: Arc<C>,
    watchdog: Arc<Watchdog<C>>,
    settings: &IngestSettings,
  ) -> Self {
    Self {
      store,
      cache,
      watchdog,
      schema: settings.schema(),
      expiry: settings.reading_ttl(),
      heartbeat_field: settings.heartbeat_field.clone(),
    }
  }

  pub fn schema(&self) -> &AcceptedSchema { &self.schema }

  /// Pet the watchdog, then validate and persist `message`.
  ///
  /// The pet happens whatever the outcome: liveness reflects traffic seen,
  /// not data accepted.
  pub async fn submit(&self, message: &FlattenedMessage) -> Result<Accepted> {
    self.watchdog.pet().await;

    if message.has_root(&self.heartbeat_field) {
      debug!("heartbeat received");
      return Ok(Accepted::Heartbeat);
    }

    let reading = self.validate(message).inspect_err(|r| {
      warn!(
        timestamp = message.timestamp_text().unwrap_or("<none>"),
        reason = %r,
        "reading rejected",
      );
    })?;

    let key = reading.timestamp.to_string();
    let body = reading.to_json_string()?;

    match self.cache.set_if_absent(&key, &body, self.expiry).await {
      Ok(true) => self.persist_gated(&reading, &key).await,
      Ok(false) => {
        warn!(timestamp = %reading.timestamp, "duplicate reading caught by cache");
        Err(Rejection::DuplicateInCache(reading.timestamp).into())
      }
      Err(e) => {
        warn!(error = %e, timestamp = %reading.timestamp, "cache unavailable, writing to store directly");
        self.persist_ungated(&reading).await
      }
    }
  }

  /// Check the timestamp, then missing sensors, then unexpected sensors.
  pub fn validate(&self, message: &FlattenedMessage) -> Result<Reading, Rejection> {
    let timestamp = match message.timestamp_text() {
      Some(text) => Timestamp::parse(text)?,
      None => {
        let raw = message.get(TIMESTAMP_FIELD).map(ToString::to_string);
        return Err(Rejection::InvalidTimestamp(raw));
      }
    };

    let diff = self.schema.diff(message);
    if !diff.missing.is_empty() {
      return Err(Rejection::MissingSensors(diff.missing));
    }
    if !diff.extra.is_empty() {
      return Err(Rejection::UnexpectedSensors(diff.extra));
    }

    Ok(Reading { timestamp, sensors: message.sensor_values() })
  }

  /// This call owns the fresh cache entry for `key`; write it through.
  async fn persist_gated(&self, reading: &Reading, key: &str) -> Result<Accepted> {
    match self.store.insert(reading).await {
      Ok(InsertOutcome::Inserted) => {
        info!(timestamp = %reading.timestamp, "reading stored");
        Ok(Accepted::Stored(reading.timestamp))
      }
      Ok(InsertOutcome::Duplicate) => {
        warn!(timestamp = %reading.timestamp, "duplicate reading caught by store");
        Err(Rejection::DuplicateInStore(reading.timestamp).into())
      }
      Err(e) => {
        // Release the key so a retry is not mistaken for a replay.
        if let Err(ce) = self.cache.delete(key).await {
          warn!(error = %ce, %key, "could not release cache entry after store failure");
        }
        Err(Error::store(e))
      }
    }
  }

  /// Degraded path: the store alone decides uniqueness.
  async fn persist_ungated(&self, reading: &Reading) -> Result<Accepted> {
    let existing = self.store.get(reading.timestamp).await.map_err(Error::store)?;
    let outcome = match existing {
      Some(_) => InsertOutcome::Duplicate,
      None => self.store.insert(reading).await.map_err(Error::store)?,
    };

    match outcome {
      InsertOutcome::Inserted => {
        info!(timestamp = %reading.timestamp, "reading stored without cache");
        Ok(Accepted::Stored(reading.timestamp))
      }
      InsertOutcome::Duplicate => {
        warn!(timestamp = %reading.timestamp, "duplicate reading caught by store");
        Err(Rejection::DuplicateInStore(reading.timestamp).into())
      }
    }
  }
}
