//! The SQLite implementation of [`TimestampStore`].

use std::{
  path::Path,
  time::{Duration, Instant},
};

use chrono::Utc;
use rusqlite::OptionalExtension as _;
use tracing::warn;

use pulse_core::{
  reading::Reading,
  store::{InsertOutcome, Page, TimestampStore},
  timestamp::Timestamp,
};

use crate::{
  Error, Result,
  encode::{RawReading, encode_dt, encode_sensors, encode_timestamp},
  schema::SCHEMA,
};

// ─── Options ─────────────────────────────────────────────────────────────────

/// Per-call limits applied to every store operation.
#[derive(Debug, Clone, Copy)]
pub struct StoreOptions {
  /// A call still running after this long fails with [`Error::Timeout`].
  pub timeout:    Duration,
  /// Calls at least this slow are logged.
  pub slow_query: Duration,
}

impl Default for StoreOptions {
  fn default() -> Self {
    Self {
      timeout:    Duration::from_secs(5),
      slow_query: Duration::from_millis(50),
    }
  }
}

// ─── Store ───────────────────────────────────────────────────────────────────

/// A reading store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn:    tokio_rusqlite::Connection,
  options: StoreOptions,
}

impl SqliteStore {
  /// Open (or create) a store at `path` with default options.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::open_with(path, StoreOptions::default()).await
  }

  pub async fn open_with(path: impl AsRef<Path>, options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn, options };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    Self::open_in_memory_with(StoreOptions::default()).await
  }

  pub async fn open_in_memory_with(options: StoreOptions) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn, options };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .call("init_schema", |conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
  }

  /// Run `f` on the connection thread under the configured timeout, logging
  /// the call if it is slow.
  pub(crate) async fn call<F, R>(&self, op: &'static str, f: F) -> Result<R>
  where
    F: FnOnce(&mut rusqlite::Connection) -> tokio_rusqlite::Result<R> + Send + 'static,
    R: Send + 'static,
  {
    let started = Instant::now();
    let result = tokio::time::timeout(self.options.timeout, self.conn.call(f)).await;

    let elapsed = started.elapsed();
    if elapsed >= self.options.slow_query {
      warn!(op, elapsed_ms = elapsed.as_millis() as u64, "slow store call");
    }

    match result {
      Ok(r) => Ok(r?),
      Err(_) => Err(Error::Timeout { op, after: self.options.timeout }),
    }
  }
}

// ─── TimestampStore impl ─────────────────────────────────────────────────────

impl TimestampStore for SqliteStore {
  type Error = Error;

  async fn insert(&self, reading: &Reading) -> Result<InsertOutcome> {
    let datetime    = encode_timestamp(reading.timestamp);
    let sensors     = encode_sensors(&reading.sensors)?;
    let received_at = encode_dt(Utc::now());

    let changed = self
      .call("insert", move |conn| {
        Ok(conn.execute(
          "INSERT INTO readings (datetime, sensors_json, received_at)
           VALUES (?1, ?2, ?3)
           ON CONFLICT (datetime) DO NOTHING",
          rusqlite::params![datetime, sensors, received_at],
        )?)
      })
      .await?;

    Ok(match changed {
      0 => InsertOutcome::Duplicate,
      _ => InsertOutcome::Inserted,
    })
  }

  async fn get(&self, timestamp: Timestamp) -> Result<Option<Reading>> {
    let datetime = encode_timestamp(timestamp);

    let raw: Option<RawReading> = self
      .call("get", move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT datetime, sensors_json FROM readings WHERE datetime = ?1",
              rusqlite::params![datetime],
              RawReading::from_row,
            )
            .optional()?,
        )
      })
      .await?;

    raw.map(RawReading::into_reading).transpose()
  }

  async fn page(&self, page: usize, per_page: usize) -> Result<Page<Reading>> {
    let page       = page.max(1);
    let limit_val  = i64::try_from(per_page).unwrap_or(i64::MAX);
    // Past any real row count; SQLite answers with an empty page.
    let offset_val = (page - 1)
      .checked_mul(per_page)
      .and_then(|o| i64::try_from(o).ok())
      .unwrap_or(i64::MAX);

    let (total, raws): (i64, Vec<RawReading>) = self
      .call("page", move |conn| {
        let total: i64 = conn.query_row("SELECT COUNT(*) FROM readings", [], |r| r.get(0))?;

        let mut stmt = conn.prepare(
          "SELECT datetime, sensors_json FROM readings
           ORDER BY datetime DESC
           LIMIT ?1 OFFSET ?2",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![limit_val, offset_val], RawReading::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok((total, rows))
      })
      .await?;

    Ok(Page {
      items: raws.into_iter().map(RawReading::into_reading).collect::<Result<_>>()?,
      page,
      per_page,
      total: total as u64,
    })
  }
}
