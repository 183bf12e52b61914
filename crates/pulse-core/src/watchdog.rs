//! Liveness tracking through a single shared cache key.
//!
//! The watchdog keeps no state of its own beyond its timeout. The time of
//! the last pet lives in the cache, so every replica sharing that cache sees
//! the same liveness signal. Concurrent pets race with last-writer-wins
//! semantics, which is fine since only the newest pet matters.

use std::{sync::Arc, time::Duration};

use serde::Serialize;
use tracing::warn;

use crate::{
  cache::{Expiry, FastCache},
  timestamp::Timestamp,
};

/// Cache key holding the last pet time.
pub const WATCHDOG_KEY: &str = "watchdog_datetime";

/// Snapshot of the liveness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Liveness {
  pub alive:        bool,
  pub last_pet:     Timestamp,
  pub timeout_secs: u64,
}

pub struct Watchdog<C> {
  cache:   Arc<C>,
  timeout: Duration,
  expiry:  Expiry,
}

impl<C: FastCache> Watchdog<C> {
  /// `expiry` bounds how long the pet survives in the cache; `timeout` is the
  /// silence after which [`Watchdog::is_alive`] turns false.
  pub fn new(cache: Arc<C>, timeout: Duration, expiry: Expiry) -> Self {
    Self { cache, timeout, expiry }
  }

  pub fn timeout(&self) -> Duration { self.timeout }

  /// Record that traffic was seen now. Cache failures are logged and
  /// swallowed.
  pub async fn pet(&self) {
    let now = Timestamp::now().to_string();
    if let Err(e) = self.cache.set(WATCHDOG_KEY, &now, self.expiry).await {
      warn!(error = %e, "watchdog: could not record pet");
    }
  }

  /// Time of the last pet, or the epoch if none is recorded (or the cache
  /// cannot be read).
  pub async fn last_pet_time(&self) -> Timestamp {
    match self.cache.get(WATCHDOG_KEY).await {
      Ok(Some(raw)) => Timestamp::parse(&raw).unwrap_or_else(|_| {
        warn!(value = %raw, "watchdog: ignoring unparsable pet time");
        Timestamp::epoch()
      }),
      Ok(None) => Timestamp::epoch(),
      Err(e) => {
        warn!(error = %e, "watchdog: could not read pet time");
        Timestamp::epoch()
      }
    }
  }

  pub async fn is_alive(&self) -> bool { self.status_at(Timestamp::now()).await.alive }

  /// Liveness as judged at `now`.
  ///
  /// A `last_pet` later than `now` (a replica whose clock runs ahead) counts
  /// as zero silence, so the producer reads as alive.
  pub async fn status_at(&self, now: Timestamp) -> Liveness {
    let last_pet = self.last_pet_time().await;
    let silence = now.seconds_since(last_pet).max(0);
    let timeout_secs = self.timeout.as_secs();
    Liveness {
      alive: silence <= i64::try_from(timeout_secs).unwrap_or(i64::MAX),
      last_pet,
      timeout_secs,
    }
  }

  pub async fn status(&self) -> Liveness { self.status_at(Timestamp::now()).await }
}
