//! Second-by-second reconstruction of a time window.
//!
//! Each second is looked up in the cache, then in the store. Seconds with no
//! data still produce an entry, so position `i` of the result always holds
//! `start + i` seconds. The walk costs one or two round-trips per second,
//! which is why the span is capped.

use std::sync::Arc;

use tracing::warn;

use crate::{
  Rejection,
  cache::FastCache,
  reading::Reading,
  settings::IngestSettings,
  store::TimestampStore,
  timestamp::Timestamp,
};

/// One second of a window.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowEntry {
  Found(Reading),
  NotFound(Timestamp),
}

impl WindowEntry {
  pub fn timestamp(&self) -> Timestamp {
    match self {
      Self::Found(r) => r.timestamp,
      Self::NotFound(ts) => *ts,
    }
  }

  pub fn reading(&self) -> Option<&Reading> {
    match self {
      Self::Found(r) => Some(r),
      Self::NotFound(_) => None,
    }
  }
}

/// Read-only: never writes to the cache or the store.
pub struct WindowReader<S, C> {
  store:    Arc<S>,
  cache:    Arc<C>,
  max_span: u64,
}

impl<S, C> WindowReader<S, C>
where
  S: TimestampStore,
  C: FastCache,
{
  pub fn new(store: Arc<S>, cache: Arc<C>, settings: &IngestSettings) -> Self {
    Self { store, cache, max_span: settings.max_window_secs }
  }

  pub fn max_span_secs(&self) -> u64 { self.max_span }

  /// Parse and bound-check a window given as text.
  pub fn bounds(&self, start: &str, end: &str) -> Result<(Timestamp, Timestamp), Rejection> {
    let start = Timestamp::parse(start)?;
    let end = Timestamp::parse(end)?;
    self.check_span(start, end)?;
    Ok((start, end))
  }

  fn check_span(&self, start: Timestamp, end: Timestamp) -> Result<(), Rejection> {
    let span = end.seconds_since(start);
    if span < 0 {
      return Err(Rejection::EndBeforeStart { start, end });
    }
    if span.unsigned_abs() > self.max_span {
      return Err(Rejection::WindowTooLarge { span_secs: span, max_secs: self.max_span });
    }
    Ok(())
  }

  /// Every second from `start` to `end` inclusive, given as text.
  pub async fn read(&self, start: &str, end: &str) -> Result<Vec<WindowEntry>, Rejection> {
    let (start, end) = self.bounds(start, end)?;
    Ok(self.walk(start, end).await)
  }

  /// Every second from `start` to `end` inclusive.
  pub async fn read_range(&self, start: Timestamp, end: Timestamp) -> Result<Vec<WindowEntry>, Rejection> {
    self.check_span(start, end)?;
    Ok(self.walk(start, end).await)
  }

  async fn walk(&self, start: Timestamp, end: Timestamp) -> Vec<WindowEntry> {
    let mut use_cache = true;
    let mut entries = Vec::new();
    for ts in Timestamp::each_second(start, end) {
      entries.push(self.lookup(ts, &mut use_cache).await);
    }
    entries
  }

  /// A failed lookup yields `NotFound` for this second only. The first cache
  /// failure switches the rest of the walk to the store.
  async fn lookup(&self, ts: Timestamp, use_cache: &mut bool) -> WindowEntry {
    if *use_cache {
      let key = ts.to_string();
      match self.cache.get(&key).await {
        Ok(Some(raw)) => match Reading::from_json_str(&raw) {
          Ok(reading) if reading.timestamp == ts => return WindowEntry::Found(reading),
          _ => warn!(%key, "ignoring unreadable cache entry"),
        },
        Ok(None) => {}
        Err(e) => {
          warn!(error = %e, "cache unavailable, reading rest of window from store");
          *use_cache = false;
        }
      }
    }

    match self.store.get(ts).await {
      Ok(Some(reading)) => WindowEntry::Found(reading),
      Ok(None) => WindowEntry::NotFound(ts),
      Err(e) => {
        warn!(error = %e, timestamp = %ts, "store lookup failed");
        WindowEntry::NotFound(ts)
      }
    }
  }
}
