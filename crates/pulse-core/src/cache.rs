//! The `FastCache` trait and an in-process implementation.
//!
//! The cache is shared between replicas and may be unreachable at any time.
//! Every method therefore reports [`CacheUnavailable`] instead of failing the
//! caller's operation; the components decide how to degrade.

use std::{
  collections::HashMap,
  future::Future,
  sync::{
    Mutex, MutexGuard, PoisonError,
    atomic::{AtomicBool, Ordering},
  },
  time::{Duration, Instant},
};

use thiserror::Error;

/// Lifetime of a cache entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expiry {
  Never,
  After(Duration),
}

/// The cache could not be reached or did not answer in time.
#[derive(Debug, Clone, Error)]
#[error("cache unavailable: {0}")]
pub struct CacheUnavailable(pub String);

/// A shared key/value cache with per-key expiry.
pub trait FastCache: Send + Sync {
  /// Store `value` under `key` only if the key is absent, in a single atomic
  /// round-trip. Returns `true` if this call created the entry.
  fn set_if_absent<'a>(
    &'a self,
    key: &'a str,
    value: &'a str,
    expiry: Expiry,
  ) -> impl Future<Output = Result<bool, CacheUnavailable>> + Send + 'a;

  fn get<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<Option<String>, CacheUnavailable>> + Send + 'a;

  /// Unconditional write; last writer wins.
  fn set<'a>(
    &'a self,
    key: &'a str,
    value: &'a str,
    expiry: Expiry,
  ) -> impl Future<Output = Result<(), CacheUnavailable>> + Send + 'a;

  fn delete<'a>(
    &'a self,
    key: &'a str,
  ) -> impl Future<Output = Result<(), CacheUnavailable>> + Send + 'a;

  /// Drop every entry this cache owns.
  fn clear(&self) -> impl Future<Output = Result<(), CacheUnavailable>> + Send + '_;
}

// ─── In-process cache ────────────────────────────────────────────────────────

struct Entry {
  value:      String,
  expires_at: Option<Instant>,
}

impl Entry {
  fn is_live(&self, now: Instant) -> bool { self.expires_at.is_none_or(|at| now < at) }
}

/// A [`FastCache`] held in process memory.
///
/// Suitable for single-replica deployments and tests. It can be switched
/// offline to reproduce a cache outage.
#[derive(Default)]
pub struct MemoryCache {
  entries: Mutex<HashMap<String, Entry>>,
  offline: AtomicBool,
}

impl MemoryCache {
  pub fn new() -> Self { Self::default() }

  /// While offline every operation fails with [`CacheUnavailable`].
  pub fn set_offline(&self, offline: bool) { self.offline.store(offline, Ordering::SeqCst); }

  fn entries(&self) -> Result<MutexGuard<'_, HashMap<String, Entry>>, CacheUnavailable> {
    if self.offline.load(Ordering::SeqCst) {
      return Err(CacheUnavailable("memory cache is offline".to_owned()));
    }
    Ok(self.entries.lock().unwrap_or_else(PoisonError::into_inner))
  }

  fn entry(value: &str, expiry: Expiry) -> Entry {
    Entry {
      value:      value.to_owned(),
      expires_at: match expiry {
        Expiry::Never => None,
        Expiry::After(ttl) => Some(Instant::now() + ttl),
      },
    }
  }
}

impl FastCache for MemoryCache {
  async fn set_if_absent(&self, key: &str, value: &str, expiry: Expiry) -> Result<bool, CacheUnavailable> {
    let mut entries = self.entries()?;
    if entries.get(key).is_some_and(|e| e.is_live(Instant::now())) {
      return Ok(false);
    }
    entries.insert(key.to_owned(), Self::entry(value, expiry));
    Ok(true)
  }

  async fn get(&self, key: &str) -> Result<Option<String>, CacheUnavailable> {
    let entries = self.entries()?;
    Ok(
      entries
        .get(key)
        .filter(|e| e.is_live(Instant::now()))
        .map(|e| e.value.clone()),
    )
  }

  async fn set(&self, key: &str, value: &str, expiry: Expiry) -> Result<(), CacheUnavailable> {
    self.entries()?.insert(key.to_owned(), Self::entry(value, expiry));
    Ok(())
  }

  async fn delete(&self, key: &str) -> Result<(), CacheUnavailable> {
    self.entries()?.remove(key);
    Ok(())
  }

  async fn clear(&self) -> Result<(), CacheUnavailable> {
    self.entries()?.clear();
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[tokio::test]
  async fn set_if_absent_only_creates_once() {
    let cache = MemoryCache::new();
    assert!(cache.set_if_absent("k", "a", Expiry::Never).await.unwrap());
    assert!(!cache.set_if_absent("k", "b", Expiry::Never).await.unwrap());
    assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("a"));
  }

  #[tokio::test]
  async fn expired_entries_are_absent() {
    let cache = MemoryCache::new();
    cache.set("k", "a", Expiry::After(Duration::ZERO)).await.unwrap();
    assert_eq!(cache.get("k").await.unwrap(), None);
    assert!(cache.set_if_absent("k", "b", Expiry::Never).await.unwrap());
  }

  #[tokio::test]
  async fn offline_cache_reports_unavailable() {
    let cache = MemoryCache::new();
    cache.set("k", "a", Expiry::Never).await.unwrap();
    cache.set_offline(true);
    assert!(cache.get("k").await.is_err());
    assert!(cache.set_if_absent("j", "b", Expiry::Never).await.is_err());
    cache.set_offline(false);
    assert_eq!(cache.get("k").await.unwrap().as_deref(), Some("a"));
  }
}
