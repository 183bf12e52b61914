//! The Redis implementation of [`FastCache`].

use std::time::Duration;

use pulse_core::{
  cache::{CacheUnavailable, Expiry, FastCache},
  timestamp::Timestamp,
  watchdog::WATCHDOG_KEY,
};
use redis::{
  Client, RedisError,
  aio::{ConnectionManager, ConnectionManagerConfig},
};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::{Result, command};

/// Connection settings for [`RedisCache`].
#[derive(Debug, Clone)]
pub struct RedisOptions {
  pub url:              String,
  /// Prepended to every key. Empty means keys are used verbatim.
  pub key_prefix:       String,
  pub connect_timeout:  Duration,
  pub response_timeout: Duration,
}

impl Default for RedisOptions {
  fn default() -> Self {
    Self {
      url:              "redis://127.0.0.1:6379".to_owned(),
      key_prefix:       String::new(),
      connect_timeout:  Duration::from_millis(250),
      response_timeout: Duration::from_millis(500),
    }
  }
}

/// A [`FastCache`] shared by every replica that points at the same Redis.
pub struct RedisCache {
  client:  Client,
  conn:    OnceCell<ConnectionManager>,
  options: RedisOptions,
}

fn unavailable(e: RedisError) -> CacheUnavailable { CacheUnavailable(e.to_string()) }

impl RedisCache {
  /// Validate the URL. No connection is attempted until first use.
  pub fn new(options: RedisOptions) -> Result<Self> {
    let client = Client::open(options.url.as_str())?;
    Ok(Self { client, conn: OnceCell::new(), options })
  }

  fn key(&self, key: &str) -> String { format!("{}{key}", self.options.key_prefix) }

  async fn connection(&self) -> Result<ConnectionManager, CacheUnavailable> {
    let conn = self
      .conn
      .get_or_try_init(|| async {
        let config = ConnectionManagerConfig::new()
          .set_number_of_retries(1)
          .set_connection_timeout(self.options.connect_timeout)
          .set_response_timeout(self.options.response_timeout);

        let manager = tokio::time::timeout(
          self.options.connect_timeout * 2,
          self.client.get_connection_manager_with_config(config),
        )
        .await
        .map_err(|_| CacheUnavailable(format!("no connection within {:?}", self.options.connect_timeout * 2)))?
        .map_err(unavailable)?;

        info!(url = %self.options.url, "connected to redis");
        Ok::<_, CacheUnavailable>(manager)
      })
      .await?;
    Ok(conn.clone())
  }

  /// Delete the readings and the watchdog key this cache owns, walking the
  /// keyspace with `SCAN` so other tenants of the database are untouched.
  async fn clear_owned(&self, conn: &mut ConnectionManager) -> Result<(), CacheUnavailable> {
    let prefix = self.options.key_prefix.as_str();
    let pattern = command::owned_pattern(prefix);
    let mut cursor = 0;
    let mut deleted = 0;
    loop {
      let (next, keys): (u64, Vec<String>) = command::scan(cursor, &pattern)
        .query_async(conn)
        .await
        .map_err(unavailable)?;
      let owned: Vec<String> = keys.into_iter().filter(|k| owns(prefix, k)).collect();
      if !owned.is_empty() {
        deleted += owned.len();
        command::del(&owned).query_async::<()>(conn).await.map_err(unavailable)?;
      }
      if next == 0 {
        break;
      }
      cursor = next;
    }

    command::del(self.key(WATCHDOG_KEY))
      .query_async::<()>(conn)
      .await
      .map_err(unavailable)?;
    debug!(deleted, "cleared cache namespace");
    Ok(())
  }
}

/// Whether `key` belongs to a cache using `prefix`. Without a prefix only
/// canonical timestamps count; the glob alone also admits `2017-99-99T…`.
fn owns(prefix: &str, key: &str) -> bool {
  if prefix.is_empty() {
    Timestamp::parse(key).is_ok()
  } else {
    key.starts_with(prefix)
  }
}

impl FastCache for RedisCache {
  async fn set_if_absent(&self, key: &str, value: &str, expiry: Expiry) -> Result<bool, CacheUnavailable> {
    let mut conn = self.connection().await?;
    let reply: Option<String> = command::set(&self.key(key), value, expiry, true)
      .query_async(&mut conn)
      .await
      .map_err(unavailable)?;
    Ok(reply.is_some())
  }

  async fn get(&self, key: &str) -> Result<Option<String>, CacheUnavailable> {
    let mut conn = self.connection().await?;
    command::get(&self.key(key))
      .query_async(&mut conn)
      .await
      .map_err(unavailable)
  }

  async fn set(&self, key: &str, value: &str, expiry: Expiry) -> Result<(), CacheUnavailable> {
    let mut conn = self.connection().await?;
    command::set(&self.key(key), value, expiry, false)
      .query_async::<()>(&mut conn)
      .await
      .map_err(unavailable)
  }

  async fn delete(&self, key: &str) -> Result<(), CacheUnavailable> {
    let mut conn = self.connection().await?;
    command::del(self.key(key))
      .query_async::<()>(&mut conn)
      .await
      .map_err(unavailable)
  }

  async fn clear(&self) -> Result<(), CacheUnavailable> {
    let mut conn = self.connection().await?;
    self.clear_owned(&mut conn).await.inspect_err(|e| {
      warn!(error = %e, "could not clear redis cache");
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn unreachable() -> RedisCache {
    RedisCache::new(RedisOptions {
      url: "redis://127.0.0.1:1/".to_owned(),
      connect_timeout: Duration::from_millis(100),
      ..RedisOptions::default()
    })
    .unwrap()
  }

  #[test]
  fn keys_are_prefixed() {
    let cache = RedisCache::new(RedisOptions {
      key_prefix: "fcache".to_owned(),
      ..RedisOptions::default()
    })
    .unwrap();
    assert_eq!(cache.key("watchdog_datetime"), "fcachewatchdog_datetime");
  }

  #[test]
  fn bare_namespace_owns_only_canonical_timestamps() {
    assert!(owns("", "2017-09-13T13:01:57Z"));
    assert!(!owns("", "2017-99-99T99:99:99Z"));
    assert!(!owns("", "session:42"));
    assert!(owns("fcache", "fcache2017-09-13T13:01:57Z"));
    assert!(!owns("fcache", "other2017-09-13T13:01:57Z"));
  }

  #[test]
  fn invalid_url_is_rejected_up_front() {
    let result = RedisCache::new(RedisOptions {
      url: "not a url".to_owned(),
      ..RedisOptions::default()
    });
    assert!(result.is_err());
  }

  #[tokio::test]
  async fn unreachable_server_reports_unavailable() {
    let cache = unreachable();
    assert!(cache.get("2017-09-13T13:01:57Z").await.is_err());
    assert!(
      cache
        .set_if_absent("2017-09-13T13:01:57Z", "{}", Expiry::Never)
        .await
        .is_err()
    );
    assert!(cache.clear().await.is_err());
  }
}
