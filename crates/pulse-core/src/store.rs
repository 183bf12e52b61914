//! The `TimestampStore` trait and supporting types.
//!
//! The trait is implemented by durable backends (e.g. `pulse-store-sqlite`).
//! The ingestion and window components depend on this abstraction, not on
//! any concrete backend.

use std::future::Future;

use serde::Serialize;

use crate::{reading::Reading, timestamp::Timestamp};

/// Outcome of [`TimestampStore::insert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
  Inserted,
  /// A record with the same timestamp already exists; nothing was written.
  Duplicate,
}

/// One page of a newest-first listing.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
  pub items:    Vec<T>,
  /// 1-based page number.
  pub page:     usize,
  pub per_page: usize,
  /// Total records across all pages.
  pub total:    u64,
}

impl<T> Page<T> {
  pub fn has_prev(&self) -> bool { self.page > 1 }

  pub fn has_next(&self) -> bool { (self.page as u64).saturating_mul(self.per_page as u64) < self.total }
}

/// Abstraction over the durable reading store.
///
/// Readings are keyed by timestamp and are never updated in place; the
/// backend must enforce timestamp uniqueness itself so that it remains the
/// final backstop when two submissions race past the cache.
pub trait TimestampStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Insert `reading` unless its timestamp is already present.
  fn insert<'a>(
    &'a self,
    reading: &'a Reading,
  ) -> impl Future<Output = Result<InsertOutcome, Self::Error>> + Send + 'a;

  /// Exact-match lookup by timestamp. Returns `None` if not found.
  fn get(
    &self,
    timestamp: Timestamp,
  ) -> impl Future<Output = Result<Option<Reading>, Self::Error>> + Send + '_;

  /// Newest-first listing. `page` is 1-based; a page past the end is empty.
  fn page(
    &self,
    page: usize,
    per_page: usize,
  ) -> impl Future<Output = Result<Page<Reading>, Self::Error>> + Send + '_;
}
