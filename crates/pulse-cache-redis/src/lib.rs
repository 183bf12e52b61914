//! Redis backend for the Pulse cache.
//!
//! The connection is opened lazily through a
//! [`redis::aio::ConnectionManager`], so a Redis that is down at boot does not
//! block startup: every call made while it is unreachable fails fast with
//! [`pulse_core::cache::CacheUnavailable`] and the next call tries again.

mod cache;
mod command;

pub mod error;

pub use cache::{RedisCache, RedisOptions};
pub use error::{Error, Result};
