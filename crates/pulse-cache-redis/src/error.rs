//! Error type for `pulse-cache-redis`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("invalid redis url: {0}")]
  InvalidUrl(#[from] redis::RedisError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
