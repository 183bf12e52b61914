//! Core types and logic for the Pulse telemetry ingestion service.
//!
//! This crate is deliberately free of HTTP, SQL and Redis dependencies. The
//! durable store and the shared cache are reached through the
//! [`store::TimestampStore`] and [`cache::FastCache`] traits; concrete backends
//! live in their own crates and are injected at construction.

// We intentionally use native `async fn` in traits (stabilised in Rust 1.75).
// Suppress the advisory lint about `Send` bounds on the returned futures.
#![allow(async_fn_in_trait)]

pub mod cache;
pub mod error;
pub mod flatten;
pub mod ingest;
pub mod reading;
pub mod schema;
pub mod settings;
pub mod store;
pub mod timestamp;
pub mod watchdog;
pub mod window;

pub use error::{Error, Rejection, Result};
