//! SQL schema for the Pulse SQLite store.
//!
//! Executed once at connection startup. Future migrations will be gated on
//! `PRAGMA user_version`.

/// Full schema DDL; idempotent thanks to `CREATE TABLE IF NOT EXISTS`.
pub const SCHEMA: &str = "
PRAGMA journal_mode = WAL;
PRAGMA busy_timeout = 1000;

-- One row per distinct timestamp. Rows are never updated.
-- The canonical `YYYY-MM-DDTHH:MM:SSZ` form sorts chronologically, so the
-- primary key doubles as the listing order.
CREATE TABLE IF NOT EXISTS readings (
    datetime     TEXT PRIMARY KEY,
    sensors_json TEXT NOT NULL,   -- JSON object: sensor name -> string | null
    received_at  TEXT NOT NULL    -- RFC 3339 UTC; server-assigned
);

PRAGMA user_version = 1;
";
