//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored in their canonical text form. Sensor maps are stored
//! as compact JSON.

use chrono::{DateTime, Utc};
use pulse_core::{
  reading::{Reading, Sensors},
  timestamp::Timestamp,
};

use crate::Result;

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn encode_timestamp(ts: Timestamp) -> String { ts.to_string() }

pub fn encode_sensors(sensors: &Sensors) -> Result<String> { Ok(serde_json::to_string(sensors)?) }

/// A `readings` row as read from SQLite, before decoding.
pub struct RawReading {
  pub datetime:     String,
  pub sensors_json: String,
}

impl RawReading {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self { datetime: row.get(0)?, sensors_json: row.get(1)? })
  }

  pub fn into_reading(self) -> Result<Reading> {
    Ok(Reading {
      timestamp: Timestamp::parse(&self.datetime)?,
      sensors:   serde_json::from_str(&self.sensors_json)?,
    })
  }
}
