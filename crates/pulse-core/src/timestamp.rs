//! Canonical second-precision UTC timestamps.
//!
//! A [`Timestamp`] is both the primary key of a reading in the durable store
//! and its key in the cache, so its text form must be bit-exact:
//! `YYYY-MM-DDTHH:MM:SSZ`. Input is validated by a real RFC 3339 parser and
//! then required to already be in canonical form, so `2017-09-13T13:01:57Z`
//! is accepted while `2017-09-13T13:01:57+00:00` and `201709-13T13:01:58Z`
//! are not.

use std::{fmt, str::FromStr};

use chrono::{DateTime, SubsecRound, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::Rejection;

/// `strftime` pattern of the canonical text form.
pub const FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(try_from = "String", into = "String")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
  /// Parse a canonical timestamp string.
  pub fn parse(s: &str) -> Result<Self, Rejection> {
    let invalid = || Rejection::InvalidTimestamp(Some(s.to_owned()));

    let parsed = DateTime::parse_from_rfc3339(s).map_err(|_| invalid())?;
    // chrono represents a leap second as nanos >= 1e9; no per-second walk can
    // ever reach one.
    if parsed.nanosecond() >= 1_000_000_000 {
      return Err(invalid());
    }
    let ts = Self(parsed.with_timezone(&Utc).trunc_subsecs(0));
    if ts.to_string() != s {
      return Err(invalid());
    }
    Ok(ts)
  }

  /// The current time, truncated to whole seconds.
  pub fn now() -> Self { Self::from_datetime(Utc::now()) }

  /// `1970-01-01T00:00:00Z`, used as "never seen".
  pub fn epoch() -> Self { Self(DateTime::UNIX_EPOCH) }

  pub fn from_datetime(dt: DateTime<Utc>) -> Self { Self(dt.trunc_subsecs(0)) }

  pub fn as_datetime(&self) -> DateTime<Utc> { self.0 }

  /// Whole seconds from `earlier` to `self`; negative if `self` is earlier.
  pub fn seconds_since(&self, earlier: Timestamp) -> i64 {
    (self.0 - earlier.0).num_seconds()
  }

  pub fn plus_seconds(&self, secs: i64) -> Self { Self(self.0 + TimeDelta::seconds(secs)) }

  /// Every whole second from `start` to `end`, both inclusive. Empty if
  /// `end < start`.
  pub fn each_second(start: Timestamp, end: Timestamp) -> impl Iterator<Item = Timestamp> {
    (0..=end.seconds_since(start)).map(move |offset| start.plus_seconds(offset))
  }
}

impl fmt::Display for Timestamp {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0.format(FORMAT))
  }
}

impl FromStr for Timestamp {
  type Err = Rejection;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Self::parse(s) }
}

impl TryFrom<String> for Timestamp {
  type Error = Rejection;

  fn try_from(s: String) -> Result<Self, Self::Error> { Self::parse(&s) }
}

impl From<Timestamp> for String {
  fn from(ts: Timestamp) -> Self { ts.to_string() }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn accepts_canonical_form() {
    let ts = Timestamp::parse("2017-09-13T13:01:57Z").unwrap();
    assert_eq!(ts.to_string(), "2017-09-13T13:01:57Z");
  }

  #[test]
  fn rejects_malformed_dates() {
    for bad in [
      "201709-13T13:01:58Z",
      "2017-09-13T:13:01:57Z",
      "2017-02-30T00:00:00Z",
      "2017-09-13T25:00:00Z",
      "2017-09-13 13:01:57",
      "",
    ] {
      assert_eq!(
        Timestamp::parse(bad),
        Err(Rejection::InvalidTimestamp(Some(bad.to_owned()))),
        "{bad:?} should be rejected",
      );
    }
  }

  #[test]
  fn rejects_valid_rfc3339_that_is_not_canonical() {
    assert!(Timestamp::parse("2017-09-13T13:01:57+00:00").is_err());
    assert!(Timestamp::parse("2017-09-13T13:01:57.250Z").is_err());
    assert!(Timestamp::parse("2017-09-13t13:01:57z").is_err());
    assert!(Timestamp::parse("2016-12-31T23:59:60Z").is_err());
  }

  #[test]
  fn each_second_is_inclusive() {
    let start = Timestamp::parse("2017-09-13T13:01:58Z").unwrap();
    let end = Timestamp::parse("2017-09-13T13:02:01Z").unwrap();
    let all: Vec<String> = Timestamp::each_second(start, end).map(String::from).collect();
    assert_eq!(all, [
      "2017-09-13T13:01:58Z",
      "2017-09-13T13:01:59Z",
      "2017-09-13T13:02:00Z",
      "2017-09-13T13:02:01Z",
    ]);
    assert_eq!(Timestamp::each_second(end, start).count(), 0);
  }

  #[test]
  fn serde_uses_the_canonical_string() {
    let ts: Timestamp = serde_json::from_str("\"2017-08-11T18:39:45Z\"").unwrap();
    assert_eq!(serde_json::to_string(&ts).unwrap(), "\"2017-08-11T18:39:45Z\"");
    assert!(serde_json::from_str::<Timestamp>("\"yesterday\"").is_err());
  }
}
