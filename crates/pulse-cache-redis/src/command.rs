//! Construction of the Redis commands the cache issues.

use pulse_core::cache::Expiry;
use redis::Cmd;

/// `SET key value [NX] [PX ms]`.
///
/// With `only_if_absent` the reply is `OK` when the key was created and nil
/// when it already existed, which makes the check-and-set a single atomic
/// round-trip.
pub fn set(key: &str, value: &str, expiry: Expiry, only_if_absent: bool) -> Cmd {
  let mut cmd = redis::cmd("SET");
  cmd.arg(key).arg(value);
  if only_if_absent {
    cmd.arg("NX");
  }
  if let Expiry::After(ttl) = expiry {
    // Redis rejects a zero expiry.
    let millis = u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1);
    cmd.arg("PX").arg(millis);
  }
  cmd
}

pub fn get(key: &str) -> Cmd {
  let mut cmd = redis::cmd("GET");
  cmd.arg(key);
  cmd
}

pub fn del<I: redis::ToRedisArgs>(keys: I) -> Cmd {
  let mut cmd = redis::cmd("DEL");
  cmd.arg(keys);
  cmd
}

/// `SCAN cursor MATCH pattern COUNT 500`.
pub fn scan(cursor: u64, pattern: &str) -> Cmd {
  let mut cmd = redis::cmd("SCAN");
  cmd.arg(cursor).arg("MATCH").arg(pattern).arg("COUNT").arg(500);
  cmd
}

/// Glob matching every key the cache may have written under `prefix`.
///
/// Without a prefix, reading keys are bare timestamps, so the glob is
/// narrowed to their shape rather than matching the whole database.
pub fn owned_pattern(prefix: &str) -> String {
  if prefix.is_empty() {
    return "[0-9][0-9][0-9][0-9]-[0-9][0-9]-[0-9][0-9]T[0-9][0-9]:[0-9][0-9]:[0-9][0-9]Z".to_owned();
  }
  let mut pattern = String::with_capacity(prefix.len() + 1);
  for c in prefix.chars() {
    if matches!(c, '*' | '?' | '[' | ']' | '\\') {
      pattern.push('\\');
    }
    pattern.push(c);
  }
  pattern.push('*');
  pattern
}

#[cfg(test)]
mod tests {
  use std::time::Duration;

  use super::*;

  /// Arguments of `cmd`, decoded from its RESP wire form.
  fn args(cmd: &Cmd) -> Vec<String> {
    String::from_utf8(cmd.get_packed_command())
      .unwrap()
      .split("\r\n")
      .filter(|part| !part.is_empty() && !part.starts_with('*') && !part.starts_with('$'))
      .map(str::to_owned)
      .collect()
  }

  #[test]
  fn set_if_absent_is_a_single_nx_command() {
    let cmd = set("2017-09-13T13:01:57Z", "{}", Expiry::After(Duration::from_secs(3)), true);
    assert_eq!(args(&cmd), ["SET", "2017-09-13T13:01:57Z", "{}", "NX", "PX", "3000"]);
  }

  #[test]
  fn plain_set_without_expiry() {
    let cmd = set("k", "v", Expiry::Never, false);
    assert_eq!(args(&cmd), ["SET", "k", "v"]);
  }

  #[test]
  fn zero_expiry_is_clamped() {
    let cmd = set("k", "v", Expiry::After(Duration::ZERO), false);
    assert_eq!(args(&cmd), ["SET", "k", "v", "PX", "1"]);
  }

  #[test]
  fn del_accepts_many_keys() {
    let cmd = del(vec!["a".to_owned(), "b".to_owned()]);
    assert_eq!(args(&cmd), ["DEL", "a", "b"]);
  }

  #[test]
  fn scan_is_cursor_based_and_filtered() {
    let cmd = scan(17, "fcache*");
    assert_eq!(args(&cmd), ["SCAN", "17", "MATCH", "fcache*", "COUNT", "500"]);
  }

  #[test]
  fn prefixed_namespace_is_globbed_with_escaping() {
    assert_eq!(owned_pattern("fcache"), "fcache*");
    assert_eq!(owned_pattern("a*b["), "a\\*b\\[*");
  }

  #[test]
  fn bare_namespace_matches_only_timestamp_shaped_keys() {
    let pattern = owned_pattern("");
    assert!(!pattern.contains('*'));
    assert!(pattern.ends_with('Z'));
  }
}
