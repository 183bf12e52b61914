//! Readings and the flattened wire form they are built from.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{Result, flatten::flatten, timestamp::Timestamp};

/// Name of the field that carries a reading's timestamp.
pub const TIMESTAMP_FIELD: &str = "datetime";

/// Sensor name to value. A sensor with no data is `None`.
pub type Sensors = BTreeMap<String, Option<String>>;

/// One timestamped sensor record.
///
/// Serialises to the flat form clients send and receive:
/// `{"datetime": "2017-09-13T13:01:57Z", "sensor_1": "7"}`. This is also the
/// form stored in the cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
  #[serde(rename = "datetime")]
  pub timestamp: Timestamp,
  #[serde(flatten)]
  pub sensors:   Sensors,
}

impl Reading {
  pub fn to_json_string(&self) -> Result<String> { Ok(serde_json::to_string(self)?) }

  pub fn from_json_str(s: &str) -> Result<Self> { Ok(serde_json::from_str(s)?) }
}

/// A submitted message collapsed to a single level of key paths.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FlattenedMessage {
  fields: BTreeMap<String, Value>,
  /// Top-level keys of the original message, including those whose value
  /// flattened to nothing (an empty object).
  roots:  BTreeSet<String>,
}

impl FlattenedMessage {
  /// Flatten a decoded JSON message. Returns `None` unless the root is an
  /// object.
  pub fn from_json(message: &Value, separator: &str) -> Option<Self> {
    let roots = message.as_object()?.keys().cloned().collect();
    let fields = flatten(message, separator)
      .into_iter()
      .map(|(k, v)| (k, v.clone()))
      .collect();
    Some(Self { fields, roots })
  }

  pub fn get(&self, key: &str) -> Option<&Value> { self.fields.get(key) }

  pub fn contains_key(&self, key: &str) -> bool { self.fields.contains_key(key) }

  /// Whether `key` was a top-level key of the message, whatever its value.
  pub fn has_root(&self, key: &str) -> bool { self.roots.contains(key) }

  pub fn keys(&self) -> impl Iterator<Item = &str> { self.fields.keys().map(String::as_str) }

  /// The timestamp field as text, if present and a string.
  pub fn timestamp_text(&self) -> Option<&str> {
    self.fields.get(TIMESTAMP_FIELD).and_then(Value::as_str)
  }

  /// Every field except the timestamp, with leaves normalised to text.
  ///
  /// Strings are kept as-is, `null` stays `None`, and any other leaf
  /// (number, boolean, array) is stored as its JSON text.
  pub fn sensor_values(&self) -> Sensors {
    self
      .fields
      .iter()
      .filter(|(k, _)| k.as_str() != TIMESTAMP_FIELD)
      .map(|(k, v)| {
        let text = match v {
          Value::Null => None,
          Value::String(s) => Some(s.clone()),
          other => Some(other.to_string()),
        };
        (k.clone(), text)
      })
      .collect()
  }
}

impl FromIterator<(String, Value)> for FlattenedMessage {
  fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
    let fields: BTreeMap<String, Value> = iter.into_iter().collect();
    let roots = fields.keys().cloned().collect();
    Self { fields, roots }
  }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::flatten::DEFAULT_SEPARATOR;

  #[test]
  fn reading_serialises_flat() {
    let reading = Reading {
      timestamp: "2017-09-13T13:01:57Z".parse().unwrap(),
      sensors:   Sensors::from([
        ("sensor_1".to_owned(), Some("7".to_owned())),
        ("sensor_2".to_owned(), None),
      ]),
    };
    let value: Value = serde_json::from_str(&reading.to_json_string().unwrap()).unwrap();
    assert_eq!(
      value,
      json!({ "datetime": "2017-09-13T13:01:57Z", "sensor_1": "7", "sensor_2": null })
    );
    assert_eq!(Reading::from_json_str(&value.to_string()).unwrap(), reading);
  }

  #[test]
  fn non_object_messages_are_not_flattened() {
    assert!(FlattenedMessage::from_json(&json!("2017"), DEFAULT_SEPARATOR).is_none());
    assert!(FlattenedMessage::from_json(&json!([1, 2]), DEFAULT_SEPARATOR).is_none());
  }

  #[test]
  fn sensor_values_are_normalised_to_text() {
    let msg = FlattenedMessage::from_json(
      &json!({
        "datetime": "2017-09-13T13:01:57Z",
        "blower": { "on": true, "rpm": 1200.5 },
        "sensor_1": "7",
        "sensor_2": null,
      }),
      DEFAULT_SEPARATOR,
    )
    .unwrap();

    assert_eq!(msg.timestamp_text(), Some("2017-09-13T13:01:57Z"));
    let sensors = msg.sensor_values();
    assert_eq!(sensors["blower__on"].as_deref(), Some("true"));
    assert_eq!(sensors["blower__rpm"].as_deref(), Some("1200.5"));
    assert_eq!(sensors["sensor_1"].as_deref(), Some("7"));
    assert_eq!(sensors["sensor_2"], None);
    assert!(!sensors.contains_key(TIMESTAMP_FIELD));
  }

  #[test]
  fn top_level_keys_survive_empty_objects() {
    let msg = FlattenedMessage::from_json(&json!({ "heartbeat": {} }), DEFAULT_SEPARATOR).unwrap();
    assert!(msg.has_root("heartbeat"));
    assert!(!msg.contains_key("heartbeat"));
    assert!(msg.sensor_values().is_empty());

    let nested = FlattenedMessage::from_json(&json!({ "heartbeat": { "beep": 1 } }), DEFAULT_SEPARATOR).unwrap();
    assert!(nested.has_root("heartbeat"));
    assert!(!nested.has_root("heartbeat__beep"));
  }
}
