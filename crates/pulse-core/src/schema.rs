//! The accepted set of flattened field names.

use std::collections::BTreeSet;

use serde_json::Value;

use crate::{
  flatten::flatten,
  reading::{FlattenedMessage, TIMESTAMP_FIELD},
};

/// The flattened field names every reading must carry, timestamp included.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcceptedSchema {
  fields: BTreeSet<String>,
}

/// Result of comparing a message against an [`AcceptedSchema`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaDiff {
  /// Expected sensors that are absent or `null`.
  pub missing: Vec<String>,
  /// Received sensors the schema does not name.
  pub extra:   Vec<String>,
}

impl AcceptedSchema {
  /// Build a schema from field names. The timestamp field is always added.
  pub fn new<I, S>(fields: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut fields: BTreeSet<String> = fields.into_iter().map(Into::into).collect();
    fields.insert(TIMESTAMP_FIELD.to_owned());
    Self { fields }
  }

  /// Build a schema from an example message; only its key paths matter.
  pub fn from_template(template: &Value, separator: &str) -> Self {
    Self::new(flatten(template, separator).into_keys())
  }

  pub fn fields(&self) -> impl Iterator<Item = &str> { self.fields.iter().map(String::as_str) }

  pub fn sensor_fields(&self) -> impl Iterator<Item = &str> {
    self.fields().filter(|f| *f != TIMESTAMP_FIELD)
  }

  /// Compare `message` against the schema, ignoring the timestamp field.
  pub fn diff(&self, message: &FlattenedMessage) -> SchemaDiff {
    let missing = self
      .sensor_fields()
      .filter(|f| message.get(f).is_none_or(Value::is_null))
      .map(str::to_owned)
      .collect();
    let extra = message
      .keys()
      .filter(|k| *k != TIMESTAMP_FIELD && !self.fields.contains(*k))
      .map(str::to_owned)
      .collect();
    SchemaDiff { missing, extra }
  }
}

impl Default for AcceptedSchema {
  fn default() -> Self { Self::new(["sensor_1"]) }
}

#[cfg(test)]
mod tests {
  use serde_json::json;

  use super::*;
  use crate::flatten::DEFAULT_SEPARATOR;

  fn message(value: Value) -> FlattenedMessage {
    FlattenedMessage::from_json(&value, DEFAULT_SEPARATOR).unwrap()
  }

  #[test]
  fn template_fields_are_flattened() {
    let schema = AcceptedSchema::from_template(
      &json!({ "datetime": "x", "blower": { "temp": "1", "rpm": "2" } }),
      DEFAULT_SEPARATOR,
    );
    let fields: Vec<&str> = schema.fields().collect();
    assert_eq!(fields, ["blower__rpm", "blower__temp", "datetime"]);
  }

  #[test]
  fn diff_reports_exact_names() {
    let schema = AcceptedSchema::new(["sensor_1", "sensor_2", "sensor_3"]);
    let diff = schema.diff(&message(json!({
      "datetime": "2017-09-13T13:01:57Z",
      "sensor_2": "1",
      "sensor_3": null,
      "sensor_9": "x",
      "new": { "gain": "y" },
    })));
    assert_eq!(diff.missing, ["sensor_1", "sensor_3"]);
    assert_eq!(diff.extra, ["new__gain", "sensor_9"]);
  }

  #[test]
  fn matching_message_has_empty_diff() {
    let schema = AcceptedSchema::default();
    let diff = schema.diff(&message(json!({ "datetime": "t", "sensor_1": "7" })));
    assert_eq!(diff, SchemaDiff::default());
  }

  #[test]
  fn missing_timestamp_is_not_a_missing_sensor() {
    let schema = AcceptedSchema::default();
    let diff = schema.diff(&message(json!({ "sensor_1": "7" })));
    assert!(diff.missing.is_empty());
  }
}
