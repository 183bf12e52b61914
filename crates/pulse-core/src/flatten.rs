//! Key-path flattening of nested messages.
//!
//! `{"a": {"b": 1, "c": {"d": 2}}, "e": 3}` flattens with separator `__` to
//! `{"a__b": 1, "a__c__d": 2, "e": 3}`. Only mapping nodes are descended
//! into; every other node (including arrays) is a leaf.

use std::collections::BTreeMap;

/// Default separator placed between a parent key and a child key.
pub const DEFAULT_SEPARATOR: &str = "__";

/// A tree-shaped value whose mapping nodes can be walked.
pub trait Nested {
  /// The `(key, child)` pairs if this node is a mapping, `None` for a leaf.
  fn entries(&self) -> Option<Vec<(&str, &Self)>>;
}

impl Nested for serde_json::Value {
  fn entries(&self) -> Option<Vec<(&str, &Self)>> {
    self
      .as_object()
      .map(|map| map.iter().map(|(k, v)| (k.as_str(), v)).collect())
  }
}

/// Flatten `root` into a single-level map of key paths to leaves.
///
/// A leaf root has no key path, so it yields an empty map.
pub fn flatten<'a, T: Nested>(root: &'a T, separator: &str) -> BTreeMap<String, &'a T> {
  let mut out = BTreeMap::new();
  walk(root, None, separator, &mut out);
  out
}

fn walk<'a, T: Nested>(
  node: &'a T,
  prefix: Option<&str>,
  separator: &str,
  out: &mut BTreeMap<String, &'a T>,
) {
  let Some(entries) = node.entries() else {
    if let Some(key) = prefix {
      out.insert(key.to_owned(), node);
    }
    return;
  };

  for (key, child) in entries {
    let path = match prefix {
      Some(p) => format!("{p}{separator}{key}"),
      None => key.to_owned(),
    };
    walk(child, Some(&path), separator, out);
  }
}
