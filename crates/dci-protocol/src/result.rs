//! Structured command results.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Ordered tree produced by a successful command.
///
/// Keys keep their insertion order. Values are JSON values, so nested
/// records and sequences are represented as objects and arrays.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommandResult(Map<String, Value>);

impl CommandResult {
    /// Creates an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends or replaces an entry. Replacing keeps the original position.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Looks up an entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Number of top-level entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the result has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Borrows the underlying map.
    #[must_use]
    pub const fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Parses a JSON object back into a result.
    ///
    /// # Errors
    ///
    /// Fails when `text` is not valid JSON or not an object at the top level.
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

impl From<Map<String, Value>> for CommandResult {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<CommandResult> for Value {
    fn from(result: CommandResult) -> Self {
        Self::Object(result.0)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for CommandResult {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn preserves_insertion_order() {
        let mut result = CommandResult::new();
        result.insert("zeta", 1);
        result.insert("alpha", 2);
        result.insert("mid", json!(["a"]));
        let keys: Vec<&str> = result.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, ["zeta", "alpha", "mid"]);
    }

    #[test]
    fn parses_nested_json() {
        let result =
            CommandResult::from_json(r#"{"b": {"x": [1, 2]}, "a": null}"#).expect("parse");
        assert_eq!(result.len(), 2);
        assert_eq!(result.get("b"), Some(&json!({"x": [1, 2]})));
    }

    #[test]
    fn rejects_non_object_json() {
        assert!(CommandResult::from_json("[1, 2]").is_err());
    }
}
