//! Labels and label collections
//!
//! On the wire a label is `{"key": <string>, "value": <string>}`. The key is
//! a rule's derived key; the value is the rule id first recorded for it.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;

/// A key/value label attached to a rule on the server
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Label {
    pub key: String,
    pub value: String,
}

impl Label {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A collection of labels with unique keys, ordered by key
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelSet {
    labels: BTreeMap<String, String>,
}

impl LabelSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a label unless its key is already present.
    ///
    /// Returns true if the label was inserted.
    pub fn insert_if_absent(&mut self, key: impl Into<String>, value: impl Into<String>) -> bool {
        match self.labels.entry(key.into()) {
            Entry::Vacant(slot) => {
                slot.insert(value.into());
                true
            }
            Entry::Occupied(_) => false,
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.labels.get(key).map(String::as_str)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.labels.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Iterate `(key, value)` pairs in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.labels.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.labels.keys().map(String::as_str)
    }

    /// Labels in key order
    pub fn to_labels(&self) -> Vec<Label> {
        self.iter().map(|(k, v)| Label::new(k, v)).collect()
    }
}

/// Collects labels, keeping the first value seen for a repeated key.
impl FromIterator<Label> for LabelSet {
    fn from_iter<I: IntoIterator<Item = Label>>(iter: I) -> Self {
        let mut set = Self::new();
        for label in iter {
            set.insert_if_absent(label.key, label.value);
        }
        set
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for LabelSet {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut set = Self::new();
        for (key, value) in iter {
            set.insert_if_absent(key, value);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_value_wins_on_repeated_key() {
        let set: LabelSet = vec![Label::new("A", "1"), Label::new("A", "2")]
            .into_iter()
            .collect();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("A"), Some("1"));
    }

    #[test]
    fn labels_come_out_in_key_order() {
        let set: LabelSet = [("b", "2"), ("a", "1")].into_iter().collect();
        assert_eq!(set.to_labels(), vec![Label::new("a", "1"), Label::new("b", "2")]);
    }

    #[test]
    fn label_wire_format() {
        let json = serde_json::to_value(Label::new("SIZE_CHECK", "123")).unwrap();
        assert_eq!(json, serde_json::json!({"key": "SIZE_CHECK", "value": "123"}));
    }
}
