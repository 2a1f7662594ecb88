//! The document model: one JSON object of named collections, each an array
//! of schemaless records.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{Error, Result};

/// A single record: one schemaless JSON object inside a collection.
pub type Record = Map<String, Value>;

/// Collection keys a freshly seeded document carries, in fixture order.
pub const CANONICAL_COLLECTIONS: [&str; 6] = [
    "contacts",
    "companies",
    "deals",
    "tickets",
    "activities",
    "users",
];

/// Maps an entity-type tag to its collection key in the document.
///
/// Unknown types fall back to naive pluralization (`{type}s`), so a new
/// entity type works against the store before anything here learns about it.
pub fn collection_name(entity_type: &str) -> String {
    match entity_type {
        "company" => "companies".to_string(),
        "contact" => "contacts".to_string(),
        "deal" => "deals".to_string(),
        "ticket" => "tickets".to_string(),
        other => format!("{}s", other),
    }
}

/// The `id` field of a record value, when present as a string.
pub fn record_id(record: &Value) -> Option<&str> {
    record.get("id").and_then(Value::as_str)
}

/// JavaScript-style truthiness for a record field.
///
/// `null`, `false`, `0`, and `""` all count as absent when testing whether a
/// caller supplied a value, matching what the CRM frontends expect.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// The field's string value, only when it is truthy.
pub fn truthy_str<'a>(record: &'a Record, key: &str) -> Option<&'a str> {
    record
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
}

/// The whole persisted CRM state: named collections of records.
///
/// Top-level key order and per-record field order survive a load/save round
/// trip (the crate runs `serde_json` with `preserve_order`), so the
/// pretty-printed file stays diffable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document(Map<String, Value>);

impl Document {
    /// An empty document carrying the six canonical collections.
    pub fn seed() -> Self {
        let mut collections = Map::new();
        for key in CANONICAL_COLLECTIONS {
            collections.insert(key.to_string(), Value::Array(Vec::new()));
        }
        Document(collections)
    }

    /// Checks the decoded shape: every top-level value must be an array of
    /// objects. Anything else means the file was edited into a state the
    /// store cannot honor.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in &self.0 {
            let records = value.as_array().ok_or_else(|| {
                Error::CorruptDocument(format!("collection {} is not an array", name))
            })?;
            if records.iter().any(|record| !record.is_object()) {
                return Err(Error::CorruptDocument(format!(
                    "collection {} contains a non-object record",
                    name
                )));
            }
        }
        Ok(())
    }

    /// Returns the named collection, `None` when the key is absent.
    pub fn collection(&self, name: &str) -> Option<&Vec<Value>> {
        self.0.get(name).and_then(Value::as_array)
    }

    /// Mutable access to the named collection.
    pub fn collection_mut(&mut self, name: &str) -> Option<&mut Vec<Value>> {
        self.0.get_mut(name).and_then(Value::as_array_mut)
    }

    /// Returns the named collection, creating it empty when absent. New
    /// collections land after the existing keys, which is where the original
    /// file format grows too.
    pub fn collection_or_insert(&mut self, name: &str) -> &mut Vec<Value> {
        let entry = self
            .0
            .entry(name.to_string())
            .or_insert_with(|| Value::Array(Vec::new()));
        if !entry.is_array() {
            *entry = Value::Array(Vec::new());
        }
        match entry {
            Value::Array(records) => records,
            _ => unreachable!(),
        }
    }

    /// Clones the records of the collection resolved for `entity_type`,
    /// empty when the collection is absent.
    pub fn records_of(&self, entity_type: &str) -> Vec<Record> {
        let name = collection_name(entity_type);
        self.collection(&name)
            .map(|records| {
                records
                    .iter()
                    .filter_map(|record| record.as_object().cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Iterates the collections in document order.
    pub fn collections(&self) -> impl Iterator<Item = (&str, &[Value])> {
        self.0.iter().filter_map(|(name, value)| {
            value
                .as_array()
                .map(|records| (name.as_str(), records.as_slice()))
        })
    }

    fn slice(&self, name: &str) -> &[Value] {
        self.collection(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// The contacts collection, empty when absent.
    pub fn contacts(&self) -> &[Value] {
        self.slice("contacts")
    }

    /// The companies collection, empty when absent.
    pub fn companies(&self) -> &[Value] {
        self.slice("companies")
    }

    /// The deals collection, empty when absent.
    pub fn deals(&self) -> &[Value] {
        self.slice("deals")
    }

    /// The tickets collection, empty when absent.
    pub fn tickets(&self) -> &[Value] {
        self.slice("tickets")
    }

    /// The activities collection, empty when absent.
    pub fn activities(&self) -> &[Value] {
        self.slice("activities")
    }

    /// The users collection, empty when absent.
    pub fn users(&self) -> &[Value] {
        self.slice("users")
    }
}
