//! Record materialization: the defaulting and stamping applied to payloads
//! before they land in a collection.
//!
//! A field counts as supplied only when it is truthy in the JavaScript
//! sense, so `""` and `null` take the default exactly like a missing key.

use chrono::{SecondsFormat, Utc};
use serde_json::Value;

use crate::engine::document::{is_truthy, truthy_str, Record};

/// Current instant as RFC 3339 UTC with millisecond precision and a `Z`
/// suffix, the `Date.toISOString()` shape the document already carries.
pub fn now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Percent-encodes everything outside the `encodeURIComponent` unreserved
/// set, so avatar URLs come out byte-identical to the ones already stored.
fn encode_uri_component(input: &str) -> String {
    let mut encoded = String::with_capacity(input.len());
    for byte in input.bytes() {
        match byte {
            b'A'..=b'Z'
            | b'a'..=b'z'
            | b'0'..=b'9'
            | b'-'
            | b'_'
            | b'.'
            | b'!'
            | b'~'
            | b'*'
            | b'\''
            | b'('
            | b')' => encoded.push(byte as char),
            _ => encoded.push_str(&format!("%{:02X}", byte)),
        }
    }
    encoded
}

/// Deterministic avatar image URL for a contact name. The avatar service
/// renders the initials; the store only pins the URL.
pub fn avatar_url(first_name: &str, last_name: &str) -> String {
    format!(
        "https://ui-avatars.com/api/?name={}&background=87CEEB&color=fff&size=128&bold=true",
        encode_uri_component(&format!("{} {}", first_name, last_name))
    )
}

fn field_truthy(fields: &Record, key: &str) -> bool {
    fields.get(key).map(is_truthy).unwrap_or(false)
}

fn default_str(fields: &mut Record, key: &str, value: &str) {
    if !field_truthy(fields, key) {
        fields.insert(key.to_string(), Value::String(value.to_string()));
    }
}

/// Fills creation defaults into `fields` in place.
///
/// The allocated id and the owner land first, then the type-specific
/// defaults. A key the payload already carried keeps its position; new keys
/// append in a fixed order, so freshly created records all share a shape.
pub fn materialize_create(entity_type: &str, fields: &mut Record, id: &str, operator_id: &str) {
    fields.insert("id".to_string(), Value::String(id.to_string()));
    default_str(fields, "ownerId", operator_id);

    match entity_type {
        "contact" => {
            if !field_truthy(fields, "avatar") {
                let first = truthy_str(fields, "firstName").unwrap_or("");
                let last = truthy_str(fields, "lastName").unwrap_or("");
                fields.insert(
                    "avatar".to_string(),
                    Value::String(avatar_url(first, last)),
                );
            }
            default_str(fields, "lastActivity", "No activity yet");
        }
        "company" => {
            if !field_truthy(fields, "isPrimary") {
                fields.insert("isPrimary".to_string(), Value::Bool(false));
            }
        }
        "deal" => {
            default_str(fields, "priority", "medium");
        }
        "ticket" => {
            default_str(fields, "status", "New");
            default_str(fields, "priority", "Medium");
            default_str(fields, "assigneeId", operator_id);
            let now = now_iso();
            default_str(fields, "createdAt", &now);
            default_str(fields, "updatedAt", &now);
        }
        _ => {}
    }
}

/// Merges an update payload over an existing record and returns the result.
///
/// Supplied fields overwrite, omitted fields survive, and the existing
/// record's `id` always wins over anything in the payload. Contacts get
/// their avatar re-derived when the payload carries a truthy name field;
/// tickets get `updatedAt` refreshed on every update.
pub fn materialize_update(entity_type: &str, existing: &Record, updates: &Record) -> Record {
    let mut merged = existing.clone();
    for (key, value) in updates {
        merged.insert(key.clone(), value.clone());
    }
    if let Some(id) = existing.get("id") {
        merged.insert("id".to_string(), id.clone());
    }

    if entity_type == "contact" {
        let name_changed = field_truthy(updates, "firstName") || field_truthy(updates, "lastName");
        if name_changed {
            let first = truthy_str(updates, "firstName")
                .or_else(|| truthy_str(existing, "firstName"))
                .unwrap_or("");
            let last = truthy_str(updates, "lastName")
                .or_else(|| truthy_str(existing, "lastName"))
                .unwrap_or("");
            merged.insert(
                "avatar".to_string(),
                Value::String(avatar_url(first, last)),
            );
        }
    }

    if entity_type == "ticket" {
        merged.insert("updatedAt".to_string(), Value::String(now_iso()));
    }

    merged
}
