//! Identifier allocation for new records.
//!
//! Companies get human-readable slugs derived from their name; every other
//! entity type gets the next value of a per-collection numeric sequence.
//! Either way the result is a string and unique within its collection.

use serde_json::Value;

use crate::engine::document::{record_id, truthy_str, Record};
use crate::{Error, Result};

/// Produces the id for a record being created.
///
/// Companies are the one type where a caller-supplied id is honored, and it
/// is checked against the existing records first. Every other type gets the
/// next sequence number regardless of what the payload carried.
pub fn allocate(entity_type: &str, fields: &Record, records: &[Value]) -> Result<String> {
    if entity_type != "company" {
        return Ok(next_numeric_id(records));
    }

    if let Some(supplied) = truthy_str(fields, "id") {
        if id_exists(records, supplied) {
            return Err(Error::DuplicateId(supplied.to_string()));
        }
        return Ok(supplied.to_string());
    }

    let name = fields.get("name").and_then(Value::as_str).unwrap_or("");
    if name.trim().is_empty() {
        return Err(Error::Validation("company name is required".to_string()));
    }
    Ok(company_id_from_name(name, records))
}

/// Lowercases the name, collapses each whitespace run to a single hyphen,
/// and strips everything outside `[a-z0-9-]`.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut prev_whitespace = false;
    for ch in name.to_lowercase().chars() {
        if ch.is_whitespace() {
            if !prev_whitespace {
                slug.push('-');
            }
            prev_whitespace = true;
        } else {
            prev_whitespace = false;
            if ch.is_ascii_lowercase() || ch.is_ascii_digit() || ch == '-' {
                slug.push(ch);
            }
        }
    }
    slug
}

/// Derives a company id from its display name: the slug, or `company-1`
/// when the slug comes out empty, with `-1`, `-2`, ... appended until the
/// candidate is unique.
pub fn company_id_from_name(name: &str, companies: &[Value]) -> String {
    let slug = slugify(name);
    let base = if slug.is_empty() {
        "company-1".to_string()
    } else {
        slug
    };

    let mut candidate = base.clone();
    let mut counter = 1;
    while id_exists(companies, &candidate) {
        candidate = format!("{}-{}", base, counter);
        counter += 1;
    }
    candidate
}

/// Allocates the next numeric id: one past the maximum integer-parseable id
/// already in the collection, with non-numeric ids counting as zero.
pub fn next_numeric_id(records: &[Value]) -> String {
    let max = records
        .iter()
        .filter_map(record_id)
        .map(|id| id.parse::<i64>().unwrap_or(0))
        .fold(0, i64::max);
    (max + 1).to_string()
}

/// Whether any record in the slice already carries this id.
pub fn id_exists(records: &[Value], id: &str) -> bool {
    records.iter().any(|record| record_id(record) == Some(id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn company(id: &str) -> Value {
        json!({ "id": id, "name": "whatever" })
    }

    #[test]
    fn test_slugify_basic() {
        assert_eq!(slugify("Acme Corp"), "acme-corp");
        assert_eq!(slugify("TechVision GmbH"), "techvision-gmbh");
        assert_eq!(slugify("Data & Sons, Inc."), "data--sons-inc");
    }

    #[test]
    fn test_slugify_collapses_whitespace_runs() {
        assert_eq!(slugify("Blue\t  Rocket\nLabs"), "blue-rocket-labs");
    }

    #[test]
    fn test_slugify_strips_symbols_and_non_ascii() {
        assert_eq!(slugify("Café #42"), "caf-42");
        assert_eq!(slugify("營業中"), "");
        assert_eq!(slugify("!!!"), "");
    }

    #[test]
    fn test_company_id_falls_back_when_slug_is_empty() {
        assert_eq!(company_id_from_name("!!!", &[]), "company-1");
        assert_eq!(
            company_id_from_name("!!!", &[company("company-1")]),
            "company-1-1"
        );
    }

    #[test]
    fn test_company_id_appends_counter_on_collision() {
        let existing = vec![company("acme-corp"), company("acme-corp-1")];
        assert_eq!(company_id_from_name("Acme Corp", &existing), "acme-corp-2");
        assert_eq!(company_id_from_name("Acme Corp", &[]), "acme-corp");
    }

    #[test]
    fn test_next_numeric_id_starts_at_one() {
        assert_eq!(next_numeric_id(&[]), "1");
    }

    #[test]
    fn test_next_numeric_id_is_max_plus_one() {
        let records = vec![
            json!({ "id": "3" }),
            json!({ "id": "12" }),
            json!({ "id": "7" }),
        ];
        assert_eq!(next_numeric_id(&records), "13");
    }

    #[test]
    fn test_next_numeric_id_treats_non_numeric_as_zero() {
        let records = vec![json!({ "id": "legacy" }), json!({ "id": "act-9" })];
        assert_eq!(next_numeric_id(&records), "1");
    }

    #[test]
    fn test_allocate_sequences_non_company_types() {
        let records = vec![json!({ "id": "2" })];
        let fields = Record::new();
        assert_eq!(allocate("ticket", &fields, &records).unwrap(), "3");
    }

    #[test]
    fn test_allocate_ignores_supplied_id_for_non_company() {
        let fields: Record = serde_json::from_value(json!({ "id": "999" })).unwrap();
        assert_eq!(allocate("contact", &fields, &[]).unwrap(), "1");
    }

    #[test]
    fn test_allocate_honors_supplied_company_id() {
        let fields: Record =
            serde_json::from_value(json!({ "id": "globex", "name": "Globex" })).unwrap();
        assert_eq!(allocate("company", &fields, &[]).unwrap(), "globex");
    }

    #[test]
    fn test_allocate_rejects_duplicate_company_id() {
        let fields: Record =
            serde_json::from_value(json!({ "id": "globex", "name": "Globex" })).unwrap();
        let err = allocate("company", &fields, &[company("globex")]).unwrap_err();
        assert!(matches!(err, Error::DuplicateId(_)));
    }

    #[test]
    fn test_allocate_requires_company_name() {
        for fields in [json!({}), json!({ "name": "   " }), json!({ "name": 7 })] {
            let fields: Record = serde_json::from_value(fields).unwrap();
            let err = allocate("company", &fields, &[]).unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
    }
}
