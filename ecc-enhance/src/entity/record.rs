//! Stored record shape shared by every category

use std::collections::BTreeMap;

use serde::Serialize;

use super::EntityKind;

/// Field name to text value
pub type FieldMap = BTreeMap<String, String>;

/// A stored row: surrogate id plus every allow-listed field (blank as "")
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Record {
    pub id: i64,
    #[serde(flatten)]
    pub fields: FieldMap,
}

impl Record {
    /// Value of a field, "" when the field is absent
    pub fn get(&self, field: &str) -> &str {
        self.fields.get(field).map(String::as_str).unwrap_or("")
    }

    pub fn key(&self, kind: EntityKind) -> &str {
        self.get(kind.natural_key())
    }
}

/// Whitespace-only values count as missing everywhere
pub fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}
