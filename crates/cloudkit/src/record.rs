//! Record, field and query types mirroring the CloudKit data model.

use std::collections::BTreeMap;
use std::path::PathBuf;

use gotravel_core::types::Timestamp;
use serde::{Deserialize, Serialize};

/// Which database a record lives in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DatabaseScope {
    /// Visible to the signed-in user only.
    Private,
    /// World-readable; shared travel plans live here.
    Public,
}

/// Binary attachment on a record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Asset {
    /// Outgoing: a local file the backend uploads during save.
    File(PathBuf),
    /// Incoming: bytes the backend downloaded with the record.
    Data(Vec<u8>),
}

impl Asset {
    pub fn read(&self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::File(path) => std::fs::read(path),
            Self::Data(bytes) => Ok(bytes.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    String(String),
    Int64(i64),
    Double(f64),
    Date(Timestamp),
    StringList(Vec<String>),
    Asset(Asset),
}

impl From<String> for FieldValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for FieldValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<i64> for FieldValue {
    fn from(v: i64) -> Self {
        Self::Int64(v)
    }
}

impl From<f64> for FieldValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<bool> for FieldValue {
    fn from(v: bool) -> Self {
        Self::Int64(i64::from(v))
    }
}

impl From<Timestamp> for FieldValue {
    fn from(v: Timestamp) -> Self {
        Self::Date(v)
    }
}

impl From<Vec<String>> for FieldValue {
    fn from(v: Vec<String>) -> Self {
        Self::StringList(v)
    }
}

impl From<Asset> for FieldValue {
    fn from(v: Asset) -> Self {
        Self::Asset(v)
    }
}

/// A typed record. Field access is by name with per-type getters that
/// return `None` on absence or type mismatch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub record_type: String,
    pub id: String,
    pub fields: BTreeMap<String, FieldValue>,
}

impl Record {
    pub fn new(record_type: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            record_type: record_type.into(),
            id: id.into(),
            fields: BTreeMap::new(),
        }
    }

    pub fn set(&mut self, key: &str, value: impl Into<FieldValue>) {
        self.fields.insert(key.to_string(), value.into());
    }

    /// Set `key` only when `value` is present; absent values are never
    /// written as placeholders.
    pub fn set_opt<V: Into<FieldValue>>(&mut self, key: &str, value: Option<V>) {
        if let Some(v) = value {
            self.set(key, v);
        }
    }

    pub fn get(&self, key: &str) -> Option<&FieldValue> {
        self.fields.get(key)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        match self.fields.get(key)? {
            FieldValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn double(&self, key: &str) -> Option<f64> {
        match self.fields.get(key)? {
            FieldValue::Double(v) => Some(*v),
            FieldValue::Int64(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn int64(&self, key: &str) -> Option<i64> {
        match self.fields.get(key)? {
            FieldValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        self.int64(key).map(|v| v != 0)
    }

    pub fn date(&self, key: &str) -> Option<Timestamp> {
        match self.fields.get(key)? {
            FieldValue::Date(v) => Some(*v),
            _ => None,
        }
    }

    pub fn string_list(&self, key: &str) -> Option<&[String]> {
        match self.fields.get(key)? {
            FieldValue::StringList(v) => Some(v),
            _ => None,
        }
    }

    pub fn asset(&self, key: &str) -> Option<&Asset> {
        match self.fields.get(key)? {
            FieldValue::Asset(v) => Some(v),
            _ => None,
        }
    }
}

/// Single-predicate query. The backend has no OR; callers needing one
/// issue two queries and merge.
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    pub record_type: String,
    pub predicate: Predicate,
}

impl Query {
    pub fn new(record_type: impl Into<String>, predicate: Predicate) -> Self {
        Self {
            record_type: record_type.into(),
            predicate,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `field == value` on a string field.
    Equals { field: String, value: String },
    /// String-list `field` contains `value`.
    ListContains { field: String, value: String },
}

impl Predicate {
    pub fn equals(field: &str, value: impl Into<String>) -> Self {
        Self::Equals {
            field: field.to_string(),
            value: value.into(),
        }
    }

    pub fn list_contains(field: &str, value: impl Into<String>) -> Self {
        Self::ListContains {
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// Field the predicate filters on.
    pub fn field(&self) -> &str {
        match self {
            Self::Equals { field, .. } | Self::ListContains { field, .. } => field,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Self::Equals { field, value } => record.string(field) == Some(value.as_str()),
            Self::ListContains { field, value } => record
                .string_list(field)
                .is_some_and(|list| list.iter().any(|v| v == value)),
        }
    }
}
