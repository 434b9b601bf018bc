//! Document values and a typed reader used at the codec boundary.

use std::collections::BTreeMap;

use gotravel_core::error::DecodeError;
use gotravel_core::types::Timestamp;
use serde::{Deserialize, Serialize};

pub type Fields = BTreeMap<String, Value>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Null,
    Bool(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Timestamp(Timestamp),
    Array(Vec<Value>),
    Map(Fields),
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<Timestamp> for Value {
    fn from(v: Timestamp) -> Self {
        Self::Timestamp(v)
    }
}

impl From<Vec<String>> for Value {
    fn from(v: Vec<String>) -> Self {
        Self::Array(v.into_iter().map(Value::String).collect())
    }
}

impl From<Fields> for Value {
    fn from(v: Fields) -> Self {
        Self::Map(v)
    }
}

/// A document: id plus its fields. The id is not stored as a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    pub fn new(id: impl Into<String>, fields: Fields) -> Self {
        Self {
            id: id.into(),
            fields,
        }
    }
}

/// Builder for field maps that drops absent optionals.
#[derive(Debug, Default)]
pub struct FieldsBuilder {
    fields: Fields,
}

impl FieldsBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.fields.insert(key.to_string(), value.into());
        self
    }

    pub fn set_opt<V: Into<Value>>(self, key: &str, value: Option<V>) -> Self {
        match value {
            Some(v) => self.set(key, v),
            None => self,
        }
    }

    pub fn build(self) -> Fields {
        self.fields
    }
}

/// Typed read access over a field map. `required_*` accessors report the
/// offending field in a [`DecodeError`].
#[derive(Debug, Clone, Copy)]
pub struct FieldReader<'a> {
    fields: &'a Fields,
    record_type: &'static str,
}

impl<'a> FieldReader<'a> {
    pub fn new(fields: &'a Fields, record_type: &'static str) -> Self {
        Self {
            fields,
            record_type,
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.fields.contains_key(key)
    }

    pub fn string(&self, key: &str) -> Option<&'a str> {
        match self.fields.get(key)? {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn double(&self, key: &str) -> Option<f64> {
        match self.fields.get(key)? {
            Value::Double(v) => Some(*v),
            Value::Integer(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn integer(&self, key: &str) -> Option<i64> {
        match self.fields.get(key)? {
            Value::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn bool(&self, key: &str) -> Option<bool> {
        match self.fields.get(key)? {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn timestamp(&self, key: &str) -> Option<Timestamp> {
        match self.fields.get(key)? {
            Value::Timestamp(v) => Some(*v),
            _ => None,
        }
    }

    /// String elements of an array; non-string elements are skipped.
    pub fn string_array(&self, key: &str) -> Option<Vec<String>> {
        match self.fields.get(key)? {
            Value::Array(items) => Some(
                items
                    .iter()
                    .filter_map(|v| match v {
                        Value::String(s) => Some(s.clone()),
                        _ => None,
                    })
                    .collect(),
            ),
            _ => None,
        }
    }

    /// Map elements of an array as readers; non-map elements are skipped.
    pub fn map_array(&self, key: &str) -> Vec<FieldReader<'a>> {
        match self.fields.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(|v| match v {
                    Value::Map(fields) => Some(FieldReader::new(fields, self.record_type)),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn owned_string(&self, key: &str) -> Option<String> {
        self.string(key).map(str::to_string)
    }

    pub fn required_string(&self, key: &str) -> Result<String, DecodeError> {
        self.owned_string(key)
            .ok_or_else(|| DecodeError::missing(self.record_type, key))
    }

    pub fn required_double(&self, key: &str) -> Result<f64, DecodeError> {
        self.double(key)
            .ok_or_else(|| DecodeError::missing(self.record_type, key))
    }

    pub fn required_integer(&self, key: &str) -> Result<i64, DecodeError> {
        self.integer(key)
            .ok_or_else(|| DecodeError::missing(self.record_type, key))
    }

    pub fn required_timestamp(&self, key: &str) -> Result<Timestamp, DecodeError> {
        self.timestamp(key)
            .ok_or_else(|| DecodeError::missing(self.record_type, key))
    }
}
