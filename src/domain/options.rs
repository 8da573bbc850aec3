//! Dynamic argument mapping passed to units of work.
//!
//! `Options` is the name-to-value mapping a caller hands to an entry point.
//! Values are `serde_json::Value`, so declared-argument checks can compare
//! a value's kind against the kinds a unit's catalog requires.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The kind of a JSON value, used as the type descriptor in declared
/// argument constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgKind {
    Null,
    Bool,
    Integer,
    Float,
    String,
    Array,
    Object,
}

impl ArgKind {
    /// Classify a JSON value.
    pub fn of(value: &Value) -> ArgKind {
        match value {
            Value::Null => ArgKind::Null,
            Value::Bool(_) => ArgKind::Bool,
            Value::Number(n) if n.is_f64() => ArgKind::Float,
            Value::Number(_) => ArgKind::Integer,
            Value::String(_) => ArgKind::String,
            Value::Array(_) => ArgKind::Array,
            Value::Object(_) => ArgKind::Object,
        }
    }

    /// Whether a value satisfies this kind. `Float` also admits integer
    /// values, mirroring ordinary numeric widening.
    pub fn admits(self, value: &Value) -> bool {
        let kind = ArgKind::of(value);
        kind == self || (self == ArgKind::Float && kind == ArgKind::Integer)
    }
}

impl fmt::Display for ArgKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ArgKind::Null => "null",
            ArgKind::Bool => "bool",
            ArgKind::Integer => "integer",
            ArgKind::Float => "float",
            ArgKind::String => "string",
            ArgKind::Array => "array",
            ArgKind::Object => "object",
        };
        f.write_str(name)
    }
}

/// An ordered name-to-value argument mapping, immutable once handed to an
/// execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Options(Map<String, Value>);

impl Options {
    /// Create an empty mapping.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Wrap a JSON object literal. Returns `None` for non-object values.
    pub fn from_object(value: Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self(map)),
            _ => None,
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.0.get(key).and_then(Value::as_i64)
    }

    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.0.get(key).and_then(Value::as_f64)
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.0.get(key).and_then(Value::as_bool)
    }

    pub fn get_array(&self, key: &str) -> Option<&Vec<Value>> {
        self.0.get(key).and_then(Value::as_array)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }
}

impl From<Map<String, Value>> for Options {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}
