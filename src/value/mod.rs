//! Runtime value model for DTO input and storage
//!
//! Loosely typed input (usually decoded JSON) is converted into [`Value`]
//! before it reaches the engine. The variants cover every runtime kind the
//! validator distinguishes, so consumers can match exhaustively.
//!
//! Associative containers use [`Map`], an insertion-ordered container whose
//! keys are either integers or strings. String keys that spell a canonical
//! decimal integer are normalized to integer keys on insertion.

mod map;

pub use map::{Key, Map};

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::dto::Dto;

/// A loosely typed runtime value.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    /// Absent or explicit null
    #[default]
    Null,
    /// Boolean
    Bool(bool),
    /// 64-bit signed integer
    Int(i64),
    /// 64-bit floating point
    Float(f64),
    /// UTF-8 string
    String(String),
    /// Index-ordered sequence
    List(Vec<Value>),
    /// Associative container
    Map(Map),
    /// A constructed DTO instance
    Object(Dto),
}

/// Runtime kind of a [`Value`], named the way diagnostics report it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Integer,
    Double,
    String,
    Array,
    Object,
}

impl ValueKind {
    /// Returns the canonical kind name used in diagnostics.
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "NULL",
            ValueKind::Boolean => "boolean",
            ValueKind::Integer => "integer",
            ValueKind::Double => "double",
            ValueKind::String => "string",
            ValueKind::Array => "array",
            ValueKind::Object => "object",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Value {
    /// Materializes an iterator into a `List`, consuming it exactly once.
    pub fn from_iterable<I>(iter: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        Value::List(iter.into_iter().map(Into::into).collect())
    }

    /// Returns the runtime kind of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Null => ValueKind::Null,
            Value::Bool(_) => ValueKind::Boolean,
            Value::Int(_) => ValueKind::Integer,
            Value::Float(_) => ValueKind::Double,
            Value::String(_) => ValueKind::String,
            Value::List(_) | Value::Map(_) => ValueKind::Array,
            Value::Object(_) => ValueKind::Object,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(f) => Some(*f),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Map> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Dto> {
        match self {
            Value::Object(dto) => Some(dto),
            _ => None,
        }
    }

    /// Returns the value as a mapping suitable for constructing a DTO.
    ///
    /// An empty `List` counts as an empty mapping: decoded input frequently
    /// cannot tell `[]` and `{}` apart.
    pub fn as_mapping(&self) -> Option<Map> {
        match self {
            Value::Map(map) => Some(map.clone()),
            Value::List(items) if items.is_empty() => Some(Map::new()),
            _ => None,
        }
    }

    /// Renders the value the way type diagnostics quote it.
    ///
    /// Containers render as `array`, instances as their schema name,
    /// `false` as the empty string and `true` as `1`.
    pub fn render(&self) -> String {
        match self {
            Value::Null => "null".to_string(),
            Value::Bool(true) => "1".to_string(),
            Value::Bool(false) => String::new(),
            Value::Int(i) => i.to_string(),
            Value::Float(f) => f.to_string(),
            Value::String(s) => s.clone(),
            Value::List(_) | Value::Map(_) => "array".to_string(),
            Value::Object(dto) => dto.schema_name().to_string(),
        }
    }

    /// Converts the value into plain data, replacing every nested instance
    /// by its `to_array()` projection at any depth.
    pub fn to_plain(&self) -> Value {
        match self {
            Value::List(items) => Value::List(items.iter().map(Value::to_plain).collect()),
            Value::Map(map) => Value::Map(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_plain()))
                    .collect(),
            ),
            Value::Object(dto) => dto.to_array(),
            other => other.clone(),
        }
    }

    /// Returns true if no nested instance remains anywhere in the value.
    pub fn is_plain(&self) -> bool {
        match self {
            Value::List(items) => items.iter().all(Value::is_plain),
            Value::Map(map) => map.values().all(Value::is_plain),
            Value::Object(_) => false,
            _ => true,
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Int(i)
    }
}

impl From<i32> for Value {
    fn from(i: i32) -> Self {
        Value::Int(i64::from(i))
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(s)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Map(map)
    }
}

impl From<Dto> for Value {
    fn from(dto: Dto) -> Self {
        Value::Object(dto)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(items: Vec<T>) -> Self {
        Value::from_iterable(items)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(opt: Option<T>) -> Self {
        opt.map_or(Value::Null, Into::into)
    }
}

impl FromIterator<Value> for Value {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Value::List(iter.into_iter().collect())
    }
}

impl From<serde_json::Value> for Value {
    fn from(json: serde_json::Value) -> Self {
        match json {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(b) => Value::Bool(b),
            serde_json::Value::Number(n) => match n.as_i64() {
                Some(i) => Value::Int(i),
                // u64 beyond i64 and real numbers both land here
                None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
            },
            serde_json::Value::String(s) => Value::String(s),
            serde_json::Value::Array(items) => {
                Value::List(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(obj) => Value::Map(
                obj.into_iter()
                    .map(|(k, v)| (Key::from(k), Value::from(v)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::Null => serializer.serialize_unit(),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Int(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::String(s) => serializer.serialize_str(s),
            Value::List(items) => serializer.collect_seq(items),
            Value::Map(map) => serializer.collect_map(map.iter()),
            Value::Object(dto) => dto.serialize(serializer),
        }
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        serde_json::Value::deserialize(deserializer).map(Value::from)
    }
}
