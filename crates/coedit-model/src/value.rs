//! Document values.
//!
//! A shared document is a tree of [`DataValue`]s. Objects keep insertion
//! order so that two sessions that apply the same operations also render
//! properties in the same order.

use std::fmt;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde_json::{Map, Number, Value};

/// Property map of an object value.
pub type ObjectMap = IndexMap<String, DataValue>;

/// Key used to carry dates through plain JSON.
pub const DATE_KEY: &str = "$date";

/// A value stored in a collaborative document.
#[derive(Debug, Clone, PartialEq)]
pub enum DataValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<DataValue>),
    Object(ObjectMap),
}

/// The kind of a [`DataValue`], without its contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Boolean,
    Number,
    String,
    Date,
    Array,
    Object,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Date => "date",
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

impl DataValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            DataValue::Null => ValueKind::Null,
            DataValue::Bool(_) => ValueKind::Boolean,
            DataValue::Number(_) => ValueKind::Number,
            DataValue::String(_) => ValueKind::String,
            DataValue::Date(_) => ValueKind::Date,
            DataValue::Array(_) => ValueKind::Array,
            DataValue::Object(_) => ValueKind::Object,
        }
    }

    /// Returns true for arrays and objects.
    pub fn is_container(&self) -> bool {
        matches!(self, DataValue::Array(_) | DataValue::Object(_))
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DataValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            DataValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DataValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<DataValue>> {
        match self {
            DataValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_array_mut(&mut self) -> Option<&mut Vec<DataValue>> {
        match self {
            DataValue::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectMap> {
        match self {
            DataValue::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_object_mut(&mut self) -> Option<&mut ObjectMap> {
        match self {
            DataValue::Object(map) => Some(map),
            _ => None,
        }
    }

    /// Converts to plain JSON.
    ///
    /// Integral numbers are emitted as JSON integers, non-finite numbers as
    /// `null`, and dates as `{"$date": "<RFC 3339>"}`.
    pub fn to_json(&self) -> Value {
        match self {
            DataValue::Null => Value::Null,
            DataValue::Bool(b) => Value::Bool(*b),
            DataValue::Number(n) => number_to_json(*n),
            DataValue::String(s) => Value::String(s.clone()),
            DataValue::Date(d) => {
                let mut m = Map::new();
                m.insert(DATE_KEY.to_string(), Value::String(d.to_rfc3339()));
                Value::Object(m)
            }
            DataValue::Array(arr) => Value::Array(arr.iter().map(DataValue::to_json).collect()),
            DataValue::Object(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    /// Converts from plain JSON, recognising the date convention of
    /// [`DataValue::to_json`].
    pub fn from_json(value: &Value) -> Self {
        match value {
            Value::Null => DataValue::Null,
            Value::Bool(b) => DataValue::Bool(*b),
            Value::Number(n) => DataValue::Number(n.as_f64().unwrap_or(0.0)),
            Value::String(s) => DataValue::String(s.clone()),
            Value::Array(arr) => DataValue::Array(arr.iter().map(DataValue::from_json).collect()),
            Value::Object(map) => {
                if let Some(date) = date_from_json(map) {
                    return DataValue::Date(date);
                }
                DataValue::Object(
                    map.iter()
                        .map(|(k, v)| (k.clone(), DataValue::from_json(v)))
                        .collect(),
                )
            }
        }
    }
}

fn number_to_json(n: f64) -> Value {
    if n.is_finite() && n.fract() == 0.0 && n.abs() < 9.007_199_254_740_992e15 {
        return Value::Number(Number::from(n as i64));
    }
    Number::from_f64(n).map(Value::Number).unwrap_or(Value::Null)
}

fn date_from_json(map: &Map<String, Value>) -> Option<DateTime<Utc>> {
    if map.len() != 1 {
        return None;
    }
    let raw = map.get(DATE_KEY)?.as_str()?;
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}

impl From<Value> for DataValue {
    fn from(value: Value) -> Self {
        DataValue::from_json(&value)
    }
}

impl From<&str> for DataValue {
    fn from(s: &str) -> Self {
        DataValue::String(s.to_string())
    }
}

impl From<String> for DataValue {
    fn from(s: String) -> Self {
        DataValue::String(s)
    }
}

impl From<f64> for DataValue {
    fn from(n: f64) -> Self {
        DataValue::Number(n)
    }
}

impl From<bool> for DataValue {
    fn from(b: bool) -> Self {
        DataValue::Bool(b)
    }
}

impl From<DateTime<Utc>> for DataValue {
    fn from(d: DateTime<Utc>) -> Self {
        DataValue::Date(d)
    }
}

impl From<Vec<DataValue>> for DataValue {
    fn from(arr: Vec<DataValue>) -> Self {
        DataValue::Array(arr)
    }
}

impl From<ObjectMap> for DataValue {
    fn from(map: ObjectMap) -> Self {
        DataValue::Object(map)
    }
}
