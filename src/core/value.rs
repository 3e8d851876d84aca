//! Purpose: In-memory value tree consumed by the encoder and produced by the decoder.
//! Exports: `Value`, `Map`.
//! Role: JSON-shaped data plus an escape hatch (`Value::Rich`) for datastore and date/time values.
//! Invariants: `Map` preserves insertion order; re-inserting a key keeps its first position.
//! Invariants: Decoding never produces `Bytes`; only callers and model encoders do.
use crate::core::rich::{Deferred, EntityKey, Model, Query, RichValue};
use std::sync::Arc;
use time::{OffsetDateTime, PrimitiveDateTime};

pub type Map = indexmap::IndexMap<String, Value>;

#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    /// Holds both `i64` and `u64` values. The writer refuses anything wider,
    /// since the reader would hand it back as a float.
    Int(i128),
    Float(f64),
    String(String),
    /// Raw bytes; written as text when they are valid UTF-8.
    Bytes(Vec<u8>),
    Array(Vec<Value>),
    Object(Map),
    Rich(Arc<dyn RichValue>),
}

impl Value {
    pub fn rich(value: impl RichValue) -> Self {
        Value::Rich(Arc::new(value))
    }

    pub fn model(model: impl Model + 'static) -> Self {
        Value::rich(Arc::new(model) as Arc<dyn Model>)
    }

    pub fn key(key: impl EntityKey + 'static) -> Self {
        Value::rich(Arc::new(key) as Arc<dyn EntityKey>)
    }

    pub fn deferred(deferred: impl Deferred + 'static) -> Self {
        Value::rich(Arc::new(deferred) as Arc<dyn Deferred>)
    }

    pub fn query(query: impl Query + 'static) -> Self {
        Value::rich(Arc::new(query) as Arc<dyn Query>)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::Int(val) => i64::try_from(*val).ok(),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(val) => Some(*val),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(text) => Some(text.as_str()),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Value::Array(items) => Some(items.as_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Value::Object(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_rich(&self) -> Option<&dyn RichValue> {
        match self {
            Value::Rich(rich) => Some(rich.as_ref()),
            _ => None,
        }
    }

    pub fn downcast_rich<T: RichValue>(&self) -> Option<&T> {
        self.as_rich()?.downcast_ref::<T>()
    }

    /// Naive date-time, as produced by decoding a date-like string.
    pub fn as_datetime(&self) -> Option<PrimitiveDateTime> {
        self.downcast_rich::<PrimitiveDateTime>().copied()
    }

    pub fn as_offset_datetime(&self) -> Option<OffsetDateTime> {
        self.downcast_rich::<OffsetDateTime>().copied()
    }

    /// Looks up `key` when this is an object.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object()?.get(key)
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Float(a), Value::Float(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Bytes(a), Value::Bytes(b)) => a == b,
            (Value::Array(a), Value::Array(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a == b,
            (Value::Rich(a), Value::Rich(b)) => a.rich_eq(b.as_ref()),
            _ => false,
        }
    }
}

impl From<bool> for Value {
    fn from(val: bool) -> Self {
        Value::Bool(val)
    }
}

macro_rules! from_integer {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Value {
                fn from(val: $ty) -> Self {
                    Value::Int(val.into())
                }
            }
        )*
    };
}

from_integer!(i8, i16, i32, i64, u8, u16, u32, u64);

impl From<f64> for Value {
    fn from(val: f64) -> Self {
        Value::Float(val)
    }
}

impl From<&str> for Value {
    fn from(text: &str) -> Self {
        Value::String(text.to_string())
    }
}

impl From<String> for Value {
    fn from(text: String) -> Self {
        Value::String(text)
    }
}

impl From<Vec<u8>> for Value {
    fn from(bytes: Vec<u8>) -> Self {
        Value::Bytes(bytes)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Value::Array(items)
    }
}

impl From<Map> for Value {
    fn from(map: Map) -> Self {
        Value::Object(map)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(val: Option<T>) -> Self {
        val.map_or(Value::Null, Into::into)
    }
}

impl<K: Into<String>, V: Into<Value>> FromIterator<(K, V)> for Value {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Value::Object(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

impl From<serde_json::Value> for Value {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => Value::Null,
            serde_json::Value::Bool(val) => Value::Bool(val),
            serde_json::Value::Number(num) => {
                if let Some(val) = num.as_i64() {
                    Value::Int(val.into())
                } else if let Some(val) = num.as_u64() {
                    Value::Int(val.into())
                } else {
                    Value::Float(num.as_f64().unwrap_or(f64::NAN))
                }
            }
            serde_json::Value::String(text) => Value::String(text),
            serde_json::Value::Array(items) => {
                Value::Array(items.into_iter().map(Value::from).collect())
            }
            serde_json::Value::Object(map) => map.into_iter().collect(),
        }
    }
}
