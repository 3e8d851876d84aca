//! Purpose: Map rich value types to the functions that lower them to JSON-shaped values.
//! Exports: `TypeRegistry`, `Registration`, `EncodeFn`, `default_registry`, built-in `encode_*` fns.
//! Role: Extension table consulted by the encoder whenever the writer meets a `Value::Rich`.
//! Invariants: At most one registration per type; registering again replaces the entry.
//! Invariants: Iteration order is by registered name, so subtype resolution is reproducible.
//! Invariants: The default table is built once and never mutated; encoders copy and patch it.
use crate::core::datetime;
use crate::core::error::{Error, ErrorKind};
use crate::core::rich::{
    BaseValue, Complex, Deferred, EntityKey, Model, Query, QueryIterator, StructTime,
};
use crate::core::value::Value;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, LazyLock};
use time::{Date, OffsetDateTime, PrimitiveDateTime};

pub type EncodeFn = Arc<dyn Fn(&dyn Any) -> Result<Value, Error> + Send + Sync>;

#[derive(Clone)]
pub struct Registration {
    name: &'static str,
    type_id: TypeId,
    encode: EncodeFn,
}

impl Registration {
    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Runs the encoder on `view`, which must be (a view of) the registered type.
    pub fn encode(&self, view: &dyn Any) -> Result<Value, Error> {
        (self.encode)(view)
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Clone, Debug, Default)]
pub struct TypeRegistry {
    entries: HashMap<TypeId, Registration>,
    order: Vec<TypeId>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<T, F>(&mut self, name: &'static str, encode: F) -> &mut Self
    where
        T: Any,
        F: Fn(&T) -> Result<Value, Error> + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<T>();
        let encode: EncodeFn = Arc::new(move |view: &dyn Any| match view.downcast_ref::<T>() {
            Some(value) => encode(value),
            None => Err(Error::new(ErrorKind::Internal)
                .with_message(format!("encoder for {name} received a value of another type"))),
        });
        let registration = Registration {
            name,
            type_id,
            encode,
        };
        if self.entries.insert(type_id, registration).is_none() {
            self.order.push(type_id);
        }
        self.order.sort_by_key(|id| self.entries[id].name);
        self
    }

    pub fn with<T, F>(mut self, name: &'static str, encode: F) -> Self
    where
        T: Any,
        F: Fn(&T) -> Result<Value, Error> + Send + Sync + 'static,
    {
        self.register::<T, F>(name, encode);
        self
    }

    pub fn get(&self, type_id: TypeId) -> Option<&Registration> {
        self.entries.get(&type_id)
    }

    pub fn contains<T: Any>(&self) -> bool {
        self.entries.contains_key(&TypeId::of::<T>())
    }

    /// Registrations in name order.
    pub fn iter(&self) -> impl Iterator<Item = &Registration> + '_ {
        self.order.iter().filter_map(|id| self.entries.get(id))
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.iter().map(Registration::name)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

static DEFAULT_REGISTRY: LazyLock<TypeRegistry> = LazyLock::new(builtin_registry);

/// Built-in encoders; keys encode as the entities they address.
pub fn default_registry() -> &'static TypeRegistry {
    &DEFAULT_REGISTRY
}

fn builtin_registry() -> TypeRegistry {
    TypeRegistry::new()
        .with::<Arc<dyn Deferred>, _>("Future", encode_future)
        .with::<Arc<dyn EntityKey>, _>("Key", encode_key_as_entity)
        .with::<Arc<dyn Model>, _>("Model", encode_model)
        .with::<Arc<dyn Query>, _>("Query", encode_query)
        .with::<QueryIterator, _>("QueryIterator", encode_query_iterator)
        .with::<BaseValue, _>("BaseValue", encode_base_value)
        .with::<Complex, _>("Complex", encode_complex)
        .with::<Date, _>("Date", encode_date)
        .with::<PrimitiveDateTime, _>("DateTime", encode_datetime)
        .with::<OffsetDateTime, _>("OffsetDateTime", encode_offset_datetime)
        .with::<StructTime, _>("StructTime", encode_struct_time)
}

/// Lowers a model to its field mapping. Binary fields that are not valid
/// UTF-8 are base64 encoded so the mapping stays representable as text.
pub fn encode_model(model: &Arc<dyn Model>) -> Result<Value, Error> {
    let mut fields = model.to_dict()?;
    for value in fields.values_mut() {
        if let Value::Bytes(bytes) = value {
            if std::str::from_utf8(bytes).is_err() {
                let encoded = STANDARD.encode(bytes.as_slice());
                *value = Value::String(encoded);
            }
        }
    }
    Ok(Value::Object(fields))
}

pub fn encode_query(query: &Arc<dyn Query>) -> Result<Value, Error> {
    query.fetch().map(Value::Array)
}

pub fn encode_query_iterator(iter: &QueryIterator) -> Result<Value, Error> {
    iter.drain().map(Value::Array)
}

/// May return a deferred handle, which the encoder then resolves.
pub fn encode_key_as_entity(key: &Arc<dyn EntityKey>) -> Result<Value, Error> {
    key.get_async()
}

pub fn encode_key_as_pairs(key: &Arc<dyn EntityKey>) -> Result<Value, Error> {
    let pairs = key
        .pairs()
        .into_iter()
        .map(|(kind, id)| Value::Array(vec![Value::String(kind), id.into()]))
        .collect();
    Ok(Value::Array(pairs))
}

pub fn encode_key_as_urlsafe(key: &Arc<dyn EntityKey>) -> Result<Value, Error> {
    Ok(Value::String(key.urlsafe()))
}

pub fn encode_future(future: &Arc<dyn Deferred>) -> Result<Value, Error> {
    future.get_result()
}

pub fn encode_date(date: &Date) -> Result<Value, Error> {
    datetime::format_date(*date)
        .map(Value::String)
        .map_err(format_error)
}

/// Naive date-times are UTC by convention, so they get an explicit `Z`.
pub fn encode_datetime(value: &PrimitiveDateTime) -> Result<Value, Error> {
    datetime::format_datetime(*value)
        .map(|text| Value::String(text + "Z"))
        .map_err(format_error)
}

pub fn encode_offset_datetime(value: &OffsetDateTime) -> Result<Value, Error> {
    datetime::format_offset_datetime(*value)
        .map(Value::String)
        .map_err(format_error)
}

pub fn encode_complex(value: &Complex) -> Result<Value, Error> {
    Ok(Value::Array(vec![Value::Float(value.re), Value::Float(value.im)]))
}

pub fn encode_base_value(value: &BaseValue) -> Result<Value, Error> {
    Ok(value.0.clone())
}

pub fn encode_struct_time(value: &StructTime) -> Result<Value, Error> {
    Ok(Value::Array(value.fields().into_iter().map(Value::from).collect()))
}

fn format_error(err: time::error::Format) -> Error {
    Error::new(ErrorKind::Encoding)
        .with_message(format!("date/time cannot be rendered as ISO-8601: {err}"))
        .with_source(err)
}
