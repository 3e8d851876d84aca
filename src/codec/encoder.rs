//! Purpose: Encode `Value` trees, rich values included, as JSON text.
//! Exports: `Encoder`, `DumpOptions`, `KeyMode`.
//! Role: Owns one registry copy plus key-mode override and serves as the writer's default hook.
//! Invariants: Key-mode flags are validated once, in `Encoder::new`, before any value is seen.
//! Invariants: Dispatch order is exact type, then first registered base type by name, then failure.
//! Invariants: The input tree is never mutated; one-shot iterators inside it are drained.
use crate::core::error::{Error, ErrorKind};
use crate::core::registry::{
    Registration, TypeRegistry, default_registry, encode_key_as_entity, encode_key_as_pairs,
    encode_key_as_urlsafe,
};
use crate::core::rich::{AsAny, EntityKey, RichValue};
use crate::core::value::Value;
use crate::json::write::{JsonWriter, WriteOptions};
use serde::Deserialize;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::io::Write;
use std::sync::Arc;
use tracing::{debug, trace};

/// How entity keys are written.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum KeyMode {
    /// Fetch the addressed entity and encode that.
    #[default]
    Entity,
    /// `[[kind, id], ...]` from the root ancestor down.
    Pairs,
    /// Opaque URL-safe token.
    UrlSafe,
}

type KeyEncodeFn = fn(&Arc<dyn EntityKey>) -> Result<Value, Error>;

impl KeyMode {
    fn encoder(self) -> KeyEncodeFn {
        match self {
            KeyMode::Entity => encode_key_as_entity,
            KeyMode::Pairs => encode_key_as_pairs,
            KeyMode::UrlSafe => encode_key_as_urlsafe,
        }
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(default)]
pub struct DumpOptions {
    pub keys_as_entities: bool,
    pub keys_as_pairs: bool,
    pub keys_as_urlsafe: bool,
    #[serde(flatten)]
    pub write: WriteOptions,
}

impl DumpOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sort_keys(mut self, sort_keys: bool) -> Self {
        self.write.sort_keys = sort_keys;
        self
    }

    pub fn with_indent(mut self, indent: usize) -> Self {
        self.write.indent = Some(indent);
        self
    }

    pub fn with_keys_as_entities(mut self, enabled: bool) -> Self {
        self.keys_as_entities = enabled;
        self
    }

    pub fn with_keys_as_pairs(mut self, enabled: bool) -> Self {
        self.keys_as_pairs = enabled;
        self
    }

    pub fn with_keys_as_urlsafe(mut self, enabled: bool) -> Self {
        self.keys_as_urlsafe = enabled;
        self
    }

    /// The explicitly requested key mode, if any.
    pub fn key_mode(&self) -> Result<Option<KeyMode>, Error> {
        let flags = [
            ("keys_as_entities", self.keys_as_entities, KeyMode::Entity),
            ("keys_as_pairs", self.keys_as_pairs, KeyMode::Pairs),
            ("keys_as_urlsafe", self.keys_as_urlsafe, KeyMode::UrlSafe),
        ];
        let requested: Vec<_> = flags.iter().filter(|(_, enabled, _)| *enabled).collect();
        match requested.as_slice() {
            [] => Ok(None),
            [(_, _, mode)] => Ok(Some(*mode)),
            conflicting => {
                let names: Vec<&str> = conflicting.iter().map(|(name, _, _)| *name).collect();
                Err(Error::new(ErrorKind::Config)
                    .with_message(format!(
                        "only one of keys_as_entities, keys_as_pairs, keys_as_urlsafe can be true (got {})",
                        names.join(", ")
                    ))
                    .with_hint("pick a single key encoding mode"))
            }
        }
    }
}

pub struct Encoder {
    registry: TypeRegistry,
    key_mode: KeyMode,
    write: WriteOptions,
    // Concrete type -> registered base type, filled by instance scans.
    resolved: RefCell<HashMap<TypeId, TypeId>>,
}

impl Encoder {
    pub fn new(options: DumpOptions) -> Result<Self, Error> {
        Self::with_registry(default_registry().clone(), options)
    }

    /// Builds an encoder over a caller-supplied registry. An explicit key
    /// mode still overrides whatever the registry holds for keys.
    pub fn with_registry(mut registry: TypeRegistry, options: DumpOptions) -> Result<Self, Error> {
        let requested = options.key_mode()?;
        if requested.is_some() || !registry.contains::<Arc<dyn EntityKey>>() {
            let mode = requested.unwrap_or_default();
            registry.register::<Arc<dyn EntityKey>, _>("Key", mode.encoder());
        }
        let key_mode = requested.unwrap_or_default();
        debug!(?key_mode, registered = registry.len(), "encoder ready");
        Ok(Self {
            registry,
            key_mode,
            write: options.write,
            resolved: RefCell::new(HashMap::new()),
        })
    }

    pub fn key_mode(&self) -> KeyMode {
        self.key_mode
    }

    pub fn registry(&self) -> &TypeRegistry {
        &self.registry
    }

    pub fn write_options(&self) -> &WriteOptions {
        &self.write
    }

    pub fn encode(&self, value: &Value) -> Result<String, Error> {
        let mut out = Vec::new();
        self.encode_to(value, &mut out)?;
        String::from_utf8(out).map_err(|err| {
            Error::new(ErrorKind::Internal)
                .with_message("writer produced invalid UTF-8")
                .with_source(err)
        })
    }

    /// Streams the encoding of `value` into `out`, token by token.
    pub fn encode_to<W: Write>(&self, value: &Value, out: W) -> Result<(), Error> {
        let hook = |rich: &dyn RichValue| self.encode_rich(rich);
        JsonWriter::new(out, &self.write, &hook).write(value)
    }

    /// Lowers one rich value by one step. The result may itself contain rich
    /// values; the writer sends those back here.
    pub fn encode_rich(&self, value: &dyn RichValue) -> Result<Value, Error> {
        if let Some(entry) = self.registry.get(value.concrete_type_id()) {
            trace!(type_name = entry.name(), "exact registry match");
            return entry.encode(AsAny::as_any(value));
        }
        if let Some((entry, view)) = self.resolve_instance(value) {
            trace!(
                type_name = value.type_name(),
                base = entry.name(),
                "registry match by instance"
            );
            return entry.encode(view);
        }
        Err(Error::not_serializable(value.type_name()))
    }

    fn resolve_instance<'s, 'v>(
        &'s self,
        value: &'v dyn RichValue,
    ) -> Option<(&'s Registration, &'v dyn Any)> {
        let concrete = value.concrete_type_id();
        let cached = self.resolved.borrow().get(&concrete).copied();
        if let Some(base) = cached {
            return Some((self.registry.get(base)?, value.instance_of(base)?));
        }
        let (entry, view) = self
            .registry
            .iter()
            .find_map(|entry| value.instance_of(entry.type_id()).map(|view| (entry, view)))?;
        self.resolved.borrow_mut().insert(concrete, entry.type_id());
        Some((entry, view))
    }
}
