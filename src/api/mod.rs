//! Purpose: Define the stable public Rust API boundary for the codec.
//! Exports: Entry points, encoder/decoder types, options, value model, collaborator traits.
//! Role: Public, additive-only surface; callers should not need the inner module paths.
//! Invariants: Everything exported here is re-exported, never defined, in this module.

pub use crate::codec::decoder::{Decoder, LoadOptions, RewriteScope, decode_date};
pub use crate::codec::encoder::{DumpOptions, Encoder, KeyMode};
pub use crate::codec::{dump, dumps, loads};
pub use crate::core::error::{Error, ErrorKind};
pub use crate::core::registry::{Registration, TypeRegistry, default_registry};
pub use crate::core::rich::{
    BaseValue, Complex, Deferred, EntityKey, KeyId, Model, Query, QueryIterator, RichValue,
    StructTime,
};
pub use crate::core::value::{Map, Value};
pub use crate::environ::{Platform, ProcessEnv};
pub use crate::json::write::WriteOptions;
