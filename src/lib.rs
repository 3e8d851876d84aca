//! Purpose: JSON codec for datastore objects plus hosting-environment helpers.
//! Exports: `dumps`, `dump`, `loads`, `Encoder`, `Decoder`, option types, `Value`, `Error`.
//! Role: Library crate; `api` is the stable surface, the other modules are building blocks.
//! Invariants: Encoding never mutates its input; decoding never fails on a date it cannot parse.
//! Invariants: No global mutable state; the default registry is read-only after first use.
pub mod api;
pub mod codec;
pub mod core;
pub mod environ;
pub mod json;

pub use api::{
    Decoder, DumpOptions, Encoder, Error, ErrorKind, KeyMode, LoadOptions, RewriteScope, Value,
    dump, dumps, loads,
};
