//! Purpose: One-call entry points for encoding and decoding.
//! Exports: `dumps`, `dump`, `loads`, plus the `encoder` and `decoder` modules.
//! Role: Builds a fresh `Encoder`/`Decoder` per call; nothing is shared between calls
//! except the read-only default registry.
pub mod decoder;
pub mod encoder;

use crate::core::error::Error;
use crate::core::value::Value;
use decoder::{Decoder, LoadOptions};
use encoder::{DumpOptions, Encoder};
use std::io::Write;

pub fn dumps(value: &Value, options: DumpOptions) -> Result<String, Error> {
    Encoder::new(options)?.encode(value)
}

/// Streams the encoding into `sink`. On error the sink may hold a partial document.
pub fn dump<W: Write>(value: &Value, sink: W, options: DumpOptions) -> Result<(), Error> {
    Encoder::new(options)?.encode_to(value, sink)
}

pub fn loads(text: &str, options: LoadOptions) -> Result<Value, Error> {
    Decoder::new(options).decode(text)
}
