//! Purpose: Baseline JSON reader producing `Value` trees with a per-object rewrite hook.
//! Exports: `from_str`, `ObjectHook`, `ParseFailureCategory`, `categorize_error`,
//! `categorize_message`, `hint_for_error`.
//! Role: Single parser seam; the decoder layers its date rewrite on top through the hook.
//! Invariants: The hook sees every object exactly once, innermost objects first.
//! Invariants: Only the standard grammar is accepted (no `NaN`/`Infinity` tokens).
//! Notes: Parse failures keep the serde_json error as source plus a stable category hint.
use crate::core::error::{Error, ErrorKind};
use crate::core::value::{Map, Value};
use serde::de::{self, DeserializeSeed, Deserializer, MapAccess, SeqAccess, Visitor};
use serde_json::error::Category;
use std::fmt;

/// Rewrites a freshly parsed mapping before it is attached to its parent.
pub type ObjectHook<'a> = &'a dyn Fn(Map) -> Map;

pub fn from_str(input: &str, hook: ObjectHook<'_>) -> Result<Value, Error> {
    let mut de = serde_json::Deserializer::from_str(input);
    let value = ValueSeed { hook }
        .deserialize(&mut de)
        .map_err(|err| parse_error(err, "value"))?;
    de.end().map_err(|err| parse_error(err, "trailing input"))?;
    Ok(value)
}

#[derive(Clone, Copy)]
struct ValueSeed<'h> {
    hook: ObjectHook<'h>,
}

impl<'de> DeserializeSeed<'de> for ValueSeed<'_> {
    type Value = Value;

    fn deserialize<D>(self, deserializer: D) -> Result<Value, D::Error>
    where
        D: Deserializer<'de>,
    {
        deserializer.deserialize_any(self)
    }
}

impl<'de> Visitor<'de> for ValueSeed<'_> {
    type Value = Value;

    fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("any JSON value")
    }

    fn visit_bool<E: de::Error>(self, val: bool) -> Result<Value, E> {
        Ok(Value::Bool(val))
    }

    fn visit_i64<E: de::Error>(self, val: i64) -> Result<Value, E> {
        Ok(Value::Int(val.into()))
    }

    fn visit_u64<E: de::Error>(self, val: u64) -> Result<Value, E> {
        Ok(Value::Int(val.into()))
    }

    fn visit_f64<E: de::Error>(self, val: f64) -> Result<Value, E> {
        Ok(Value::Float(val))
    }

    fn visit_str<E: de::Error>(self, val: &str) -> Result<Value, E> {
        Ok(Value::String(val.to_owned()))
    }

    fn visit_string<E: de::Error>(self, val: String) -> Result<Value, E> {
        Ok(Value::String(val))
    }

    fn visit_unit<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_none<E: de::Error>(self) -> Result<Value, E> {
        Ok(Value::Null)
    }

    fn visit_seq<A>(self, mut seq: A) -> Result<Value, A::Error>
    where
        A: SeqAccess<'de>,
    {
        let mut items = Vec::with_capacity(seq.size_hint().unwrap_or(0));
        while let Some(item) = seq.next_element_seed(self)? {
            items.push(item);
        }
        Ok(Value::Array(items))
    }

    fn visit_map<A>(self, mut access: A) -> Result<Value, A::Error>
    where
        A: MapAccess<'de>,
    {
        let mut map = Map::new();
        while let Some(key) = access.next_key::<String>()? {
            let value = access.next_value_seed(self)?;
            map.insert(key, value);
        }
        Ok(Value::Object((self.hook)(map)))
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParseFailureCategory {
    Syntax,
    Eof,
    Data,
    Io,
    DepthLimit,
    Unknown,
}

impl ParseFailureCategory {
    pub fn label(self) -> &'static str {
        match self {
            ParseFailureCategory::Syntax => "syntax",
            ParseFailureCategory::Eof => "eof",
            ParseFailureCategory::Data => "data",
            ParseFailureCategory::Io => "io",
            ParseFailureCategory::DepthLimit => "depth-limit",
            ParseFailureCategory::Unknown => "unknown",
        }
    }
}

pub fn categorize_error(err: &serde_json::Error) -> ParseFailureCategory {
    if categorize_message(&err.to_string()) == ParseFailureCategory::DepthLimit {
        return ParseFailureCategory::DepthLimit;
    }
    match err.classify() {
        Category::Syntax => ParseFailureCategory::Syntax,
        Category::Eof => ParseFailureCategory::Eof,
        Category::Data => ParseFailureCategory::Data,
        Category::Io => ParseFailureCategory::Io,
    }
}

pub fn categorize_message(message: &str) -> ParseFailureCategory {
    let message = message.to_ascii_lowercase();
    if message.contains("recursion limit") {
        ParseFailureCategory::DepthLimit
    } else if message.contains("eof while parsing") {
        ParseFailureCategory::Eof
    } else if message.contains("expected") || message.contains("invalid") {
        ParseFailureCategory::Syntax
    } else {
        ParseFailureCategory::Unknown
    }
}

pub fn hint_for_error(err: &serde_json::Error, context: &str) -> String {
    format!(
        "parse category: {}; line {} column {}; context: {context}",
        categorize_error(err).label(),
        err.line(),
        err.column()
    )
}

fn parse_error(err: serde_json::Error, context: &str) -> Error {
    Error::new(ErrorKind::Parse)
        .with_message(format!("invalid JSON text: {err}"))
        .with_hint(hint_for_error(&err, context))
        .with_source(err)
}
