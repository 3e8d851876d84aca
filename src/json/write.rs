//! Purpose: Baseline streaming JSON writer for `Value` trees.
//! Exports: `WriteOptions`, `JsonWriter`, `DefaultHook`, `float_repr`.
//! Role: Emits the reference text layout (`", "` / `": "` separators) and defers rich values to a hook.
//! Invariants: Output for plain values depends only on the value and `WriteOptions`.
//! Invariants: Every token is written to the sink as soon as it is produced; nothing is buffered here.
//! Invariants: Nesting (containers plus hook replacements) is bounded by `max_depth`.
use crate::core::error::{Error, ErrorKind};
use crate::core::rich::RichValue;
use crate::core::value::{Map, Value};
use serde::Deserialize;
use std::io::Write;

pub const DEFAULT_MAX_DEPTH: usize = 512;

#[derive(Clone, Debug, Deserialize, PartialEq)]
#[serde(default)]
pub struct WriteOptions {
    pub sort_keys: bool,
    /// Spaces per nesting level; `None` keeps everything on one line.
    pub indent: Option<usize>,
    /// `(item, key)` separators overriding the defaults.
    pub separators: Option<(String, String)>,
    pub ensure_ascii: bool,
    pub allow_nan: bool,
    pub max_depth: usize,
}

impl WriteOptions {
    pub fn new() -> Self {
        Self {
            sort_keys: false,
            indent: None,
            separators: None,
            ensure_ascii: true,
            allow_nan: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }

    fn item_separator(&self) -> &str {
        match (&self.separators, self.indent) {
            (Some((item, _)), _) => item.as_str(),
            (None, Some(_)) => ",",
            (None, None) => ", ",
        }
    }

    fn key_separator(&self) -> &str {
        match &self.separators {
            Some((_, key)) => key.as_str(),
            None => ": ",
        }
    }
}

impl Default for WriteOptions {
    fn default() -> Self {
        Self::new()
    }
}

/// Called for every `Value::Rich`; its result is written in the value's place.
pub type DefaultHook<'a> = &'a dyn Fn(&dyn RichValue) -> Result<Value, Error>;

pub struct JsonWriter<'a, W: Write> {
    out: W,
    options: &'a WriteOptions,
    default: DefaultHook<'a>,
}

impl<'a, W: Write> JsonWriter<'a, W> {
    pub fn new(out: W, options: &'a WriteOptions, default: DefaultHook<'a>) -> Self {
        Self {
            out,
            options,
            default,
        }
    }

    pub fn write(&mut self, value: &Value) -> Result<(), Error> {
        self.write_value(value, 0, 0)?;
        self.out.flush()?;
        Ok(())
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn write_value(&mut self, value: &Value, level: usize, depth: usize) -> Result<(), Error> {
        if depth > self.options.max_depth {
            return Err(Error::new(ErrorKind::RecursionLimit)
                .with_message(format!("nesting exceeds {} levels", self.options.max_depth))
                .with_hint("check for keys or entities that refer back to themselves"));
        }
        match value {
            Value::Null => self.chunk("null"),
            Value::Bool(val) => self.chunk(if *val { "true" } else { "false" }),
            Value::Int(num) => {
                let text = int_text(*num)?;
                self.chunk(&text)
            }
            Value::Float(num) => {
                let text = self.float_text(*num)?;
                self.chunk(&text)
            }
            Value::String(text) => self.write_string(text),
            Value::Bytes(bytes) => match std::str::from_utf8(bytes) {
                Ok(text) => self.write_string(text),
                Err(err) => Err(Error::new(ErrorKind::Encoding)
                    .with_message(format!("byte string is not valid UTF-8: {err}"))
                    .with_hint("base64 encode binary payloads before writing them")
                    .with_source(err)),
            },
            Value::Array(items) => self.write_array(items, level, depth),
            Value::Object(map) => self.write_object(map, level, depth),
            Value::Rich(rich) => {
                let replacement = (self.default)(rich.as_ref())?;
                self.write_value(&replacement, level, depth + 1)
            }
        }
    }

    fn write_array(&mut self, items: &[Value], level: usize, depth: usize) -> Result<(), Error> {
        if items.is_empty() {
            return self.chunk("[]");
        }
        self.chunk("[")?;
        for (idx, item) in items.iter().enumerate() {
            self.separate(idx, level + 1)?;
            self.write_value(item, level + 1, depth + 1)?;
        }
        self.close(level)?;
        self.chunk("]")
    }

    fn write_object(&mut self, map: &Map, level: usize, depth: usize) -> Result<(), Error> {
        if map.is_empty() {
            return self.chunk("{}");
        }
        let mut entries: Vec<(&String, &Value)> = map.iter().collect();
        if self.options.sort_keys {
            entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        }
        self.chunk("{")?;
        for (idx, (key, value)) in entries.into_iter().enumerate() {
            self.separate(idx, level + 1)?;
            self.write_string(key)?;
            let options = self.options;
            self.chunk(options.key_separator())?;
            self.write_value(value, level + 1, depth + 1)?;
        }
        self.close(level)?;
        self.chunk("}")
    }

    // Item separator (after the first item) plus the newline/indent when indenting.
    fn separate(&mut self, idx: usize, level: usize) -> Result<(), Error> {
        if idx > 0 {
            let options = self.options;
            self.chunk(options.item_separator())?;
        }
        self.push_indent(level)
    }

    fn close(&mut self, level: usize) -> Result<(), Error> {
        self.push_indent(level)
    }

    fn push_indent(&mut self, level: usize) -> Result<(), Error> {
        if let Some(width) = self.options.indent {
            let text = format!("\n{}", " ".repeat(width * level));
            self.chunk(&text)?;
        }
        Ok(())
    }

    fn write_string(&mut self, text: &str) -> Result<(), Error> {
        let escaped = escape_string(text, self.options.ensure_ascii);
        self.chunk(&escaped)
    }

    fn float_text(&self, num: f64) -> Result<String, Error> {
        if num.is_finite() {
            return Ok(float_repr(num));
        }
        if !self.options.allow_nan {
            return Err(Error::new(ErrorKind::Encoding)
                .with_message(format!("out of range float value {num} is not JSON compliant")));
        }
        let label = if num.is_nan() {
            "NaN"
        } else if num > 0.0 {
            "Infinity"
        } else {
            "-Infinity"
        };
        Ok(label.to_string())
    }

    fn chunk(&mut self, text: &str) -> Result<(), Error> {
        self.out.write_all(text.as_bytes())?;
        Ok(())
    }
}

// Integer text outside i64/u64 would read back as a float.
fn int_text(num: i128) -> Result<String, Error> {
    if num < i128::from(i64::MIN) || num > i128::from(u64::MAX) {
        return Err(Error::new(ErrorKind::Encoding)
            .with_message(format!("integer {num} is outside the 64-bit range"))
            .with_hint("store wide integers as strings"));
    }
    Ok(num.to_string())
}

fn escape_string(text: &str, ensure_ascii: bool) -> String {
    let mut out = String::with_capacity(text.len() + 2);
    out.push('"');
    for ch in text.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ch if (ch as u32) < 0x20 => push_unicode_escape(ch, &mut out),
            ch if ensure_ascii && !(' '..='~').contains(&ch) => push_unicode_escape(ch, &mut out),
            ch => out.push(ch),
        }
    }
    out.push('"');
    out
}

// Astral characters become UTF-16 surrogate pairs.
fn push_unicode_escape(ch: char, out: &mut String) {
    let mut units = [0u16; 2];
    for unit in ch.encode_utf16(&mut units) {
        out.push_str(&format!("\\u{unit:04x}"));
    }
}

/// Shortest round-trip rendering of a finite float: positional for decimal
/// exponents in `[-4, 16)`, otherwise `d.ddde+XX`.
pub fn float_repr(num: f64) -> String {
    let sci = format!("{num:e}");
    let Some((mantissa, exponent)) = sci.split_once('e') else {
        return sci;
    };
    let exponent: i32 = exponent.parse().unwrap_or(0);
    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", mantissa),
    };
    if !(-4..16).contains(&exponent) {
        let exp_sign = if exponent < 0 { '-' } else { '+' };
        return format!("{sign}{mantissa}e{exp_sign}{:02}", exponent.unsigned_abs());
    }
    let digits: String = mantissa.chars().filter(|ch| *ch != '.').collect();
    if exponent < 0 {
        let zeros = "0".repeat(exponent.unsigned_abs() as usize - 1);
        return format!("{sign}0.{zeros}{digits}");
    }
    let point = exponent as usize + 1;
    if digits.len() <= point {
        let zeros = "0".repeat(point - digits.len());
        format!("{sign}{digits}{zeros}.0")
    } else {
        format!("{sign}{}.{}", &digits[..point], &digits[point..])
    }
}

#[cfg(test)]
mod tests {
    use super::{JsonWriter, WriteOptions, float_repr};
    use crate::core::error::{Error, ErrorKind};
    use crate::core::rich::{Complex, RichValue};
    use crate::core::value::Value;

    fn refuse(rich: &dyn RichValue) -> Result<Value, Error> {
        Err(Error::not_serializable(rich.type_name()))
    }

    fn render(value: &Value, options: &WriteOptions) -> Result<String, Error> {
        let mut writer = JsonWriter::new(Vec::new(), options, &refuse);
        writer.write(value)?;
        Ok(String::from_utf8(writer.into_inner()).expect("utf8 output"))
    }

    fn sample() -> Value {
        [
            ("b", Value::from("x")),
            ("a", Value::from(1)),
            ("c", Value::Array(vec![Value::Null, Value::from(true)])),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn default_layout_uses_spaced_separators() {
        let text = render(&sample(), &WriteOptions::new()).expect("render");
        assert_eq!(text, r#"{"b": "x", "a": 1, "c": [null, true]}"#);
    }

    #[test]
    fn sort_keys_and_compact_separators() {
        let options = WriteOptions {
            sort_keys: true,
            separators: Some((",".to_string(), ":".to_string())),
            ..WriteOptions::new()
        };
        let text = render(&sample(), &options).expect("render");
        assert_eq!(text, r#"{"a":1,"b":"x","c":[null,true]}"#);
    }

    #[test]
    fn indent_places_items_on_their_own_lines() {
        let options = WriteOptions {
            indent: Some(2),
            ..WriteOptions::new()
        };
        let value: Value = [("a", Value::Array(vec![Value::from(1)])), ("e", Value::Array(vec![]))]
            .into_iter()
            .collect();
        let text = render(&value, &options).expect("render");
        assert_eq!(text, "{\n  \"a\": [\n    1\n  ],\n  \"e\": []\n}");
    }

    #[test]
    fn ensure_ascii_escapes_non_ascii() {
        let value = Value::from("(╯°□°)╯︵ ┻━┻ 😀\u{7f}");
        let text = render(&value, &WriteOptions::new()).expect("render");
        assert_eq!(
            text,
            r#""(\u256f\u00b0\u25a1\u00b0)\u256f\ufe35 \u253b\u2501\u253b \ud83d\ude00\u007f""#
        );

        let options = WriteOptions {
            ensure_ascii: false,
            ..WriteOptions::new()
        };
        let text = render(&Value::from("°\n\u{1}"), &options).expect("render");
        assert_eq!(text, "\"°\\n\\u0001\"");
    }

    #[test]
    fn floats_render_like_repr() {
        let cases = [
            (1.2345, "1.2345"),
            (12345.0, "12345.0"),
            (0.0, "0.0"),
            (-0.0, "-0.0"),
            (0.0001, "0.0001"),
            (1.5e-5, "1.5e-05"),
            (1e16, "1e+16"),
            (-2.5e20, "-2.5e+20"),
            (123456789.125, "123456789.125"),
        ];
        for (num, expected) in cases {
            assert_eq!(float_repr(num), expected, "{num:?}");
        }
    }

    #[test]
    fn non_finite_floats_follow_allow_nan() {
        let err = render(&Value::Float(f64::NAN), &WriteOptions::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);

        let options = WriteOptions {
            allow_nan: true,
            ..WriteOptions::new()
        };
        let value = Value::Array(vec![
            Value::Float(f64::NAN),
            Value::Float(f64::INFINITY),
            Value::Float(f64::NEG_INFINITY),
        ]);
        assert_eq!(render(&value, &options).expect("render"), "[NaN, Infinity, -Infinity]");
    }

    #[test]
    fn integers_are_limited_to_the_64_bit_range() {
        let edges = Value::Array(vec![
            Value::from(i64::MIN),
            Value::from(u64::MAX),
        ]);
        let text = render(&edges, &WriteOptions::new()).expect("render");
        assert_eq!(text, "[-9223372036854775808, 18446744073709551615]");
        for wide in [i128::from(u64::MAX) + 1, i128::from(i64::MIN) - 1] {
            let err = render(&Value::Int(wide), &WriteOptions::new()).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Encoding);
        }
    }

    #[test]
    fn invalid_utf8_bytes_are_rejected() {
        let err = render(&Value::Bytes(vec![0xff]), &WriteOptions::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Encoding);
        let text = render(&Value::Bytes(b"ok".to_vec()), &WriteOptions::new()).expect("render");
        assert_eq!(text, r#""ok""#);
    }

    #[test]
    fn rich_values_go_through_the_hook() {
        let err = render(&Value::rich(Complex::new(1.0, 2.0)), &WriteOptions::new()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotSerializable);
        assert_eq!(err.type_name(), Some("Complex"));
    }

    #[test]
    fn self_referencing_hook_hits_depth_limit() {
        let looping =
            |_: &dyn RichValue| -> Result<Value, Error> { Ok(Value::rich(Complex::new(0.0, 0.0))) };
        let options = WriteOptions {
            max_depth: 8,
            ..WriteOptions::new()
        };
        let mut writer = JsonWriter::new(Vec::new(), &options, &looping);
        let err = writer.write(&Value::rich(Complex::new(0.0, 0.0))).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::RecursionLimit);
    }
}
