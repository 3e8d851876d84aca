//! Purpose: Decode JSON text and turn date-shaped strings back into date/time values.
//! Exports: `Decoder`, `LoadOptions`, `RewriteScope`, `decode_date`, `is_date_candidate`.
//! Role: Wraps the baseline parser with a raw-text fast path and a string rewrite.
//! Invariants: Only strings passing the shape filter reach the date parser.
//! Invariants: A failed date parse keeps the original string; it is never an error.
//! Invariants: Values written with an explicit UTC marker decode as naive UTC date-times.
use crate::core::datetime::{ParsedDateTime, parse_iso};
use crate::core::error::Error;
use crate::core::value::{Map, Value};
use crate::json::parse;
use regex::Regex;
use serde::Deserialize;
use std::sync::LazyLock;
use time::PrimitiveDateTime;
use tracing::trace;

static DATE_CANDIDATE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^\d{4}[-/]\d{2}[-/]\d{2}").ok());

const UTC_MARKERS: [&str; 3] = ["Z", "+00:00", "-00:00"];

/// Which string positions the date rewrite visits.
#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum RewriteScope {
    /// Values directly inside objects, plus a raw date given as the whole input.
    #[default]
    Mappings,
    /// Every string, including array elements and a top-level JSON string.
    Everywhere,
}

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct LoadOptions {
    pub parse_dates: bool,
    pub rewrite_scope: RewriteScope,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            parse_dates: true,
            rewrite_scope: RewriteScope::Mappings,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_parse_dates(mut self, enabled: bool) -> Self {
        self.parse_dates = enabled;
        self
    }

    pub fn with_rewrite_scope(mut self, scope: RewriteScope) -> Self {
        self.rewrite_scope = scope;
        self
    }
}

#[derive(Clone, Debug, Default)]
pub struct Decoder {
    options: LoadOptions,
}

impl Decoder {
    pub fn new(options: LoadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &LoadOptions {
        &self.options
    }

    pub fn decode(&self, text: &str) -> Result<Value, Error> {
        if !self.options.parse_dates {
            return parse::from_str(text, &|map| map);
        }
        // A bare date is not valid JSON; accept it as the whole document.
        if let Some(date) = decode_date(text) {
            return Ok(date);
        }
        match self.options.rewrite_scope {
            RewriteScope::Mappings => parse::from_str(text, &rewrite_mapping),
            RewriteScope::Everywhere => parse::from_str(text, &|map| map).map(rewrite_everywhere),
        }
    }
}

pub fn is_date_candidate(text: &str) -> bool {
    DATE_CANDIDATE
        .as_ref()
        .is_some_and(|pattern| pattern.is_match(text))
}

/// Parses a date-shaped string. `None` means "keep the string".
pub fn decode_date(text: &str) -> Option<Value> {
    if !is_date_candidate(text) {
        return None;
    }
    match parse_iso(text) {
        Ok(ParsedDateTime::Naive(value)) => Some(Value::rich(value)),
        Ok(ParsedDateTime::Zoned(value)) if UTC_MARKERS.iter().any(|m| text.ends_with(m)) => {
            Some(Value::rich(PrimitiveDateTime::new(value.date(), value.time())))
        }
        Ok(ParsedDateTime::Zoned(value)) => Some(Value::rich(value)),
        Err(err) => {
            trace!(candidate = text, error = %err, "date candidate kept as string");
            None
        }
    }
}

fn rewrite_string(value: Value) -> Value {
    match value {
        Value::String(text) => decode_date(&text).unwrap_or(Value::String(text)),
        other => other,
    }
}

fn rewrite_mapping(map: Map) -> Map {
    map.into_iter()
        .map(|(key, value)| (key, rewrite_string(value)))
        .collect()
}

fn rewrite_everywhere(value: Value) -> Value {
    match value {
        Value::Array(items) => Value::Array(items.into_iter().map(rewrite_everywhere).collect()),
        Value::Object(map) => Value::Object(
            map.into_iter()
                .map(|(key, value)| (key, rewrite_everywhere(value)))
                .collect(),
        ),
        other => rewrite_string(other),
    }
}

#[cfg(test)]
mod tests {
    use super::{Decoder, LoadOptions, RewriteScope, decode_date, is_date_candidate};
    use crate::core::value::Value;
    use time::macros::datetime;

    #[test]
    fn shape_filter_is_anchored() {
        assert!(is_date_candidate("2015-01-01"));
        assert!(is_date_candidate("2015/01/01"));
        assert!(is_date_candidate("2015-01-01T12:00:00Z"));
        assert!(!is_date_candidate("on 2015-01-01"));
        assert!(!is_date_candidate("12:30"));
        assert!(!is_date_candidate("12-15-0"));
    }

    #[test]
    fn utc_markers_normalize_to_naive() {
        let expected = Value::rich(datetime!(2015-01-01 12:00));
        for text in [
            "2015-01-01T12:00:00Z",
            "2015-01-01T12:00:00+00:00",
            "2015-01-01T12:00:00-00:00",
        ] {
            assert_eq!(decode_date(text), Some(expected.clone()), "{text}");
        }
    }

    #[test]
    fn other_offsets_stay_zoned() {
        let decoded = decode_date("2015-01-01T12:00:00+05:30").expect("zoned");
        assert_eq!(
            decoded.as_offset_datetime(),
            Some(datetime!(2015-01-01 12:00 +5:30))
        );
    }

    #[test]
    fn unparseable_candidates_are_kept() {
        assert_eq!(decode_date("2015/01/01"), None);
        assert_eq!(decode_date("2015-13-45"), None);
        assert_eq!(decode_date("2015-01-01Tnoon"), None);
    }

    #[test]
    fn mapping_scope_leaves_arrays_alone() {
        let decoder = Decoder::new(LoadOptions::new());
        let value = decoder
            .decode(r#"{"when": "2015-01-01", "list": ["2015-01-01"]}"#)
            .expect("decode");
        assert_eq!(value.get("when"), Some(&Value::rich(datetime!(2015-01-01 0:00))));
        assert_eq!(
            value.get("list"),
            Some(&Value::Array(vec![Value::from("2015-01-01")]))
        );
    }

    #[test]
    fn everywhere_scope_reaches_arrays_and_top_level() {
        let decoder =
            Decoder::new(LoadOptions::new().with_rewrite_scope(RewriteScope::Everywhere));
        let value = decoder.decode(r#"["2015-01-01", {"a": ["2016-02-03"]}]"#).expect("decode");
        let expected = Value::Array(vec![
            Value::rich(datetime!(2015-01-01 0:00)),
            [(
                "a",
                Value::Array(vec![Value::rich(datetime!(2016-02-03 0:00))]),
            )]
            .into_iter()
            .collect(),
        ]);
        assert_eq!(value, expected);
        assert_eq!(
            decoder.decode(r#""2015-01-01""#).expect("top-level string"),
            Value::rich(datetime!(2015-01-01 0:00))
        );
    }

    #[test]
    fn parse_dates_off_is_plain_json() {
        let decoder = Decoder::new(LoadOptions::new().with_parse_dates(false));
        let value = decoder.decode(r#"{"when": "2015-01-01"}"#).expect("decode");
        assert_eq!(value.get("when"), Some(&Value::from("2015-01-01")));
        assert!(decoder.decode("2015-01-01").is_err());
    }
}
