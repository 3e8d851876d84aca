//! Purpose: ISO-8601 rendering and parsing for the codec's date/time values.
//! Exports: `format_date`, `format_datetime`, `format_offset_datetime`, `parse_iso`,
//! `ParsedDateTime`, `DateParseError`.
//! Role: Shared by the built-in encoders (render) and the decoder's date rewrite (parse).
//! Invariants: Rendering matches `isoformat()` layout; fractions and offset seconds appear only when non-zero.
//! Invariants: Parsing accepts `-` separated dates only; anything else is a `DateParseError`.
use std::fmt;
use time::format_description::BorrowedFormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime, PrimitiveDateTime, Time, UtcOffset};

const DATE: &[BorrowedFormatItem<'_>] = format_description!("[year]-[month]-[day]");
const CLOCK: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]:[second]");
const CLOCK_H: &[BorrowedFormatItem<'_>] = format_description!("[hour]");
const CLOCK_HM: &[BorrowedFormatItem<'_>] = format_description!("[hour]:[minute]");
const CLOCK_FRACTION: &[BorrowedFormatItem<'_>] =
    format_description!("[hour]:[minute]:[second].[subsecond]");
const OFFSET: &[BorrowedFormatItem<'_>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]");
const OFFSET_COMPACT: &[BorrowedFormatItem<'_>] =
    format_description!("[offset_hour sign:mandatory][offset_minute]");
const OFFSET_HOURS: &[BorrowedFormatItem<'_>] = format_description!("[offset_hour sign:mandatory]");
const OFFSET_SECONDS: &[BorrowedFormatItem<'_>] =
    format_description!("[offset_hour sign:mandatory]:[offset_minute]:[offset_second]");

pub fn format_date(date: Date) -> Result<String, time::error::Format> {
    date.format(DATE)
}

pub fn format_datetime(datetime: PrimitiveDateTime) -> Result<String, time::error::Format> {
    let date = datetime.date().format(DATE)?;
    let clock = datetime.time().format(CLOCK)?;
    Ok(format!("{date}T{clock}{}", fraction(datetime.nanosecond())))
}

pub fn format_offset_datetime(datetime: OffsetDateTime) -> Result<String, time::error::Format> {
    let local = format_datetime(PrimitiveDateTime::new(datetime.date(), datetime.time()))?;
    let offset = datetime.offset();
    let offset = if offset.seconds_past_minute() == 0 {
        offset.format(OFFSET)?
    } else {
        offset.format(OFFSET_SECONDS)?
    };
    Ok(format!("{local}{offset}"))
}

// Microsecond precision unless the value carries finer digits.
fn fraction(nanos: u32) -> String {
    match nanos {
        0 => String::new(),
        n if n % 1_000 == 0 => format!(".{:06}", n / 1_000),
        n => format!(".{n:09}"),
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ParsedDateTime {
    Naive(PrimitiveDateTime),
    Zoned(OffsetDateTime),
}

#[derive(Debug)]
pub enum DateParseError {
    Shape(&'static str),
    Component(time::error::Parse),
}

impl fmt::Display for DateParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DateParseError::Shape(what) => write!(f, "unsupported {what} layout"),
            DateParseError::Component(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for DateParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DateParseError::Shape(_) => None,
            DateParseError::Component(err) => Some(err),
        }
    }
}

impl From<time::error::Parse> for DateParseError {
    fn from(err: time::error::Parse) -> Self {
        DateParseError::Component(err)
    }
}

/// Parses `YYYY-MM-DD[(T| )HH[:MM[:SS[.fraction]]][Z|±HH:MM[:SS]|±HHMM|±HH]]`.
///
/// A bare date becomes midnight. The result is zoned only when the text
/// carries an offset.
pub fn parse_iso(text: &str) -> Result<ParsedDateTime, DateParseError> {
    let (date_part, rest) = match text.find(['T', ' ']) {
        Some(idx) => (&text[..idx], Some(&text[idx + 1..])),
        None => (text, None),
    };
    let date = Date::parse(date_part, DATE)?;
    let Some(rest) = rest else {
        return Ok(ParsedDateTime::Naive(date.midnight()));
    };

    let (clock, offset) = split_offset(rest);
    let time = Time::parse(clock, clock_format(clock)?)?;
    let naive = PrimitiveDateTime::new(date, time);
    match offset {
        None => Ok(ParsedDateTime::Naive(naive)),
        Some(offset) => Ok(ParsedDateTime::Zoned(
            naive.assume_offset(parse_offset(offset)?),
        )),
    }
}

fn split_offset(rest: &str) -> (&str, Option<&str>) {
    if let Some(clock) = rest.strip_suffix('Z') {
        return (clock, Some("Z"));
    }
    match rest.rfind(['+', '-']) {
        Some(idx) => (&rest[..idx], Some(&rest[idx..])),
        None => (rest, None),
    }
}

fn clock_format(clock: &str) -> Result<&'static [BorrowedFormatItem<'static>], DateParseError> {
    let fractional = clock.contains('.');
    match (clock.matches(':').count(), fractional) {
        (0, false) => Ok(CLOCK_H),
        (1, false) => Ok(CLOCK_HM),
        (2, false) => Ok(CLOCK),
        (2, true) => Ok(CLOCK_FRACTION),
        _ => Err(DateParseError::Shape("time")),
    }
}

fn parse_offset(offset: &str) -> Result<UtcOffset, DateParseError> {
    let format = match offset.len() {
        1 if offset == "Z" => return Ok(UtcOffset::UTC),
        3 => OFFSET_HOURS,
        5 => OFFSET_COMPACT,
        6 => OFFSET,
        9 => OFFSET_SECONDS,
        _ => return Err(DateParseError::Shape("offset")),
    };
    Ok(UtcOffset::parse(offset, format)?)
}

#[cfg(test)]
mod tests {
    use super::{
        DateParseError, ParsedDateTime, format_datetime, format_offset_datetime, parse_iso,
    };
    use time::macros::{date, datetime, offset};

    #[test]
    fn offsets_with_seconds_keep_them() {
        let value = datetime!(2015-10-01 12:00).assume_offset(offset!(+5:30:15));
        let text = format_offset_datetime(value).expect("format");
        assert_eq!(text, "2015-10-01T12:00:00+05:30:15");
        assert_eq!(parse_iso(&text).expect("parse"), ParsedDateTime::Zoned(value));
    }

    #[test]
    fn formats_like_isoformat() {
        assert_eq!(
            format_datetime(datetime!(2015-10-01 0:00)).expect("format"),
            "2015-10-01T00:00:00"
        );
        assert_eq!(
            format_datetime(datetime!(2015-10-01 12:30:05.25)).expect("format"),
            "2015-10-01T12:30:05.250000"
        );
        assert_eq!(
            format_offset_datetime(datetime!(2015-10-01 12:00 +5:30)).expect("format"),
            "2015-10-01T12:00:00+05:30"
        );
        assert_eq!(super::format_date(date!(2015-01-01)).expect("format"), "2015-01-01");
    }

    #[test]
    fn parses_dates_and_times() {
        assert_eq!(
            parse_iso("2015-01-01").expect("date"),
            ParsedDateTime::Naive(datetime!(2015-01-01 0:00))
        );
        assert_eq!(
            parse_iso("2015-01-01T12:00:00").expect("datetime"),
            ParsedDateTime::Naive(datetime!(2015-01-01 12:00))
        );
        assert_eq!(
            parse_iso("2015-01-01 12:00").expect("space separator"),
            ParsedDateTime::Naive(datetime!(2015-01-01 12:00))
        );
        assert_eq!(
            parse_iso("2015-01-01T12:00:00.123456").expect("fraction"),
            ParsedDateTime::Naive(datetime!(2015-01-01 12:00:00.123456))
        );
    }

    #[test]
    fn parses_offsets() {
        assert_eq!(
            parse_iso("2015-01-01T12:00:00Z").expect("utc"),
            ParsedDateTime::Zoned(datetime!(2015-01-01 12:00 UTC))
        );
        let zoned = |text: &str| match parse_iso(text).expect(text) {
            ParsedDateTime::Zoned(value) => value.offset(),
            ParsedDateTime::Naive(_) => panic!("{text} parsed without offset"),
        };
        assert_eq!(zoned("2015-01-01T12:00:00-05:00"), offset!(-5));
        assert_eq!(zoned("2015-01-01T12:00:00+0530"), offset!(+5:30));
        assert_eq!(zoned("2015-01-01T12:00+02"), offset!(+2));
        assert_eq!(zoned("2015-01-01T12:00:00-05:30:15"), offset!(-5:30:15));
    }

    #[test]
    fn rejects_other_layouts() {
        assert!(matches!(parse_iso("2015/01/01"), Err(DateParseError::Component(_))));
        assert!(matches!(parse_iso("2015-13-01"), Err(DateParseError::Component(_))));
        assert!(matches!(
            parse_iso("2015-01-01T1:2:3:4"),
            Err(DateParseError::Shape("time"))
        ));
        assert!(parse_iso("2015-01-01 tomorrow").is_err());
    }
}
