//! Variable precision timestamps and the nullable timestamp type.
//!
//! Timestamps arrive from the database as text of varying precision, from a
//! bare date (`YYYY-MM-DD`) up to microseconds (`YYYY-MM-DD HH:MM:SS.ffffff`).
//! [`parse_date_time`] accepts exactly those shapes and attaches a named zone
//! to the result. A bare date always lands at midnight in [`DEFAULT_ZONE`].

// used for persistence
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, Value, ValueRef};

use chrono::{
    DateTime, Duration, LocalResult, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone,
};
use chrono_tz::Tz;
use lazy_static::lazy_static;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

use std::fmt;

use crate::datatype::unsupported;
use crate::error::{Error, Result};

/// Zone used when a timestamp has no configured location.
pub const DEFAULT_ZONE: Tz = chrono_tz::America::New_York;

/// Layout written to the database, the wall clock in the value's own zone.
pub const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.6f";

// an all-zero date, truncated to the length of the input
const ZERO_SENTINEL: &str = "0000-00-00 00:00:00.0000000";

lazy_static! {
    static ref ZERO_INSTANT: DateTime<Tz> = Tz::UTC.with_ymd_and_hms(1, 1, 1, 0, 0, 0).unwrap();
}

/// The zero instant, `0001-01-01T00:00:00Z`.
pub fn zero_instant() -> DateTime<Tz> {
    *ZERO_INSTANT
}

/// Outcome of parsing a stored timestamp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stamp {
    /// The all-zero sentinel, a stored "no time".
    Zero,
    At(DateTime<Tz>),
}

/// Parses `YYYY-MM-DD`, `YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DD HH:MM:SS.f`
/// with one to six fractional digits.
///
/// A bare date ignores `location` and is read as midnight in [`DEFAULT_ZONE`].
/// The all-zero sentinel yields [`zero_instant`] without an error.
pub fn parse_date_time(input: &str, location: Tz) -> Result<DateTime<Tz>> {
    Ok(match parse_stamp(input, location)? {
        Stamp::Zero => zero_instant(),
        Stamp::At(time) => time,
    })
}

/// Like [`parse_date_time`], with the all-zero sentinel reported as
/// [`Stamp::Zero`] instead of folded into the zero instant.
pub fn parse_stamp(input: &str, location: Tz) -> Result<Stamp> {
    let len = input.len();
    match len {
        10 | 19 | 21..=26 => {}
        _ => {
            return Err(Error::parse(
                input,
                format!("invalid time string of length {len}"),
            ));
        }
    }
    if input == &ZERO_SENTINEL[..len] {
        return Ok(Stamp::Zero);
    }
    let (naive, zone) = if len == 10 {
        let date = NaiveDate::parse_from_str(input, "%Y-%m-%d")
            .map_err(|e| Error::parse(input, e.to_string()))?;
        let midnight = date
            .and_hms_opt(0, 0, 0)
            .ok_or_else(|| Error::parse(input, "date has no midnight"))?;
        (midnight, DEFAULT_ZONE)
    } else {
        let layout = if len == 19 {
            "%Y-%m-%d %H:%M:%S"
        } else {
            "%Y-%m-%d %H:%M:%S%.f"
        };
        let naive = NaiveDateTime::parse_from_str(input, layout)
            .map_err(|e| Error::parse(input, e.to_string()))?;
        (naive, location)
    };
    localize(naive, zone)
        .map(Stamp::At)
        .ok_or_else(|| Error::parse(input, format!("no such local time in {zone}")))
}

/// Attaches the same wall clock digits to `zone`.
///
/// Ambiguous local times take the earlier instant, local times skipped by a
/// DST gap move forward one hour.
pub fn localize(naive: NaiveDateTime, zone: Tz) -> Option<DateTime<Tz>> {
    if zone == Tz::UTC {
        return Some(zone.from_utc_datetime(&naive));
    }
    match zone.from_local_datetime(&naive) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => zone
            .from_local_datetime(&(naive + Duration::hours(1)))
            .earliest(),
    }
}

/// Lenient parse used for user input such as HTML form fields.
pub fn parse_date_multi(input: &str, location: Tz) -> Option<DateTime<Tz>> {
    const DATE_TIMES: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
        "%Y-%m-%dT%H:%M",
    ];
    const DATES: [&str; 2] = ["%Y-%m-%d", "%m/%d/%Y"];

    let input = input.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(input) {
        return Some(t.with_timezone(&location));
    }
    for layout in DATE_TIMES {
        if let Ok(naive) = NaiveDateTime::parse_from_str(input, layout) {
            return localize(naive, location);
        }
    }
    for layout in DATES {
        if let Ok(date) = NaiveDate::parse_from_str(input, layout) {
            return localize(date.and_hms_opt(0, 0, 0)?, location);
        }
    }
    None
}

// ------------- Nullable timestamp --------------

/// A nullable, zone-aware timestamp.
#[derive(Clone, Debug, PartialEq)]
pub struct NullTime {
    time: DateTime<Tz>,
    valid: bool,
    location: Option<Tz>,
}

impl Default for NullTime {
    fn default() -> Self {
        Self {
            time: zero_instant(),
            valid: false,
            location: None,
        }
    }
}

impl NullTime {
    pub fn new(time: DateTime<Tz>, location: Option<Tz>) -> Self {
        Self {
            time,
            valid: true,
            location,
        }
    }
    pub fn null() -> Self {
        Self::default()
    }
    /// Sets the zone that scanned and unmarshalled values are read in.
    pub fn with_location(mut self, location: Tz) -> Self {
        self.location = Some(location);
        self
    }
    pub fn time(&self) -> &DateTime<Tz> {
        &self.time
    }
    pub fn is_valid(&self) -> bool {
        self.valid
    }
    pub fn location(&self) -> Option<Tz> {
        self.location
    }
    pub fn as_option(&self) -> Option<&DateTime<Tz>> {
        self.valid.then_some(&self.time)
    }
    fn invalidate(&mut self) {
        self.time = zero_instant();
        self.valid = false;
    }
    /// Reads a database cell.
    ///
    /// Integers are unix seconds, text and blobs go through [`parse_stamp`].
    /// A ten character date switches the location to [`DEFAULT_ZONE`], the
    /// all-zero sentinel leaves the value invalid.
    pub fn scan(&mut self, raw: ValueRef<'_>) -> Result<()> {
        if let ValueRef::Null = raw {
            self.invalidate();
            return Ok(());
        }
        let zone = *self.location.get_or_insert(DEFAULT_ZONE);
        let parsed = match raw {
            ValueRef::Integer(secs) => zone
                .timestamp_opt(secs, 0)
                .single()
                .map(Stamp::At)
                .ok_or_else(|| Error::conversion("NullTime", format!("unix time {secs}"))),
            ValueRef::Text(bytes) | ValueRef::Blob(bytes) => match std::str::from_utf8(bytes) {
                Ok(s) => {
                    if s.len() == 10 {
                        self.location = Some(DEFAULT_ZONE);
                    }
                    parse_stamp(s, zone)
                }
                Err(e) => Err(Error::conversion("NullTime", format!("invalid UTF-8 ({e})"))),
            },
            other => Err(unsupported(&other, "NullTime")),
        };
        match parsed {
            Ok(Stamp::At(time)) => {
                self.time = time;
                self.valid = true;
                Ok(())
            }
            Ok(Stamp::Zero) => {
                self.invalidate();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "could not scan timestamp");
                self.invalidate();
                Err(e)
            }
        }
    }
    pub fn to_storage_value(&self) -> Value {
        if self.valid {
            Value::Text(self.time.format(STORAGE_FORMAT).to_string())
        } else {
            Value::Null
        }
    }
    pub fn marshal_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }
    /// Decodes `null` or an RFC 3339 string, converted into the configured
    /// location (UTC when there is none).
    pub fn unmarshal_json(&mut self, bytes: &[u8]) -> Result<()> {
        let decoded = serde_json::from_slice::<Option<String>>(bytes)
            .map_err(Error::from)
            .and_then(|text| match text {
                Some(text) => from_rfc3339(&text, self.location.unwrap_or(Tz::UTC)).map(Some),
                None => Ok(None),
            });
        match decoded {
            Ok(Some(time)) => {
                self.time = time;
                self.valid = true;
                Ok(())
            }
            Ok(None) => {
                self.invalidate();
                Ok(())
            }
            Err(e) => {
                warn!(error = %e, "could not unmarshal timestamp");
                self.invalidate();
                Err(e)
            }
        }
    }
}

fn from_rfc3339(text: &str, zone: Tz) -> Result<DateTime<Tz>> {
    DateTime::parse_from_rfc3339(text)
        .map(|t| t.with_timezone(&zone))
        .map_err(|e| Error::parse(text, e.to_string()))
}

impl From<DateTime<Tz>> for NullTime {
    fn from(time: DateTime<Tz>) -> Self {
        let location = Some(time.timezone());
        Self::new(time, location)
    }
}
impl fmt::Display for NullTime {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.as_option() {
            Some(t) => write!(f, "{}", t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => write!(f, "NULL"),
        }
    }
}
impl ToSql for NullTime {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::Owned(self.to_storage_value()))
    }
}
impl FromSql for NullTime {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        let mut scanned = Self::null();
        scanned
            .scan(value)
            .map_err(|e| FromSqlError::Other(Box::new(e)))?;
        Ok(scanned)
    }
}
impl Serialize for NullTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        match self.as_option() {
            Some(t) => serializer.serialize_str(&t.to_rfc3339_opts(SecondsFormat::AutoSi, true)),
            None => serializer.serialize_none(),
        }
    }
}
impl<'de> Deserialize<'de> for NullTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        match Option::<String>::deserialize(deserializer)? {
            Some(text) => from_rfc3339(&text, Tz::UTC)
                .map(|time| Self::new(time, None))
                .map_err(serde::de::Error::custom),
            None => Ok(Self::null()),
        }
    }
}
