//! Date-time text conventions.
//!
//! Date-times are held as microseconds since the Unix epoch (UTC) and
//! stored as `YYYY-MM-DD HH:MM:SS` text, with a six-digit fraction only
//! when the value has sub-second precision.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};

use crate::error::{Error, Result};

const STORAGE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";
const STORAGE_FORMAT_FRACTION: &str = "%Y-%m-%d %H:%M:%S%.6f";

fn to_utc(micros: i64) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_micros(micros)
        .ok_or_else(|| Error::Conversion(format!("date-time {micros}us is out of range")))
}

/// Format microseconds as storage text.
pub fn format_storage(micros: i64) -> Result<String> {
    let value = to_utc(micros)?;
    let format = if micros % 1_000_000 == 0 {
        STORAGE_FORMAT
    } else {
        STORAGE_FORMAT_FRACTION
    };
    Ok(value.format(format).to_string())
}

/// Format microseconds as RFC 3339 text, the form serde uses for `DateTime<Utc>`.
pub fn format_rfc3339(micros: i64) -> Result<String> {
    Ok(to_utc(micros)?.to_rfc3339_opts(SecondsFormat::AutoSi, true))
}

/// Parse storage text or RFC 3339 text into microseconds.
pub fn parse(text: &str) -> Result<i64> {
    let text = text.trim();
    if let Ok(value) = DateTime::parse_from_rfc3339(text) {
        return Ok(value.with_timezone(&Utc).timestamp_micros());
    }
    [STORAGE_FORMAT_FRACTION, STORAGE_FORMAT]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc().timestamp_micros())
        .ok_or_else(|| Error::Conversion(format!("'{text}' is not a date-time")))
}

/// Current time in microseconds.
pub fn now() -> i64 {
    Utc::now().timestamp_micros()
}
