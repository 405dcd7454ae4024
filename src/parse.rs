//! Free-text input parsers
//!
//! Each parser turns a raw chat reply into a typed value or a [`ParseError`]
//! whose message tells the user which formats are accepted. Malformed input
//! is an expected outcome here, so nothing in this module panics on it.

#[cfg(test)]
mod proptests;

use chrono::{DateTime, Days, LocalResult, Month, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;
use thiserror::Error;

/// All departure times and dates are interpreted in Sydney time.
pub const REFERENCE_TZ: Tz = chrono_tz::Australia::Sydney;

/// `H:MM` / `HH:MM` with an optional `AM`/`PM` suffix
static CLOCK_TIME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2}):(\d{2})\s*([AaPp][Mm])?$").expect("clock time pattern is valid")
});

/// `HHMM` with no separator
static COMPACT_TIME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{2})(\d{2})$").expect("compact time pattern is valid"));

/// `DD/MM/YYYY`, `DD-MM-YY`, `DD MM YYYY`, ...
static NUMERIC_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})([/\- ])(\d{1,2})([/\- ])(\d{4}|\d{2})$")
        .expect("numeric date pattern is valid")
});

/// `DD Mon YYYY`
static NAMED_DATE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(\d{1,2})\s+([A-Za-z]{3})\s+(\d{4})$").expect("named date pattern is valid")
});

/// Rejected chat input, with a message suitable for showing to the user
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParseError {
    #[error("Please enter a valid 3-letter IATA airport code (e.g. SYD, MEL, BNE).")]
    InvalidIata,
    #[error("Invalid time format.")]
    InvalidTime,
    #[error("Invalid date format.")]
    InvalidDate,
    #[error("{date} is in the past. Please enter today or a future date.")]
    DateInPast { date: NaiveDate },
    #[error("{time} does not exist on {date} in Sydney because of a daylight saving change.")]
    NonexistentLocalTime { date: NaiveDate, time: NaiveTime },
    #[error("Please enter a valid flight number (at least 2 characters, including a letter).")]
    InvalidFlightNumber,
}

impl ParseError {
    /// Accepted input formats for the field that failed to parse
    pub fn hint(&self) -> &'static str {
        match self {
            ParseError::InvalidIata => "`SYD` for Sydney, `MEL` for Melbourne, `BNE` for Brisbane",
            ParseError::InvalidTime | ParseError::NonexistentLocalTime { .. } => {
                "• `14:30` (24-hour)\n• `2:30 PM` (12-hour)\n• `1430` (no colon)"
            }
            ParseError::InvalidDate | ParseError::DateInPast { .. } => {
                "• `25/01/2026` (DD/MM/YYYY)\n• `25-01-2026` (DD-MM-YYYY)\n• `25 Jan 2026`\n• `today` or `tomorrow`"
            }
            ParseError::InvalidFlightNumber => "• `QF94`\n• `JQ30`\n• `VA803`",
        }
    }
}

/// Parse a 3-letter IATA airport code, normalized to uppercase.
///
/// Only the shape is checked; whether the airport exists is the resolver's
/// concern.
pub fn parse_iata(input: &str) -> Result<String, ParseError> {
    let code = input.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_uppercase())
    } else {
        Err(ParseError::InvalidIata)
    }
}

/// Parse a time of day.
///
/// Accepts `14:30`, `2:30 PM`, `2:30pm`, `12:05 AM` and `1430`. With a
/// suffix, `12 AM` is midnight, `12 PM` stays noon and every other PM hour
/// gains 12.
pub fn parse_time(input: &str) -> Result<NaiveTime, ParseError> {
    let input = input.trim();

    let (hour, minute) = if let Some(caps) = CLOCK_TIME.captures(input) {
        let hour: u32 = caps[1].parse().map_err(|_| ParseError::InvalidTime)?;
        let minute: u32 = caps[2].parse().map_err(|_| ParseError::InvalidTime)?;
        let suffix = caps.get(3).map(|m| m.as_str().to_ascii_uppercase());
        let hour = match suffix.as_deref() {
            Some("AM") if hour == 12 => 0,
            Some("PM") if hour != 12 => hour + 12,
            _ => hour,
        };
        (hour, minute)
    } else if let Some(caps) = COMPACT_TIME.captures(input) {
        let hour: u32 = caps[1].parse().map_err(|_| ParseError::InvalidTime)?;
        let minute: u32 = caps[2].parse().map_err(|_| ParseError::InvalidTime)?;
        (hour, minute)
    } else {
        return Err(ParseError::InvalidTime);
    };

    NaiveTime::from_hms_opt(hour, minute, 0).ok_or(ParseError::InvalidTime)
}

/// Parse a departure date relative to `today` (in the reference timezone).
///
/// Rules are tried in order: `today`/`tomorrow`, numeric `DD<sep>MM<sep>YYYY`
/// (two-digit years mean 20YY, both separators must match), then
/// `DD Mon YYYY`. Dates before `today` are rejected.
pub fn parse_date(input: &str, today: NaiveDate) -> Result<NaiveDate, ParseError> {
    let input = input.trim();
    let date = relative_date(input, today)
        .or_else(|| numeric_date(input))
        .or_else(|| named_date(input))
        .ok_or(ParseError::InvalidDate)?;

    if date < today {
        return Err(ParseError::DateInPast { date });
    }
    Ok(date)
}

fn relative_date(input: &str, today: NaiveDate) -> Option<NaiveDate> {
    match input.to_ascii_lowercase().as_str() {
        "today" => Some(today),
        "tomorrow" => today.checked_add_days(Days::new(1)),
        _ => None,
    }
}

fn numeric_date(input: &str) -> Option<NaiveDate> {
    let caps = NUMERIC_DATE.captures(input)?;
    if caps[2] != caps[4] {
        return None;
    }
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[3].parse().ok()?;
    let year_digits = &caps[5];
    let year: i32 = year_digits.parse().ok()?;
    let year = if year_digits.len() == 2 { 2000 + year } else { year };
    NaiveDate::from_ymd_opt(year, month, day)
}

fn named_date(input: &str) -> Option<NaiveDate> {
    let caps = NAMED_DATE.captures(input)?;
    let day: u32 = caps[1].parse().ok()?;
    let month = caps[2].parse::<Month>().ok()?.number_from_month();
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a flight number: at least two characters and at least one letter,
/// normalized to uppercase.
pub fn parse_flight_number(input: &str) -> Result<String, ParseError> {
    let flight_number = input.trim().to_uppercase();
    if flight_number.chars().count() >= 2 && flight_number.chars().any(char::is_alphabetic) {
        Ok(flight_number)
    } else {
        Err(ParseError::InvalidFlightNumber)
    }
}

/// Combine a date and a time of day in the reference timezone into an
/// absolute instant.
///
/// A local time repeated by a daylight saving change resolves to the earlier
/// instant; a local time skipped by one is rejected.
pub fn combine(date: NaiveDate, time: NaiveTime) -> Result<DateTime<Utc>, ParseError> {
    match REFERENCE_TZ.from_local_datetime(&date.and_time(time)) {
        LocalResult::Single(instant) => Ok(instant.with_timezone(&Utc)),
        LocalResult::Ambiguous(earliest, _) => Ok(earliest.with_timezone(&Utc)),
        LocalResult::None => Err(ParseError::NonexistentLocalTime { date, time }),
    }
}

/// Current date in the reference timezone
pub fn reference_today(now: DateTime<Utc>) -> NaiveDate {
    now.with_timezone(&REFERENCE_TZ).date_naive()
}
