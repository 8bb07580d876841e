//! Cell-level normalization: dates, numbers, percentages and region labels.
//!
//! Every function here is total. Bad input yields `None`; deciding whether that
//! counts as an issue is left to the caller.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::region::Region;

/// Only tried when the input starts with a four-digit year.
const YEAR_FIRST_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d"];

/// Month-first, never day-first. `%y` is tried before `%Y` so that
/// `01/06/21` is not read as the year 21.
const DATE_FORMATS: &[&str] = &[
    "%m/%d/%y",
    "%m/%d/%Y",
    "%m-%d-%Y",
    "%B %d, %Y",
    "%B %d %Y",
    "%d %B %Y",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%m/%d/%Y %I:%M:%S %p",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

/// Parses a calendar date, or returns `None` for blank or unrecognised input.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    let year_first = s.len() >= 4 && s.as_bytes()[..4].iter().all(u8::is_ascii_digit);
    let formats = if year_first {
        YEAR_FIRST_FORMATS
    } else {
        DATE_FORMATS
    };
    for fmt in formats {
        if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
            return Some(date);
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(dt.date());
        }
    }

    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Parses a number after stripping thousands separators, percent signs and
/// surrounding whitespace. Non-finite values are treated as unparsable.
pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',' && *c != '%').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Keeps a percentage only if it lies in `[0, 100]`. Out-of-range values are
/// dropped, not clamped.
pub fn percentage_in_range(value: f64) -> Option<f64> {
    (0.0..=100.0).contains(&value).then_some(value)
}

/// A percentage cell after parsing and range checking.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Percentage {
    Value(f64),
    OutOfRange(f64),
    /// Blank or unparsable.
    Missing,
}

impl Percentage {
    pub fn value(self) -> Option<f64> {
        match self {
            Percentage::Value(v) => Some(v),
            _ => None,
        }
    }
}

pub fn parse_percentage(raw: &str) -> Percentage {
    match parse_number(raw) {
        Some(v) => match percentage_in_range(v) {
            Some(v) => Percentage::Value(v),
            None => Percentage::OutOfRange(v),
        },
        None => Percentage::Missing,
    }
}

/// Resolves a postal code, FIPS code or full state name.
pub fn resolve_region(raw: &str) -> Option<Region> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }
    if s.len() == 2 && s.chars().all(|c| c.is_ascii_alphabetic()) {
        return Region::from_postal(s);
    }
    if s.chars().all(|c| c.is_ascii_digit()) {
        return Region::from_fips(s);
    }
    Region::from_name(s)
}

/// True for cells that carry no value at all, as opposed to unparsable text.
pub fn is_blank(raw: &str) -> bool {
    let s = raw.trim();
    s.is_empty() || s.eq_ignore_ascii_case("nan") || s.eq_ignore_ascii_case("na")
}
