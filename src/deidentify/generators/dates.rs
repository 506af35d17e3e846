//! Date transformation
//!
//! Two regimes per the de-identification options:
//!
//! - **Categorical removal**: dates truncate to year only, and birth
//!   dates of subjects older than the age threshold collapse to a fixed
//!   sentinel year so extreme ages can't narrow identity.
//! - **Date shifting**: every date belonging to a subject moves by the
//!   same deterministic offset (seeded from the subject key and the
//!   session salt), preserving relative ordering and deltas between
//!   events across all files in the session.
//!
//! HL7 TS values keep any time-of-day suffix through a shift; truncation
//! drops it with the rest of the date.

use super::derive_u64;
use crate::deidentify::options::DateShiftPolicy;
use crate::domain::errors::DeidentifyError;
use chrono::{Datelike, Duration, NaiveDate};

/// Sentinel year for subjects past the age threshold
pub const SENTINEL_YEAR: &str = "1900";

/// Parsed HL7 timestamp: date part plus whatever followed it
struct Hl7Timestamp<'a> {
    date: NaiveDate,
    time_suffix: &'a str,
}

fn parse_hl7_timestamp(value: &str) -> Option<Hl7Timestamp<'_>> {
    let trimmed = value.trim();
    if trimmed.len() < 8 || !trimmed.is_char_boundary(8) {
        return None;
    }
    let (date_part, time_suffix) = trimmed.split_at(8);
    if !date_part.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let date = NaiveDate::parse_from_str(date_part, "%Y%m%d").ok()?;
    Some(Hl7Timestamp { date, time_suffix })
}

/// Deterministic per-subject day offset in [-max_days, max_days] \ {0}
pub fn subject_offset_days(salt: &str, subject_key: &str, max_days: i64) -> i64 {
    let span = (2 * max_days) as u64;
    let raw = (derive_u64(salt, &["date-offset", subject_key]) % span) as i64 - max_days;
    // Zero would leave dates unchanged; fold it onto the positive bound
    if raw == 0 {
        max_days
    } else {
        raw
    }
}

/// Transform a service date per policy
pub fn service_date(
    value: &str,
    location: &str,
    policy: DateShiftPolicy,
    salt: &str,
    subject_key: &str,
) -> Result<String, DeidentifyError> {
    match policy {
        DateShiftPolicy::None => truncate_to_year(value, location),
        DateShiftPolicy::FixedDays { days } => shift(value, location, days),
        DateShiftPolicy::PerSubject { max_days } => {
            let offset = subject_offset_days(salt, subject_key, max_days);
            shift(value, location, offset)
        }
    }
}

/// Transform a birth date per policy
///
/// Categorical mode applies the age threshold: subjects older than
/// `age_threshold` as of `today` collapse to the sentinel year instead
/// of keeping their real birth year.
pub fn birth_date(
    value: &str,
    location: &str,
    policy: DateShiftPolicy,
    salt: &str,
    subject_key: &str,
    age_threshold: u32,
    today: NaiveDate,
) -> Result<String, DeidentifyError> {
    match policy {
        DateShiftPolicy::None => {
            let ts = parse_hl7_timestamp(value).ok_or_else(|| invalid(location, value))?;
            let age = age_in_years(ts.date, today);
            if age > age_threshold as i32 {
                Ok(SENTINEL_YEAR.to_string())
            } else {
                Ok(ts.date.format("%Y").to_string())
            }
        }
        DateShiftPolicy::FixedDays { days } => shift(value, location, days),
        DateShiftPolicy::PerSubject { max_days } => {
            let offset = subject_offset_days(salt, subject_key, max_days);
            shift(value, location, offset)
        }
    }
}

fn truncate_to_year(value: &str, location: &str) -> Result<String, DeidentifyError> {
    // Already year-only values pass through the truncation unchanged
    let trimmed = value.trim();
    if trimmed.len() == 4 && trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Ok(trimmed.to_string());
    }
    let ts = parse_hl7_timestamp(value).ok_or_else(|| invalid(location, value))?;
    Ok(ts.date.format("%Y").to_string())
}

fn shift(value: &str, location: &str, offset_days: i64) -> Result<String, DeidentifyError> {
    let ts = parse_hl7_timestamp(value).ok_or_else(|| invalid(location, value))?;
    let shifted = ts.date + Duration::days(offset_days);
    Ok(format!(
        "{}{}",
        shifted.format("%Y%m%d"),
        ts.time_suffix
    ))
}

fn age_in_years(birth: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth.year();
    if (today.month(), today.day()) < (birth.month(), birth.day()) {
        age -= 1;
    }
    age
}

fn invalid(location: &str, value: &str) -> DeidentifyError {
    DeidentifyError::InvalidDate {
        location: location.to_string(),
        value: value.to_string(),
    }
}
