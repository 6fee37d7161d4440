/// Common types and utilities shared across handlers and services
use chrono::{DateTime, NaiveDate, Utc};
use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use validator::ValidationError;

use crate::errors::ServiceError;

lazy_static! {
    static ref NON_SLUG_CHARS: Regex = Regex::new(r"[^a-z0-9_\s-]").unwrap();
    static ref SEPARATOR_RUNS: Regex = Regex::new(r"[\s_-]+").unwrap();
}

/// URL slug for a display name: lowercase, punctuation dropped, separators
/// collapsed to single hyphens, no leading or trailing hyphen.
pub fn slugify(input: &str) -> String {
    let lowered = input.to_lowercase();
    let stripped = NON_SLUG_CHARS.replace_all(lowered.trim(), "");
    let hyphenated = SEPARATOR_RUNS.replace_all(&stripped, "-");
    hyphenated.trim_matches('-').to_string()
}

const BASE36_DIGITS: &[u8; 36] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Uppercase base-36 rendering of `value`.
pub fn to_base36(mut value: u64) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut digits = Vec::new();
    while value > 0 {
        digits.push(BASE36_DIGITS[(value % 36) as usize]);
        value /= 36;
    }
    digits.reverse();
    String::from_utf8(digits).unwrap_or_default()
}

pub fn base36_digit(index: usize) -> char {
    BASE36_DIGITS[index % 36] as char
}

/// Distinguishes an absent field (`None`) from an explicit `null` (`Some(None)`)
/// in partial updates. Use with `#[serde(default, deserialize_with = "double_option")]`.
pub fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub fn validate_non_negative_price(amount: &Decimal) -> Result<(), ValidationError> {
    if amount.is_sign_negative() && !amount.is_zero() {
        let mut err = ValidationError::new("price");
        err.message = Some("Price must not be negative".into());
        return Err(err);
    }
    Ok(())
}

/// Date range parameters for filtering queries
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRangeParams {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl DateRangeParams {
    /// Accepts RFC 3339 timestamps or plain `YYYY-MM-DD` dates; a plain end
    /// date covers the whole day.
    pub fn to_datetime_range(
        &self,
    ) -> Result<(Option<DateTime<Utc>>, Option<DateTime<Utc>>), ServiceError> {
        let start = self
            .start_date
            .as_deref()
            .map(|raw| parse_bound(raw, false, "start"))
            .transpose()?;
        let end = self
            .end_date
            .as_deref()
            .map(|raw| parse_bound(raw, true, "end"))
            .transpose()?;
        Ok((start, end))
    }
}

fn parse_bound(raw: &str, end_of_day: bool, label: &str) -> Result<DateTime<Utc>, ServiceError> {
    let raw = raw.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Ok(ts.with_timezone(&Utc));
    }

    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| ServiceError::ValidationError(format!("Invalid {} date format: {}", label, e)))?;
    let time = if end_of_day {
        date.and_hms_milli_opt(23, 59, 59, 999)
    } else {
        date.and_hms_opt(0, 0, 0)
    };
    time.map(|t| t.and_utc())
        .ok_or_else(|| ServiceError::ValidationError(format!("Invalid {} date time", label)))
}
