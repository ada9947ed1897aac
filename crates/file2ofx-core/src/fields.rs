//! Field-level parsers for dates and amounts.
//!
//! Both parsers are shared by the content profiler (to decide whether a
//! column *looks like* a date or an amount) and the row parser (to produce
//! the normalized values), so a column is only ever detected as a role whose
//! values the parser will actually accept.

use std::sync::LazyLock;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use rust_decimal::Decimal;
use thiserror::Error;

/// Date-time patterns, tried before the date-only ones.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%d.%m.%Y %H:%M:%S",
];

/// Date-only patterns in priority order; first match wins.
///
/// Two-digit-year variants come before their four-digit counterparts:
/// `%Y` happily reads `24` as the year 24.
const DATE_FORMATS: &[&str] = &[
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%m/%d/%y",
    "%m/%d/%Y",
    "%d/%m/%y",
    "%d/%m/%Y",
    "%m-%d-%Y",
    "%d-%m-%Y",
    "%d.%m.%y",
    "%d.%m.%Y",
    "%d %b %Y",
    "%d-%b-%y",
    "%d-%b-%Y",
    "%b %d, %Y",
    "%B %d, %Y",
    "%d %B %Y",
];

const CURRENCY_SYMBOLS: &[char] = &['$', '€', '£', '¥', '₹', '₽', '₿'];

/// Digits with optional grouping and an optional fractional part.
static AMOUNT_BODY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:\d{1,3}(?:[,.' ]\d{3})+|\d+)(?:[.,]\d+)?$").expect("valid amount regex")
});

/// Reason a single field could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FieldError {
    /// No accepted date pattern matched.
    #[error("invalid date '{0}'")]
    InvalidDate(String),
    /// Value is not a recognizable amount.
    #[error("invalid amount '{0}'")]
    InvalidAmount(String),
    /// Both halves of a debit/credit pair are blank.
    #[error("no debit or credit amount")]
    NoSplitAmount,
    /// The row has fewer fields than the assigned column index.
    #[error("missing {role} column (index {column})")]
    MissingColumn {
        /// Role name.
        role: &'static str,
        /// Expected column index.
        column: usize,
    },
}

/// Parses a date or date-time; dates without a time get midnight.
pub fn parse_date(raw: &str) -> Result<NaiveDateTime, FieldError> {
    let value = raw.trim();
    if value.is_empty() {
        return Err(FieldError::InvalidDate(raw.to_string()));
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, fmt) {
            return Ok(dt);
        }
    }

    if let Some(date) = parse_compact_date(value) {
        return Ok(date.and_time(NaiveTime::MIN));
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(value, fmt) {
            return Ok(date.and_time(NaiveTime::MIN));
        }
    }

    Err(FieldError::InvalidDate(raw.to_string()))
}

/// `YYYYMMDD` without separators.
fn parse_compact_date(value: &str) -> Option<NaiveDate> {
    if value.len() != 8 || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year = value[0..4].parse().ok()?;
    let month = value[4..6].parse().ok()?;
    let day = value[6..8].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parses a signed amount.
///
/// Accepts currency symbols and three-letter codes, thousands separators,
/// decimal comma, a leading or trailing sign, parentheses for negatives and
/// `CR` / `DR` suffixes (`DR` is negative).
///
/// ```
/// use file2ofx_core::fields::parse_amount;
/// use rust_decimal::Decimal;
///
/// assert_eq!(parse_amount("(12.50)").unwrap(), Decimal::new(-1250, 2));
/// assert_eq!(parse_amount("$12.50 CR").unwrap(), Decimal::new(1250, 2));
/// assert_eq!(parse_amount("1.234,56").unwrap(), Decimal::new(123456, 2));
/// ```
pub fn parse_amount(raw: &str) -> Result<Decimal, FieldError> {
    let invalid = || FieldError::InvalidAmount(raw.to_string());

    let mut s = raw.trim().to_string();
    let mut negative = false;

    let upper = s.to_ascii_uppercase();
    if let Some(rest) = upper.strip_suffix("DR") {
        negative = true;
        s.truncate(rest.len());
    } else if let Some(rest) = upper.strip_suffix("CR") {
        s.truncate(rest.len());
    }

    let mut body = strip_currency(s.trim());

    if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        negative = true;
        body = strip_currency(inner);
    }
    if let Some(rest) = body.strip_prefix('-') {
        negative = true;
        body = strip_currency(rest);
    } else if let Some(rest) = body.strip_prefix('+') {
        body = strip_currency(rest);
    } else if let Some(rest) = body.strip_suffix('-') {
        negative = true;
        body = strip_currency(rest);
    }
    if let Some(inner) = body.strip_prefix('(').and_then(|b| b.strip_suffix(')')) {
        negative = true;
        body = strip_currency(inner);
    }

    if !AMOUNT_BODY.is_match(&body) {
        return Err(invalid());
    }

    let normalized = normalize_separators(&body);
    let mut value = Decimal::from_str_exact(&normalized).map_err(|_| invalid())?;
    if negative {
        value = -value;
    }
    if value.is_zero() {
        value.set_sign_positive(true);
    }
    Ok(value)
}

/// Removes currency symbols, a leading/trailing ISO code and inner spaces
/// next to them.
fn strip_currency(s: &str) -> String {
    let mut out: String = s.chars().filter(|c| !CURRENCY_SYMBOLS.contains(c)).collect();
    out = out.trim().to_string();

    let is_code = |part: &str| part.len() == 3 && part.bytes().all(|b| b.is_ascii_alphabetic());
    if out.len() > 3 && out.is_char_boundary(3) && is_code(&out[..3]) {
        out = out[3..].trim().to_string();
    }
    if out.len() > 3 && out.is_char_boundary(out.len() - 3) && is_code(&out[out.len() - 3..]) {
        out = out[..out.len() - 3].trim().to_string();
    }
    out
}

/// Rewrites grouping/decimal separators into plain `1234.56` form.
fn normalize_separators(body: &str) -> String {
    let last_dot = body.rfind('.');
    let last_comma = body.rfind(',');

    let decimal = match (last_dot, last_comma) {
        (Some(d), Some(c)) => Some(if d > c { '.' } else { ',' }),
        (None, Some(c)) => {
            let commas = body.matches(',').count();
            let frac_digits = body.len() - c - 1;
            (commas == 1 && frac_digits != 3).then_some(',')
        }
        (Some(_), None) => (body.matches('.').count() == 1).then_some('.'),
        (None, None) => None,
    };

    body.chars()
        .filter_map(|c| match c {
            '0'..='9' => Some(c),
            _ if Some(c) == decimal => Some('.'),
            _ => None,
        })
        .collect()
}

/// Formats an amount for the wire: at least two fractional digits,
/// otherwise the value's own precision.
///
/// ```
/// use file2ofx_core::fields::format_amount;
/// use rust_decimal::Decimal;
///
/// assert_eq!(format_amount(&Decimal::new(-450, 2)), "-4.50");
/// assert_eq!(format_amount(&Decimal::new(12, 0)), "12.00");
/// assert_eq!(format_amount(&Decimal::new(12345, 3)), "12.345");
/// ```
#[must_use]
pub fn format_amount(amount: &Decimal) -> String {
    let mut value = *amount;
    if value.scale() < 2 {
        value.rescale(2);
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use chrono::{Datelike, Timelike};

    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str_exact(s).unwrap()
    }

    // ==================== Dates ====================

    #[test]
    fn test_iso_date_gets_midnight() {
        let dt = parse_date("2024-01-15").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 1, 15));
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (0, 0, 0));
    }

    #[test]
    fn test_datetime_keeps_time() {
        let dt = parse_date("2024-01-15 13:45:10").unwrap();
        assert_eq!((dt.hour(), dt.minute(), dt.second()), (13, 45, 10));
    }

    #[test]
    fn test_us_date_wins_over_european() {
        let dt = parse_date("02/03/2024").unwrap();
        assert_eq!((dt.month(), dt.day()), (2, 3));
    }

    #[test]
    fn test_european_date_when_us_impossible() {
        let dt = parse_date("13/01/2024").unwrap();
        assert_eq!((dt.year(), dt.month(), dt.day()), (2024, 1, 13));
    }

    #[test]
    fn test_two_digit_year() {
        let dt = parse_date("01/15/24").unwrap();
        assert_eq!(dt.year(), 2024);
    }

    #[test]
    fn test_compact_and_textual_dates() {
        assert_eq!(parse_date("20240115").unwrap().day(), 15);
        assert_eq!(parse_date("15 Jan 2024").unwrap().month(), 1);
        assert_eq!(parse_date("Jan 15, 2024").unwrap().day(), 15);
        assert_eq!(parse_date("15.01.2024").unwrap().day(), 15);
    }

    #[test]
    fn test_rejects_non_dates() {
        assert!(parse_date("").is_err());
        assert!(parse_date("Coffee Shop").is_err());
        assert!(parse_date("-4.50").is_err());
        assert!(parse_date("20241345").is_err());
    }

    // ==================== Amounts ====================

    #[test]
    fn test_plain_and_signed_amounts() {
        assert_eq!(parse_amount("-4.50").unwrap(), dec("-4.50"));
        assert_eq!(parse_amount("+4.50").unwrap(), dec("4.50"));
        assert_eq!(parse_amount("12.50-").unwrap(), dec("-12.50"));
        assert_eq!(parse_amount("100").unwrap(), dec("100"));
    }

    #[test]
    fn test_parentheses_are_negative() {
        assert_eq!(parse_amount("(12.50)").unwrap(), dec("-12.50"));
        assert_eq!(parse_amount("($1,200.00)").unwrap(), dec("-1200.00"));
    }

    #[test]
    fn test_credit_debit_suffixes() {
        assert_eq!(parse_amount("$12.50 CR").unwrap(), dec("12.50"));
        assert_eq!(parse_amount("12.50 DR").unwrap(), dec("-12.50"));
        assert_eq!(parse_amount("12.50dr").unwrap(), dec("-12.50"));
    }

    #[test]
    fn test_currency_symbols_and_codes() {
        assert_eq!(parse_amount("€1,234.56").unwrap(), dec("1234.56"));
        assert_eq!(parse_amount("-$5.00").unwrap(), dec("-5.00"));
        assert_eq!(parse_amount("$-5.00").unwrap(), dec("-5.00"));
        assert_eq!(parse_amount("USD 12.00").unwrap(), dec("12.00"));
        assert_eq!(parse_amount("12.00 EUR").unwrap(), dec("12.00"));
    }

    #[test]
    fn test_grouping_and_decimal_comma() {
        assert_eq!(parse_amount("1,234").unwrap(), dec("1234"));
        assert_eq!(parse_amount("1.234,56").unwrap(), dec("1234.56"));
        assert_eq!(parse_amount("12,5").unwrap(), dec("12.5"));
        assert_eq!(parse_amount("1,234,567.89").unwrap(), dec("1234567.89"));
    }

    #[test]
    fn test_zero_is_never_negative() {
        assert!(parse_amount("-0.00").unwrap().is_sign_positive());
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(parse_amount("").is_err());
        assert!(parse_amount("abc").is_err());
        assert!(parse_amount("2024-01-15").is_err());
        assert!(parse_amount("12..5").is_err());
        assert!(matches!(parse_amount("x"), Err(FieldError::InvalidAmount(v)) if v == "x"));
    }

    #[test]
    fn test_amount_fidelity_through_formatting() {
        for (input, wire) in [
            ("-12.50", "-12.50"),
            ("(12.50)", "-12.50"),
            ("$12.50 CR", "12.50"),
            ("12.50-", "-12.50"),
            ("0.125", "0.125"),
            ("7", "7.00"),
        ] {
            assert_eq!(format_amount(&parse_amount(input).unwrap()), wire, "input {input}");
        }
    }
}
