//! Number normalization for Italian bills.

use std::str::FromStr;

use lazy_static::lazy_static;
use regex::Regex;
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::trace;

use crate::error::ExtractionError;

lazy_static! {
    // "1.234,56": dot groups thousands, comma marks decimals
    static ref GROUPED_THOUSANDS: Regex = Regex::new(r"\d\.\d{3},").unwrap();

    // "1.234" or "12.345.678" with no decimal part
    static ref GROUPED_INTEGER: Regex = Regex::new(r"^\d{1,3}(?:\.\d{3})+$").unwrap();
}

/// Convert an Italian or plain decimal token into a canonical value.
///
/// `"1.234,56"` and `"1234,56"` both give `1234.56`, `"234.60"` passes
/// through, `"1.234"` is read as a grouped integer.
pub fn normalize_number(token: &str) -> Result<Decimal, ExtractionError> {
    let cleaned: String = token
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == ',' || *c == '.')
        .collect();

    let canonical = if GROUPED_THOUSANDS.is_match(&cleaned) {
        cleaned.replace('.', "").replace(',', ".")
    } else if cleaned.contains(',') {
        cleaned.replace(',', ".")
    } else if GROUPED_INTEGER.is_match(&cleaned) {
        cleaned.replace('.', "")
    } else {
        cleaned
    };

    Decimal::from_str(&canonical)
        .map_err(|_| ExtractionError::AmbiguousNumericFormat(token.to_string()))
}

/// Like [`normalize_number`], but a malformed token is simply no value.
pub fn parse_italian_number(token: &str) -> Option<Decimal> {
    match normalize_number(token) {
        Ok(value) => Some(value),
        Err(e) => {
            trace!("{}", e);
            None
        }
    }
}

/// Round a monetary value to cents.
pub fn round_money(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Round a consumption quantity to whole units.
pub fn round_quantity(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
}

/// Format amount in Italian style (1.234,56).
pub fn format_italian_amount(amount: Decimal) -> String {
    let s = format!("{:.2}", round_money(amount));
    let (sign, digits) = match s.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", s.as_str()),
    };
    let Some((integer_part, decimal_part)) = digits.split_once('.') else {
        return s;
    };

    let chars: Vec<char> = integer_part.chars().collect();
    let mut formatted = String::new();

    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            formatted.push('.');
        }
        formatted.push(*c);
    }

    format!("{}{},{}", sign, formatted, decimal_part)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    #[test]
    fn test_normalize_italian_grouping() {
        assert_eq!(normalize_number("1.234,56").unwrap(), dec("1234.56"));
        assert_eq!(normalize_number("12.345.678,90").unwrap(), dec("12345678.90"));
    }

    #[test]
    fn test_normalize_decimal_comma() {
        assert_eq!(normalize_number("39,10").unwrap(), dec("39.10"));
        assert_eq!(normalize_number("1234,5").unwrap(), dec("1234.5"));
    }

    #[test]
    fn test_canonical_form_passes_through() {
        assert_eq!(normalize_number("234.60").unwrap(), dec("234.60"));
        assert_eq!(normalize_number("86").unwrap(), dec("86"));
    }

    #[test]
    fn test_grouped_integer() {
        assert_eq!(normalize_number("1.234").unwrap(), dec("1234"));
        assert_eq!(normalize_number("2.500 kWh").unwrap(), dec("2500"));
    }

    #[test]
    fn test_malformed_tokens() {
        assert!(matches!(
            normalize_number("1,234.56"),
            Err(ExtractionError::AmbiguousNumericFormat(_))
        ));
        assert!(normalize_number("€").is_err());
        assert_eq!(parse_italian_number("n/d"), None);
    }

    #[test]
    fn test_rounding() {
        assert_eq!(round_money(dec("569.2049")), dec("569.20"));
        assert_eq!(round_money(dec("0.125")), dec("0.13"));
        assert_eq!(round_quantity(dec("442.5")), dec("443"));
    }

    #[test]
    fn test_format_italian_amount() {
        assert_eq!(format_italian_amount(dec("1234.56")), "1.234,56");
        assert_eq!(format_italian_amount(dec("78.52")), "78,52");
        assert_eq!(format_italian_amount(dec("12345678.9")), "12.345.678,90");
    }
}
