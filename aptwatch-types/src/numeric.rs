//! Locale-aware numeric parsing shared by [`crate::listing::RawValue`] and
//! the normalizer's regex-sweep fallback.

use rust_decimal::Decimal;
use std::str::FromStr;

/// Parse a German-locale-formatted numeric string into a [`Decimal`].
///
/// Strips thousands separators (`.` or plain spaces, including the
/// non-breaking space some providers emit) and replaces a decimal comma
/// with a period before delegating to [`Decimal::from_str`].
#[must_use]
pub fn parse_locale_decimal(raw: &str) -> Option<Decimal> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Keep only digits, separators and a leading sign; discard currency
    // symbols, unit suffixes ("m²", "Zimmer") and the like.
    let mut cleaned = String::with_capacity(trimmed.len());
    for c in trimmed.chars() {
        if c.is_ascii_digit() || c == '-' || c == '.' || c == ',' {
            cleaned.push(c);
        } else if c == '\u{a0}' || c == ' ' {
            // thousands-separator whitespace; dropped below
        }
    }
    if cleaned.is_empty() {
        return None;
    }

    let has_comma = cleaned.contains(',');
    let has_dot = cleaned.contains('.');

    let normalized = if has_comma && has_dot {
        // Both present: whichever appears last is the decimal separator.
        let last_comma = cleaned.rfind(',').unwrap_or(0);
        let last_dot = cleaned.rfind('.').unwrap_or(0);
        if last_comma > last_dot {
            cleaned.replace('.', "").replace(',', ".")
        } else {
            cleaned.replace(',', "")
        }
    } else if has_comma {
        // Comma is the decimal separator (German convention).
        cleaned.replace(',', ".")
    } else {
        cleaned
    };

    Decimal::from_str(&normalized).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_integer() {
        assert_eq!(parse_locale_decimal("1200"), Decimal::from_str("1200").ok());
    }

    #[test]
    fn parses_german_decimal_comma() {
        assert_eq!(
            parse_locale_decimal("1.234,50"),
            Decimal::from_str("1234.50").ok()
        );
    }

    #[test]
    fn parses_with_currency_and_unit_noise() {
        assert_eq!(
            parse_locale_decimal("1.200 €"),
            Decimal::from_str("1200").ok()
        );
        assert_eq!(
            parse_locale_decimal("65,5 m²"),
            Decimal::from_str("65.5").ok()
        );
    }

    #[test]
    fn empty_input_is_none() {
        assert_eq!(parse_locale_decimal(""), None);
        assert_eq!(parse_locale_decimal("   "), None);
    }
}
