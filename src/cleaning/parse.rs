//! Field-level parsers used by the cleaner. Each returns `None` when the
//! cell is malformed; the caller turns that into a row rejection.

use chrono::{Datelike, NaiveDate, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::constants::{RATING_MAX, RATING_MIN};

// Optional leading dollar sign, optional thousands separators, optional fraction
static CURRENCY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\$?\s*(\d{1,3}(?:,\d{3})+|\d+)(\.\d+)?$").expect("valid currency regex")
});

static QUANTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d+)(?:\.0+)?$").expect("valid quantity regex"));

/// Parse a currency-formatted amount such as `$1,234.50` into a number
pub fn parse_currency(raw: &str) -> Option<f64> {
    let caps = CURRENCY_RE.captures(raw.trim())?;
    let whole = caps.get(1)?.as_str().replace(',', "");
    let fraction = caps.get(2).map(|m| m.as_str()).unwrap_or("");
    let value: f64 = format!("{whole}{fraction}").parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parse a non-negative integer quantity. `3.0` is accepted, `3.5` is not.
pub fn parse_quantity(raw: &str) -> Option<u32> {
    let caps = QUANTITY_RE.captures(raw.trim())?;
    caps.get(1)?.as_str().parse().ok()
}

/// Parse a rating on the closed 0–10 scale
pub fn parse_rating(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    (value.is_finite() && (RATING_MIN..=RATING_MAX).contains(&value)).then_some(value)
}

/// Parse a profit margin expressed as a fraction (0.48 for 48%)
pub fn parse_margin(raw: &str) -> Option<f64> {
    let value: f64 = raw.trim().parse().ok()?;
    value.is_finite().then_some(value)
}

/// Parse a date trying each format in order.
///
/// chrono's `%Y` also accepts one or two digit years, so a `%Y` match is
/// only kept when the year has four digits.
pub fn parse_date(raw: &str, formats: &[String]) -> Option<NaiveDate> {
    let raw = raw.trim();
    formats.iter().find_map(|fmt| {
        NaiveDate::parse_from_str(raw, fmt)
            .ok()
            .filter(|date| !fmt.contains("%Y") || date.year() >= 1000)
    })
}

/// Parse a time of day trying each format in order
pub fn parse_time(raw: &str, formats: &[String]) -> Option<NaiveTime> {
    let raw = raw.trim();
    formats
        .iter()
        .find_map(|fmt| NaiveTime::parse_from_str(raw, fmt).ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::{default_date_formats, default_time_formats};

    #[test]
    fn test_parse_currency() {
        assert_eq!(parse_currency("$12.34"), Some(12.34));
        assert_eq!(parse_currency("12.34"), Some(12.34));
        assert_eq!(parse_currency(" $74.69 "), Some(74.69));
        assert_eq!(parse_currency("$1,234.50"), Some(1234.5));
        assert_eq!(parse_currency("$7"), Some(7.0));
        assert_eq!(parse_currency("$12.3.4"), None);
        assert_eq!(parse_currency("twelve"), None);
        assert_eq!(parse_currency("-$5.00"), None);
        assert_eq!(parse_currency("$"), None);
        assert_eq!(parse_currency("1,23.00"), None);
    }

    #[test]
    fn test_parse_quantity() {
        assert_eq!(parse_quantity("7"), Some(7));
        assert_eq!(parse_quantity("0"), Some(0));
        assert_eq!(parse_quantity("3.0"), Some(3));
        assert_eq!(parse_quantity("3.5"), None);
        assert_eq!(parse_quantity("-1"), None);
        assert_eq!(parse_quantity("many"), None);
    }

    #[test]
    fn test_parse_rating_bounds() {
        assert_eq!(parse_rating("0"), Some(0.0));
        assert_eq!(parse_rating("10"), Some(10.0));
        assert_eq!(parse_rating("9.1"), Some(9.1));
        assert_eq!(parse_rating("10.1"), None);
        assert_eq!(parse_rating("-0.5"), None);
        assert_eq!(parse_rating("NaN"), None);
    }

    #[test]
    fn test_parse_date_formats_in_order() {
        let formats = default_date_formats();
        assert_eq!(
            parse_date("2023-03-15", &formats),
            NaiveDate::from_ymd_opt(2023, 3, 15)
        );
        assert_eq!(
            parse_date("05/01/19", &formats),
            NaiveDate::from_ymd_opt(2019, 1, 5)
        );
        assert_eq!(
            parse_date("15/03/2023", &formats),
            NaiveDate::from_ymd_opt(2023, 3, 15)
        );
        assert_eq!(parse_date("31/02/2023", &formats), None);
    }

    #[test]
    fn test_parse_date_rejects_short_years_for_four_digit_formats() {
        let formats = default_date_formats();
        assert_eq!(parse_date("05-01-22", &formats), None);
        assert_eq!(parse_date("19-01-05", &formats), None);
        assert_eq!(parse_date("5/1/22", &["%d/%m/%Y".to_string()]), None);
        assert_eq!(
            parse_date("05-01-2022", &formats),
            NaiveDate::from_ymd_opt(2022, 1, 5)
        );
    }

    #[test]
    fn test_parse_time() {
        let formats = default_time_formats();
        assert_eq!(parse_time("13:08:00", &formats), NaiveTime::from_hms_opt(13, 8, 0));
        assert_eq!(parse_time("09:30", &formats), NaiveTime::from_hms_opt(9, 30, 0));
        assert_eq!(parse_time("25:00", &formats), None);
    }
}
