//! Value parsing shared by the crash and reference adapters.
//!
//! Every function takes text that has already passed
//! [`crash_warehouse_models::present`], so callers decide what counts as
//! missing and these functions only decide what counts as well-formed.

use chrono::NaiveDate;
use crash_warehouse_crash_models::InvalidValueError;

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// Normalizes a CSV header to lower snake case.
///
/// Runs of anything other than ASCII letters and digits (spaces, embedded
/// newlines, punctuation) collapse into one underscore, so
/// `"Bus \nInvolvement"` becomes `bus_involvement`.
#[must_use]
pub fn normalize_header(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut pending_sep = false;
    for c in raw.trim().chars() {
        if c.is_ascii_alphanumeric() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(c.to_ascii_lowercase());
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Parses a crash time into its hour.
///
/// Accepts `HH:MM`, `H:MM`, `HH:MM:SS` and the compact `HHMM`/`HMM`
/// forms. Returns `None` for anything malformed or out of range.
#[must_use]
pub fn parse_hour(raw: &str) -> Option<u8> {
    let raw = raw.trim();
    let (hour, minute) = if let Some((hour, rest)) = raw.split_once(':') {
        let minute = rest.split(':').next()?;
        (hour, minute)
    } else if raw.len() == 3 || raw.len() == 4 {
        if !raw.is_ascii() {
            return None;
        }
        raw.split_at(raw.len() - 2)
    } else {
        return None;
    };
    if hour.is_empty() || hour.len() > 2 || minute.len() != 2 {
        return None;
    }
    let hour: u8 = hour.parse().ok()?;
    let minute: u8 = minute.parse().ok()?;
    (hour < 24 && minute < 60).then_some(hour)
}

/// Parses a calendar date in ISO (`2021-03-07`) or Australian
/// (`07/03/2021`) form. A trailing time component is ignored.
#[must_use]
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let date = raw.split_whitespace().next()?;
    let date = date.split('T').next()?;
    ["%Y-%m-%d", "%d/%m/%Y", "%d-%m-%Y", "%Y/%m/%d"]
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(date, format).ok())
}

/// Parses a four-digit year.
#[must_use]
pub fn parse_year(raw: &str) -> Option<i32> {
    let year: i32 = raw.trim().parse().ok()?;
    (1000..=9999).contains(&year).then_some(year)
}

/// Parses a month given as a number (`3`) or an English name (`March`,
/// `Mar`).
#[must_use]
pub fn parse_month(raw: &str) -> Option<u32> {
    let raw = raw.trim();
    if let Ok(month) = raw.parse::<u32>() {
        return (1..=12).contains(&month).then_some(month);
    }
    let lower = raw.to_ascii_lowercase();
    if lower.len() < 3 {
        return None;
    }
    MONTH_NAMES
        .iter()
        .position(|name| name.starts_with(&lower))
        .and_then(|idx| u32::try_from(idx + 1).ok())
}

/// Parses an involvement flag (`Yes`/`No`, `Y`/`N`, `True`/`False`,
/// `1`/`0`).
///
/// # Errors
///
/// Returns [`InvalidValueError`] for any other text.
pub fn parse_flag(field: &'static str, raw: &str) -> Result<bool, InvalidValueError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "yes" | "y" | "true" | "t" | "1" => Ok(true),
        "no" | "n" | "false" | "f" | "0" => Ok(false),
        _ => Err(InvalidValueError::new(field, raw)),
    }
}

/// Parses a non-negative integer count.
///
/// Integral decimals such as `2.0` (common in spreadsheet exports) are
/// accepted.
///
/// # Errors
///
/// Returns [`InvalidValueError`] for negative, fractional, or non-numeric
/// text.
pub fn parse_count(field: &'static str, raw: &str) -> Result<u32, InvalidValueError> {
    let trimmed = raw.trim();
    if let Ok(count) = trimmed.parse::<u32>() {
        return Ok(count);
    }
    let (whole, fraction) = trimmed
        .split_once('.')
        .ok_or_else(|| InvalidValueError::new(field, raw))?;
    if fraction.chars().all(|c| c == '0') {
        whole
            .parse::<u32>()
            .map_err(|_| InvalidValueError::new(field, raw))
    } else {
        Err(InvalidValueError::new(field, raw))
    }
}

/// Parses an age in whole years.
#[must_use]
pub fn parse_age(raw: &str) -> Option<u16> {
    let age: u16 = raw.trim().parse().ok()?;
    (age <= 130).then_some(age)
}

/// Parses a population figure, tolerating thousands separators.
#[must_use]
pub fn parse_population(raw: &str) -> Option<u64> {
    let digits: String = raw.trim().chars().filter(|c| *c != ',').collect();
    digits.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn headers_normalize_to_snake_case() {
        assert_eq!(normalize_header("Crash ID"), "crash_id");
        assert_eq!(normalize_header(" Bus \nInvolvement "), "bus_involvement");
        assert_eq!(normalize_header("SA4 Name 2021"), "sa4_name_2021");
        assert_eq!(normalize_header("National Road Type"), "national_road_type");
        assert_eq!(normalize_header("Number  Fatalities"), "number_fatalities");
    }

    #[test]
    fn hours_from_time_formats() {
        assert_eq!(parse_hour("14:30"), Some(14));
        assert_eq!(parse_hour("7:05"), Some(7));
        assert_eq!(parse_hour("23:59:00"), Some(23));
        assert_eq!(parse_hour("0930"), Some(9));
        assert_eq!(parse_hour("930"), Some(9));
        assert_eq!(parse_hour("24:00"), None);
        assert_eq!(parse_hour("12:7"), None);
        assert_eq!(parse_hour("noon"), None);
        assert_eq!(parse_hour("1"), None);
    }

    #[test]
    fn dates_in_iso_and_australian_order() {
        let expected = NaiveDate::from_ymd_opt(2021, 3, 7);
        assert_eq!(parse_date("2021-03-07"), expected);
        assert_eq!(parse_date("07/03/2021"), expected);
        assert_eq!(parse_date("2021-03-07 00:00:00"), expected);
        assert_eq!(parse_date("31/02/2021"), None);
    }

    #[test]
    fn months_by_number_or_name() {
        assert_eq!(parse_month("3"), Some(3));
        assert_eq!(parse_month("March"), Some(3));
        assert_eq!(parse_month("dec"), Some(12));
        assert_eq!(parse_month("13"), None);
        assert_eq!(parse_month("ju"), None);
    }

    #[test]
    fn flags() {
        assert!(parse_flag("bus", "Yes").unwrap());
        assert!(!parse_flag("bus", "n").unwrap());
        assert!(parse_flag("bus", "maybe").is_err());
    }

    #[test]
    fn counts_must_be_non_negative_integers() {
        assert_eq!(parse_count("fatalities", "3").unwrap(), 3);
        assert_eq!(parse_count("fatalities", "2.0").unwrap(), 2);
        assert!(parse_count("fatalities", "-1").is_err());
        assert!(parse_count("fatalities", "1.5").is_err());
        assert!(parse_count("fatalities", "many").is_err());
    }

    #[test]
    fn populations_with_separators() {
        assert_eq!(parse_population("1,234,567"), Some(1_234_567));
        assert_eq!(parse_population("n/a"), None);
    }
}
