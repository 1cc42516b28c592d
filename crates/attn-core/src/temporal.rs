//! Date/time normalization for cells from mixed spreadsheet sources
//!
//! Exports arrive as text in several regional layouts, as spreadsheet serial
//! numbers, or already decoded by the source layer. Everything is brought to a
//! [`NaiveDateTime`]; anything that cannot be read becomes `None`.
//!
//! Two-digit years are always resolved the same way: `00..=68` map to
//! `2000..=2068` and `69..=99` to `1969..=1999`.

use crate::table::CellValue;
use chrono::{DateTime, Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};
use regex::Regex;
use std::sync::OnceLock;

/// Exclusive upper bound for spreadsheet serial dates (year 9999)
pub const MAX_SERIAL_DATE: f64 = 2_958_466.0;

/// Day-first, ISO and US layouts in priority order.
///
/// `%Y` also accepts one- or two-digit years, which are then corrected, so no
/// separate `%y` variants are needed.
pub const DEFAULT_PATTERNS: &[&str] = &[
    // Day-first, dotted
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%d.%m.%Y",
    // Day-first, slashed
    "%d/%m/%Y %H:%M:%S",
    "%d/%m/%Y %H:%M",
    "%d/%m/%Y",
    // ISO
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y-%m-%d",
    // US, slashed (only reached when day-first fails, e.g. 01/13/2024)
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
    "%m/%d/%Y",
    // US, hyphenated
    "%m-%d-%Y %H:%M:%S",
    "%m-%d-%Y %H:%M",
    "%m-%d-%Y",
];

const ISO_FALLBACK_PATTERNS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"];

const TIME_PATTERNS: &[&str] = &["%H:%M:%S", "%H:%M:%S%.f", "%H:%M"];

/// Parses cell values into normalized instants using an ordered pattern list
#[derive(Debug, Clone)]
pub struct TemporalParser {
    patterns: Vec<String>,
}

impl Default for TemporalParser {
    fn default() -> Self {
        Self::new(DEFAULT_PATTERNS.iter().map(|p| p.to_string()).collect())
    }
}

impl TemporalParser {
    /// Create a parser with custom `chrono` format strings, tried in order
    pub fn new(patterns: Vec<String>) -> Self {
        Self { patterns }
    }

    /// Normalize any cell value to a point in time
    pub fn parse(&self, value: &CellValue) -> Option<NaiveDateTime> {
        match value {
            CellValue::DateTime(dt) => correct_two_digit_year(*dt),
            CellValue::Integer(i) => parse_serial(*i as f64),
            CellValue::Float(f) => parse_serial(*f),
            CellValue::String(s) => self.parse_str(s),
            CellValue::Bool(_) | CellValue::Empty => None,
        }
    }

    /// Parse text against the pattern list, then as ISO-8601
    pub fn parse_str(&self, text: &str) -> Option<NaiveDateTime> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        // Year-first layouts see a two-digit year only after every other
        // layout failed, so "05-01-24" stays month-first.
        let year_digits = leading_digits(text);
        let four_digit_pass = self
            .patterns
            .iter()
            .filter(|p| !p.starts_with("%Y") || year_digits == 4);
        let two_digit_pass = self
            .patterns
            .iter()
            .filter(|p| p.starts_with("%Y") && year_digits == 2);

        four_digit_pass
            .chain(two_digit_pass)
            .filter_map(|pattern| parse_with(text, pattern))
            .find_map(correct_two_digit_year)
            .or_else(|| parse_iso8601(text).and_then(correct_two_digit_year))
    }

    /// Time of day carried by a dedicated time cell.
    ///
    /// Numbers below 1 are spreadsheet day fractions; larger numbers and full
    /// date-times contribute their time component.
    pub fn parse_time_of_day(&self, value: &CellValue) -> Option<NaiveTime> {
        match value {
            CellValue::DateTime(dt) => Some(dt.time()),
            CellValue::Integer(_) | CellValue::Float(_) => {
                let v = value.as_f64()?;
                if (0.0..1.0).contains(&v) {
                    day_fraction_to_time(v)
                } else {
                    parse_serial(v).map(|dt| dt.time())
                }
            }
            CellValue::String(s) => {
                let s = s.trim();
                TIME_PATTERNS
                    .iter()
                    .find_map(|p| NaiveTime::parse_from_str(s, p).ok())
                    .or_else(|| self.parse_str(s).map(|dt| dt.time()))
            }
            CellValue::Bool(_) | CellValue::Empty => None,
        }
    }
}

fn parse_with(text: &str, pattern: &str) -> Option<NaiveDateTime> {
    if pattern.contains("%H") {
        NaiveDateTime::parse_from_str(text, pattern).ok()
    } else {
        NaiveDate::parse_from_str(text, pattern)
            .ok()
            .and_then(|d| d.and_hms_opt(0, 0, 0))
    }
}

/// Length of the digit run `text` starts with, when a separator follows it
fn leading_digits(text: &str) -> usize {
    let run = text.bytes().take_while(u8::is_ascii_digit).count();
    if run < text.len() {
        run
    } else {
        0
    }
}

fn parse_iso8601(text: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.naive_local());
    }
    ISO_FALLBACK_PATTERNS
        .iter()
        .find_map(|p| NaiveDateTime::parse_from_str(text, p).ok())
}

/// Convert a spreadsheet serial number (day 0 = 1899-12-30) to a date-time.
///
/// Serials above 60 lose one day for the phantom 1900-02-29; the fractional
/// part becomes the time of day.
pub fn parse_serial(serial: f64) -> Option<NaiveDateTime> {
    if !(serial > 0.0 && serial < MAX_SERIAL_DATE) {
        return None;
    }
    let days = if serial > 60.0 { serial - 1.0 } else { serial };
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?.and_hms_opt(0, 0, 0)?;
    let seconds = (days * 86_400.0).round() as i64;
    let dt = epoch.checked_add_signed(Duration::seconds(seconds))?;
    correct_two_digit_year(dt)
}

fn day_fraction_to_time(fraction: f64) -> Option<NaiveTime> {
    let seconds = ((fraction * 86_400.0).round() as u32).min(86_399);
    NaiveTime::from_num_seconds_from_midnight_opt(seconds, 0)
}

/// Move a year in `0..100` into `1969..=2068`.
///
/// Returns `None` when the adjusted date does not exist.
pub fn correct_two_digit_year(dt: NaiveDateTime) -> Option<NaiveDateTime> {
    let year = dt.year();
    if !(0..100).contains(&year) {
        return Some(dt);
    }
    let full = if year <= 68 { year + 2000 } else { year + 1900 };
    dt.with_year(full)
}

/// First valid `H:MM` or `H:MM:SS` time mentioned in free text
pub fn find_time_in_text(text: &str) -> Option<NaiveTime> {
    static TIME_RE: OnceLock<Regex> = OnceLock::new();
    let re = TIME_RE.get_or_init(|| {
        Regex::new(r"\b(\d{1,2}:\d{2}(?::\d{2})?)\b").expect("time pattern is valid")
    });

    re.captures_iter(text).find_map(|caps| {
        let matched = caps.get(1)?.as_str();
        TIME_PATTERNS
            .iter()
            .find_map(|p| NaiveTime::parse_from_str(matched, p).ok())
    })
}

/// `dd.MM.yyyy`
pub fn format_dmy(dt: &NaiveDateTime) -> String {
    dt.format("%d.%m.%Y").to_string()
}

/// `HH:mm:ss`
pub fn format_hms(dt: &NaiveDateTime) -> String {
    dt.format("%H:%M:%S").to_string()
}

/// `dd.MM.yyyy HH:mm:ss`
pub fn format_datetime(dt: &NaiveDateTime) -> String {
    dt.format("%d.%m.%Y %H:%M:%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn dt(y: i32, m: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn text(s: &str) -> CellValue {
        CellValue::String(s.to_string())
    }

    #[test]
    fn test_parse_day_first_formats() {
        let parser = TemporalParser::default();
        assert_eq!(parser.parse(&text("05.01.2024")), Some(dt(2024, 1, 5, 0, 0, 0)));
        assert_eq!(parser.parse(&text("5.1.2024 8:30")), Some(dt(2024, 1, 5, 8, 30, 0)));
        assert_eq!(
            parser.parse(&text("05/01/2024 17:45:10")),
            Some(dt(2024, 1, 5, 17, 45, 10))
        );
    }

    #[test]
    fn test_parse_iso_and_us_formats() {
        let parser = TemporalParser::default();
        assert_eq!(
            parser.parse(&text("2024-01-05 08:00")),
            Some(dt(2024, 1, 5, 8, 0, 0))
        );
        // Day 13 cannot be a month, so the US layout takes over
        assert_eq!(parser.parse(&text("01/13/2024")), Some(dt(2024, 1, 13, 0, 0, 0)));
        assert_eq!(parser.parse(&text("12-31-2023 23:59")), Some(dt(2023, 12, 31, 23, 59, 0)));
    }

    #[test]
    fn test_parse_iso8601_fallback() {
        let parser = TemporalParser::default();
        assert_eq!(
            parser.parse(&text("2024-05-12T10:00:00")),
            Some(dt(2024, 5, 12, 10, 0, 0))
        );
        assert_eq!(
            parser.parse(&text("2024-05-12T10:00:00+03:00")),
            Some(dt(2024, 5, 12, 10, 0, 0))
        );
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let parser = TemporalParser::default();
        assert_eq!(parser.parse(&text("")), None);
        assert_eq!(parser.parse(&text("Giriş")), None);
        assert_eq!(parser.parse(&text("31.02.2024")), None);
        assert_eq!(parser.parse(&CellValue::Bool(true)), None);
        assert_eq!(parser.parse(&CellValue::Empty), None);
    }

    #[test]
    fn test_two_digit_years() {
        let parser = TemporalParser::default();
        assert_eq!(parser.parse(&text("05.01.24")), Some(dt(2024, 1, 5, 0, 0, 0)));
        assert_eq!(parser.parse(&text("05.01.68")), Some(dt(2068, 1, 5, 0, 0, 0)));
        assert_eq!(parser.parse(&text("05.01.69")), Some(dt(1969, 1, 5, 0, 0, 0)));
        assert_eq!(parser.parse(&text("05-01-99")), Some(dt(1999, 5, 1, 0, 0, 0)));
    }

    #[test]
    fn test_two_digit_year_first() {
        let parser = TemporalParser::default();
        assert_eq!(parser.parse(&text("24-01-05")), Some(dt(2024, 1, 5, 0, 0, 0)));
        assert_eq!(parser.parse(&text("24-01-05 08:00")), Some(dt(2024, 1, 5, 8, 0, 0)));
        assert_eq!(parser.parse(&text("99-12-31")), Some(dt(1999, 12, 31, 0, 0, 0)));
        // A valid month-first reading wins
        assert_eq!(parser.parse(&text("05-01-24")), Some(dt(2024, 5, 1, 0, 0, 0)));
        // Three-digit prefixes are not years
        assert_eq!(parser.parse(&text("124-01-05")), None);
    }

    #[test]
    fn test_native_value_year_correction() {
        let parser = TemporalParser::default();
        let raw = CellValue::DateTime(dt(24, 3, 1, 9, 0, 0));
        assert_eq!(parser.parse(&raw), Some(dt(2024, 3, 1, 9, 0, 0)));

        let raw = CellValue::DateTime(dt(96, 2, 29, 0, 0, 0));
        assert_eq!(parser.parse(&raw), Some(dt(1996, 2, 29, 0, 0, 0)));

        let modern = CellValue::DateTime(dt(2023, 6, 1, 0, 0, 0));
        assert_eq!(parser.parse(&modern), Some(dt(2023, 6, 1, 0, 0, 0)));
    }

    #[test]
    fn test_parse_serial_numbers() {
        let parser = TemporalParser::default();
        // 1899-12-30 + 45677 days
        assert_eq!(parser.parse(&CellValue::Integer(45678)), Some(dt(2025, 1, 20, 0, 0, 0)));
        assert_eq!(
            parser.parse(&CellValue::Float(45678.5)),
            Some(dt(2025, 1, 20, 12, 0, 0))
        );
        assert_eq!(parser.parse(&CellValue::Integer(1)), Some(dt(1899, 12, 31, 0, 0, 0)));
        assert_eq!(parser.parse(&CellValue::Integer(0)), None);
        assert_eq!(parser.parse(&CellValue::Integer(-5)), None);
        assert_eq!(parser.parse(&CellValue::Integer(3_000_000)), None);
    }

    #[test]
    fn test_parse_time_of_day() {
        let parser = TemporalParser::default();
        let t = |h, m, s| NaiveTime::from_hms_opt(h, m, s).unwrap();

        assert_eq!(parser.parse_time_of_day(&text("08:00")), Some(t(8, 0, 0)));
        assert_eq!(parser.parse_time_of_day(&text("8:05:30")), Some(t(8, 5, 30)));
        assert_eq!(parser.parse_time_of_day(&CellValue::Float(0.75)), Some(t(18, 0, 0)));
        assert_eq!(
            parser.parse_time_of_day(&text("05.01.2024 17:00")),
            Some(t(17, 0, 0))
        );
        assert_eq!(parser.parse_time_of_day(&text("yok")), None);
        assert_eq!(parser.parse_time_of_day(&CellValue::Empty), None);
    }

    #[test]
    fn test_find_time_in_text() {
        let t = |h, m, s| NaiveTime::from_hms_opt(h, m, s).unwrap();
        assert_eq!(find_time_in_text("Giriş 08:15"), Some(t(8, 15, 0)));
        assert_eq!(find_time_in_text("Silme (17:30:05)"), Some(t(17, 30, 5)));
        assert_eq!(find_time_in_text("kod 99:99 saat 9:10"), Some(t(9, 10, 0)));
        assert_eq!(find_time_in_text("Giriş"), None);
    }

    #[test]
    fn test_formatting_helpers() {
        let value = dt(2024, 1, 5, 8, 3, 9);
        assert_eq!(format_dmy(&value), "05.01.2024");
        assert_eq!(format_hms(&value), "08:03:09");
        assert_eq!(format_datetime(&value), "05.01.2024 08:03:09");
    }

    proptest! {
        #[test]
        fn prop_parse_format_parse_is_stable(
            y in 1900i32..2100,
            m in 1u32..=12,
            d in 1u32..=28,
            h in 0u32..24,
            mi in 0u32..60,
            s in 0u32..60,
            layout in 0usize..4,
        ) {
            let parser = TemporalParser::default();
            let input = match layout {
                0 => format!("{:02}.{:02}.{} {:02}:{:02}:{:02}", d, m, y, h, mi, s),
                1 => format!("{}-{:02}-{:02} {}:{:02}", y, m, d, h, mi),
                2 => format!("{}/{}/{}", d, m, y),
                _ => format!("{}-{}-{}", m, d, y),
            };
            let first = parser.parse(&CellValue::String(input)).unwrap();
            let again = parser.parse(&CellValue::String(format_datetime(&first)));
            prop_assert_eq!(again, Some(first));
        }

        #[test]
        fn prop_two_digit_year_rule(
            yy in 0i32..100,
            m in 1u32..=12,
            d in 1u32..=28,
            layout in 0usize..5,
        ) {
            let parser = TemporalParser::default();
            let input = match layout {
                0 => format!("{:02}.{:02}.{:02}", d, m, yy),
                1 => format!("{:02}/{:02}/{:02} 10:00", d, m, yy),
                2 => format!("{:02}.{:02}.{:02} 10:00:00", d, m, yy),
                3 => format!("{:02}-{:02}-{:02}", m, d, yy),
                _ => {
                    // Below 13 the text is also a valid month-first date
                    prop_assume!(yy > 12);
                    format!("{:02}-{:02}-{:02} 10:00", yy, m, d)
                }
            };
            let parsed = parser.parse(&CellValue::String(input)).unwrap();
            let expected = if yy <= 68 { 2000 + yy } else { 1900 + yy };
            prop_assert_eq!(parsed.year(), expected);
        }
    }
}
