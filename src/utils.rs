//! Small string and time helpers used across the pipeline.
//!
//! - String truncation for log previews
//! - Title-casing for subject lines and headings
//! - Date stamps in the `dd/mm/YYYY` form used by the newsletters

use chrono::{DateTime, TimeZone};
use std::fmt::Display;

/// Truncate a string for logging purposes.
///
/// Long strings are truncated to at most `max` bytes (backing off to a char
/// boundary) with an ellipsis and byte count indicator appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 bytes)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Capitalize the first character of a string.
pub fn upcase(s: &str) -> String {
    let mut c = s.chars();
    match c.next() {
        None => String::new(),
        Some(f) => f.to_uppercase().collect::<String>() + c.as_str(),
    }
}

/// Capitalize every whitespace-separated word, lowercasing the rest.
///
/// ```ignore
/// assert_eq!(title_case("mercado IMOBILIARIO"), "Mercado Imobiliario");
/// ```
pub fn title_case(s: &str) -> String {
    s.split_whitespace()
        .map(|w| upcase(&w.to_lowercase()))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `dd/mm/YYYY`
pub fn date_stamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    now.format("%d/%m/%Y").to_string()
}

/// `dd/mm/YYYY HH:MM`
pub fn datetime_stamp<Tz: TimeZone>(now: &DateTime<Tz>) -> String
where
    Tz::Offset: Display,
{
    now.format("%d/%m/%Y %H:%M").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn test_truncate_for_log_short_string() {
        let s = "Hello, world!";
        assert_eq!(truncate_for_log(s, 100), "Hello, world!");
    }

    #[test]
    fn test_truncate_for_log_long_string() {
        let s = "a".repeat(500);
        let result = truncate_for_log(&s, 100);
        assert!(result.starts_with(&"a".repeat(100)));
        assert!(result.contains("…(+400 bytes)"));
    }

    #[test]
    fn test_truncate_for_log_respects_char_boundary() {
        // "ç" is two bytes; cutting at 1 must back off to 0
        let result = truncate_for_log("çã", 1);
        assert_eq!(result, "…(+4 bytes)");
    }

    #[test]
    fn test_upcase() {
        assert_eq!(upcase("hello"), "Hello");
        assert_eq!(upcase(""), "");
        assert_eq!(upcase("ç"), "Ç");
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("mercado imobiliario"), "Mercado Imobiliario");
        assert_eq!(title_case("construção CIVIL"), "Construção Civil");
        assert_eq!(title_case("  spaced   out "), "Spaced Out");
    }

    #[test]
    fn test_date_stamps() {
        let now = Utc.with_ymd_and_hms(2025, 5, 6, 7, 8, 9).unwrap();
        assert_eq!(date_stamp(&now), "06/05/2025");
        assert_eq!(datetime_stamp(&now), "06/05/2025 07:08");
    }
}
