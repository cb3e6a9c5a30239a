//! Date parsing and formatting for Vietnamese documents.

use chrono::{DateTime, NaiveDate};

use super::patterns::{DATE_DMY, DATE_VIETNAMESE_LONG};

/// Fallback formats tried after the D/M/YYYY and long Vietnamese forms.
const FALLBACK_FORMATS: &[&str] = &["%Y-%m-%d", "%d-%m-%Y", "%d.%m.%Y", "%Y/%m/%d"];

/// Parse a whole-string `D/M/YYYY` date.
pub fn parse_dmy(s: &str) -> Option<NaiveDate> {
    let caps = DATE_DMY.captures(s)?;
    let day: u32 = caps[1].parse().ok()?;
    let month: u32 = caps[2].parse().ok()?;
    let year: i32 = caps[3].parse().ok()?;
    NaiveDate::from_ymd_opt(year, month, day)
}

/// True when the string has the `D/M/YYYY` shape, valid or not.
pub fn is_dmy_shaped(s: &str) -> bool {
    DATE_DMY.is_match(s)
}

/// Parse a date in any supported notation.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    if is_dmy_shaped(s) {
        return parse_dmy(s);
    }

    if let Some(caps) = DATE_VIETNAMESE_LONG.captures(s) {
        let day: u32 = caps[1].parse().ok()?;
        let month: u32 = caps[2].parse().ok()?;
        let year: i32 = caps[3].parse().ok()?;
        return NaiveDate::from_ymd_opt(year, month, day);
    }

    for format in FALLBACK_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return Some(date);
        }
    }

    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.date_naive())
}

/// Render a date by substituting `YYYY`, `MM` and `DD` tokens.
pub fn format_date(date: NaiveDate, pattern: &str) -> String {
    pattern
        .replace("YYYY", &date.format("%Y").to_string())
        .replace("MM", &date.format("%m").to_string())
        .replace("DD", &date.format("%d").to_string())
}
