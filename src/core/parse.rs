//! Parsers for the text tokens found in listing table cells.
//!
//! Every parser returns `None` for an empty cell, the `n/a` marker or text it
//! cannot make sense of. Zero is a real observed value and comes back as `Some(0.0)`.

use chrono::NaiveDate;

const NOT_APPLICABLE: &str = "n/a";

const MONTHS: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

fn is_absent(text: &str) -> bool {
    text.is_empty() || text.eq_ignore_ascii_case(NOT_APPLICABLE)
}

/// Parses `"1.5%"` style text into `1.5`.
pub fn parse_percentage(text: &str) -> Option<f64> {
    let text = text.trim();
    if is_absent(text) {
        return None;
    }
    text.strip_suffix('%')
        .unwrap_or(text)
        .trim()
        .parse()
        .ok()
        .filter(|v: &f64| v.is_finite())
}

pub fn parse_decimal(text: &str) -> Option<f64> {
    let text = text.trim();
    if is_absent(text) {
        return None;
    }
    text.parse().ok().filter(|v: &f64| v.is_finite())
}

/// Parses either `dd/mm/yy[yy]` or a `MonYY` token (`"Mar21"` is the first of March 2021).
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let text = text.trim();
    if is_absent(text) {
        return None;
    }

    if text.contains('/') {
        return parse_slash_date(text);
    }

    if text.len() == 5 && text.is_ascii() {
        let (month, year) = text.split_at(3);
        let month = MONTHS.iter().position(|m| *m == month)? as u32 + 1;
        return NaiveDate::from_ymd_opt(window_year(year)?, month, 1);
    }

    None
}

fn parse_slash_date(text: &str) -> Option<NaiveDate> {
    let parts: Vec<&str> = text.split('/').map(str::trim).collect();
    let [day, month, year] = parts.as_slice() else {
        return None;
    };

    let year = match year.len() {
        2 => window_year(year)?,
        4 => year.parse().ok()?,
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month.parse().ok()?, day.parse().ok()?)
}

/// Two digit years 00-50 belong to the 2000s, 51-99 to the 1900s.
fn window_year(text: &str) -> Option<i32> {
    if text.len() != 2 || !text.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let year: i32 = text.parse().ok()?;
    Some(if year <= 50 { 2000 + year } else { 1900 + year })
}
