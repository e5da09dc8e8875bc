//! Plain text helpers shared by recipes and items.

use chrono::NaiveDate;
use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").unwrap();
    // 5. 3. 2024, 05.03.2024, 5.3.2024 ob 10:00
    static ref SL_DATE: Regex = Regex::new(r"(\d{1,2})\.\s*(\d{1,2})\.\s*(\d{4})").unwrap();
    static ref ISO_DATE: Regex = Regex::new(r"(\d{4})-(\d{2})-(\d{2})").unwrap();
}

/// Collapses whitespace runs, non-breaking spaces included, into single spaces.
pub fn clean_text(text: &str) -> String {
    WHITESPACE.replace_all(text.trim(), " ").into_owned()
}

/// First `max_chars` characters of `text`, followed by `...` when cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", text[..idx].trim_end()),
        None => text.to_string(),
    }
}

/// Normalizes a site date to `YYYY-MM-DD`, or keeps the cleaned raw text when
/// it isn't recognized.
pub fn normalize_date(raw: &str) -> Option<String> {
    let raw = clean_text(raw);
    if raw.is_empty() {
        return None;
    }

    let parsed = if let Some(caps) = ISO_DATE.captures(&raw) {
        ymd(&caps[1], &caps[2], &caps[3])
    } else if let Some(caps) = SL_DATE.captures(&raw) {
        ymd(&caps[3], &caps[2], &caps[1])
    } else {
        None
    };

    Some(match parsed {
        Some(date) => date.format("%Y-%m-%d").to_string(),
        None => raw,
    })
}

fn ymd(y: &str, m: &str, d: &str) -> Option<NaiveDate> {
    NaiveDate::from_ymd_opt(y.parse().ok()?, m.parse().ok()?, d.parse().ok()?)
}
