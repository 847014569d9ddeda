use std::sync::OnceLock;

use chrono::{NaiveDate, NaiveDateTime};
use regex::Regex;
use tracing::debug;

// ── HeaderNormalizer ──────────────────────────────────────────────────────────

/// Canonical names of the columns every input must provide, in record order.
pub const REQUIRED_COLUMNS: [&str; 7] = [
    "Customer_ID",
    "Customer_Name",
    "Plan_Type",
    "Meal_Frequency",
    "Start_Date",
    "Duration_Days",
    "Total_Price",
];

/// Maps raw column headers onto canonical keys.
pub struct HeaderNormalizer;

impl HeaderNormalizer {
    /// Trim `header` and replace every internal whitespace run with `_`.
    ///
    /// `"  Customer  ID "` → `"Customer_ID"`.
    pub fn canonical(header: &str) -> String {
        static WHITESPACE: OnceLock<Regex> = OnceLock::new();
        let re = WHITESPACE.get_or_init(|| Regex::new(r"\s+").expect("regex is valid"));
        // Strip a UTF-8 BOM that spreadsheet exports like to prepend.
        let trimmed = header.trim_start_matches('\u{feff}').trim();
        re.replace_all(trimmed, "_").into_owned()
    }

    /// Case-insensitive comparison of a raw header against a canonical name.
    pub fn matches(header: &str, canonical: &str) -> bool {
        Self::canonical(header).eq_ignore_ascii_case(canonical)
    }
}

// ── DateProcessor ─────────────────────────────────────────────────────────────

/// Parses calendar dates from the formats spreadsheet exports commonly emit.
pub struct DateProcessor;

impl DateProcessor {
    const DATE_FORMATS: &'static [&'static str] =
        &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%m/%d/%Y", "%d-%b-%Y"];

    const DATETIME_FORMATS: &'static [&'static str] = &[
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M:%S%.f",
    ];

    /// Parse `s` into a [`NaiveDate`], discarding any time-of-day part.
    ///
    /// Returns `None` when no format matches or the date does not exist
    /// (e.g. `2024-02-30`).
    pub fn parse(s: &str) -> Option<NaiveDate> {
        let s = s.trim();
        if s.is_empty() {
            return None;
        }

        for fmt in Self::DATE_FORMATS {
            if let Ok(date) = NaiveDate::parse_from_str(s, fmt) {
                return Some(date);
            }
        }
        for fmt in Self::DATETIME_FORMATS {
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, fmt) {
                return Some(dt.date());
            }
        }

        debug!("DateProcessor: could not parse date string \"{}\"", s);
        None
    }
}

// ── NumberProcessor ───────────────────────────────────────────────────────────

/// Parses the numeric columns. Errors carry a short human-readable reason.
pub struct NumberProcessor;

impl NumberProcessor {
    /// Parse a non-negative whole number of days.
    ///
    /// Integer-valued decimals such as `"30.0"` are accepted because
    /// spreadsheet exports frequently write integers that way.
    pub fn parse_days(s: &str) -> Result<u32, String> {
        let s = s.trim();
        if let Ok(v) = s.parse::<i64>() {
            return Self::check_days(v);
        }
        let f: f64 = s.parse().map_err(|_| "not a number".to_string())?;
        if !f.is_finite() || f.fract() != 0.0 {
            return Err("not a whole number of days".to_string());
        }
        Self::check_days(f as i64)
    }

    fn check_days(v: i64) -> Result<u32, String> {
        if v < 0 {
            return Err("duration must be non-negative".to_string());
        }
        u32::try_from(v).map_err(|_| "duration out of range".to_string())
    }

    /// Parse a non-negative, finite price. `,` thousands separators are
    /// ignored.
    pub fn parse_price(s: &str) -> Result<f64, String> {
        let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
        let v: f64 = cleaned.parse().map_err(|_| "not a number".to_string())?;
        if !v.is_finite() {
            return Err("price must be finite".to_string());
        }
        if v < 0.0 {
            return Err("price must be non-negative".to_string());
        }
        Ok(v)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
