//! Number rendering helpers shared by the table and JSON presenters.

/// Format `value` with `,` thousands separators and `decimals` fractional
/// digits.
///
/// # Examples
///
/// ```
/// use subscription_core::formatting::format_number;
///
/// assert_eq!(format_number(1234.5, 1), "1,234.5");
/// assert_eq!(format_number(1234567.0, 0), "1,234,567");
/// assert_eq!(format_number(0.0, 2), "0.00");
/// assert_eq!(format_number(-9876.5, 1), "-9,876.5");
/// ```
pub fn format_number(value: f64, decimals: usize) -> String {
    let rendered = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match rendered.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (rendered.as_str(), None),
    };

    let mut out = String::with_capacity(rendered.len() + rendered.len() / 3 + 1);
    // "-0" is not a useful rendering of a tiny negative amount.
    if value < 0.0 && rendered.bytes().any(|b| (b'1'..=b'9').contains(&b)) {
        out.push('-');
    }
    out.push_str(&group_thousands(int_part));
    if let Some(frac) = frac_part {
        out.push('.');
        out.push_str(frac);
    }
    out
}

/// Format an amount in Indian rupees, rounded to whole units as on the KPI
/// cards.
///
/// ```
/// use subscription_core::formatting::format_inr;
///
/// assert_eq!(format_inr(123456.4), "₹123,456");
/// assert_eq!(format_inr(0.0), "₹0");
/// ```
pub fn format_inr(amount: f64) -> String {
    format!("₹{}", format_number(amount, 0))
}

/// Render an optional amount, using `"n/a"` for an undefined value such as
/// the mean of an empty selection.
///
/// ```
/// use subscription_core::formatting::format_optional;
///
/// assert_eq!(format_optional(Some(1500.0), 0), "1,500");
/// assert_eq!(format_optional(None, 0), "n/a");
/// ```
pub fn format_optional(value: Option<f64>, decimals: usize) -> String {
    match value {
        Some(v) if v.is_finite() => format_number(v, decimals),
        _ => "n/a".to_string(),
    }
}

/// `(part / whole) * 100`, rounded to `decimal_places`. Zero when `whole` is
/// zero.
pub fn percentage(part: f64, whole: f64, decimal_places: i32) -> f64 {
    if whole == 0.0 {
        return 0.0;
    }
    let factor = 10_f64.powi(decimal_places);
    ((part / whole) * 100.0 * factor).round() / factor
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ── Tests ──────────────────────────────────────────────────────────────────────
