//! Price-shaped numeral patterns, parsing, and display formatting.

use std::sync::LazyLock;

use regex::Regex;

/// One leading digit, an optional thousands separator, three digits and
/// one or two decimals. Matches `2345.67` and `2,345.67`.
pub static LOOSE_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d,?\d{3}\.\d{1,2})").expect("valid loose price regex"));

/// Same shape with a mandatory thousands separator. Used on free page text
/// where bare four-digit runs (years, ids) would be false positives.
pub static GROUPED_PRICE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d,\d{3}\.\d{1,2})").expect("valid grouped price regex"));

/// A `"price"` key followed by a price-shaped value, quoted or not.
pub static SCRIPT_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""price["']?\s*:\s*["']?(\d,?\d{3}\.\d{1,2})"#)
        .expect("valid script price regex")
});

/// Values of `pattern`'s first capture that stand on their own.
///
/// A capture touching another digit, or a thousands separator that continues
/// the number, is the tail or head of a larger figure and is skipped:
/// `12,345.67` never yields `2,345.67`. A comma followed by a space is
/// punctuation, not part of the number.
pub fn standalone_prices<'h>(
    pattern: &'h Regex,
    haystack: &'h str,
) -> impl Iterator<Item = f64> + 'h {
    pattern.captures_iter(haystack).filter_map(move |cap| {
        let m = cap.get(1)?;
        let before = haystack[..m.start()].chars().next_back();
        let mut after = haystack[m.end()..].chars();
        let joined_before = before.is_some_and(|c| c.is_ascii_digit() || c == ',');
        let joined_after = match after.next() {
            Some(c) if c.is_ascii_digit() => true,
            Some(',') => after.next().is_some_and(|c| c.is_ascii_digit()),
            _ => false,
        };
        if joined_before || joined_after {
            return None;
        }
        parse_price(m.as_str())
    })
}

/// Parses a numeral after stripping thousands separators.
///
/// Returns `None` for empty, unparseable, or non-finite input. Never zero
/// as a stand-in for garbage.
pub fn parse_price(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Rounds to two decimal places.
pub fn round_cents(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Formats with a thousands separator and exactly two decimals: `2,345.67`.
pub fn format_price(value: f64) -> String {
    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && fixed != "0.00" { "-" } else { "" };
    format!("{}{}.{}", sign, grouped, frac_part)
}

/// Formats an absolute change with an explicit sign: `+12.30`, `-5.10`.
pub fn format_change(value: f64) -> String {
    if value < 0.0 && round_cents(value) != 0.0 {
        format_price(value)
    } else {
        format!("+{}", format_price(value.abs()))
    }
}

/// Formats a percentage change with an explicit sign: `+0.52%`.
pub fn format_percent(value: f64) -> String {
    format!("{}%", format_change(value))
}
