//! Locale-aware parsing of human-readable counts.
//!
//! Channel pages render counts the way a person reads them:
//! "42,6 тыс. подписчиков", "3 734 972 просмотра", "1.2M subscribers".
//! [`parse_count`] turns any of these into an integer and never fails;
//! text without a usable numeral yields 0. Only ASCII digits count as
//! numerals.

use std::sync::OnceLock;

use regex::Regex;

/// Unit markers checked in order. The first marker found in the text decides
/// the multiplier.
const UNIT_MARKERS: &[(&str, u64)] = &[
    ("тыс", 1_000),
    ("млн", 1_000_000),
    ("млрд", 1_000_000_000),
];

/// Parse a locale-formatted quantity into a non-negative integer.
///
/// Decimal fractions are scaled with integer arithmetic and truncated, so
/// `"42,6 тыс."` is exactly 42600.
pub fn parse_count(text: &str) -> u64 {
    let lower = text.to_lowercase();

    for &(marker, multiplier) in UNIT_MARKERS {
        if !lower.contains(marker) {
            continue;
        }
        if let Some(value) = first_decimal(&lower).and_then(|(w, f)| scale(w, f, multiplier)) {
            return value;
        }
    }

    if let Some(value) = compact_suffix(&lower) {
        return value;
    }

    match plain_integer(&lower) {
        Some(value) => value,
        None => {
            tracing::trace!("no numeral in {:?}, defaulting to 0", text);
            0
        }
    }
}

/// First `123` or `123,45` / `123.45` numeral, split into whole and fraction digits.
fn first_decimal(text: &str) -> Option<(&str, &str)> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"([0-9]+)(?:[.,]([0-9]+))?").unwrap());
    let cap = re.captures(text)?;
    let whole = cap.get(1)?.as_str();
    let frac = cap.get(2).map(|m| m.as_str()).unwrap_or("");
    Some((whole, frac))
}

/// English compact notation: "42.6k", "1,2 m", "3b", suffix directly after
/// the first numeral.
fn compact_suffix(text: &str) -> Option<u64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| {
        Regex::new(r"^[^0-9]*?([0-9]+)(?:[.,]([0-9]+))?\s?([kmb])(?:[^\p{L}]|$)").unwrap()
    });
    let cap = re.captures(text)?;
    let whole = cap.get(1)?.as_str();
    let frac = cap.get(2).map(|m| m.as_str()).unwrap_or("");
    let multiplier = match cap.get(3)?.as_str() {
        "k" => 1_000,
        "m" => 1_000_000,
        _ => 1_000_000_000,
    };
    scale(whole, frac, multiplier)
}

/// First run of digits with interior whitespace ("3 734 972") or comma
/// thousands groups ("3,734,972"), separators stripped.
fn plain_integer(text: &str) -> Option<u64> {
    static RE: OnceLock<Regex> = OnceLock::new();
    let re = RE.get_or_init(|| Regex::new(r"[0-9](?:[0-9\s]|,[0-9]{3}\b)*").unwrap());
    let run = re.find(text)?.as_str();
    let digits: String = run.chars().filter(|c| c.is_ascii_digit()).collect();
    digits.parse().ok()
}

fn scale(whole: &str, frac: &str, multiplier: u64) -> Option<u64> {
    let whole: u128 = whole.parse().ok()?;
    let mut value = whole.checked_mul(u128::from(multiplier))?;
    if !frac.is_empty() {
        let frac = &frac[..frac.len().min(18)];
        let digits: u128 = frac.parse().ok()?;
        let denom = 10u128.pow(frac.len() as u32);
        value += digits * u128::from(multiplier) / denom;
    }
    u64::try_from(value).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thousands_with_comma_decimal() {
        assert_eq!(parse_count("42,6 тыс. подписчиков"), 42_600);
    }

    #[test]
    fn space_grouped_plain_number() {
        assert_eq!(parse_count("3 734 972 просмотра"), 3_734_972);
    }

    #[test]
    fn no_break_space_grouping() {
        assert_eq!(parse_count("3\u{a0}734\u{a0}972 просмотра"), 3_734_972);
        assert_eq!(parse_count("12\u{202f}500 views"), 12_500);
    }

    #[test]
    fn small_plain_number() {
        assert_eq!(parse_count("76 видео"), 76);
    }

    #[test]
    fn millions_with_comma_decimal() {
        assert_eq!(parse_count("1,2 млн подписчиков"), 1_200_000);
    }

    #[test]
    fn billions() {
        assert_eq!(parse_count("2,5 млрд просмотров"), 2_500_000_000);
    }

    #[test]
    fn integer_with_marker() {
        assert_eq!(parse_count("15 тыс. подписчиков"), 15_000);
    }

    #[test]
    fn fraction_is_truncated_not_rounded() {
        assert_eq!(parse_count("1,2345 тыс."), 1_234);
    }

    #[test]
    fn english_compact_suffixes() {
        assert_eq!(parse_count("42.6K subscribers"), 42_600);
        assert_eq!(parse_count("1.2M subscribers"), 1_200_000);
        assert_eq!(parse_count("3B views"), 3_000_000_000);
    }

    #[test]
    fn suffix_letter_inside_word_is_not_a_multiplier() {
        assert_eq!(parse_count("5 minutes ago"), 5);
        assert_eq!(parse_count("12 members"), 12);
    }

    #[test]
    fn english_comma_grouping() {
        assert_eq!(parse_count("3,734,972 views"), 3_734_972);
    }

    #[test]
    fn comma_decimal_without_marker_keeps_whole_part() {
        assert_eq!(parse_count("42,6 подписчиков"), 42);
    }

    #[test]
    fn unparseable_is_zero() {
        assert_eq!(parse_count("n/a"), 0);
        assert_eq!(parse_count(""), 0);
        assert_eq!(parse_count("тыс."), 0);
        assert_eq!(parse_count("нет видео"), 0);
    }

    #[test]
    fn leading_text_before_number() {
        assert_eq!(parse_count("Подписчиков: 512"), 512);
    }

    #[test]
    fn overflow_is_zero() {
        assert_eq!(parse_count("99999999999999999999999999 views"), 0);
    }

    #[test]
    fn non_ascii_digits_are_not_numerals() {
        assert_eq!(parse_count("1,1\u{ff11}\u{ff11}\u{ff11}\u{ff11}\u{ff11}\u{ff11} тыс."), 1_100);
        assert_eq!(parse_count("\u{ff14}\u{ff12} views"), 0);
        assert_eq!(parse_count("2.\u{0663}\u{0663}k"), 2);
    }

    #[test]
    fn long_fraction_is_capped() {
        assert_eq!(parse_count("1,99999999999999999999999 тыс."), 1_999);
    }

    #[test]
    fn deterministic() {
        for _ in 0..3 {
            assert_eq!(parse_count("42,6 тыс. подписчиков"), 42_600);
        }
    }
}
