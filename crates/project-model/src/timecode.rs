//! Conversion between seconds and canonical time-code text.
//!
//! The canonical form is `HH:MM:SS.mmm`: zero padded, three fractional
//! digits. The parser is deliberately forgiving and never fails; anything
//! it cannot read becomes `0.0`.

/// Text produced for values that have no valid time code.
pub const ZERO_TIME_CODE: &str = "00:00:00.000";

/// Parse a time code into seconds.
///
/// Accepts a bare number of seconds or colon-delimited `H:M:S`, `M:S`, `S`
/// with an optional fractional part on the last segment. `,` is accepted as
/// the decimal separator. Malformed input yields `0.0`.
pub fn parse_time(input: &str) -> f64 {
    try_parse_time(input).unwrap_or(0.0)
}

/// Parse a time code, returning `None` on malformed input.
pub fn try_parse_time(input: &str) -> Option<f64> {
    let normalized = input.trim().replace(',', ".");
    if normalized.is_empty() {
        return None;
    }

    let segments: Vec<&str> = normalized.split(':').collect();
    if segments.len() > 3 {
        return None;
    }

    let last = segments.len() - 1;
    let mut total = 0.0;
    for (i, segment) in segments.iter().enumerate() {
        let segment = segment.trim();
        if segment.is_empty() || !segment.chars().all(|c| c.is_ascii_digit() || c == '.') {
            return None;
        }
        // Only the seconds segment may carry a fraction.
        if i != last && segment.contains('.') {
            return None;
        }
        let value: f64 = segment.parse().ok()?;
        total = total * 60.0 + value;
    }

    total.is_finite().then_some(total)
}

/// Format seconds as `HH:MM:SS.mmm`, rounded to the nearest millisecond.
///
/// Negative and non-finite input formats as [`ZERO_TIME_CODE`].
pub fn format_time(secs: f64) -> String {
    format_with_separator(secs, '.')
}

/// Format seconds as an SRT timestamp: `HH:MM:SS,mmm`.
pub fn format_srt_time(secs: f64) -> String {
    format_with_separator(secs, ',')
}

/// Snap a value to the canonical millisecond grid.
///
/// Equivalent to `parse_time(&format_time(secs))`.
pub fn canonicalize(secs: f64) -> f64 {
    parse_time(&format_time(secs))
}

fn format_with_separator(secs: f64, separator: char) -> String {
    let total_ms = total_millis(secs).unwrap_or(0);
    let hours = total_ms / 3_600_000;
    let minutes = (total_ms % 3_600_000) / 60_000;
    let seconds = (total_ms % 60_000) / 1000;
    let millis = total_ms % 1000;
    format!("{hours:02}:{minutes:02}:{seconds:02}{separator}{millis:03}")
}

fn total_millis(secs: f64) -> Option<u64> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    Some((secs * 1000.0).round() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_full_time_code() {
        assert_eq!(parse_time("01:02:03.500"), 3723.5);
    }

    #[test]
    fn test_parse_bare_seconds() {
        assert_eq!(parse_time("90"), 90.0);
        assert_eq!(parse_time("  12.25 "), 12.25);
    }

    #[test]
    fn test_parse_minutes_seconds() {
        assert_eq!(parse_time("1:30"), 90.0);
        assert_eq!(parse_time("0:05.5"), 5.5);
    }

    #[test]
    fn test_parse_comma_decimal() {
        assert_eq!(parse_time("01,5"), 1.5);
        assert_eq!(parse_time("00:00:01,250"), 1.25);
    }

    #[test]
    fn test_parse_malformed_is_zero() {
        assert_eq!(parse_time("bad"), 0.0);
        assert_eq!(parse_time(""), 0.0);
        assert_eq!(parse_time("1:2:3:4"), 0.0);
        assert_eq!(parse_time("-5"), 0.0);
        assert_eq!(parse_time("1.5:30"), 0.0);
        assert_eq!(parse_time("inf"), 0.0);
        assert_eq!(parse_time("1::2"), 0.0);
        assert_eq!(try_parse_time("nope"), None);
    }

    #[test]
    fn test_format_canonical() {
        assert_eq!(format_time(0.0), "00:00:00.000");
        assert_eq!(format_time(3723.5), "01:02:03.500");
        assert_eq!(format_time(59.9996), "00:01:00.000");
        assert_eq!(format_time(360_000.0), "100:00:00.000");
    }

    #[test]
    fn test_format_invalid_is_zero() {
        assert_eq!(format_time(-1.0), ZERO_TIME_CODE);
        assert_eq!(format_time(f64::NAN), ZERO_TIME_CODE);
        assert_eq!(format_time(f64::INFINITY), ZERO_TIME_CODE);
    }

    #[test]
    fn test_srt_format() {
        assert_eq!(format_srt_time(3661.5), "01:01:01,500");
        assert_eq!(parse_time(&format_srt_time(3661.5)), 3661.5);
    }

    #[test]
    fn test_canonicalize_snaps_to_millis() {
        assert!((canonicalize(4.8000000001) - 4.8).abs() < 1e-9);
        assert!((canonicalize(1.23456) - 1.235).abs() < 1e-9);
        assert_eq!(canonicalize(-3.0), 0.0);
    }

    proptest! {
        #[test]
        fn prop_roundtrip_within_a_millisecond(ms in 0u64..360_000_000u64) {
            let secs = ms as f64 / 1000.0;
            let parsed = parse_time(&format_time(secs));
            prop_assert!((parsed - secs).abs() < 1e-3);
        }

        #[test]
        fn prop_format_is_injective_at_millis(a in 0u64..86_400_000u64, b in 0u64..86_400_000u64) {
            let fa = format_time(a as f64 / 1000.0);
            let fb = format_time(b as f64 / 1000.0);
            prop_assert_eq!(a == b, fa == fb);
        }

        #[test]
        fn prop_parse_never_panics(input in ".{0,24}") {
            let value = parse_time(&input);
            prop_assert!(value.is_finite());
            prop_assert!(value >= 0.0);
        }
    }
}
