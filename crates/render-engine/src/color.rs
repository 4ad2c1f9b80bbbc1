//! CSS hex color parsing.

use image::Rgba;

/// Opaque black.
pub const BLACK: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// Parse `#rgb`, `#rgba`, `#rrggbb` or `#rrggbbaa`. The leading `#` is
/// optional. Returns `None` for anything else.
pub fn parse_color(input: &str) -> Option<Rgba<u8>> {
    let hex = input.trim();
    let hex = hex.strip_prefix('#').unwrap_or(hex);
    if !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }

    let nibble = |i: usize| u8::from_str_radix(&hex[i..=i], 16).ok().map(|v| v * 17);
    let byte = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).ok();

    match hex.len() {
        3 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, 255])),
        4 => Some(Rgba([nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?])),
        6 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, 255])),
        8 => Some(Rgba([byte(0)?, byte(2)?, byte(4)?, byte(6)?])),
        _ => None,
    }
}

/// [`parse_color`] with a fallback for malformed input.
pub fn color_or(input: &str, fallback: Rgba<u8>) -> Rgba<u8> {
    parse_color(input).unwrap_or_else(|| {
        tracing::trace!(color = input, "Unparseable color, using fallback");
        fallback
    })
}

/// Scale a color's alpha by `opacity` (clamped to `[0, 1]`).
pub fn with_opacity(color: Rgba<u8>, opacity: f64) -> Rgba<u8> {
    let opacity = if opacity.is_finite() {
        opacity.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let Rgba([r, g, b, a]) = color;
    Rgba([r, g, b, (a as f64 * opacity).round() as u8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_short_and_long_forms() {
        assert_eq!(parse_color("#f00"), Some(Rgba([255, 0, 0, 255])));
        assert_eq!(parse_color("#FFD700"), Some(Rgba([255, 215, 0, 255])));
        assert_eq!(parse_color("00000080"), Some(Rgba([0, 0, 0, 128])));
        assert_eq!(parse_color(" #fff8 "), Some(Rgba([255, 255, 255, 136])));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert_eq!(parse_color(""), None);
        assert_eq!(parse_color("#12345"), None);
        assert_eq!(parse_color("red"), None);
        assert_eq!(parse_color("#ggg"), None);
        assert_eq!(parse_color("#ééé"), None);
    }

    #[test]
    fn test_color_or_and_opacity() {
        assert_eq!(color_or("nope", BLACK), BLACK);
        assert_eq!(with_opacity(BLACK, 0.5), Rgba([0, 0, 0, 128]));
        assert_eq!(with_opacity(BLACK, 3.0), BLACK);
        assert_eq!(with_opacity(BLACK, f64::NAN).0[3], 0);
    }
}
