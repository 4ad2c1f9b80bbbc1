//! Drawing surfaces the compositor renders into.
//!
//! [`Canvas`] is the seam between caption layout and pixels. The concrete
//! [`DrawingSurface`] is an RGBA buffer at the source's native resolution;
//! the preview reads it for display and the export capture samples it.

use std::path::Path;

use image::{imageops, GrayImage, Pixel, Rgba, RgbaImage};
use imageproc::contrast::{threshold, ThresholdType};
use imageproc::distance_transform::Norm;
use imageproc::drawing::{draw_filled_rect_mut, Blend};
use imageproc::morphology;
use imageproc::rect::Rect;
use rusttype::{point, Font, Scale};

use subburn_common::error::{SubburnError, SubburnResult};

use crate::color::with_opacity;

/// Largest rasterized font, relative to the surface's longer side.
const MAX_FONT_RATIO: f64 = 1.0;

const MAX_DILATE_RADIUS: f64 = 254.0;

/// Synthesized bold grows glyphs by this fraction of the font size.
const BOLD_DILATE_RATIO: f64 = 0.02;

/// Axis-aligned rectangle in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RectF {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

/// Font request for measuring or drawing a run of text.
#[derive(Debug, Clone, PartialEq)]
pub struct FontSpec {
    pub family: String,
    pub weight: String,
    /// Pixel size after scaling.
    pub size_px: f64,
}

impl FontSpec {
    /// CSS-style weight check: `bold`, `bolder`, or a numeric weight of 600
    /// and above.
    pub fn is_bold(&self) -> bool {
        let weight = self.weight.trim();
        weight.eq_ignore_ascii_case("bold")
            || weight.eq_ignore_ascii_case("bolder")
            || weight.parse::<u32>().map(|w| w >= 600).unwrap_or(false)
    }
}

/// How a text run is painted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextPaint {
    Fill {
        color: Rgba<u8>,
        opacity: f64,
    },
    /// Outline of `width` pixels centered on the glyph edges.
    Stroke {
        color: Rgba<u8>,
        opacity: f64,
        width: f64,
    },
}

/// 2D drawing context.
///
/// Text is positioned by the center of its line box, matching centered
/// alignment with a middle baseline.
pub trait Canvas {
    fn size(&self) -> (u32, u32);

    /// Resize the backing store. Contents are cleared.
    fn resize(&mut self, width: u32, height: u32);

    /// Clear to transparent black.
    fn clear(&mut self);

    /// Copy a decoded frame, scaling it to the surface size when needed.
    fn draw_frame(&mut self, frame: &RgbaImage);

    /// Advance width of `text`, or `None` when metrics are unavailable.
    fn measure_text(&self, text: &str, font: &FontSpec) -> Option<f64>;

    fn fill_rect(&mut self, rect: RectF, color: Rgba<u8>, opacity: f64);

    fn draw_text(&mut self, text: &str, center_x: f64, center_y: f64, font: &FontSpec, paint: TextPaint);
}

/// RGBA pixel buffer with an optional font for text rasterization.
///
/// Without a font, text measures as unavailable and text draws are no-ops;
/// frames and rectangles still render.
#[derive(Clone)]
pub struct DrawingSurface {
    image: RgbaImage,
    font: Option<Font<'static>>,
}

impl std::fmt::Debug for DrawingSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DrawingSurface")
            .field("width", &self.image.width())
            .field("height", &self.image.height())
            .field("has_font", &self.font.is_some())
            .finish()
    }
}

impl DrawingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            image: RgbaImage::new(width, height),
            font: None,
        }
    }

    pub fn with_font(mut self, font: Font<'static>) -> Self {
        self.font = Some(font);
        self
    }

    /// Load a TrueType/OpenType font from disk.
    pub fn load_font(path: &Path) -> SubburnResult<Font<'static>> {
        if !path.exists() {
            return Err(SubburnError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let bytes = std::fs::read(path)?;
        Font::try_from_vec(bytes).ok_or_else(|| {
            SubburnError::render(format!("Unsupported font file: {}", path.display()))
        })
    }

    pub fn has_font(&self) -> bool {
        self.font.is_some()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Write the current contents as PNG.
    pub fn save_png(&self, path: &Path) -> SubburnResult<()> {
        self.image
            .save_with_format(path, image::ImageFormat::Png)
            .map_err(|e| SubburnError::render(format!("Failed to write {}: {e}", path.display())))
    }

    /// Pixel size to rasterize `font` at, capped relative to the surface.
    fn font_px(&self, font: &FontSpec) -> Option<f32> {
        if !(font.size_px.is_finite() && font.size_px > 0.0) {
            return None;
        }
        let (w, h) = self.image.dimensions();
        let limit = (w.max(h) as f64 * MAX_FONT_RATIO).max(1.0);
        Some(font.size_px.min(limit) as f32)
    }

    /// Rasterize `text` into a mask padded by `stroke_radius`, with bold
    /// synthesized when the weight asks for it. Only the part that can
    /// reach the surface is kept.
    fn coverage(
        &self,
        text: &str,
        font: &FontSpec,
        center_x: f64,
        center_y: f64,
        stroke_radius: u8,
    ) -> Option<GlyphMask> {
        let face = self.font.as_ref()?;
        let size = self.font_px(font)?;
        let scale = Scale::uniform(size);
        let v_metrics = face.v_metrics(scale);
        let width = advance_width(face, text, scale);
        let bold_radius = if font.is_bold() {
            dilate_radius(size as f64 * BOLD_DILATE_RATIO)
        } else {
            0
        };

        let left = center_x as f32 - width / 2.0;
        let top = center_y as f32 - (v_metrics.ascent - v_metrics.descent) / 2.0;
        let glyphs: Vec<_> = face
            .layout(text, scale, point(left, top + v_metrics.ascent))
            .filter_map(|g| g.pixel_bounding_box().map(|bb| (g, bb)))
            .collect();

        let pad = i64::from(bold_radius) + i64::from(stroke_radius);
        let (surface_w, surface_h) = (
            i64::from(self.image.width()),
            i64::from(self.image.height()),
        );
        let x0 = (glyphs.iter().map(|(_, bb)| bb.min.x).min()? as i64 - pad).max(-pad);
        let y0 = (glyphs.iter().map(|(_, bb)| bb.min.y).min()? as i64 - pad).max(-pad);
        let x1 = (glyphs.iter().map(|(_, bb)| bb.max.x).max()? as i64 + pad).min(surface_w + pad);
        let y1 = (glyphs.iter().map(|(_, bb)| bb.max.y).max()? as i64 + pad).min(surface_h + pad);
        if x1 <= x0 || y1 <= y0 {
            return None;
        }

        let mut mask = GlyphMask::new(
            x0,
            y0,
            u32::try_from(x1 - x0).ok()?,
            u32::try_from(y1 - y0).ok()?,
        );
        for (glyph, bb) in &glyphs {
            let (gx0, gy0) = (i64::from(bb.min.x), i64::from(bb.min.y));
            if i64::from(bb.max.x) <= x0 || gx0 >= x1 || i64::from(bb.max.y) <= y0 || gy0 >= y1 {
                continue;
            }
            glyph.draw(|gx, gy, v| {
                mask.add(gx0 + i64::from(gx), gy0 + i64::from(gy), v);
            });
        }

        mask.dilate(bold_radius);
        Some(mask)
    }

    fn blend_mask(&mut self, mask: &GlyphMask, color: Rgba<u8>) {
        let (width, height) = (
            i64::from(self.image.width()),
            i64::from(self.image.height()),
        );
        for (mx, my, cov) in mask.coverage.enumerate_pixels() {
            let (x, y) = (mask.x0 + i64::from(mx), mask.y0 + i64::from(my));
            if cov.0[0] == 0 || x < 0 || y < 0 || x >= width || y >= height {
                continue;
            }
            let mut src = color;
            src.0[3] = (u16::from(color.0[3]) * u16::from(cov.0[0]) / 255) as u8;
            self.image.get_pixel_mut(x as u32, y as u32).blend(&src);
        }
    }
}

fn advance_width(face: &Font<'_>, text: &str, scale: Scale) -> f32 {
    face.layout(text, scale, point(0.0, 0.0))
        .last()
        .map(|g| g.position().x + g.unpositioned().h_metrics().advance_width)
        .unwrap_or(0.0)
}

/// Whole-pixel dilation radius. The distance transform saturates at 255,
/// so radii stay below that.
fn dilate_radius(radius: f64) -> u8 {
    if !(radius.is_finite() && radius >= 0.5) {
        return 0;
    }
    radius.round().min(MAX_DILATE_RADIUS) as u8
}

impl Canvas for DrawingSurface {
    fn size(&self) -> (u32, u32) {
        self.image.dimensions()
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::new(width, height);
    }

    fn clear(&mut self) {
        for pixel in self.image.pixels_mut() {
            *pixel = Rgba([0, 0, 0, 0]);
        }
    }

    fn draw_frame(&mut self, frame: &RgbaImage) {
        if frame.dimensions() == self.image.dimensions() {
            self.image.copy_from_slice(frame.as_raw());
        } else {
            let (w, h) = self.image.dimensions();
            self.image = imageops::resize(frame, w, h, imageops::FilterType::Triangle);
        }
    }

    fn measure_text(&self, text: &str, font: &FontSpec) -> Option<f64> {
        let face = self.font.as_ref()?;
        let scale = Scale::uniform(self.font_px(font)?);
        Some(advance_width(face, text, scale) as f64)
    }

    fn fill_rect(&mut self, rect: RectF, color: Rgba<u8>, opacity: f64) {
        if ![rect.x, rect.y, rect.width, rect.height].iter().all(|v| v.is_finite()) {
            return;
        }
        let (width, height) = self.image.dimensions();
        let x0 = rect.x.round().max(0.0);
        let y0 = rect.y.round().max(0.0);
        let x1 = (rect.x + rect.width).round().min(width as f64);
        let y1 = (rect.y + rect.height).round().min(height as f64);
        if !(x1 - x0 >= 1.0 && y1 - y0 >= 1.0) {
            return;
        }
        let area = Rect::at(x0 as i32, y0 as i32).of_size((x1 - x0) as u32, (y1 - y0) as u32);
        let mut blend = Blend(std::mem::replace(&mut self.image, RgbaImage::new(0, 0)));
        draw_filled_rect_mut(&mut blend, area, with_opacity(color, opacity));
        self.image = blend.0;
    }

    fn draw_text(&mut self, text: &str, center_x: f64, center_y: f64, font: &FontSpec, paint: TextPaint) {
        let (color, opacity, stroke_radius) = match paint {
            TextPaint::Fill { color, opacity } => (color, opacity, 0),
            TextPaint::Stroke {
                color,
                opacity,
                width,
            } => {
                if !(width > 0.0) {
                    return;
                }
                (color, opacity, dilate_radius(width / 2.0))
            }
        };
        let Some(mut mask) = self.coverage(text, font, center_x, center_y, stroke_radius) else {
            return;
        };
        mask.dilate(stroke_radius);
        self.blend_mask(&mask, with_opacity(color, opacity));
    }
}

/// Glyph coverage over a window of the surface, origin at `(x0, y0)`.
#[derive(Debug, Clone)]
struct GlyphMask {
    x0: i64,
    y0: i64,
    coverage: GrayImage,
}

impl GlyphMask {
    fn new(x0: i64, y0: i64, width: u32, height: u32) -> Self {
        Self {
            x0,
            y0,
            coverage: GrayImage::new(width, height),
        }
    }

    fn add(&mut self, x: i64, y: i64, v: f32) {
        let (mx, my) = (x - self.x0, y - self.y0);
        let (width, height) = self.coverage.dimensions();
        if mx < 0 || my < 0 || mx >= i64::from(width) || my >= i64::from(height) {
            return;
        }
        let value = (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        let pixel = self.coverage.get_pixel_mut(mx as u32, my as u32);
        pixel.0[0] = pixel.0[0].max(value);
    }

    /// Grow the half-covered glyph body by a disc of `radius` pixels,
    /// keeping the anti-aliased edge where it extends further.
    fn dilate(&mut self, radius: u8) {
        if radius == 0 {
            return;
        }
        let body = threshold(&self.coverage, 127, ThresholdType::Binary);
        if body.pixels().all(|p| p.0[0] == 0) {
            return;
        }
        let grown = morphology::dilate(&body, Norm::L2, radius);
        for (pixel, solid) in self.coverage.pixels_mut().zip(grown.pixels()) {
            pixel.0[0] = pixel.0[0].max(solid.0[0]);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn font(size: f64) -> FontSpec {
        FontSpec {
            family: "Inter".to_string(),
            weight: "bold".to_string(),
            size_px: size,
        }
    }

    #[test]
    fn test_resize_and_clear() {
        let mut surface = DrawingSurface::new(4, 4);
        surface.fill_rect(
            RectF { x: 0.0, y: 0.0, width: 4.0, height: 4.0 },
            Rgba([255, 0, 0, 255]),
            1.0,
        );
        assert_eq!(surface.image().get_pixel(1, 1), &Rgba([255, 0, 0, 255]));

        surface.clear();
        assert_eq!(surface.image().get_pixel(1, 1), &Rgba([0, 0, 0, 0]));

        surface.resize(8, 2);
        assert_eq!(surface.size(), (8, 2));
    }

    #[test]
    fn test_fill_rect_blends_at_opacity() {
        let mut surface = DrawingSurface::new(10, 10);
        surface.draw_frame(&RgbaImage::from_pixel(10, 10, Rgba([255, 255, 255, 255])));
        surface.fill_rect(
            RectF { x: 2.0, y: 2.0, width: 4.0, height: 4.0 },
            Rgba([0, 0, 0, 255]),
            0.5,
        );

        let inside = surface.image().get_pixel(3, 3);
        assert!(inside.0[0] > 100 && inside.0[0] < 155, "got {inside:?}");
        assert_eq!(surface.image().get_pixel(8, 8), &Rgba([255, 255, 255, 255]));
    }

    #[test]
    fn test_fill_rect_outside_is_ignored() {
        let mut surface = DrawingSurface::new(4, 4);
        surface.fill_rect(
            RectF { x: 100.0, y: 100.0, width: 4.0, height: 4.0 },
            Rgba([255, 0, 0, 255]),
            1.0,
        );
        surface.fill_rect(
            RectF { x: 0.0, y: 0.0, width: 0.0, height: 4.0 },
            Rgba([255, 0, 0, 255]),
            1.0,
        );
        assert!(surface.image().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn test_fill_rect_clips_oversized() {
        let mut surface = DrawingSurface::new(4, 4);
        surface.fill_rect(
            RectF { x: -3e9, y: 2.0, width: 9e9, height: 5e9 },
            Rgba([255, 0, 0, 255]),
            1.0,
        );
        assert_eq!(surface.image().get_pixel(0, 1), &Rgba([0, 0, 0, 0]));
        assert_eq!(surface.image().get_pixel(3, 3), &Rgba([255, 0, 0, 255]));

        surface.fill_rect(
            RectF { x: f64::NAN, y: 0.0, width: 4.0, height: 4.0 },
            Rgba([0, 255, 0, 255]),
            1.0,
        );
        assert_eq!(surface.image().get_pixel(0, 0), &Rgba([0, 0, 0, 0]));
    }

    #[test]
    fn test_draw_frame_scales_mismatched_sizes() {
        let mut surface = DrawingSurface::new(8, 6);
        surface.draw_frame(&RgbaImage::from_pixel(4, 3, Rgba([10, 20, 30, 255])));
        assert_eq!(surface.size(), (8, 6));
        let corner = surface.image().get_pixel(7, 5);
        assert!(corner.0[0].abs_diff(10) <= 1 && corner.0[2].abs_diff(30) <= 1);
        assert_eq!(corner.0[3], 255);
    }

    #[test]
    fn test_text_without_font_is_unavailable() {
        let mut surface = DrawingSurface::new(32, 32);
        assert!(!surface.has_font());
        assert_eq!(surface.measure_text("hello", &font(20.0)), None);

        surface.draw_text(
            "hello",
            16.0,
            16.0,
            &font(20.0),
            TextPaint::Fill { color: Rgba([255, 255, 255, 255]), opacity: 1.0 },
        );
        assert!(surface.image().pixels().all(|p| p.0 == [0, 0, 0, 0]));
    }

    #[test]
    fn test_load_font_missing_file() {
        let missing = std::env::temp_dir().join("subburn_no_such_font.ttf");
        assert!(matches!(
            DrawingSurface::load_font(&missing),
            Err(SubburnError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_font_weight() {
        assert!(font(10.0).is_bold());
        assert!(FontSpec { weight: "700".into(), ..font(10.0) }.is_bold());
        assert!(!FontSpec { weight: "normal".into(), ..font(10.0) }.is_bold());
    }

    #[test]
    fn test_mask_dilate_grows_by_radius() {
        let mut mask = GlyphMask::new(4, 4, 3, 3);
        mask.add(5, 5, 1.0);
        mask.dilate(1);
        assert_eq!(mask.coverage.get_pixel(1, 0).0[0], 255);
        assert_eq!(mask.coverage.get_pixel(2, 1).0[0], 255);
        assert_eq!(mask.coverage.get_pixel(0, 0).0[0], 0);
    }

    #[test]
    fn test_mask_dilate_keeps_faint_coverage() {
        let mut mask = GlyphMask::new(0, 0, 3, 3);
        mask.add(1, 1, 0.3);
        mask.dilate(2);
        assert_eq!(mask.coverage.get_pixel(1, 1).0[0], 77);
        assert_eq!(mask.coverage.get_pixel(0, 1).0[0], 0);
    }

    #[test]
    fn test_dilate_radius_bounds() {
        assert_eq!(dilate_radius(0.2), 0);
        assert_eq!(dilate_radius(f64::NAN), 0);
        assert_eq!(dilate_radius(f64::INFINITY), 0);
        assert_eq!(dilate_radius(2.6), 3);
        assert_eq!(dilate_radius(1e9), 254);
    }

    fn fixture_font() -> Font<'static> {
        let path = std::path::PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("..")
            .join("..")
            .join("fixtures")
            .join("fonts")
            .join("DejaVuSans.ttf");
        DrawingSurface::load_font(&path).expect("fixture font should load")
    }

    fn regular(size: f64) -> FontSpec {
        FontSpec {
            weight: "normal".to_string(),
            ..font(size)
        }
    }

    fn white_fill() -> TextPaint {
        TextPaint::Fill {
            color: Rgba([255, 255, 255, 255]),
            opacity: 1.0,
        }
    }

    fn lit(surface: &DrawingSurface) -> Vec<(u32, u32)> {
        surface
            .image()
            .enumerate_pixels()
            .filter(|(_, _, p)| p.0[3] > 0)
            .map(|(x, y, _)| (x, y))
            .collect()
    }

    #[test]
    fn test_text_lands_inside_line_box() {
        let face = fixture_font();
        let mut surface = DrawingSurface::new(240, 80).with_font(face.clone());
        let spec = regular(32.0);
        let width = surface.measure_text("Hello", &spec).unwrap();
        assert!(width > 40.0 && width < 200.0, "width {width}");

        surface.draw_text("Hello", 120.0, 40.0, &spec, white_fill());
        let pixels = lit(&surface);
        assert!(pixels.len() > 50, "only {} pixels drawn", pixels.len());

        let v = face.v_metrics(Scale::uniform(32.0));
        let half_line = ((v.ascent - v.descent) / 2.0) as f64;
        for (x, y) in pixels {
            let (x, y) = (x as f64, y as f64);
            assert!((x - 120.0).abs() <= width / 2.0 + 1.0, "x {x} outside line box");
            assert!((y - 40.0).abs() <= half_line + 1.0, "y {y} outside line box");
        }
    }

    #[test]
    fn test_stroke_covers_more_than_fill() {
        let face = fixture_font();
        let spec = regular(32.0);
        let mut filled = DrawingSurface::new(240, 80).with_font(face.clone());
        filled.draw_text("Hello", 120.0, 40.0, &spec, white_fill());
        let mut stroked = DrawingSurface::new(240, 80).with_font(face);
        stroked.draw_text(
            "Hello",
            120.0,
            40.0,
            &spec,
            TextPaint::Stroke {
                color: Rgba([0, 0, 0, 255]),
                opacity: 1.0,
                width: 6.0,
            },
        );

        let fill = lit(&filled);
        let stroke = lit(&stroked);
        assert!(stroke.len() > fill.len(), "{} vs {}", stroke.len(), fill.len());
        assert!(fill.iter().all(|p| stroke.contains(p)));
    }

    #[test]
    fn test_bold_is_heavier() {
        let face = fixture_font();
        let mut normal = DrawingSurface::new(400, 160).with_font(face.clone());
        normal.draw_text("Hello", 200.0, 80.0, &regular(100.0), white_fill());
        let mut bold = DrawingSurface::new(400, 160).with_font(face);
        bold.draw_text("Hello", 200.0, 80.0, &font(100.0), white_fill());
        assert!(lit(&bold).len() > lit(&normal).len());
    }

    #[test]
    fn test_huge_stroke_is_clamped() {
        let mut surface = DrawingSurface::new(320, 180).with_font(fixture_font());
        surface.draw_text(
            "Hi",
            160.0,
            90.0,
            &regular(24.0),
            TextPaint::Stroke {
                color: Rgba([0, 0, 0, 255]),
                opacity: 1.0,
                width: 1e9,
            },
        );
        // Every pixel is within the capped radius of the glyphs.
        assert!(surface.image().pixels().all(|p| p.0[3] == 255));
    }

    #[test]
    fn test_huge_font_is_clamped() {
        let surface = DrawingSurface::new(100, 50).with_font(fixture_font());
        let capped = surface.measure_text("W", &regular(100.0)).unwrap();
        assert_eq!(surface.measure_text("W", &regular(1e12)), Some(capped));

        let mut surface = surface;
        surface.draw_text("W", 50.0, 25.0, &font(1e12), white_fill());
        assert!(!lit(&surface).is_empty());
    }

    #[test]
    fn test_text_off_surface_draws_nothing() {
        let mut surface = DrawingSurface::new(64, 64).with_font(fixture_font());
        surface.draw_text("far", 5000.0, -5000.0, &regular(20.0), white_fill());
        assert!(lit(&surface).is_empty());
    }
}
