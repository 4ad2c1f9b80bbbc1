//! Caption compositor: draws the current video frame and at most one
//! caption overlay per tick.
//!
//! Style values are authored for a 720-pixel reference frame and scaled by
//! `min(width, height) / 720`, so a caption keeps its proportions at any
//! source resolution.

use image::{Rgba, RgbaImage};

use subburn_project_model::caption::{active_caption, Caption, CaptionId};
use subburn_project_model::style::{effective_style, AnimationType, StyleConfig};

use crate::color::{color_or, BLACK};
use crate::engine::CaptionScene;
use crate::surface::{Canvas, FontSpec, RectF, TextPaint};

/// Reference frame size style values are authored against.
pub const REFERENCE_SIZE_PX: f64 = 720.0;

/// Lines wrap once they would exceed this fraction of the frame width.
pub const WRAP_WIDTH_RATIO: f64 = 0.9;

/// Line advance as a multiple of the scaled font size.
pub const LINE_HEIGHT_RATIO: f64 = 1.3;

/// Background box padding per side, before scaling.
pub const BACKGROUND_PAD_X: f64 = 10.0;
pub const BACKGROUND_PAD_Y: f64 = 5.0;

/// Drop shadow offset before scaling, and its opacity.
pub const SHADOW_OFFSET: f64 = 2.0;
pub const SHADOW_OPACITY: f64 = 0.5;

/// Fill color used while a karaoke caption is active.
pub const KARAOKE_HIGHLIGHT: &str = "#FFD700";

const WHITE: Rgba<u8> = Rgba([255, 255, 255, 255]);

/// What a single compositor tick did.
#[derive(Debug, Clone, PartialEq)]
pub enum TickReport {
    /// Nothing was drawn; the next tick tries again.
    Skipped { reason: &'static str },
    Drawn {
        time: f64,
        /// Whether a decoded frame was available.
        frame_drawn: bool,
        caption_id: Option<CaptionId>,
        lines: usize,
    },
}

impl TickReport {
    pub fn is_skipped(&self) -> bool {
        matches!(self, TickReport::Skipped { .. })
    }

    pub fn caption_id(&self) -> Option<&CaptionId> {
        match self {
            TickReport::Drawn { caption_id, .. } => caption_id.as_ref(),
            TickReport::Skipped { .. } => None,
        }
    }
}

/// A wrapped line positioned on the frame.
#[derive(Debug, Clone, PartialEq)]
pub struct LaidOutLine {
    pub text: String,
    pub width: f64,
    pub center_x: f64,
    pub center_y: f64,
}

/// Geometry of one caption block.
#[derive(Debug, Clone, PartialEq)]
pub struct CaptionLayout {
    pub scale: f64,
    pub font: FontSpec,
    pub line_height: f64,
    pub lines: Vec<LaidOutLine>,
    /// Box behind the text; `None` when the background is fully transparent.
    pub background: Option<RectF>,
}

/// Scale factor for a frame of the given size.
pub fn frame_scale(width: u32, height: u32) -> f64 {
    width.min(height) as f64 / REFERENCE_SIZE_PX
}

/// Greedy word wrap.
///
/// Words are appended to the current line while its measured width stays
/// strictly under `max_width`. A word that alone exceeds the budget gets a
/// line of its own. Unavailable metrics count as zero width.
pub fn wrap_words<C: Canvas + ?Sized>(
    canvas: &C,
    text: &str,
    font: &FontSpec,
    max_width: f64,
) -> Vec<String> {
    let mut lines = vec![];
    let mut current = String::new();

    for word in text.split_whitespace() {
        if current.is_empty() {
            current.push_str(word);
            continue;
        }
        let candidate = format!("{current} {word}");
        if measure(canvas, &candidate, font) < max_width {
            current = candidate;
        } else {
            lines.push(std::mem::replace(&mut current, word.to_string()));
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

/// Lay out `text` with `style` on the canvas's current size.
pub fn layout_caption<C: Canvas + ?Sized>(canvas: &C, text: &str, style: &StyleConfig) -> CaptionLayout {
    let (width, height) = canvas.size();
    let (w, h) = (width as f64, height as f64);
    let scale = frame_scale(width, height);
    let font = FontSpec {
        family: style.font_family.clone(),
        weight: style.font_weight.clone(),
        size_px: style.font_size * scale,
    };
    let line_height = LINE_HEIGHT_RATIO * font.size_px;

    let wrapped = wrap_words(canvas, text, &font, WRAP_WIDTH_RATIO * w);
    let anchor_x = style.position_x / 100.0 * w;
    let anchor_y = style.position_y / 100.0 * h;
    let block_height = wrapped.len() as f64 * line_height;
    let block_top = anchor_y - block_height / 2.0;

    let lines: Vec<LaidOutLine> = wrapped
        .into_iter()
        .enumerate()
        .map(|(i, text)| LaidOutLine {
            width: measure(canvas, &text, &font),
            center_x: anchor_x,
            center_y: block_top + line_height * (i as f64 + 0.5),
            text,
        })
        .collect();

    let background = (style.background_opacity > 0.0 && !lines.is_empty()).then(|| {
        let widest = lines.iter().map(|l| l.width).fold(0.0, f64::max);
        let pad_x = BACKGROUND_PAD_X * scale;
        let pad_y = BACKGROUND_PAD_Y * scale;
        RectF {
            x: anchor_x - widest / 2.0 - pad_x,
            y: block_top - pad_y,
            width: widest + 2.0 * pad_x,
            height: block_height + 2.0 * pad_y,
        }
    });

    CaptionLayout {
        scale,
        font,
        line_height,
        lines,
        background,
    }
}

/// Draw one caption with an already-resolved style. Returns the number of
/// lines drawn.
pub fn draw_caption<C: Canvas + ?Sized>(canvas: &mut C, caption: &Caption, style: &StyleConfig) -> usize {
    let layout = layout_caption(canvas, &caption.text, style);

    if let Some(rect) = layout.background {
        canvas.fill_rect(
            rect,
            color_or(&style.background_color, BLACK),
            style.background_opacity,
        );
    }

    let fill = match style.animation_type {
        AnimationType::KaraokeHighlight => color_or(KARAOKE_HIGHLIGHT, WHITE),
        _ => color_or(&style.text_color, WHITE),
    };
    let border = color_or(&style.border_color, BLACK);
    let shadow_offset = SHADOW_OFFSET * layout.scale;
    let stroke_width = style.border_width * layout.scale;

    for line in &layout.lines {
        canvas.draw_text(
            &line.text,
            line.center_x + shadow_offset,
            line.center_y + shadow_offset,
            &layout.font,
            TextPaint::Fill {
                color: BLACK,
                opacity: SHADOW_OPACITY,
            },
        );
        if stroke_width > 0.0 {
            canvas.draw_text(
                &line.text,
                line.center_x,
                line.center_y,
                &layout.font,
                TextPaint::Stroke {
                    color: border,
                    opacity: 1.0,
                    width: stroke_width,
                },
            );
        }
        canvas.draw_text(
            &line.text,
            line.center_x,
            line.center_y,
            &layout.font,
            TextPaint::Fill {
                color: fill,
                opacity: 1.0,
            },
        );
    }

    layout.lines.len()
}

/// Composite one frame at `time`.
///
/// The canvas is resized to `native_size` when it differs, the frame is
/// copied in (or the canvas cleared when no frame is decoded yet), then the
/// active caption is drawn on top.
pub fn compose_frame<C: Canvas + ?Sized>(
    canvas: &mut C,
    time: f64,
    frame: Option<&RgbaImage>,
    native_size: (u32, u32),
    scene: &CaptionScene,
) -> TickReport {
    let (width, height) = native_size;
    if width == 0 || height == 0 {
        return TickReport::Skipped {
            reason: "video dimensions unknown",
        };
    }
    if canvas.size() != native_size {
        tracing::debug!(width, height, "Resizing drawing surface");
        canvas.resize(width, height);
    }

    match frame {
        Some(frame) => canvas.draw_frame(frame),
        None => canvas.clear(),
    }

    let active = if time.is_finite() {
        active_caption(&scene.captions, time)
    } else {
        None
    };
    let lines = match active {
        Some(caption) => {
            let style = effective_style(&scene.style, caption);
            draw_caption(canvas, caption, &style)
        }
        None => 0,
    };

    TickReport::Drawn {
        time,
        frame_drawn: frame.is_some(),
        caption_id: active.map(|c| c.id.clone()),
        lines,
    }
}

fn measure<C: Canvas + ?Sized>(canvas: &C, text: &str, font: &FontSpec) -> f64 {
    canvas
        .measure_text(text, font)
        .filter(|w| w.is_finite())
        .unwrap_or(0.0)
}
