//! Caption styling: the global style, per-caption overrides, and the merge
//! that produces the effective style used for drawing.

use serde::{Deserialize, Serialize};

use crate::caption::Caption;

/// Per-frame animation declared on a style.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum AnimationType {
    #[default]
    None,
    FadeIn,
    SlideUp,
    ScaleUp,
    KaraokeHighlight,
}

/// Largest font size accepted, in reference-frame pixels.
pub const MAX_FONT_SIZE: f64 = 400.0;

/// Largest text outline accepted, in reference-frame pixels.
pub const MAX_BORDER_WIDTH: f64 = 64.0;

/// Global caption style.
///
/// Colors are CSS hex strings. Sizes and widths are expressed for a 720p
/// reference frame and scaled by the compositor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleConfig {
    pub font_family: String,
    pub font_size: f64,
    pub text_color: String,
    pub border_color: String,
    pub border_width: f64,
    pub background_color: String,
    /// Opacity of the box behind the text, `[0.0, 1.0]`.
    pub background_opacity: f64,
    /// Horizontal anchor as a percentage of frame width, `[0, 100]`.
    pub position_x: f64,
    /// Vertical anchor as a percentage of frame height, `[0, 100]`.
    pub position_y: f64,
    pub font_weight: String,
    pub animation_type: AnimationType,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font_family: "Inter".to_string(),
            font_size: 40.0,
            text_color: "#FFFFFF".to_string(),
            border_color: "#000000".to_string(),
            border_width: 2.0,
            background_color: "#000000".to_string(),
            background_opacity: 0.5,
            position_x: 50.0,
            position_y: 85.0,
            font_weight: "bold".to_string(),
            animation_type: AnimationType::None,
        }
    }
}

impl StyleConfig {
    /// Describe out-of-range values. Empty when the style is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = vec![];
        if !(self.font_size > 0.0 && self.font_size <= MAX_FONT_SIZE) {
            issues.push(format!(
                "font size must be within (0, {MAX_FONT_SIZE}], got {}",
                self.font_size
            ));
        }
        if !(0.0..=MAX_BORDER_WIDTH).contains(&self.border_width) {
            issues.push(format!(
                "border width must be within [0, {MAX_BORDER_WIDTH}], got {}",
                self.border_width
            ));
        }
        if !(0.0..=1.0).contains(&self.background_opacity) {
            issues.push(format!(
                "background opacity must be within [0, 1], got {}",
                self.background_opacity
            ));
        }
        for (label, value) in [("position x", self.position_x), ("position y", self.position_y)] {
            if !(0.0..=100.0).contains(&value) {
                issues.push(format!("{label} must be within [0, 100], got {value}"));
            }
        }
        issues
    }
}

/// A partial style attached to a single caption. Absent fields fall back to
/// the global style.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StyleOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub border_width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_opacity: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position_y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_weight: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub animation_type: Option<AnimationType>,
}

impl StyleOverride {
    /// Whether no field is overridden.
    pub fn is_empty(&self) -> bool {
        *self == StyleOverride::default()
    }

    /// Field-wise merge: every field set here wins over `global`.
    pub fn merge_onto(&self, global: &StyleConfig) -> StyleConfig {
        StyleConfig {
            font_family: self
                .font_family
                .clone()
                .unwrap_or_else(|| global.font_family.clone()),
            font_size: self.font_size.unwrap_or(global.font_size),
            text_color: self
                .text_color
                .clone()
                .unwrap_or_else(|| global.text_color.clone()),
            border_color: self
                .border_color
                .clone()
                .unwrap_or_else(|| global.border_color.clone()),
            border_width: self.border_width.unwrap_or(global.border_width),
            background_color: self
                .background_color
                .clone()
                .unwrap_or_else(|| global.background_color.clone()),
            background_opacity: self.background_opacity.unwrap_or(global.background_opacity),
            position_x: self.position_x.unwrap_or(global.position_x),
            position_y: self.position_y.unwrap_or(global.position_y),
            font_weight: self
                .font_weight
                .clone()
                .unwrap_or_else(|| global.font_weight.clone()),
            animation_type: self.animation_type.unwrap_or(global.animation_type),
        }
    }
}

/// The style a caption is drawn with. Derived on demand, never stored.
pub fn effective_style(global: &StyleConfig, caption: &Caption) -> StyleConfig {
    match &caption.style_override {
        Some(style_override) => style_override.merge_onto(global),
        None => global.clone(),
    }
}

/// A copy of `caption` with its override cleared, so it follows the global
/// style entirely.
pub fn reset_override(caption: &Caption) -> Caption {
    Caption {
        style_override: None,
        ..caption.clone()
    }
}
