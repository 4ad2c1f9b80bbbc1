//! Timeline geometry: zoom, pixel/time mapping, and hit testing.
//!
//! Pointer x coordinates are in timeline content space: `0` is time zero,
//! independent of any scrolling the host applies.

use subburn_project_model::caption::{latest_end, Caption, CaptionId};

/// Zoom bounds in pixels per second.
pub const MIN_ZOOM: f64 = 10.0;
pub const MAX_ZOOM: f64 = 300.0;
pub const DEFAULT_ZOOM: f64 = 50.0;

/// Zoom change per zoom-in/zoom-out step.
pub const ZOOM_STEP: f64 = 10.0;

/// Room kept after the last caption so it stays reachable even when the
/// source duration is not known yet.
pub const DURATION_PADDING_SECS: f64 = 5.0;

/// Width of the resize grip at each end of a caption block.
pub const EDGE_HANDLE_PX: f64 = 6.0;

/// Half-width of the playhead grab area on the ruler.
pub const PLAYHEAD_HANDLE_PX: f64 = 6.0;

/// Minimum pixel distance between ruler labels.
const MIN_TICK_SPACING_PX: f64 = 80.0;

/// Candidate ruler steps in seconds.
const TICK_STEPS_SECS: [f64; 11] = [0.5, 1.0, 2.0, 5.0, 10.0, 15.0, 30.0, 60.0, 120.0, 300.0, 600.0];

/// Which horizontal band of the timeline the pointer is over.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineLane {
    /// Time ruler carrying the playhead handle.
    Ruler,
    /// Caption track.
    Captions,
}

/// What a pointer-down landed on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PointerTarget {
    EmptyTrack,
    CaptionBody(CaptionId),
    CaptionLeftEdge(CaptionId),
    CaptionRightEdge(CaptionId),
    PlayheadHandle,
}

/// A labelled ruler mark.
#[derive(Debug, Clone, PartialEq)]
pub struct RulerTick {
    pub time: f64,
    pub x: f64,
    pub label: String,
}

/// Zoom state and the pixel/time mapping derived from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimelineView {
    zoom: f64,
}

impl Default for TimelineView {
    fn default() -> Self {
        Self { zoom: DEFAULT_ZOOM }
    }
}

impl TimelineView {
    pub fn new(zoom: f64) -> Self {
        let mut view = Self::default();
        view.set_zoom(zoom);
        view
    }

    /// Pixels per second.
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    /// Set the zoom, clamped to `[MIN_ZOOM, MAX_ZOOM]`. Non-finite values
    /// are ignored.
    pub fn set_zoom(&mut self, zoom: f64) {
        if zoom.is_finite() {
            self.zoom = zoom.clamp(MIN_ZOOM, MAX_ZOOM);
        }
    }

    pub fn zoom_in(&mut self) {
        self.set_zoom(self.zoom + ZOOM_STEP);
    }

    pub fn zoom_out(&mut self) {
        self.set_zoom(self.zoom - ZOOM_STEP);
    }

    pub fn px_to_time(&self, px: f64) -> f64 {
        px / self.zoom
    }

    pub fn time_to_px(&self, time: f64) -> f64 {
        time * self.zoom
    }

    /// Total track width for the given editing duration.
    pub fn track_width_px(&self, effective_duration: f64) -> f64 {
        self.time_to_px(effective_duration.max(0.0))
    }

    /// Map a pointer x to a seek time inside `[0, effective_duration]`.
    pub fn seek_time(&self, x: f64, effective_duration: f64) -> f64 {
        let time = self.px_to_time(x);
        if !time.is_finite() {
            return 0.0;
        }
        time.clamp(0.0, effective_duration.max(0.0))
    }

    /// Resolve what a pointer at `x` in `lane` is over.
    ///
    /// Captions later in the list are drawn on top, so they win when blocks
    /// overlap. The resize grips shrink on very narrow blocks so the body
    /// stays grabbable.
    pub fn hit_test(
        &self,
        x: f64,
        lane: TimelineLane,
        playhead: f64,
        captions: &[Caption],
    ) -> PointerTarget {
        match lane {
            TimelineLane::Ruler => {
                if (x - self.time_to_px(playhead)).abs() <= PLAYHEAD_HANDLE_PX {
                    PointerTarget::PlayheadHandle
                } else {
                    PointerTarget::EmptyTrack
                }
            }
            TimelineLane::Captions => {
                for caption in captions.iter().rev() {
                    let left = self.time_to_px(caption.start);
                    let right = self.time_to_px(caption.end);
                    if !(x >= left && x <= right) {
                        continue;
                    }
                    let grip = EDGE_HANDLE_PX.min((right - left) / 3.0);
                    return if x - left <= grip {
                        PointerTarget::CaptionLeftEdge(caption.id.clone())
                    } else if right - x <= grip {
                        PointerTarget::CaptionRightEdge(caption.id.clone())
                    } else {
                        PointerTarget::CaptionBody(caption.id.clone())
                    };
                }
                PointerTarget::EmptyTrack
            }
        }
    }

    /// Ruler labels across `width_px`, spaced at least
    /// `MIN_TICK_SPACING_PX` apart.
    pub fn ruler_ticks(&self, width_px: f64) -> Vec<RulerTick> {
        if !(width_px.is_finite() && width_px > 0.0) {
            return vec![];
        }
        let step = TICK_STEPS_SECS
            .iter()
            .copied()
            .find(|step| self.time_to_px(*step) >= MIN_TICK_SPACING_PX)
            .unwrap_or(TICK_STEPS_SECS[TICK_STEPS_SECS.len() - 1]);

        let end_time = self.px_to_time(width_px);
        let count = (end_time / step).floor() as u64;
        (0..=count)
            .map(|i| {
                let time = i as f64 * step;
                RulerTick {
                    time,
                    x: self.time_to_px(time),
                    label: ruler_label(time),
                }
            })
            .collect()
    }
}

/// `max(reported_duration, latest_caption_end + 5)`.
///
/// A missing, zero, or non-finite reported duration counts as zero so that
/// existing captions are never hidden before the media metadata arrives.
pub fn effective_duration(reported_duration: f64, captions: &[Caption]) -> f64 {
    let reported = if reported_duration.is_finite() {
        reported_duration.max(0.0)
    } else {
        0.0
    };
    reported.max(latest_end(captions) + DURATION_PADDING_SECS)
}

/// `M:SS`, `H:MM:SS`, with a tenth when the time is not whole.
fn ruler_label(time: f64) -> String {
    let tenths = (time * 10.0).round() as u64;
    let whole = tenths / 10;
    let frac = tenths % 10;
    let hours = whole / 3600;
    let minutes = (whole % 3600) / 60;
    let seconds = whole % 60;

    let base = if hours > 0 {
        format!("{hours}:{minutes:02}:{seconds:02}")
    } else {
        format!("{minutes}:{seconds:02}")
    };
    if frac == 0 {
        base
    } else {
        format!("{base}.{frac}")
    }
}
