//! Pointer-drag state machine for caption spans and the playhead.
//!
//! ```text
//!            down(caption body) ──► MovingCaption ───┐
//!            down(left edge)    ──► ResizingLeft  ───┤
//!   Idle ──► down(right edge)   ──► ResizingRight ───┼── up ──► Idle
//!            down(playhead)     ──► DraggingPlayhead ┘  (ScrubEnd)
//!            down(empty track)  ──► Seek, stays Idle
//! ```
//!
//! Every move while dragging a caption yields a `CaptionChanged` action
//! immediately; there is no pending edit to commit or roll back. A drag
//! holds only the caption id and a numeric snapshot of its initial span,
//! so the application may replace its caption list mid-drag.

use subburn_project_model::caption::{find_caption, Caption, CaptionId, CaptionPatch};
use subburn_project_model::timecode::canonicalize;

use crate::view::{effective_duration, PointerTarget, TimelineView};

/// Minimum span a resize may leave.
pub const MIN_SPAN_SECS: f64 = 0.2;

/// Minimum span a move may leave.
pub const MOVE_MIN_SPAN_SECS: f64 = 0.1;

/// Which caption edit a drag performs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DragKind {
    Move,
    ResizeLeft,
    ResizeRight,
}

/// An in-progress drag.
#[derive(Debug, Clone, PartialEq)]
pub enum DragSession {
    Caption {
        kind: DragKind,
        caption_id: CaptionId,
        anchor_x: f64,
        initial_start: f64,
        initial_end: f64,
    },
    Playhead {
        anchor_x: f64,
    },
}

/// Observable controller state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimelineState {
    Idle,
    MovingCaption,
    ResizingLeft,
    ResizingRight,
    DraggingPlayhead,
}

/// What the application should do in response to a pointer event.
#[derive(Debug, Clone, PartialEq)]
pub enum TimelineAction {
    /// Seek the decode engine to this time.
    Seek(f64),
    /// Playhead drag started; typically pause playback.
    ScrubStart,
    /// Playhead drag ended.
    ScrubEnd,
    /// Apply this update to the caption with `id`.
    CaptionChanged { id: CaptionId, patch: CaptionPatch },
}

/// Drag state machine plus the zoomable view it maps pointers through.
#[derive(Debug, Clone, Default)]
pub struct TimelineController {
    view: TimelineView,
    drag: Option<DragSession>,
}

impl TimelineController {
    pub fn new(view: TimelineView) -> Self {
        Self { view, drag: None }
    }

    pub fn view(&self) -> &TimelineView {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut TimelineView {
        &mut self.view
    }

    pub fn drag(&self) -> Option<&DragSession> {
        self.drag.as_ref()
    }

    pub fn state(&self) -> TimelineState {
        match &self.drag {
            None => TimelineState::Idle,
            Some(DragSession::Playhead { .. }) => TimelineState::DraggingPlayhead,
            Some(DragSession::Caption { kind, .. }) => match kind {
                DragKind::Move => TimelineState::MovingCaption,
                DragKind::ResizeLeft => TimelineState::ResizingLeft,
                DragKind::ResizeRight => TimelineState::ResizingRight,
            },
        }
    }

    /// Handle a pointer press. Ignored unless the controller is idle.
    ///
    /// `duration` is the duration reported by the decode engine; captions
    /// are needed to resolve the drag target and the effective duration.
    pub fn pointer_down(
        &mut self,
        x: f64,
        target: PointerTarget,
        captions: &[Caption],
        duration: f64,
    ) -> Option<TimelineAction> {
        if self.drag.is_some() {
            tracing::debug!(state = ?self.state(), "Ignoring pointer-down during drag");
            return None;
        }

        let kind = match target {
            PointerTarget::EmptyTrack => {
                let time = self
                    .view
                    .seek_time(x, effective_duration(duration, captions));
                return Some(TimelineAction::Seek(time));
            }
            PointerTarget::PlayheadHandle => {
                self.drag = Some(DragSession::Playhead { anchor_x: x });
                tracing::debug!("Playhead scrub started");
                return Some(TimelineAction::ScrubStart);
            }
            PointerTarget::CaptionBody(id) => (DragKind::Move, id),
            PointerTarget::CaptionLeftEdge(id) => (DragKind::ResizeLeft, id),
            PointerTarget::CaptionRightEdge(id) => (DragKind::ResizeRight, id),
        };

        let (kind, caption_id) = kind;
        let Some(caption) = find_caption(captions, &caption_id) else {
            tracing::debug!(caption_id = %caption_id, "Pointer-down on unknown caption");
            return None;
        };

        tracing::debug!(
            caption_id = %caption_id,
            ?kind,
            start = caption.start,
            end = caption.end,
            "Caption drag started"
        );
        self.drag = Some(DragSession::Caption {
            kind,
            caption_id,
            anchor_x: x,
            initial_start: caption.start,
            initial_end: caption.end,
        });
        None
    }

    /// Handle pointer motion. Returns the edit or seek the motion implies.
    pub fn pointer_move(
        &mut self,
        x: f64,
        captions: &[Caption],
        duration: f64,
    ) -> Option<TimelineAction> {
        match self.drag.as_ref()? {
            DragSession::Playhead { .. } => {
                let time = self
                    .view
                    .seek_time(x, effective_duration(duration, captions));
                Some(TimelineAction::Seek(time))
            }
            DragSession::Caption {
                kind,
                caption_id,
                anchor_x,
                initial_start,
                initial_end,
            } => {
                let delta = self.view.px_to_time(x - anchor_x);
                if !delta.is_finite() {
                    return None;
                }
                let patch = match kind {
                    DragKind::Move => {
                        let (start, end) = move_span(*initial_start, *initial_end, delta);
                        CaptionPatch::span(canonicalize(start), canonicalize(end))
                    }
                    DragKind::ResizeLeft => CaptionPatch::start(canonicalize(resize_left(
                        *initial_start,
                        *initial_end,
                        delta,
                    ))),
                    DragKind::ResizeRight => CaptionPatch::end(canonicalize(resize_right(
                        *initial_start,
                        *initial_end,
                        delta,
                    ))),
                };
                Some(TimelineAction::CaptionChanged {
                    id: caption_id.clone(),
                    patch,
                })
            }
        }
    }

    /// Handle a pointer release. Ends any drag.
    pub fn pointer_up(&mut self) -> Option<TimelineAction> {
        match self.drag.take()? {
            DragSession::Playhead { .. } => {
                tracing::debug!("Playhead scrub ended");
                Some(TimelineAction::ScrubEnd)
            }
            DragSession::Caption { caption_id, .. } => {
                tracing::debug!(caption_id = %caption_id, "Caption drag ended");
                None
            }
        }
    }
}

/// Shift a span by `delta`, never starting before zero.
///
/// The delta is limited at the zero boundary so the span keeps its length
/// there; the end is also kept at least `MOVE_MIN_SPAN_SECS` after the
/// start.
pub fn move_span(initial_start: f64, initial_end: f64, delta: f64) -> (f64, f64) {
    let start = (initial_start + delta).max(0.0);
    let applied = start - initial_start;
    let end = (initial_end + applied).max(start + MOVE_MIN_SPAN_SECS);
    (start, end)
}

/// New start for a left-edge drag: never below zero and never closer than
/// `MIN_SPAN_SECS` to the end.
pub fn resize_left(initial_start: f64, initial_end: f64, delta: f64) -> f64 {
    (initial_start + delta)
        .min(initial_end - MIN_SPAN_SECS)
        .max(0.0)
}

/// New end for a right-edge drag: never closer than `MIN_SPAN_SECS` to the
/// start.
pub fn resize_right(initial_start: f64, initial_end: f64, delta: f64) -> f64 {
    (initial_end + delta).max(initial_start + MIN_SPAN_SECS)
}
