//! Captions: timed text spans and their lifecycle.
//!
//! The caption list is owned by the application. The helpers here either
//! query a list or apply an edit the application asked for; nothing in the
//! editing or rendering core holds on to a caption between calls.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::style::StyleOverride;
use crate::timecode::{canonicalize, format_time};

/// Span given to a manually added caption.
pub const MANUAL_CAPTION_SECS: f64 = 2.0;

/// Text given to a manually added caption.
pub const MANUAL_CAPTION_TEXT: &str = "New caption";

/// Opaque, stable caption identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CaptionId(String);

impl CaptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CaptionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CaptionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// A timed text span with an optional style override.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Caption {
    pub id: CaptionId,

    /// Start time in seconds.
    pub start: f64,

    /// End time in seconds. Intended to be greater than `start`, but not
    /// enforced for spans created outside the timeline.
    pub end: f64,

    pub text: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub style_override: Option<StyleOverride>,
}

impl Caption {
    /// Create a caption with canonicalized times and no override.
    pub fn new(id: impl Into<CaptionId>, start: f64, end: f64, text: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            start: canonicalize(start),
            end: canonicalize(end),
            text: text.into(),
            style_override: None,
        }
    }

    /// Span length in seconds (negative for inverted spans).
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether `time` falls inside `[start, end]`.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }

    /// Apply a partial update in place. Times are canonicalized.
    pub fn apply(&mut self, patch: &CaptionPatch) {
        if let Some(start) = patch.start {
            self.start = canonicalize(start);
        }
        if let Some(end) = patch.end {
            self.end = canonicalize(end);
        }
        if let Some(text) = &patch.text {
            self.text = text.clone();
        }
        if let Some(style_override) = &patch.style_override {
            self.style_override = style_override.clone().filter(|o| !o.is_empty());
        }
    }

    /// `start --> end` in canonical time codes, for listings and logs.
    pub fn time_range_label(&self) -> String {
        format!("{} --> {}", format_time(self.start), format_time(self.end))
    }
}

/// A partial caption update.
///
/// `style_override` is doubly optional: `None` leaves the override alone,
/// `Some(None)` clears it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptionPatch {
    pub start: Option<f64>,
    pub end: Option<f64>,
    pub text: Option<String>,
    pub style_override: Option<Option<StyleOverride>>,
}

impl CaptionPatch {
    pub fn span(start: f64, end: f64) -> Self {
        Self {
            start: Some(start),
            end: Some(end),
            ..Default::default()
        }
    }

    pub fn start(start: f64) -> Self {
        Self {
            start: Some(start),
            ..Default::default()
        }
    }

    pub fn end(end: f64) -> Self {
        Self {
            end: Some(end),
            ..Default::default()
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Default::default()
        }
    }

    pub fn style(style_override: StyleOverride) -> Self {
        Self {
            style_override: Some(Some(style_override)),
            ..Default::default()
        }
    }

    pub fn clear_style() -> Self {
        Self {
            style_override: Some(None),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == CaptionPatch::default()
    }
}

/// The caption drawn at `time`: the first one in list order whose span
/// contains it. Overlapping captions resolve to the earliest list entry.
pub fn active_caption(captions: &[Caption], time: f64) -> Option<&Caption> {
    captions.iter().find(|c| c.contains(time))
}

/// Look a caption up by id.
pub fn find_caption<'a>(captions: &'a [Caption], id: &CaptionId) -> Option<&'a Caption> {
    captions.iter().find(|c| &c.id == id)
}

/// Apply `patch` to the caption with `id`. Returns false when no caption
/// has that id.
pub fn apply_patch(captions: &mut [Caption], id: &CaptionId, patch: &CaptionPatch) -> bool {
    match captions.iter_mut().find(|c| &c.id == id) {
        Some(caption) => {
            caption.apply(patch);
            true
        }
        None => false,
    }
}

/// Remove the caption with `id`, returning it.
pub fn remove_caption(captions: &mut Vec<Caption>, id: &CaptionId) -> Option<Caption> {
    let index = captions.iter().position(|c| &c.id == id)?;
    Some(captions.remove(index))
}

/// The latest end time in the list, or `0.0` when empty.
pub fn latest_end(captions: &[Caption]) -> f64 {
    captions
        .iter()
        .map(|c| c.end)
        .filter(|end| end.is_finite())
        .fold(0.0, f64::max)
}

/// A copy of the list ordered by start time (stable for equal starts).
pub fn sorted_by_start(captions: &[Caption]) -> Vec<Caption> {
    let mut sorted = captions.to_vec();
    sorted.sort_by(|a, b| a.start.total_cmp(&b.start));
    sorted
}

/// Bulk-create captions from timed text segments.
///
/// Ids are `seg-<n>`, numbered from 1 over the segments that survive.
/// Text is trimmed, and segments with no text or a non-finite span are
/// dropped. An inverted span is swapped.
pub fn import_segments<I, S>(segments: I) -> Vec<Caption>
where
    I: IntoIterator<Item = (f64, f64, S)>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .filter_map(|(start, end, text)| {
            let text = text.as_ref().trim();
            if text.is_empty() || !start.is_finite() || !end.is_finite() {
                return None;
            }
            Some((start.min(end).max(0.0), start.max(end).max(0.0), text.to_string()))
        })
        .enumerate()
        .map(|(i, (start, end, text))| Caption::new(format!("seg-{}", i + 1), start, end, text))
        .collect()
}

/// Build a caption for manual insertion at the playhead.
///
/// The span is [`MANUAL_CAPTION_SECS`] long and clamped to `duration` when
/// the duration is known. A playhead at the very end shifts the span back
/// so it keeps its length where possible.
pub fn manual_caption(playhead: f64, duration: f64, created_at: DateTime<Utc>) -> Caption {
    let id = format!("manual-{}", created_at.timestamp_millis());
    let playhead = if playhead.is_finite() {
        playhead.max(0.0)
    } else {
        0.0
    };

    let known_duration = duration.is_finite() && duration > 0.0;
    let (start, end) = if known_duration {
        let start = playhead.min(duration);
        let end = (start + MANUAL_CAPTION_SECS).min(duration);
        if end - start < MANUAL_CAPTION_SECS {
            ((end - MANUAL_CAPTION_SECS).max(0.0), end)
        } else {
            (start, end)
        }
    } else {
        (playhead, playhead + MANUAL_CAPTION_SECS)
    };

    Caption::new(id, start, end, MANUAL_CAPTION_TEXT)
}

/// Split a caption at its midpoint.
///
/// Returns the shortened original and the new second half. The new caption
/// inherits text and style override; its id is the parent id with a
/// `-split` suffix, numbered when that id is already taken in `existing`.
/// Returns `None` for spans too short to split.
pub fn split_caption(caption: &Caption, existing: &[Caption]) -> Option<(Caption, Caption)> {
    let mid = canonicalize((caption.start + caption.end) / 2.0);
    if !(mid > caption.start && mid < caption.end) {
        return None;
    }

    let first = Caption {
        end: mid,
        ..caption.clone()
    };
    let second = Caption {
        id: child_id(&caption.id, existing),
        start: mid,
        ..caption.clone()
    };
    Some((first, second))
}

/// Split the caption with `id` inside the list, inserting the new half
/// right after the original. Returns the new caption's id.
pub fn split_in_place(captions: &mut Vec<Caption>, id: &CaptionId) -> Option<CaptionId> {
    let index = captions.iter().position(|c| &c.id == id)?;
    let (first, second) = split_caption(&captions[index], &captions[..])?;
    let new_id = second.id.clone();
    captions[index] = first;
    captions.insert(index + 1, second);
    Some(new_id)
}

fn child_id(parent: &CaptionId, existing: &[Caption]) -> CaptionId {
    let taken = |candidate: &str| existing.iter().any(|c| c.id.as_str() == candidate);

    let base = format!("{parent}-split");
    if !taken(&base) {
        return CaptionId(base);
    }
    let mut n = 2;
    loop {
        let candidate = format!("{base}-{n}");
        if !taken(&candidate) {
            return CaptionId(candidate);
        }
        n += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_millis(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_new_canonicalizes_times() {
        let caption = Caption::new("a", 1.00049, 2.9996, "hi");
        assert_eq!(caption.start, 1.0);
        assert_eq!(caption.end, 3.0);
        assert_eq!(caption.time_range_label(), "00:00:01.000 --> 00:00:03.000");
    }

    #[test]
    fn test_active_caption_prefers_first_in_list_order() {
        let captions = vec![Caption::new("A", 0.0, 5.0, "a"), Caption::new("B", 3.0, 8.0, "b")];
        assert_eq!(active_caption(&captions, 4.0).unwrap().id.as_str(), "A");
        assert_eq!(active_caption(&captions, 6.0).unwrap().id.as_str(), "B");
        assert!(active_caption(&captions, 8.5).is_none());

        let reversed: Vec<_> = captions.iter().rev().cloned().collect();
        assert_eq!(active_caption(&reversed, 4.0).unwrap().id.as_str(), "B");
    }

    #[test]
    fn test_active_caption_bounds_are_inclusive() {
        let captions = vec![Caption::new("A", 1.0, 2.0, "a")];
        assert!(active_caption(&captions, 1.0).is_some());
        assert!(active_caption(&captions, 2.0).is_some());
    }

    #[test]
    fn test_apply_patch() {
        let mut captions = vec![Caption::new("A", 1.0, 2.0, "a")];
        assert!(apply_patch(
            &mut captions,
            &CaptionId::from("A"),
            &CaptionPatch::span(1.5, 2.5)
        ));
        assert_eq!((captions[0].start, captions[0].end), (1.5, 2.5));

        assert!(apply_patch(
            &mut captions,
            &CaptionId::from("A"),
            &CaptionPatch::style(StyleOverride {
                font_size: Some(10.0),
                ..Default::default()
            })
        ));
        assert!(captions[0].style_override.is_some());

        captions[0].apply(&CaptionPatch::clear_style());
        assert!(captions[0].style_override.is_none());

        assert!(!apply_patch(
            &mut captions,
            &CaptionId::from("missing"),
            &CaptionPatch::text("x")
        ));
    }

    #[test]
    fn test_empty_override_is_dropped() {
        let mut caption = Caption::new("A", 0.0, 1.0, "a");
        caption.apply(&CaptionPatch::style(StyleOverride::default()));
        assert!(caption.style_override.is_none());
    }

    #[test]
    fn test_import_segments_numbers_survivors() {
        let captions = import_segments(vec![
            (0.0, 1.5, "  Hello "),
            (1.5, 2.0, "   "),
            (3.0, 2.0004, "swapped"),
            (f64::NAN, 4.0, "broken"),
        ]);

        assert_eq!(captions.len(), 2);
        assert_eq!(captions[0].id.as_str(), "seg-1");
        assert_eq!(captions[0].text, "Hello");
        assert_eq!(captions[1].id.as_str(), "seg-2");
        assert_eq!((captions[1].start, captions[1].end), (2.0, 3.0));
    }

    #[test]
    fn test_manual_caption_at_playhead() {
        let caption = manual_caption(3.0, 60.0, at_millis(1_700_000_000_123));
        assert_eq!(caption.id.as_str(), "manual-1700000000123");
        assert_eq!((caption.start, caption.end), (3.0, 5.0));
        assert_eq!(caption.text, MANUAL_CAPTION_TEXT);
    }

    #[test]
    fn test_manual_caption_clamped_to_duration() {
        let caption = manual_caption(9.5, 10.0, at_millis(0));
        assert_eq!((caption.start, caption.end), (8.0, 10.0));

        let short = manual_caption(0.5, 1.0, at_millis(0));
        assert_eq!((short.start, short.end), (0.0, 1.0));
    }

    #[test]
    fn test_manual_caption_unknown_duration() {
        let caption = manual_caption(4.0, f64::NAN, at_millis(0));
        assert_eq!((caption.start, caption.end), (4.0, 6.0));
    }

    #[test]
    fn test_split_caption() {
        let mut original = Caption::new("c7", 2.0, 5.0, "split me");
        original.style_override = Some(StyleOverride {
            text_color: Some("#f00".to_string()),
            ..Default::default()
        });

        let (first, second) = split_caption(&original, &[original.clone()]).unwrap();
        assert_eq!(first.id.as_str(), "c7");
        assert_eq!((first.start, first.end), (2.0, 3.5));
        assert_eq!(second.id.as_str(), "c7-split");
        assert_eq!((second.start, second.end), (3.5, 5.0));
        assert_eq!(second.text, "split me");
        assert_eq!(second.style_override, original.style_override);
    }

    #[test]
    fn test_split_ids_stay_unique() {
        let mut captions = vec![Caption::new("c1", 0.0, 8.0, "x")];
        let first = split_in_place(&mut captions, &CaptionId::from("c1")).unwrap();
        let second = split_in_place(&mut captions, &CaptionId::from("c1")).unwrap();
        assert_eq!(first.as_str(), "c1-split");
        assert_eq!(second.as_str(), "c1-split-2");
        assert_eq!(captions.len(), 3);
        assert_eq!(captions[0].end, 2.0);
        assert_eq!(captions[1].id.as_str(), "c1-split-2");
    }

    #[test]
    fn test_split_rejects_degenerate_span() {
        let tiny = Caption::new("t", 1.0, 1.001, "x");
        assert!(split_caption(&tiny, &[]).is_none());
        let inverted = Caption::new("i", 3.0, 2.0, "x");
        assert!(split_caption(&inverted, &[]).is_none());
    }

    #[test]
    fn test_remove_and_latest_end() {
        let mut captions = vec![Caption::new("A", 0.0, 4.0, "a"), Caption::new("B", 1.0, 9.0, "b")];
        assert_eq!(latest_end(&captions), 9.0);
        assert!(remove_caption(&mut captions, &CaptionId::from("B")).is_some());
        assert_eq!(latest_end(&captions), 4.0);
        assert!(remove_caption(&mut captions, &CaptionId::from("B")).is_none());
        assert_eq!(latest_end(&[]), 0.0);
    }

    #[test]
    fn test_sorted_by_start_does_not_touch_input() {
        let captions = vec![Caption::new("B", 5.0, 6.0, "b"), Caption::new("A", 1.0, 2.0, "a")];
        let sorted = sorted_by_start(&captions);
        assert_eq!(sorted[0].id.as_str(), "A");
        assert_eq!(captions[0].id.as_str(), "B");
    }

    #[test]
    fn test_caption_serde_shape() {
        let caption = Caption::new("A", 1.0, 2.5, "hello");
        let json = serde_json::to_string(&caption).unwrap();
        assert_eq!(json, r#"{"id":"A","start":1.0,"end":2.5,"text":"hello"}"#);
    }
}
