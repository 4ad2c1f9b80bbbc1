//! Sidecar subtitles in SRT and VTT formats.

use std::path::Path;

use subburn_common::error::SubburnResult;
use subburn_project_model::caption::{sorted_by_start, Caption};
use subburn_project_model::timecode::{format_srt_time, format_time, try_parse_time};

use crate::transcription::TranscriptSegment;

/// Generate SRT subtitle content from captions, in start-time order.
pub fn generate_srt(captions: &[Caption]) -> String {
    let mut output = String::new();

    for (i, caption) in sorted_by_start(captions).iter().enumerate() {
        output.push_str(&format!("{}\n", i + 1));
        output.push_str(&format!(
            "{} --> {}\n",
            format_srt_time(caption.start),
            format_srt_time(caption.end),
        ));
        output.push_str(&caption.text);
        output.push_str("\n\n");
    }

    output
}

/// Generate WebVTT subtitle content from captions, in start-time order.
pub fn generate_vtt(captions: &[Caption]) -> String {
    let mut output = String::from("WEBVTT\n\n");

    for caption in sorted_by_start(captions) {
        output.push_str(&format!(
            "{} --> {}\n",
            format_time(caption.start),
            format_time(caption.end),
        ));
        output.push_str(&caption.text);
        output.push_str("\n\n");
    }

    output
}

/// Read cues from SRT text. VTT is accepted too.
///
/// Blocks are separated by blank lines. A block without a readable
/// `start --> end` line is skipped; cue numbers, headers and cue settings
/// after the end time are ignored.
pub fn parse_srt(content: &str) -> Vec<TranscriptSegment> {
    let normalized = content.replace("\r\n", "\n").replace('\r', "\n");
    let mut segments = Vec::new();

    for block in normalized.split("\n\n") {
        let mut lines = block.lines().map(str::trim_end).skip_while(|l| !l.contains("-->"));
        let Some(timing) = lines.next() else {
            continue;
        };
        let Some((start, end)) = parse_timing(timing) else {
            tracing::debug!(line = timing, "Skipping cue with unreadable timing");
            continue;
        };

        let text = lines
            .filter(|l| !l.trim().is_empty())
            .collect::<Vec<_>>()
            .join("\n");
        segments.push(TranscriptSegment::new(start, end, text));
    }

    segments
}

fn parse_timing(line: &str) -> Option<(f64, f64)> {
    let (start, rest) = line.split_once("-->")?;
    let end = rest.split_whitespace().next()?;
    Some((try_parse_time(start)?, try_parse_time(end)?))
}

/// Save subtitles to a file. `.vtt` writes WebVTT, anything else SRT.
pub fn save_subtitles(captions: &[Caption], path: &Path) -> SubburnResult<()> {
    let content = match path.extension().and_then(|e| e.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("vtt") => generate_vtt(captions),
        _ => generate_srt(captions),
    };
    std::fs::write(path, content)?;
    tracing::info!(path = %path.display(), cues = captions.len(), "Subtitles written");
    Ok(())
}
