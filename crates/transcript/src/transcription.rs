//! Speech-to-text as an external service.
//!
//! Transcription itself happens elsewhere (a local model, a hosted API, a
//! subtitle file someone already made). All this crate needs is timed text
//! back, which [`import_transcript`] turns into captions.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use subburn_common::error::{SubburnError, SubburnResult};
use subburn_project_model::caption::{import_segments, Caption};

use crate::subtitles::parse_srt;

/// A single transcribed segment with timing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Start time in seconds.
    pub start_secs: f64,
    /// End time in seconds.
    pub end_secs: f64,
    /// Transcribed text.
    pub text: String,
    /// Confidence score [0.0, 1.0] (if available).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl TranscriptSegment {
    pub fn new(start_secs: f64, end_secs: f64, text: impl Into<String>) -> Self {
        Self {
            start_secs,
            end_secs,
            text: text.into(),
            confidence: None,
        }
    }
}

/// Produces timed text for a media file.
#[async_trait]
pub trait TranscriptionService: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    async fn transcribe(&self, media: &Path) -> SubburnResult<Vec<TranscriptSegment>>;
}

/// Transcribe `media` and convert the result into captions.
///
/// Captions get `seg-<n>` ids and canonical times. Segments with empty text
/// are dropped.
pub async fn import_transcript(
    service: &dyn TranscriptionService,
    media: &Path,
) -> SubburnResult<Vec<Caption>> {
    tracing::info!(
        service = service.name(),
        path = %media.display(),
        "Starting transcription"
    );

    let segments = service.transcribe(media).await?;
    let received = segments.len();
    let captions = import_segments(
        segments
            .into_iter()
            .map(|s| (s.start_secs, s.end_secs, s.text)),
    );

    if captions.len() < received {
        tracing::debug!(
            dropped = received - captions.len(),
            "Dropped empty transcript segments"
        );
    }
    tracing::info!(captions = captions.len(), "Transcript imported");
    Ok(captions)
}

/// Reads an existing SRT (or VTT) file instead of transcribing.
#[derive(Debug, Clone)]
pub struct SubtitleFileService {
    path: PathBuf,
}

impl SubtitleFileService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TranscriptionService for SubtitleFileService {
    fn name(&self) -> &str {
        "subtitle-file"
    }

    async fn transcribe(&self, _media: &Path) -> SubburnResult<Vec<TranscriptSegment>> {
        let content = read_existing(&self.path).await?;
        Ok(parse_srt(&content))
    }
}

/// Reads a JSON array of [`TranscriptSegment`]s written by an external
/// transcriber.
#[derive(Debug, Clone)]
pub struct JsonSegmentsService {
    path: PathBuf,
}

impl JsonSegmentsService {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TranscriptionService for JsonSegmentsService {
    fn name(&self) -> &str {
        "json-segments"
    }

    async fn transcribe(&self, _media: &Path) -> SubburnResult<Vec<TranscriptSegment>> {
        let content = read_existing(&self.path).await?;
        serde_json::from_str(&content).map_err(|e| {
            SubburnError::transcript(format!("{}: {e}", self.path.display()))
        })
    }
}

async fn read_existing(path: &Path) -> SubburnResult<String> {
    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(SubburnError::FileNotFound {
            path: path.to_path_buf(),
        }),
        Err(e) => Err(e.into()),
    }
}
