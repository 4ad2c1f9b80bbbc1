//! Subburn Transcript
//!
//! Getting timed text in and out of a caption project:
//! - **Transcription:** An opaque async service returning timed segments,
//!   imported as captions
//! - **Subtitles:** SRT/VTT sidecar output and a tolerant SRT reader

pub mod subtitles;
pub mod transcription;

pub use subtitles::*;
pub use transcription::*;
