//! The decode engine seam and the caption scene published by the editor.
//!
//! A decode engine is whatever plays the source video: it owns the live
//! playback clock, the current decoded frame, and the mute flag. The
//! compositor and the export sequencer only talk to it through
//! [`DecodeEngine`].

use std::sync::{Arc, Mutex};

use image::RgbaImage;
use tokio::sync::{broadcast, watch};

use subburn_common::error::SubburnResult;
use subburn_project_model::caption::Caption;
use subburn_project_model::style::StyleConfig;

/// Notifications emitted by a decode engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    /// Playback time advanced.
    TimeUpdate(f64),
    /// A seek completed.
    Seeked,
    /// Playback reached the end of the media.
    Ended,
    /// Decoding or playback failed.
    Error(String),
}

/// Video playback backend.
///
/// Calls are synchronous and short; anything that completes later is
/// reported through [`DecodeEngine::subscribe`].
pub trait DecodeEngine: Send {
    /// Live playback time in seconds. Authoritative for rendering.
    fn current_time(&self) -> f64;

    /// Request a seek. Completion is signalled by [`EngineEvent::Seeked`].
    fn seek(&mut self, time: f64);

    /// Media duration in seconds; `0.0` or NaN while unknown.
    fn duration(&self) -> f64;

    /// Native frame size; `(0, 0)` until metadata is available.
    fn native_size(&self) -> (u32, u32);

    /// Start playback. May be rejected.
    fn play(&mut self) -> SubburnResult<()>;

    fn pause(&mut self);

    fn is_playing(&self) -> bool;

    fn is_muted(&self) -> bool;

    fn set_muted(&mut self, muted: bool);

    /// The most recently decoded frame, if any.
    fn current_frame(&self) -> Option<Arc<RgbaImage>>;

    /// Subscribe to engine events from this point on.
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
}

/// A decode engine shared between the render loop, the export sequencer,
/// and the host application.
pub type SharedEngine = Arc<Mutex<dyn DecodeEngine>>;

/// Snapshot of transport state for display.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlaybackState {
    pub current_time: f64,
    pub duration: f64,
    pub is_playing: bool,
}

impl PlaybackState {
    pub fn snapshot(engine: &dyn DecodeEngine) -> Self {
        Self {
            current_time: engine.current_time(),
            duration: engine.duration(),
            is_playing: engine.is_playing(),
        }
    }
}

/// The caption list and global style as last published by the editor.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CaptionScene {
    pub captions: Vec<Caption>,
    pub style: StyleConfig,
}

impl CaptionScene {
    pub fn new(captions: Vec<Caption>, style: StyleConfig) -> Self {
        Self { captions, style }
    }
}

/// Create the channel the editor publishes scenes through. The render loop
/// holds a receiver and reads the latest scene on every tick.
pub fn scene_channel(initial: CaptionScene) -> (watch::Sender<CaptionScene>, watch::Receiver<CaptionScene>) {
    watch::channel(initial)
}
