//! Subburn Render Engine
//!
//! Real-time caption compositing over a playing video, and the export
//! sequence that burns captions into a recording.
//!
//! # Pipeline Architecture
//!
//! ```text
//! decode engine ──► live time, frame ──┐
//!                                      ├── compositor (every tick) ──► DrawingSurface
//! caption scene (watch) ───────────────┘                                  │
//!                                                                         ├── preview
//!                                                                         └── capture ──► ffmpeg ──► export.webm
//! ```
//!
//! The render loop and the export sequencer share the decode engine and
//! the surface as `Arc<Mutex<_>>`. Locks are held only for the duration of
//! a synchronous call, never across an `.await`.

pub mod capture;
pub mod color;
pub mod compositor;
pub mod engine;
pub mod export;
pub mod render_loop;
pub mod solid_engine;
pub mod surface;

pub use capture::{
    encoder_args, CaptureSession, CaptureSource, CaptureStats, ChunkReceiver, FfmpegEncoder,
    FrameGrabber, MemoryCapture, SharedSurface,
};
pub use color::parse_color;
pub use compositor::{compose_frame, draw_caption, layout_caption, wrap_words, CaptionLayout, TickReport};
pub use engine::{scene_channel, CaptionScene, DecodeEngine, EngineEvent, PlaybackState, SharedEngine};
pub use export::*;
pub use render_loop::{render_tick, RenderLoop};
pub use solid_engine::SolidColorEngine;
pub use surface::{Canvas, DrawingSurface, FontSpec, RectF, TextPaint};
