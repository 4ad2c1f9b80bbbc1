//! A decode engine with no video behind it: a solid background and a
//! wall-clock playhead. Drives caption-only renders, where the captions are
//! burned over a flat colour instead of source footage.

use std::sync::Arc;
use std::time::{Duration, Instant};

use image::{Rgba, RgbaImage};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use subburn_common::error::{SubburnError, SubburnResult};

use crate::engine::{DecodeEngine, EngineEvent};

/// How often `TimeUpdate` fires during playback.
pub const TIME_UPDATE_INTERVAL: Duration = Duration::from_millis(250);

const EVENT_CAPACITY: usize = 64;

#[derive(Debug)]
pub struct SolidColorEngine {
    frame: Arc<RgbaImage>,
    duration: f64,
    /// Playhead while paused; the play origin while playing.
    position: f64,
    started: Option<Instant>,
    muted: bool,
    events: broadcast::Sender<EngineEvent>,
    ticker: Option<JoinHandle<()>>,
}

impl SolidColorEngine {
    pub fn new(width: u32, height: u32, color: Rgba<u8>, duration: f64) -> Self {
        Self {
            frame: Arc::new(RgbaImage::from_pixel(width, height, color)),
            duration: if duration.is_finite() { duration.max(0.0) } else { 0.0 },
            position: 0.0,
            started: None,
            muted: false,
            events: broadcast::channel(EVENT_CAPACITY).0,
            ticker: None,
        }
    }

    fn start_ticker(&mut self, origin: f64) -> SubburnResult<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| SubburnError::playback("Playback needs a running tokio runtime"))?;
        let started = Instant::now();
        let duration = self.duration;
        let events = self.events.clone();

        self.started = Some(started);
        self.ticker = Some(runtime.spawn(async move {
            loop {
                let time = origin + started.elapsed().as_secs_f64();
                let remaining = duration - time;
                if remaining <= 0.0 {
                    let _ = events.send(EngineEvent::TimeUpdate(duration));
                    let _ = events.send(EngineEvent::Ended);
                    break;
                }
                let _ = events.send(EngineEvent::TimeUpdate(time));
                tokio::time::sleep(TIME_UPDATE_INTERVAL.min(Duration::from_secs_f64(remaining))).await;
            }
        }));
        Ok(())
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }
}

impl DecodeEngine for SolidColorEngine {
    fn current_time(&self) -> f64 {
        match self.started {
            Some(started) => (self.position + started.elapsed().as_secs_f64()).min(self.duration),
            None => self.position,
        }
    }

    fn seek(&mut self, time: f64) {
        let playing = self.started.is_some();
        self.stop_ticker();
        self.started = None;
        self.position = if time.is_finite() {
            time.clamp(0.0, self.duration)
        } else {
            0.0
        };
        if playing {
            if let Err(e) = self.start_ticker(self.position) {
                tracing::warn!(error = %e, "Could not resume after seek");
            }
        }
        let _ = self.events.send(EngineEvent::Seeked);
    }

    fn duration(&self) -> f64 {
        self.duration
    }

    fn native_size(&self) -> (u32, u32) {
        self.frame.dimensions()
    }

    fn play(&mut self) -> SubburnResult<()> {
        if self.duration <= 0.0 {
            return Err(SubburnError::playback("Nothing to play: duration is zero"));
        }
        if self.is_playing() {
            return Ok(());
        }
        // Playing from the end starts over.
        if self.current_time() >= self.duration {
            self.position = 0.0;
        } else {
            self.position = self.current_time();
        }
        self.stop_ticker();
        self.start_ticker(self.position)
    }

    fn pause(&mut self) {
        self.position = self.current_time();
        self.started = None;
        self.stop_ticker();
    }

    fn is_playing(&self) -> bool {
        self.started.is_some() && self.current_time() < self.duration
    }

    fn is_muted(&self) -> bool {
        self.muted
    }

    fn set_muted(&mut self, muted: bool) {
        self.muted = muted;
    }

    fn current_frame(&self) -> Option<Arc<RgbaImage>> {
        Some(self.frame.clone())
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

impl Drop for SolidColorEngine {
    fn drop(&mut self) {
        self.stop_ticker();
    }
}
