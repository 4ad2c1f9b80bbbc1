//! Tick and rate utilities.
//!
//! The preview compositor, the export frame grabber and export progress
//! reporting all run at fixed rates. This module provides:
//! - Conversion from a target rate to a tick interval
//! - A rate controller for throttling work driven by irregular events
//! - Frame index / timestamp conversion at a fixed frame rate

use std::time::Duration;

/// Tick interval for a target rate. A zero rate is treated as 1 Hz.
pub fn interval_for_hz(hz: u32) -> Duration {
    Duration::from_nanos(1_000_000_000 / hz.max(1) as u64)
}

/// Convert seconds to nanoseconds, saturating at zero for negative input.
pub fn secs_to_ns(secs: f64) -> u64 {
    if !secs.is_finite() || secs <= 0.0 {
        return 0;
    }
    (secs * 1_000_000_000.0) as u64
}

/// Convert nanoseconds to seconds.
pub fn ns_to_secs(ns: u64) -> f64 {
    ns as f64 / 1_000_000_000.0
}

/// Frame rate controller for event-driven work.
#[derive(Debug)]
pub struct RateController {
    target_interval_ns: u64,
    last_tick_ns: Option<u64>,
}

impl RateController {
    /// Create a controller targeting the given Hz rate.
    pub fn new(target_hz: u32) -> Self {
        Self {
            target_interval_ns: 1_000_000_000 / target_hz.max(1) as u64,
            last_tick_ns: None,
        }
    }

    /// Check if enough time has passed for the next tick.
    /// Returns true and updates internal state if ready.
    /// The first call always returns true.
    pub fn should_tick(&mut self, current_ns: u64) -> bool {
        match self.last_tick_ns {
            None => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            Some(last) if current_ns >= last + self.target_interval_ns => {
                self.last_tick_ns = Some(current_ns);
                true
            }
            _ => false,
        }
    }

    /// Forget the last tick so the next call fires immediately.
    pub fn reset(&mut self) {
        self.last_tick_ns = None;
    }

    /// Target interval in nanoseconds.
    pub fn interval_ns(&self) -> u64 {
        self.target_interval_ns
    }
}

/// Fixed frame-rate timebase used by export capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTimebase {
    fps: u32,
}

impl FrameTimebase {
    pub fn new(fps: u32) -> Self {
        Self { fps: fps.max(1) }
    }

    pub fn fps(&self) -> u32 {
        self.fps
    }

    /// Presentation time of a frame index in seconds.
    pub fn frame_time(&self, index: u64) -> f64 {
        index as f64 / self.fps as f64
    }

    /// Number of frames needed to cover `duration_secs`.
    pub fn frames_for(&self, duration_secs: f64) -> u64 {
        if !duration_secs.is_finite() || duration_secs <= 0.0 {
            return 0;
        }
        (duration_secs * self.fps as f64).ceil() as u64
    }

    pub fn interval(&self) -> Duration {
        interval_for_hz(self.fps)
    }
}
