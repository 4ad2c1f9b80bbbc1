//! Burn-in export: replay the source once at 1x while recording the
//! composited surface.
//!
//! ```text
//! pause, remember (time, muted)
//!   └─ open capture ── seek(0) + mute ── await Seeked
//!        └─ start capture ── play ── await Ended
//!             └─ stop capture ── await flush ── concatenate chunks
//! restore (time, muted)            <- always, success or failure
//! ```
//!
//! The render loop keeps drawing while this runs; the capture samples the
//! same surface the preview shows, so the artifact matches the live
//! composite.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, watch};

use subburn_common::clock::RateController;
use subburn_common::error::{SubburnError, SubburnResult};

use crate::capture::{CaptureSession, CaptureSource, ChunkReceiver};
use crate::engine::{DecodeEngine, EngineEvent};

/// Default capture rate.
pub const DEFAULT_EXPORT_FPS: u32 = 30;

/// Progress callbacks per second while rendering.
const PROGRESS_HZ: u32 = 4;

/// A `Seeked` only completes step 3 once the engine is this close to 0.
const SEEK_TOLERANCE_SECS: f64 = 0.001;

/// Message reported when an export is cancelled.
pub const CANCELLED_MESSAGE: &str = "export cancelled";

/// Export lifecycle as seen by the host application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportStatus {
    Idle,
    Rendering,
    Success,
    Error,
}

/// A status transition or progress update.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportStatusReport {
    pub status: ExportStatus,
    /// Human-readable detail; set for errors.
    pub message: Option<String>,
    /// Playback progress in `[0.0, 1.0]`.
    pub progress: f64,
}

/// Receives every status report.
pub type StatusCallback = Box<dyn Fn(ExportStatusReport) + Send + Sync>;

/// The assembled recording.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportArtifact {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub chunk_count: usize,
}

impl ExportArtifact {
    /// Write the artifact to `path`, creating parent directories.
    pub async fn write_to(&self, path: &Path) -> SubburnResult<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &self.bytes).await?;
        tracing::info!(
            path = %path.display(),
            bytes = self.bytes.len(),
            mime_type = %self.mime_type,
            "Wrote export artifact"
        );
        Ok(())
    }
}

/// Requests cancellation of the export currently running on a sequencer.
#[derive(Debug, Clone)]
pub struct ExportCancel {
    tx: Arc<watch::Sender<bool>>,
}

impl ExportCancel {
    pub fn cancel(&self) {
        tracing::info!("Export cancellation requested");
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

/// Runs burn-in exports against a shared decode engine. At most one export
/// runs at a time.
pub struct ExportSequencer {
    engine: Arc<Mutex<dyn DecodeEngine>>,
    capture: Arc<dyn CaptureSource>,
    fps: u32,
    busy: Arc<AtomicBool>,
    cancel: Arc<watch::Sender<bool>>,
    on_status: Option<StatusCallback>,
}

impl std::fmt::Debug for ExportSequencer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExportSequencer")
            .field("fps", &self.fps)
            .field("busy", &self.is_busy())
            .finish()
    }
}

/// Clears the busy flag when the export finishes, however it finishes.
struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl BusyGuard {
    fn acquire(busy: &Arc<AtomicBool>) -> Option<Self> {
        busy.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { busy: busy.clone() })
    }
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

/// Puts the engine back at the time and mute state it had before the
/// export. Restores on drop, so an export future abandoned mid-flight
/// still leaves playback where the user had it.
struct RestoreGuard {
    engine: Arc<Mutex<dyn DecodeEngine>>,
    time: f64,
    muted: bool,
}

impl Drop for RestoreGuard {
    fn drop(&mut self) {
        match self.engine.lock() {
            Ok(mut engine) => {
                engine.pause();
                engine.set_muted(self.muted);
                engine.seek(self.time);
                tracing::debug!(time = self.time, muted = self.muted, "Restored playback state");
            }
            Err(_) => tracing::warn!("Decode engine unavailable, playback state not restored"),
        }
    }
}

impl ExportSequencer {
    pub fn new(engine: Arc<Mutex<dyn DecodeEngine>>, capture: Arc<dyn CaptureSource>) -> Self {
        Self {
            engine,
            capture,
            fps: DEFAULT_EXPORT_FPS,
            busy: Arc::new(AtomicBool::new(false)),
            cancel: Arc::new(watch::channel(false).0),
            on_status: None,
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps.max(1);
        self
    }

    pub fn with_status_callback(mut self, callback: StatusCallback) -> Self {
        self.on_status = Some(callback);
        self
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    /// Handle that cancels the running export, if any.
    pub fn cancel_handle(&self) -> ExportCancel {
        ExportCancel {
            tx: self.cancel.clone(),
        }
    }

    /// Run one export.
    ///
    /// Returns [`SubburnError::ExportBusy`] without side effects if another
    /// export is running. Otherwise the engine's mute flag and playback time
    /// are restored before this returns, whatever the outcome.
    pub async fn export(&self) -> SubburnResult<ExportArtifact> {
        let Some(_busy) = BusyGuard::acquire(&self.busy) else {
            tracing::warn!("Export requested while another is running");
            return Err(SubburnError::ExportBusy);
        };
        self.cancel.send_replace(false);
        let mut cancel = self.cancel.subscribe();

        self.report(ExportStatus::Rendering, None, 0.0);

        // Step 1: pause and remember what to restore.
        let (original_time, original_muted, duration, events) = match self.lock_engine() {
            Ok(mut engine) => {
                engine.pause();
                (
                    engine.current_time(),
                    engine.is_muted(),
                    engine.duration(),
                    engine.subscribe(),
                )
            }
            Err(e) => {
                self.report(ExportStatus::Error, Some(failure_message(&e)), 0.0);
                return Err(e);
            }
        };
        tracing::info!(
            original_time,
            original_muted,
            duration,
            fps = self.fps,
            "Starting export"
        );

        // Step 7 runs when this drops, including when the future is dropped.
        let restore = RestoreGuard {
            engine: self.engine.clone(),
            time: original_time,
            muted: original_muted,
        };

        let result = self.record(events, duration, &mut cancel).await;
        drop(restore);

        match result {
            Ok(artifact) => {
                tracing::info!(
                    bytes = artifact.bytes.len(),
                    chunks = artifact.chunk_count,
                    status = "success",
                    "Export finished"
                );
                self.report(ExportStatus::Success, None, 1.0);
                Ok(artifact)
            }
            Err(e) => {
                tracing::warn!(error = %e, status = "error", "Export failed");
                self.report(ExportStatus::Error, Some(failure_message(&e)), 0.0);
                Err(e)
            }
        }
    }

    /// Steps 2-6. Capture is stopped on every path once opened.
    async fn record(
        &self,
        events: broadcast::Receiver<EngineEvent>,
        duration: f64,
        cancel: &mut watch::Receiver<bool>,
    ) -> SubburnResult<ExportArtifact> {
        let (mut session, chunks) = self.capture.open(self.fps).await?;
        let collector = tokio::spawn(collect_chunks(chunks));

        let played = self
            .play_through(session.as_mut(), events, duration, cancel)
            .await;
        let stopped = session.stop().await;

        if let Err(e) = played.and(stopped) {
            collector.abort();
            tracing::debug!("Discarding partial capture output");
            return Err(e);
        }

        tracing::debug!("Waiting for capture flush");
        let chunks = collector
            .await
            .map_err(|e| SubburnError::capture(format!("Chunk collector failed: {e}")))?;
        let chunk_count = chunks.len();
        Ok(ExportArtifact {
            bytes: chunks.concat(),
            mime_type: self.capture.mime_type().to_string(),
            chunk_count,
        })
    }

    /// Steps 3-5.
    async fn play_through(
        &self,
        session: &mut dyn CaptureSession,
        mut events: broadcast::Receiver<EngineEvent>,
        duration: f64,
        cancel: &mut watch::Receiver<bool>,
    ) -> SubburnResult<()> {
        {
            let mut engine = self.lock_engine()?;
            drain_pending(&mut events)?;
            engine.seek(0.0);
            engine.set_muted(true);
        }
        tracing::debug!("Waiting for seek to 0");
        loop {
            match next_event(&mut events, cancel).await? {
                EngineEvent::Seeked => {
                    let at = self.lock_engine()?.current_time();
                    if at.abs() <= SEEK_TOLERANCE_SECS {
                        break;
                    }
                    tracing::debug!(at, "Ignoring Seeked from an earlier seek");
                }
                EngineEvent::Error(message) => return Err(SubburnError::playback(message)),
                _ => {}
            }
        }

        session.start().await?;
        let played = self.lock_engine()?.play();
        played?;
        tracing::debug!("Playback started, recording");

        let mut progress_gate = RateController::new(PROGRESS_HZ);
        let started = std::time::Instant::now();
        loop {
            match next_event(&mut events, cancel).await? {
                EngineEvent::Ended => break,
                EngineEvent::Error(message) => return Err(SubburnError::playback(message)),
                EngineEvent::TimeUpdate(time) => {
                    let now_ns = started.elapsed().as_nanos() as u64;
                    if progress_gate.should_tick(now_ns) {
                        self.report(ExportStatus::Rendering, None, progress(time, duration));
                    }
                }
                EngineEvent::Seeked => {}
            }
        }
        tracing::debug!("Playback ended");
        Ok(())
    }

    fn lock_engine(&self) -> SubburnResult<MutexGuard<'_, dyn DecodeEngine + 'static>> {
        self.engine
            .lock()
            .map_err(|_| SubburnError::playback("Decode engine unavailable"))
    }

    fn report(&self, status: ExportStatus, message: Option<String>, progress: f64) {
        if let Some(callback) = &self.on_status {
            callback(ExportStatusReport {
                status,
                message,
                progress,
            });
        }
    }
}

/// Wait for the next engine event, failing on cancellation or when the
/// engine goes away. Lagged receivers skip ahead.
async fn next_event(
    events: &mut broadcast::Receiver<EngineEvent>,
    cancel: &mut watch::Receiver<bool>,
) -> SubburnResult<EngineEvent> {
    loop {
        if *cancel.borrow_and_update() {
            return Err(SubburnError::export(CANCELLED_MESSAGE));
        }
        tokio::select! {
            changed = cancel.changed() => {
                if changed.is_err() {
                    return Err(SubburnError::export(CANCELLED_MESSAGE));
                }
            }
            event = events.recv() => match event {
                Ok(event) => return Ok(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "Engine event receiver lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    return Err(SubburnError::playback("Decode engine event stream closed"));
                }
            },
        }
    }
}

/// Discard events queued before the export's own seek.
fn drain_pending(events: &mut broadcast::Receiver<EngineEvent>) -> SubburnResult<()> {
    loop {
        match events.try_recv() {
            Ok(event) => tracing::trace!(?event, "Discarding stale engine event"),
            Err(broadcast::error::TryRecvError::Lagged(_)) => {}
            Err(broadcast::error::TryRecvError::Empty) => return Ok(()),
            Err(broadcast::error::TryRecvError::Closed) => {
                return Err(SubburnError::playback("Decode engine event stream closed"));
            }
        }
    }
}

async fn collect_chunks(mut chunks: ChunkReceiver) -> Vec<Vec<u8>> {
    let mut collected = vec![];
    while let Some(chunk) = chunks.recv().await {
        collected.push(chunk);
    }
    collected
}

fn progress(time: f64, duration: f64) -> f64 {
    if duration.is_finite() && duration > 0.0 && time.is_finite() {
        (time / duration).clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Message shown to the user for a failed export.
fn failure_message(error: &SubburnError) -> String {
    match error {
        SubburnError::Export { message } => message.clone(),
        other => other.to_string(),
    }
}
