//! Recording the drawing surface into a media stream.
//!
//! A [`CaptureSource`] opens a [`CaptureSession`] plus a channel of encoded
//! chunks. Chunks arrive while the session runs; after
//! [`CaptureSession::stop`] the remaining output is flushed and the channel
//! closes, which is how consumers know the stream is complete.

use std::process::Stdio;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use image::imageops;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::process::{Child, ChildStdin, Command};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use subburn_common::clock::FrameTimebase;
use subburn_common::config::{CaptureContainer, ExportDefaults};
use subburn_common::error::{SubburnError, SubburnResult};

use crate::surface::DrawingSurface;

/// Encoded output chunks, in order.
pub type ChunkReceiver = mpsc::Receiver<Vec<u8>>;

/// A drawing surface shared with the render loop.
pub type SharedSurface = Arc<Mutex<DrawingSurface>>;

const CHUNK_CHANNEL_CAPACITY: usize = 64;
const FRAME_CHANNEL_CAPACITY: usize = 8;
const STDOUT_CHUNK_BYTES: usize = 64 * 1024;

/// Something that can record the drawing surface.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    /// MIME type of the assembled output.
    fn mime_type(&self) -> &str;

    /// Prepare a session sampling at `fps`. Nothing is recorded until
    /// [`CaptureSession::start`].
    async fn open(&self, fps: u32) -> SubburnResult<(Box<dyn CaptureSession>, ChunkReceiver)>;
}

/// A single recording.
#[async_trait]
pub trait CaptureSession: Send {
    async fn start(&mut self) -> SubburnResult<()>;

    /// Stop recording and flush. The chunk channel closes once the last
    /// chunk has been sent. Safe to call without a prior `start`.
    async fn stop(&mut self) -> SubburnResult<()>;
}

/// Samples the shared surface at a fixed frame rate as raw RGBA.
///
/// The frame size is fixed when the grabber is created; if the surface is
/// resized mid-capture, frames are scaled back to that size.
#[derive(Debug, Clone)]
pub struct FrameGrabber {
    surface: SharedSurface,
    timebase: FrameTimebase,
    size: (u32, u32),
}

impl FrameGrabber {
    pub fn new(surface: SharedSurface, fps: u32) -> SubburnResult<Self> {
        let size = surface
            .lock()
            .map_err(|_| SubburnError::capture("Drawing surface unavailable"))?
            .image()
            .dimensions();
        if size.0 == 0 || size.1 == 0 {
            return Err(SubburnError::capture(
                "Drawing surface has no size; is the video loaded?",
            ));
        }
        Ok(Self {
            surface,
            timebase: FrameTimebase::new(fps),
            size,
        })
    }

    pub fn frame_size(&self) -> (u32, u32) {
        self.size
    }

    pub fn fps(&self) -> u32 {
        self.timebase.fps()
    }

    /// Copy the current surface contents.
    pub fn sample(&self) -> SubburnResult<Vec<u8>> {
        let surface = self
            .surface
            .lock()
            .map_err(|_| SubburnError::capture("Drawing surface unavailable"))?;
        let image = surface.image();
        if image.dimensions() == self.size {
            Ok(image.as_raw().clone())
        } else {
            let scaled = imageops::resize(image, self.size.0, self.size.1, imageops::FilterType::Triangle);
            Ok(scaled.into_raw())
        }
    }

    /// Push frames into `frames` until `stop` flips to true or the receiver
    /// goes away. Always emits at least one frame. Returns the frame count.
    pub async fn run(self, frames: mpsc::Sender<Vec<u8>>, mut stop: watch::Receiver<bool>) -> u64 {
        let mut interval = tokio::time::interval(self.timebase.interval());
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut sent = 0u64;

        loop {
            tokio::select! {
                biased;
                _ = interval.tick() => {}
                _ = stop.changed() => break,
            }

            let frame = match self.sample() {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(error = %e, "Frame sampling failed, stopping grabber");
                    break;
                }
            };
            if frames.send(frame).await.is_err() {
                break;
            }
            sent += 1;
            if *stop.borrow() {
                break;
            }
        }

        tracing::debug!(frames = sent, fps = self.fps(), "Frame grabber finished");
        sent
    }
}

/// Grabber task plumbing shared by the capture sessions.
struct GrabberHandle {
    grabber: Option<FrameGrabber>,
    sink: Option<mpsc::Sender<Vec<u8>>>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
    task: Option<JoinHandle<u64>>,
}

impl GrabberHandle {
    fn new(grabber: FrameGrabber, sink: mpsc::Sender<Vec<u8>>) -> Self {
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            grabber: Some(grabber),
            sink: Some(sink),
            stop_tx,
            stop_rx,
            task: None,
        }
    }

    fn start(&mut self) -> SubburnResult<()> {
        let (Some(grabber), Some(sink)) = (self.grabber.take(), self.sink.take()) else {
            return Err(SubburnError::capture("Capture session already started"));
        };
        self.task = Some(tokio::spawn(grabber.run(sink, self.stop_rx.clone())));
        Ok(())
    }

    /// Stop the grabber and release the sink. Returns frames captured.
    async fn stop(&mut self) -> SubburnResult<u64> {
        self.stop_tx.send_replace(true);
        self.sink = None;
        self.grabber = None;
        match self.task.take() {
            Some(task) => task
                .await
                .map_err(|e| SubburnError::capture(format!("Frame grabber task failed: {e}"))),
            None => Ok(0),
        }
    }
}

impl Drop for GrabberHandle {
    fn drop(&mut self) {
        self.stop_tx.send_replace(true);
    }
}

/// Running totals for a [`MemoryCapture`].
#[derive(Debug, Default)]
struct CaptureCounters {
    opened: AtomicUsize,
    started: AtomicUsize,
    stopped: AtomicUsize,
}

/// Snapshot of [`MemoryCapture`] activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CaptureStats {
    pub opened: usize,
    pub started: usize,
    pub stopped: usize,
}

/// In-memory capture: every chunk is one raw RGBA frame.
///
/// Useful for headless runs and tests. `failing_start` makes every
/// session refuse to start, exercising the export failure path.
#[derive(Debug, Clone)]
pub struct MemoryCapture {
    surface: SharedSurface,
    fail_start: bool,
    counters: Arc<CaptureCounters>,
}

impl MemoryCapture {
    pub fn new(surface: SharedSurface) -> Self {
        Self {
            surface,
            fail_start: false,
            counters: Arc::new(CaptureCounters::default()),
        }
    }

    pub fn failing_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    pub fn stats(&self) -> CaptureStats {
        CaptureStats {
            opened: self.counters.opened.load(Ordering::SeqCst),
            started: self.counters.started.load(Ordering::SeqCst),
            stopped: self.counters.stopped.load(Ordering::SeqCst),
        }
    }
}

#[async_trait]
impl CaptureSource for MemoryCapture {
    fn mime_type(&self) -> &str {
        "video/x-raw-rgba"
    }

    async fn open(&self, fps: u32) -> SubburnResult<(Box<dyn CaptureSession>, ChunkReceiver)> {
        let grabber = FrameGrabber::new(self.surface.clone(), fps)?;
        let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
        self.counters.opened.fetch_add(1, Ordering::SeqCst);

        let session = MemorySession {
            handle: GrabberHandle::new(grabber, chunk_tx),
            fail_start: self.fail_start,
            counters: self.counters.clone(),
        };
        Ok((Box::new(session), chunk_rx))
    }
}

struct MemorySession {
    handle: GrabberHandle,
    fail_start: bool,
    counters: Arc<CaptureCounters>,
}

#[async_trait]
impl CaptureSession for MemorySession {
    async fn start(&mut self) -> SubburnResult<()> {
        if self.fail_start {
            return Err(SubburnError::capture("Capture refused to start"));
        }
        self.handle.start()?;
        self.counters.started.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn stop(&mut self) -> SubburnResult<()> {
        let frames = self.handle.stop().await?;
        self.counters.stopped.fetch_add(1, Ordering::SeqCst);
        tracing::debug!(frames, "Memory capture stopped");
        Ok(())
    }
}

/// Encodes the surface to WebM/VP9 (or Matroska) by piping raw frames
/// through an `ffmpeg` child process. Encoded bytes from its stdout become
/// the chunks.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    surface: SharedSurface,
    ffmpeg_path: String,
    container: CaptureContainer,
    video_bitrate_kbps: u32,
}

impl FfmpegEncoder {
    pub fn new(surface: SharedSurface, defaults: &ExportDefaults) -> Self {
        Self {
            surface,
            ffmpeg_path: defaults.ffmpeg_path.clone(),
            container: defaults.container,
            video_bitrate_kbps: defaults.video_bitrate_kbps,
        }
    }

    /// Whether the configured ffmpeg binary can be executed.
    pub fn is_available(&self) -> bool {
        std::process::Command::new(&self.ffmpeg_path)
            .arg("-version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|status| status.success())
            .unwrap_or(false)
    }
}

/// Arguments for an ffmpeg process reading raw RGBA on stdin and writing
/// the encoded stream to stdout.
pub fn encoder_args(
    size: (u32, u32),
    fps: u32,
    container: CaptureContainer,
    video_bitrate_kbps: u32,
) -> Vec<String> {
    let format = match container {
        CaptureContainer::Webm => "webm",
        CaptureContainer::Matroska => "matroska",
    };
    vec![
        "-hide_banner".to_string(),
        "-loglevel".to_string(),
        "error".to_string(),
        "-f".to_string(),
        "rawvideo".to_string(),
        "-pix_fmt".to_string(),
        "rgba".to_string(),
        "-s".to_string(),
        format!("{}x{}", size.0, size.1),
        "-r".to_string(),
        fps.to_string(),
        "-i".to_string(),
        "-".to_string(),
        "-an".to_string(),
        "-c:v".to_string(),
        "libvpx-vp9".to_string(),
        "-b:v".to_string(),
        format!("{video_bitrate_kbps}k"),
        "-deadline".to_string(),
        "realtime".to_string(),
        "-cpu-used".to_string(),
        "8".to_string(),
        "-f".to_string(),
        format.to_string(),
        "-".to_string(),
    ]
}

#[async_trait]
impl CaptureSource for FfmpegEncoder {
    fn mime_type(&self) -> &str {
        self.container.mime_type()
    }

    async fn open(&self, fps: u32) -> SubburnResult<(Box<dyn CaptureSession>, ChunkReceiver)> {
        let grabber = FrameGrabber::new(self.surface.clone(), fps)?;
        let args = encoder_args(grabber.frame_size(), fps, self.container, self.video_bitrate_kbps);
        tracing::debug!(args = ?args, "Starting ffmpeg encoder");

        let mut child = Command::new(&self.ffmpeg_path)
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SubburnError::capture(format!("Failed to start ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| SubburnError::capture("Failed to capture ffmpeg stdin"))?;
        let mut stdout = child
            .stdout
            .take()
            .ok_or_else(|| SubburnError::capture("Failed to capture ffmpeg stdout"))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| SubburnError::capture("Failed to capture ffmpeg stderr"))?;

        let (chunk_tx, chunk_rx) = mpsc::channel(CHUNK_CHANNEL_CAPACITY);
        let reader = tokio::spawn(async move {
            let mut buf = vec![0u8; STDOUT_CHUNK_BYTES];
            loop {
                match stdout.read(&mut buf).await {
                    Ok(0) => break,
                    Ok(n) => {
                        if chunk_tx.send(buf[..n].to_vec()).await.is_err() {
                            break;
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Failed reading ffmpeg output");
                        break;
                    }
                }
            }
        });

        // Drain stderr so ffmpeg never blocks on a full pipe.
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let writer = tokio::spawn(write_frames(stdin, frame_rx));

        tracing::info!(pid = child.id(), fps, "ffmpeg encoder started");
        let session = FfmpegSession {
            handle: GrabberHandle::new(grabber, frame_tx),
            child,
            writer: Some(writer),
            reader: Some(reader),
            stderr_task: Some(stderr_task),
        };
        Ok((Box::new(session), chunk_rx))
    }
}

async fn write_frames(mut stdin: ChildStdin, mut frames: mpsc::Receiver<Vec<u8>>) -> SubburnResult<u64> {
    let mut written = 0u64;
    while let Some(frame) = frames.recv().await {
        stdin
            .write_all(&frame)
            .await
            .map_err(|e| SubburnError::capture(format!("Failed writing frame to ffmpeg: {e}")))?;
        written += 1;
    }
    stdin
        .shutdown()
        .await
        .map_err(|e| SubburnError::capture(format!("Failed closing ffmpeg stdin: {e}")))?;
    Ok(written)
}

struct FfmpegSession {
    handle: GrabberHandle,
    child: Child,
    writer: Option<JoinHandle<SubburnResult<u64>>>,
    reader: Option<JoinHandle<()>>,
    stderr_task: Option<JoinHandle<String>>,
}

#[async_trait]
impl CaptureSession for FfmpegSession {
    async fn start(&mut self) -> SubburnResult<()> {
        self.handle.start()
    }

    async fn stop(&mut self) -> SubburnResult<()> {
        let grabbed = self.handle.stop().await?;

        let written = match self.writer.take() {
            Some(writer) => writer
                .await
                .map_err(|e| SubburnError::capture(format!("ffmpeg writer task failed: {e}")))??,
            None => 0,
        };

        let status = self
            .child
            .wait()
            .await
            .map_err(|e| SubburnError::capture(format!("Failed to wait on ffmpeg: {e}")))?;

        if let Some(reader) = self.reader.take() {
            reader
                .await
                .map_err(|e| SubburnError::capture(format!("ffmpeg reader task failed: {e}")))?;
        }
        let stderr_output = match self.stderr_task.take() {
            Some(task) => task
                .await
                .unwrap_or_else(|_| "<failed to join stderr reader>".to_string()),
            None => String::new(),
        };

        if !status.success() {
            return Err(SubburnError::capture(format!(
                "ffmpeg encode failed (status {}): {}",
                status,
                stderr_output.trim()
            )));
        }

        tracing::info!(grabbed, written, "ffmpeg encoder finished");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    use crate::surface::{Canvas, RectF};

    fn surface(width: u32, height: u32) -> SharedSurface {
        Arc::new(Mutex::new(DrawingSurface::new(width, height)))
    }

    #[test]
    fn test_grabber_rejects_empty_surface() {
        assert!(matches!(
            FrameGrabber::new(surface(0, 0), 30),
            Err(SubburnError::Capture { .. })
        ));
    }

    #[test]
    fn test_grabber_scales_after_resize() {
        let shared = surface(4, 2);
        let grabber = FrameGrabber::new(shared.clone(), 30).unwrap();
        assert_eq!(grabber.sample().unwrap().len(), 4 * 2 * 4);

        shared.lock().unwrap().resize(8, 8);
        assert_eq!(grabber.sample().unwrap().len(), 4 * 2 * 4);
    }

    #[test]
    fn test_encoder_args() {
        let args = encoder_args((1280, 720), 30, CaptureContainer::Webm, 8000);
        let joined = args.join(" ");
        assert!(joined.contains("-f rawvideo -pix_fmt rgba -s 1280x720 -r 30 -i -"));
        assert!(joined.contains("-c:v libvpx-vp9 -b:v 8000k"));
        assert!(joined.ends_with("-f webm -"));

        let mkv = encoder_args((2, 2), 25, CaptureContainer::Matroska, 100);
        assert!(mkv.join(" ").ends_with("-f matroska -"));
    }

    #[tokio::test]
    async fn test_memory_capture_emits_frames_then_closes() {
        let shared = surface(4, 4);
        shared.lock().unwrap().fill_rect(
            RectF { x: 0.0, y: 0.0, width: 4.0, height: 4.0 },
            Rgba([9, 9, 9, 255]),
            1.0,
        );
        let capture = MemoryCapture::new(shared);
        let (mut session, mut chunks) = capture.open(100).await.unwrap();

        session.start().await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(35)).await;
        session.stop().await.unwrap();

        let mut frames = vec![];
        while let Some(chunk) = chunks.recv().await {
            frames.push(chunk);
        }
        assert!(!frames.is_empty());
        assert!(frames.iter().all(|f| f.len() == 64 && f[0] == 9));
        assert_eq!(
            capture.stats(),
            CaptureStats { opened: 1, started: 1, stopped: 1 }
        );
    }

    #[tokio::test]
    async fn test_stop_without_start_closes_channel() {
        let capture = MemoryCapture::new(surface(2, 2));
        let (mut session, mut chunks) = capture.open(30).await.unwrap();
        session.stop().await.unwrap();
        assert!(chunks.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_failing_start() {
        let capture = MemoryCapture::new(surface(2, 2)).failing_start();
        let (mut session, _chunks) = capture.open(30).await.unwrap();
        assert!(session.start().await.is_err());
        assert_eq!(capture.stats().started, 0);
    }
}
