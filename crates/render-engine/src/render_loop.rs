//! Repeating compositor task for the interactive preview.
//!
//! The loop ticks at a fixed rate whether or not playback is running, so
//! caption and style edits show up on a paused frame too. It reads the
//! engine's live time, the latest published [`CaptionScene`], and draws
//! through [`compose_frame`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use subburn_common::clock::interval_for_hz;

use crate::compositor::{compose_frame, TickReport};
use crate::engine::{CaptionScene, DecodeEngine};
use crate::surface::Canvas;

/// Run one compositor tick.
///
/// Locks are taken one at a time and released before returning. A poisoned
/// lock skips the tick.
pub fn render_tick<C: Canvas + ?Sized>(
    engine: &Mutex<dyn DecodeEngine>,
    canvas: &Mutex<C>,
    scene: &CaptionScene,
) -> TickReport {
    let (time, size, frame) = match engine.lock() {
        Ok(engine) => (
            engine.current_time(),
            engine.native_size(),
            engine.current_frame(),
        ),
        Err(_) => {
            return TickReport::Skipped {
                reason: "decode engine unavailable",
            }
        }
    };

    let Ok(mut canvas) = canvas.lock() else {
        return TickReport::Skipped {
            reason: "drawing surface unavailable",
        };
    };
    compose_frame(&mut *canvas, time, frame.as_deref(), size, scene)
}

/// Handle to a running preview loop. Dropping it stops the loop.
#[derive(Debug)]
pub struct RenderLoop {
    running: Arc<AtomicBool>,
    ticks: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl RenderLoop {
    /// Spawn the loop on the current tokio runtime.
    pub fn spawn<C>(
        engine: Arc<Mutex<dyn DecodeEngine>>,
        canvas: Arc<Mutex<C>>,
        mut scene: watch::Receiver<CaptionScene>,
        tick_hz: u32,
    ) -> Self
    where
        C: Canvas + Send + 'static,
    {
        let running = Arc::new(AtomicBool::new(true));
        let ticks = Arc::new(AtomicU64::new(0));
        let period = interval_for_hz(tick_hz);

        let task_running = running.clone();
        let task_ticks = ticks.clone();
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
            tracing::debug!(tick_hz, "Render loop started");

            while task_running.load(Ordering::Acquire) {
                interval.tick().await;
                if !task_running.load(Ordering::Acquire) {
                    break;
                }

                let current = scene.borrow_and_update().clone();
                let report = render_tick(&engine, &canvas, &current);
                task_ticks.fetch_add(1, Ordering::Relaxed);
                match &report {
                    TickReport::Skipped { reason } => {
                        tracing::trace!(reason, "Render tick skipped");
                    }
                    TickReport::Drawn {
                        time, caption_id, ..
                    } => {
                        tracing::trace!(time, caption_id = ?caption_id, "Render tick");
                    }
                }
            }

            tracing::debug!("Render loop stopped");
        });

        Self {
            running,
            ticks,
            handle: Some(handle),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
            && self.handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Ticks completed so far.
    pub fn ticks(&self) -> u64 {
        self.ticks.load(Ordering::Relaxed)
    }

    /// Stop the loop. No tick starts after this returns.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

impl Drop for RenderLoop {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    use image::{Rgba, RgbaImage};
    use tokio::sync::broadcast;

    use subburn_common::error::SubburnResult;
    use subburn_project_model::caption::{Caption, CaptionId};
    use subburn_project_model::style::StyleConfig;

    use crate::engine::{scene_channel, EngineEvent};
    use crate::surface::DrawingSurface;

    struct StillEngine {
        time: f64,
        size: (u32, u32),
        frame: Option<Arc<RgbaImage>>,
        events: broadcast::Sender<EngineEvent>,
    }

    impl StillEngine {
        fn new(time: f64, size: (u32, u32)) -> Self {
            Self {
                time,
                size,
                frame: Some(Arc::new(RgbaImage::from_pixel(
                    size.0.max(1),
                    size.1.max(1),
                    Rgba([0, 0, 255, 255]),
                ))),
                events: broadcast::channel(8).0,
            }
        }
    }

    impl DecodeEngine for StillEngine {
        fn current_time(&self) -> f64 {
            self.time
        }
        fn seek(&mut self, time: f64) {
            self.time = time;
        }
        fn duration(&self) -> f64 {
            10.0
        }
        fn native_size(&self) -> (u32, u32) {
            self.size
        }
        fn play(&mut self) -> SubburnResult<()> {
            Ok(())
        }
        fn pause(&mut self) {}
        fn is_playing(&self) -> bool {
            false
        }
        fn is_muted(&self) -> bool {
            false
        }
        fn set_muted(&mut self, _muted: bool) {}
        fn current_frame(&self) -> Option<Arc<RgbaImage>> {
            self.frame.clone()
        }
        fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
            self.events.subscribe()
        }
    }

    fn scene() -> CaptionScene {
        CaptionScene::new(
            vec![Caption::new("a", 0.0, 5.0, "hello")],
            StyleConfig::default(),
        )
    }

    #[test]
    fn test_render_tick_reads_live_time() {
        let engine: Arc<Mutex<dyn DecodeEngine>> = Arc::new(Mutex::new(StillEngine::new(2.0, (64, 36))));
        let canvas = Mutex::new(DrawingSurface::new(1, 1));

        let report = render_tick(&engine, &canvas, &scene());
        assert_eq!(report.caption_id(), Some(&CaptionId::new("a")));

        let surface = canvas.lock().unwrap();
        assert_eq!(surface.image().dimensions(), (64, 36));
        assert_eq!(surface.image().get_pixel(0, 0), &Rgba([0, 0, 255, 255]));
    }

    #[test]
    fn test_render_tick_skips_without_dimensions() {
        let engine: Arc<Mutex<dyn DecodeEngine>> = Arc::new(Mutex::new(StillEngine::new(0.0, (0, 0))));
        let canvas = Mutex::new(DrawingSurface::new(8, 8));
        assert!(render_tick(&engine, &canvas, &scene()).is_skipped());
        assert_eq!(canvas.lock().unwrap().image().dimensions(), (8, 8));
    }

    #[tokio::test]
    async fn test_loop_ticks_and_picks_up_scene_edits() {
        let engine: Arc<Mutex<dyn DecodeEngine>> = Arc::new(Mutex::new(StillEngine::new(7.0, (720, 720))));
        let canvas = Arc::new(Mutex::new(DrawingSurface::new(1, 1)));
        let (scene_tx, scene_rx) = scene_channel(scene());
        // Center of the caption background box at scale 1.
        let pixel_at = |canvas: &Mutex<DrawingSurface>| *canvas.lock().unwrap().image().get_pixel(360, 612);

        let mut render_loop = RenderLoop::spawn(engine, canvas.clone(), scene_rx, 200);
        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(render_loop.is_running());
        assert!(render_loop.ticks() > 0);

        // Paused at 7 s: the caption ends at 5 s, so only the frame shows.
        assert_eq!(pixel_at(&canvas), Rgba([0, 0, 255, 255]));

        scene_tx.send_modify(|s| s.captions[0].end = 8.0);
        tokio::time::sleep(Duration::from_millis(30)).await;
        let shaded = pixel_at(&canvas);
        assert!(shaded.0[2] < 200, "background not drawn: {shaded:?}");

        render_loop.stop();
        assert!(!render_loop.is_running());
        let after_stop = render_loop.ticks();
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(render_loop.ticks(), after_stop);
    }

    #[tokio::test]
    async fn test_drop_stops_loop() {
        let engine: Arc<Mutex<dyn DecodeEngine>> = Arc::new(Mutex::new(StillEngine::new(0.0, (8, 8))));
        let canvas = Arc::new(Mutex::new(DrawingSurface::new(8, 8)));
        let (_tx, rx) = scene_channel(CaptionScene::default());

        let render_loop = RenderLoop::spawn(engine, canvas, rx, 500);
        let ticks = render_loop.ticks.clone();
        tokio::time::sleep(Duration::from_millis(20)).await;
        drop(render_loop);

        tokio::time::sleep(Duration::from_millis(10)).await;
        let settled = ticks.load(Ordering::Relaxed);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(ticks.load(Ordering::Relaxed), settled);
    }
}
