use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};
use tokio::sync::broadcast;

use subburn_common::error::SubburnResult;
use subburn_project_model::project::LoadedProject;
use subburn_render_engine::{
    compose_frame, scene_channel, CaptionScene, DecodeEngine, DrawingSurface, EngineEvent,
    ExportSequencer, ExportStatus, MemoryCapture, RenderLoop,
};

const GRAY: Rgba<u8> = Rgba([128, 128, 128, 255]);

fn load_fixture_project() -> LoadedProject {
    let root = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("..")
        .join("fixtures")
        .join("sample-project");
    LoadedProject::load(root).expect("fixture project should load")
}

fn fixture_scene() -> CaptionScene {
    let project = load_fixture_project().project;
    CaptionScene::new(project.captions, project.style)
}

/// Plays instantly: `play()` emits half-second time updates up to the
/// duration, then `Ended`.
struct InstantEngine {
    time: f64,
    duration: f64,
    muted: bool,
    playing: bool,
    frame: Arc<RgbaImage>,
    events: broadcast::Sender<EngineEvent>,
}

impl InstantEngine {
    fn new(width: u32, height: u32, duration: f64) -> Self {
        Self {
            time: 3.0,
            duration,
            muted: false,
            playing: false,
            frame: Arc::new(RgbaImage::from_pixel(width, height, GRAY)),
            events: broadcast::channel(256).0,
        }
    }
}

impl DecodeEngine for InstantEngine {
    fn current_time(&self) -> f64 {
        self.time
    }
    fn seek(&mut self, time: f64) {
        self.time = time;
        let _ = self.events.send(EngineEvent::Seeked);
    }
    fn duration(&self) -> f64 {
        self.duration
    }
    fn native_size(&self) -> (u32, u32) {
        self.frame.dimensions()
    }
    fn play(&mut self) -> SubburnResult<()> {
        self.playing = true;
        let mut t = 0.0;
        while t < self.duration {
            t += 0.5;
            let _ = self.events.send(EngineEvent::TimeUpdate(t.min(self.duration)));
        }
        self.time = self.duration;
        let _ = self.events.send(EngineEvent::Ended);
        Ok(())
    }
    fn pause(&mut self) {
        self.playing = false;
    }
    fn is_playing(&self) -> bool {
        self.playing
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

#[test]
fn fixture_active_caption_timeline() {
    let scene = fixture_scene();
    let mut surface = DrawingSurface::new(1, 1);

    let mut active_at = |time: f64| {
        compose_frame(&mut surface, time, None, (1280, 720), &scene)
            .caption_id()
            .map(|id| id.to_string())
    };

    assert_eq!(active_at(0.2), None);
    assert_eq!(active_at(0.5).as_deref(), Some("seg-1"));
    // Shared boundary: the earlier list entry wins.
    assert_eq!(active_at(2.0).as_deref(), Some("seg-1"));
    assert_eq!(active_at(2.5).as_deref(), Some("seg-2"));
    // Overlap of seg-2 and seg-3.
    assert_eq!(active_at(3.7).as_deref(), Some("seg-2"));
    assert_eq!(active_at(4.5).as_deref(), Some("seg-3"));
    assert_eq!(active_at(5.8), None);
}

#[test]
fn fixture_override_moves_background_box() {
    let scene = fixture_scene();
    let frame = RgbaImage::from_pixel(1280, 720, GRAY);
    let mut surface = DrawingSurface::new(1280, 720);

    // seg-1 sits at the default 85% anchor.
    compose_frame(&mut surface, 1.0, Some(&frame), (1280, 720), &scene);
    assert!(surface.image().get_pixel(640, 612).0[0] < 100);
    assert_eq!(surface.image().get_pixel(640, 72), &GRAY);

    // seg-2 overrides the vertical anchor to 10%.
    compose_frame(&mut surface, 2.5, Some(&frame), (1280, 720), &scene);
    assert!(surface.image().get_pixel(640, 72).0[0] < 100);
    assert_eq!(surface.image().get_pixel(640, 612), &GRAY);
}

#[tokio::test]
async fn fixture_export_with_live_render_loop() {
    let scene = fixture_scene();
    let instant = Arc::new(Mutex::new(InstantEngine::new(64, 36, 6.0)));
    let engine: Arc<Mutex<dyn DecodeEngine>> = instant.clone();
    let surface = Arc::new(Mutex::new(DrawingSurface::new(64, 36)));
    let (_scene_tx, scene_rx) = scene_channel(scene);

    let mut render_loop = RenderLoop::spawn(engine.clone(), surface.clone(), scene_rx, 120);

    let statuses = Arc::new(Mutex::new(vec![]));
    let sink = statuses.clone();
    let sequencer = ExportSequencer::new(engine, Arc::new(MemoryCapture::new(surface.clone())))
        .with_fps(30)
        .with_status_callback(Box::new(move |report| sink.lock().unwrap().push(report.status)));

    let artifact = sequencer.export().await.expect("export should succeed");
    render_loop.stop();

    assert!(artifact.chunk_count >= 1);
    assert_eq!(artifact.bytes.len() % (64 * 36 * 4), 0);

    let engine = instant.lock().unwrap();
    assert_eq!(engine.time, 3.0);
    assert!(!engine.muted);

    let statuses = statuses.lock().unwrap();
    assert_eq!(statuses.first(), Some(&ExportStatus::Rendering));
    assert_eq!(statuses.last(), Some(&ExportStatus::Success));
}
