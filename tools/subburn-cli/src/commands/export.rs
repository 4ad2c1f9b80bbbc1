//! Burn captions into a caption-only video.
//!
//! The project's captions are composited over a solid background that
//! plays for the source duration, recorded in real time, and encoded by
//! ffmpeg.

use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use subburn_common::config::AppConfig;
use subburn_render_engine::color::parse_color;
use subburn_render_engine::{
    scene_channel, CaptionScene, DecodeEngine, ExportSequencer, ExportStatus, FfmpegEncoder,
    RenderLoop, SolidColorEngine,
};

use super::{load_project, surface_with_font};

pub async fn run(
    config: &AppConfig,
    path: PathBuf,
    output: Option<PathBuf>,
    font: Option<PathBuf>,
    background: String,
) -> anyhow::Result<()> {
    println!("Exporting project at: {}", path.display());

    let project = load_project(&path)?;
    let source = project
        .project
        .source
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Project has no source video; frame size unknown"))?;
    let duration = project.project.source_duration();
    if duration <= 0.0 {
        anyhow::bail!("Source duration is unknown; set duration_secs in meta/project.json");
    }
    let color = parse_color(&background)
        .ok_or_else(|| anyhow::anyhow!("Unreadable background colour: {background}"))?;

    let size = (source.width, source.height);
    let surface = Arc::new(Mutex::new(surface_with_font(config, font, size)?));
    let encoder = FfmpegEncoder::new(surface.clone(), &config.export);
    if !encoder.is_available() {
        anyhow::bail!(
            "ffmpeg not found at '{}'; set export.ffmpeg_path in the config",
            config.export.ffmpeg_path
        );
    }

    let output_path = output.unwrap_or_else(|| {
        project
            .exports_dir()
            .join(format!("captions.{}", config.export.container.extension()))
    });
    println!("  Output: {}", output_path.display());
    println!("  Resolution: {}x{} @ {}fps", size.0, size.1, config.export.fps);

    let engine: Arc<Mutex<dyn DecodeEngine>> = Arc::new(Mutex::new(SolidColorEngine::new(
        size.0, size.1, color, duration,
    )));
    let (_scene_tx, scene_rx) = scene_channel(CaptionScene::new(
        project.project.captions.clone(),
        project.project.style.clone(),
    ));
    let mut render_loop =
        RenderLoop::spawn(engine.clone(), surface.clone(), scene_rx, config.preview.tick_hz);

    let sequencer = ExportSequencer::new(engine, Arc::new(encoder))
        .with_fps(config.export.fps)
        .with_status_callback(Box::new(|report| match report.status {
            ExportStatus::Rendering => {
                print!("\r  Progress: {:.1}%  ", report.progress * 100.0);
                let _ = std::io::stdout().flush();
            }
            ExportStatus::Error => {
                tracing::warn!(message = ?report.message, "Export failed");
            }
            ExportStatus::Success | ExportStatus::Idle => {}
        }));

    let cancel = sequencer.cancel_handle();
    let ctrl_c = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancel.cancel();
        }
    });

    let result = sequencer.export().await;
    ctrl_c.abort();
    render_loop.stop();

    match result {
        Ok(artifact) => {
            artifact.write_to(&output_path).await?;
            println!(
                "\nExport complete: {} ({} bytes, {})",
                output_path.display(),
                artifact.bytes.len(),
                artifact.mime_type
            );
        }
        Err(e) => {
            println!("\nExport failed: {e}");
        }
    }

    Ok(())
}
