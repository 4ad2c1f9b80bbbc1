//! Render the caption overlay at one time code.

use std::path::PathBuf;

use subburn_common::config::AppConfig;
use subburn_render_engine::{compose_frame, CaptionScene, TickReport};

use super::{load_project, parse_time_arg, surface_with_font};

pub fn run(
    config: &AppConfig,
    path: PathBuf,
    at: String,
    output: Option<PathBuf>,
    font: Option<PathBuf>,
) -> anyhow::Result<()> {
    let time = parse_time_arg(&at)?;
    let project = load_project(&path)?;
    let source = project
        .project
        .source
        .as_ref()
        .ok_or_else(|| anyhow::anyhow!("Project has no source video; frame size unknown"))?;
    let size = (source.width, source.height);

    let mut surface = surface_with_font(config, font, size)?;
    let scene = CaptionScene::new(project.project.captions.clone(), project.project.style.clone());

    // No decoded frame: the overlay lands on a transparent canvas.
    match compose_frame(&mut surface, time, None, size, &scene) {
        TickReport::Skipped { reason } => anyhow::bail!("Nothing rendered: {reason}"),
        TickReport::Drawn {
            caption_id, lines, ..
        } => match caption_id {
            Some(id) => println!("Caption {id} at {at} ({lines} line(s))"),
            None => println!("No caption active at {at}"),
        },
    }

    let output_path = output.unwrap_or_else(|| {
        project
            .exports_dir()
            .join(format!("still-{}.png", (time * 1000.0).round() as u64))
    });
    surface.save_png(&output_path)?;
    println!("Wrote {}", output_path.display());
    Ok(())
}
