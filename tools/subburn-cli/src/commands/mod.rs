pub mod edit;
pub mod export;
pub mod import;
pub mod info;
pub mod init;
pub mod still;
pub mod subs;
pub mod timecode;
pub mod validate;

use std::path::{Path, PathBuf};

use subburn_common::config::AppConfig;
use subburn_project_model::LoadedProject;
use subburn_project_model::timecode::try_parse_time;
use subburn_render_engine::DrawingSurface;

pub(crate) fn load_project(path: &Path) -> anyhow::Result<LoadedProject> {
    LoadedProject::load(path).map_err(|e| anyhow::anyhow!("Failed to load project: {e}"))
}

pub(crate) fn save_project(project: &mut LoadedProject) -> anyhow::Result<()> {
    project.project.touch();
    project
        .save()
        .map_err(|e| anyhow::anyhow!("Failed to save project: {e}"))
}

pub(crate) fn parse_time_arg(value: &str) -> anyhow::Result<f64> {
    try_parse_time(value).ok_or_else(|| anyhow::anyhow!("Unreadable time code: {value}"))
}

/// A surface at `size` with the font from `--font`, else the configured
/// one. Without a font, captions are laid out but no glyphs are drawn.
pub(crate) fn surface_with_font(
    config: &AppConfig,
    font: Option<PathBuf>,
    size: (u32, u32),
) -> anyhow::Result<DrawingSurface> {
    let surface = DrawingSurface::new(size.0, size.1);
    match font.or_else(|| config.font_path.clone()) {
        Some(path) => {
            let font = DrawingSurface::load_font(&path)?;
            Ok(surface.with_font(font))
        }
        None => {
            println!("  Warning: no font configured; caption text will not be drawn");
            Ok(surface)
        }
    }
}
