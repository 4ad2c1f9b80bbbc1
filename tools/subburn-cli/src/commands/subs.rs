//! Write sidecar subtitles.

use std::path::PathBuf;

use subburn_transcript::save_subtitles;

use super::load_project;

pub fn run(path: PathBuf, output: Option<PathBuf>) -> anyhow::Result<()> {
    let project = load_project(&path)?;
    let output_path = output.unwrap_or_else(|| project.exports_dir().join("captions.srt"));

    if let Some(parent) = output_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    save_subtitles(&project.project.captions, &output_path)
        .map_err(|e| anyhow::anyhow!("Failed to write subtitles: {e}"))?;

    println!(
        "Wrote {} cue(s) to {}",
        project.project.captions.len(),
        output_path.display()
    );
    Ok(())
}
