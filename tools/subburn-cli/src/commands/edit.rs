//! Caption edits: add, split, remove, retime.

use std::path::PathBuf;

use subburn_project_model::caption::{
    apply_patch, find_caption, manual_caption, remove_caption, split_in_place, CaptionId,
    CaptionPatch,
};

use super::{load_project, parse_time_arg, save_project};

pub fn add(path: PathBuf, at: String, text: Option<String>) -> anyhow::Result<()> {
    let playhead = parse_time_arg(&at)?;
    let mut project = load_project(&path)?;

    let mut caption = manual_caption(playhead, project.project.source_duration(), chrono::Utc::now());
    if let Some(text) = text.map(|t| t.trim().to_string()).filter(|t| !t.is_empty()) {
        caption.text = text;
    }

    println!("Added {} {}", caption.id, caption.time_range_label());
    project.project.captions.push(caption);
    save_project(&mut project)
}

pub fn split(path: PathBuf, id: String) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;
    let id = CaptionId::new(id);

    let new_id = split_in_place(&mut project.project.captions, &id)
        .ok_or_else(|| anyhow::anyhow!("Caption {id} not found or too short to split"))?;

    for caption_id in [&id, &new_id] {
        if let Some(caption) = find_caption(&project.project.captions, caption_id) {
            println!("  {} {}", caption.id, caption.time_range_label());
        }
    }
    save_project(&mut project)
}

pub fn remove(path: PathBuf, id: String) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;
    let id = CaptionId::new(id);

    let removed = remove_caption(&mut project.project.captions, &id)
        .ok_or_else(|| anyhow::anyhow!("Caption {id} not found"))?;

    println!("Removed {} {}", removed.id, removed.time_range_label());
    save_project(&mut project)
}

pub fn retime(
    path: PathBuf,
    id: String,
    start: Option<String>,
    end: Option<String>,
) -> anyhow::Result<()> {
    if start.is_none() && end.is_none() {
        anyhow::bail!("Nothing to change: pass --start and/or --end");
    }

    let mut project = load_project(&path)?;
    let id = CaptionId::new(id);
    let current = find_caption(&project.project.captions, &id)
        .ok_or_else(|| anyhow::anyhow!("Caption {id} not found"))?;

    let patch = CaptionPatch {
        start: start.as_deref().map(parse_time_arg).transpose()?,
        end: end.as_deref().map(parse_time_arg).transpose()?,
        ..CaptionPatch::default()
    };

    let mut preview = current.clone();
    preview.apply(&patch);
    if preview.end <= preview.start {
        anyhow::bail!(
            "Caption {id} would have an empty or inverted span ({})",
            preview.time_range_label()
        );
    }

    apply_patch(&mut project.project.captions, &id, &patch);
    println!("Retimed {} {}", id, preview.time_range_label());
    save_project(&mut project)
}
