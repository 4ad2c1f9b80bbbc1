//! Replace a project's captions from a transcript.

use std::path::PathBuf;

use subburn_transcript::{
    import_transcript, JsonSegmentsService, SubtitleFileService, TranscriptionService,
};

use super::{load_project, save_project};

pub async fn run(path: PathBuf, file: PathBuf) -> anyhow::Result<()> {
    let mut project = load_project(&path)?;

    let service: Box<dyn TranscriptionService> =
        match file.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Box::new(JsonSegmentsService::new(&file)),
            _ => Box::new(SubtitleFileService::new(&file)),
        };
    let media = project
        .source_path()
        .unwrap_or_else(|| project.root.clone());

    println!("Importing {} via {}", file.display(), service.name());
    let captions = import_transcript(service.as_ref(), &media)
        .await
        .map_err(|e| anyhow::anyhow!("Import failed: {e}"))?;

    let replaced = project.project.captions.len();
    project.project.captions = captions;
    println!(
        "  Imported {} caption(s), replacing {}",
        project.project.captions.len(),
        replaced
    );
    save_project(&mut project)
}
