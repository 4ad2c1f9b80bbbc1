//! Initialize a new Subburn project.

use std::path::PathBuf;

use subburn_project_model::project::SourceMedia;
use subburn_project_model::LoadedProject;

use super::{parse_time_arg, save_project};

pub fn run(
    name: String,
    output: PathBuf,
    source: Option<String>,
    width: u32,
    height: u32,
    duration: String,
) -> anyhow::Result<()> {
    let duration_secs = parse_time_arg(&duration)?;
    let project_dir = output.join(&name);
    println!("Creating project '{}' at {}", name, project_dir.display());

    let mut project = LoadedProject::create(&project_dir, &name)
        .map_err(|e| anyhow::anyhow!("Failed to create project: {e}"))?;

    if let Some(path) = source {
        project.project.source = Some(SourceMedia {
            path,
            width,
            height,
            duration_secs,
        });
        save_project(&mut project)?;
    }

    println!("Project created successfully:");
    println!("  Directory: {}", project.root.display());
    match &project.project.source {
        Some(source) => println!(
            "  Source: {} ({}x{}, {:.3}s)",
            source.path, source.width, source.height, source.duration_secs
        ),
        None => println!("  Source: (none, set one in meta/project.json)"),
    }
    println!();
    println!("Directory structure:");
    println!("  {}/", name);
    println!("  ├── sources/     (source video)");
    println!("  ├── meta/        (project.json)");
    println!("  └── exports/     (rendered output, subtitles)");

    Ok(())
}
