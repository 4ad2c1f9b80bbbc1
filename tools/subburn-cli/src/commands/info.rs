//! Show project information.

use std::path::PathBuf;

use subburn_project_model::caption::sorted_by_start;
use subburn_project_model::timecode::format_time;

use super::load_project;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let project = load_project(&path)?;
    let p = &project.project;

    println!("Project: {}", p.name);
    println!("  ID: {}", p.id);
    println!("  Created: {}", p.created_at);
    println!("  Modified: {}", p.modified_at);
    println!();

    println!("Source:");
    match &p.source {
        Some(source) => {
            println!("  Path: {}", source.path);
            println!("  Resolution: {}x{}", source.width, source.height);
            println!("  Duration: {}", format_time(source.duration_secs));
        }
        None => println!("  (none)"),
    }
    println!();

    println!("Style:");
    println!(
        "  Font: {} {} @ {}px",
        p.style.font_family, p.style.font_weight, p.style.font_size
    );
    println!(
        "  Text: {} (border {} x{})",
        p.style.text_color, p.style.border_color, p.style.border_width
    );
    println!(
        "  Background: {} @ {:.0}%",
        p.style.background_color,
        p.style.background_opacity * 100.0
    );
    println!(
        "  Position: {}% x {}%",
        p.style.position_x, p.style.position_y
    );
    println!("  Animation: {:?}", p.style.animation_type);
    println!();

    println!("Captions: {}", p.captions.len());
    for caption in sorted_by_start(&p.captions) {
        let marker = if caption.style_override.is_some() { "*" } else { " " };
        println!(
            "  {marker} {:<16} {}  {}",
            caption.id.as_str(),
            caption.time_range_label(),
            caption.text.replace('\n', " / ")
        );
    }

    Ok(())
}
