//! Subburn CLI: create caption projects, edit captions, and burn them in.
//!
//! Usage:
//!   subburn init <NAME>            Create a new project
//!   subburn info <PATH>            Show project information
//!   subburn validate <PATH>        Validate a project
//!   subburn add <PATH>             Add a caption at a time code
//!   subburn split <PATH> <ID>      Split a caption at its midpoint
//!   subburn remove <PATH> <ID>     Remove a caption
//!   subburn retime <PATH> <ID>     Set a caption's start and/or end
//!   subburn import <PATH> <FILE>   Replace captions from SRT/VTT or JSON segments
//!   subburn subs <PATH>            Write SRT/VTT sidecar subtitles
//!   subburn timecode <VALUE>...    Normalize time codes
//!   subburn still <PATH>           Render one caption overlay frame to PNG
//!   subburn export <PATH>          Burn captions into a caption-only video

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use subburn_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "subburn",
    about = "Caption editing and burn-in export",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new empty project
    Init {
        /// Project name
        name: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Source video path (relative to the project root or absolute)
        #[arg(long)]
        source: Option<String>,

        /// Source width
        #[arg(long, default_value = "1920")]
        width: u32,

        /// Source height
        #[arg(long, default_value = "1080")]
        height: u32,

        /// Source duration as a time code
        #[arg(long, default_value = "0")]
        duration: String,
    },

    /// Show project information
    Info {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Validate a project
    Validate {
        /// Path to the project directory
        path: PathBuf,
    },

    /// Add a caption at a time code
    Add {
        /// Path to the project directory
        path: PathBuf,

        /// Playhead position as a time code
        #[arg(long, default_value = "0")]
        at: String,

        /// Caption text
        #[arg(long)]
        text: Option<String>,
    },

    /// Split a caption at its midpoint
    Split {
        /// Path to the project directory
        path: PathBuf,

        /// Caption id
        id: String,
    },

    /// Remove a caption
    Remove {
        /// Path to the project directory
        path: PathBuf,

        /// Caption id
        id: String,
    },

    /// Set a caption's start and/or end
    Retime {
        /// Path to the project directory
        path: PathBuf,

        /// Caption id
        id: String,

        /// New start time code
        #[arg(long)]
        start: Option<String>,

        /// New end time code
        #[arg(long)]
        end: Option<String>,
    },

    /// Replace the captions from an SRT/VTT file or a JSON segment list
    Import {
        /// Path to the project directory
        path: PathBuf,

        /// Subtitle or segment file
        file: PathBuf,
    },

    /// Write sidecar subtitles (.srt or .vtt)
    Subs {
        /// Path to the project directory
        path: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Print canonical time codes
    Timecode {
        /// Time codes or seconds
        #[arg(required = true)]
        values: Vec<String>,
    },

    /// Render the caption overlay at one time code to a transparent PNG
    Still {
        /// Path to the project directory
        path: PathBuf,

        /// Time code to render
        #[arg(long, default_value = "0")]
        at: String,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Font file (overrides the configured font)
        #[arg(long)]
        font: Option<PathBuf>,
    },

    /// Burn captions over a solid background into a video
    Export {
        /// Path to the project directory
        path: PathBuf,

        /// Output file path
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Font file (overrides the configured font)
        #[arg(long)]
        font: Option<PathBuf>,

        /// Background colour
        #[arg(long, default_value = "#000000")]
        background: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = AppConfig::load();
    if cli.verbose {
        config.logging.level = "debug".to_string();
    }
    subburn_common::logging::init_logging(&config.logging);

    match cli.command {
        Commands::Init {
            name,
            output,
            source,
            width,
            height,
            duration,
        } => commands::init::run(name, output, source, width, height, duration),
        Commands::Info { path } => commands::info::run(path),
        Commands::Validate { path } => commands::validate::run(path),
        Commands::Add { path, at, text } => commands::edit::add(path, at, text),
        Commands::Split { path, id } => commands::edit::split(path, id),
        Commands::Remove { path, id } => commands::edit::remove(path, id),
        Commands::Retime {
            path,
            id,
            start,
            end,
        } => commands::edit::retime(path, id, start, end),
        Commands::Import { path, file } => commands::import::run(path, file).await,
        Commands::Subs { path, output } => commands::subs::run(path, output),
        Commands::Timecode { values } => commands::timecode::run(values),
        Commands::Still {
            path,
            at,
            output,
            font,
        } => commands::still::run(&config, path, at, output, font),
        Commands::Export {
            path,
            output,
            font,
            background,
        } => commands::export::run(&config, path, output, font, background).await,
    }
}
