//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory where caption projects are stored.
    pub projects_dir: PathBuf,

    /// Interactive preview settings.
    #[serde(default)]
    pub preview: PreviewDefaults,

    /// Burn-in export settings.
    #[serde(default)]
    pub export: ExportDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// TrueType/OpenType font used to rasterize captions.
    /// Without one, captions are laid out but not rasterized.
    #[serde(default)]
    pub font_path: Option<PathBuf>,
}

/// Interactive preview parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewDefaults {
    /// Compositor tick rate (Hz). Runs whether or not playback is active.
    pub tick_hz: u32,

    /// Initial timeline zoom in pixels per second.
    pub zoom: f64,
}

/// Container produced by the export capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CaptureContainer {
    #[default]
    Webm,
    Matroska,
}

impl CaptureContainer {
    /// MIME type of the assembled artifact.
    pub fn mime_type(&self) -> &'static str {
        match self {
            CaptureContainer::Webm => "video/webm",
            CaptureContainer::Matroska => "video/x-matroska",
        }
    }

    /// Conventional file extension.
    pub fn extension(&self) -> &'static str {
        match self {
            CaptureContainer::Webm => "webm",
            CaptureContainer::Matroska => "mkv",
        }
    }
}

/// Default export parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportDefaults {
    /// Fixed capture frame rate.
    pub fps: u32,

    /// Output container.
    pub container: CaptureContainer,

    /// Video bitrate in kbps.
    pub video_bitrate_kbps: u32,

    /// ffmpeg binary used by the encoder.
    pub ffmpeg_path: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "subburn=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            projects_dir: dirs_default_projects(),
            preview: PreviewDefaults::default(),
            export: ExportDefaults::default(),
            logging: LoggingConfig::default(),
            font_path: None,
        }
    }
}

impl Default for PreviewDefaults {
    fn default() -> Self {
        Self {
            tick_hz: 60,
            zoom: 50.0,
        }
    }
}

impl Default for ExportDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            container: CaptureContainer::Webm,
            video_bitrate_kbps: 8000,
            ffmpeg_path: "ffmpeg".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(&config_file_path())
    }

    /// Save config to an explicit path.
    pub fn save_to(&self, config_path: &std::path::Path) -> Result<(), std::io::Error> {
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("subburn").join("config.json")
}

/// Default projects directory.
fn dirs_default_projects() -> PathBuf {
    let base = std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local").join("share")
        });
    base.join("subburn").join("projects")
}
