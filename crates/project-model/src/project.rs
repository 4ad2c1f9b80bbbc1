//! Project metadata and on-disk layout.
//!
//! A project ties a source video to its caption list and global style.
//! It lives in a directory:
//!
//! ```text
//! <root>/
//!   sources/   (the source video, if copied in)
//!   meta/      (project.json)
//!   exports/   (burned-in renders, sidecar subtitles)
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::caption::Caption;
use crate::style::StyleConfig;

/// Current project schema version.
pub const PROJECT_VERSION: &str = "1.0";

/// Top-level project file (`meta/project.json`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptionProject {
    /// Schema version.
    pub version: String,

    /// Human-readable project name.
    pub name: String,

    /// Unique project identifier.
    pub id: String,

    /// Creation timestamp (RFC 3339).
    pub created_at: String,

    /// Last modified timestamp (RFC 3339).
    pub modified_at: String,

    /// The video captions are burned into.
    #[serde(default)]
    pub source: Option<SourceMedia>,

    /// Global caption style.
    #[serde(default)]
    pub style: StyleConfig,

    /// Captions in list order.
    #[serde(default)]
    pub captions: Vec<Caption>,
}

/// Reference to the source video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceMedia {
    /// Path to the video, relative to the project root or absolute.
    pub path: String,

    /// Native resolution in pixels.
    pub width: u32,
    pub height: u32,

    /// Duration in seconds, `0.0` when not yet known.
    #[serde(default)]
    pub duration_secs: f64,
}

/// The complete in-memory representation of a loaded project.
#[derive(Debug, Clone)]
pub struct LoadedProject {
    /// Filesystem path to the project directory.
    pub root: PathBuf,

    /// Project contents.
    pub project: CaptionProject,
}

impl CaptionProject {
    /// Create an empty project.
    pub fn new(name: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        let stamp = now.to_rfc3339();
        Self {
            version: PROJECT_VERSION.to_string(),
            name: name.into(),
            id: format!("proj-{}", now.timestamp_nanos_opt().unwrap_or_default()),
            created_at: stamp.clone(),
            modified_at: stamp,
            source: None,
            style: StyleConfig::default(),
            captions: vec![],
        }
    }

    /// Duration used for editing: the detected source duration, or 0 when
    /// unknown.
    pub fn source_duration(&self) -> f64 {
        self.source
            .as_ref()
            .map(|s| s.duration_secs)
            .filter(|d| d.is_finite() && *d > 0.0)
            .unwrap_or(0.0)
    }

    /// Bump `modified_at` to now.
    pub fn touch(&mut self) {
        self.modified_at = chrono::Utc::now().to_rfc3339();
    }
}

impl LoadedProject {
    fn project_path(root: &Path) -> PathBuf {
        root.join("meta").join("project.json")
    }

    /// Load a project from a directory.
    pub fn load(root: impl AsRef<Path>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();
        let project_path = Self::project_path(&root);

        let project_json =
            std::fs::read_to_string(&project_path).map_err(|e| ProjectError::IoError {
                path: project_path.clone(),
                source: e,
            })?;

        let project: CaptionProject =
            serde_json::from_str(&project_json).map_err(|e| ProjectError::ParseError {
                path: project_path,
                source: e,
            })?;

        Ok(Self { root, project })
    }

    /// Save the project file to disk.
    pub fn save(&self) -> Result<(), ProjectError> {
        let meta_dir = self.root.join("meta");
        std::fs::create_dir_all(&meta_dir).map_err(|e| ProjectError::IoError {
            path: meta_dir.clone(),
            source: e,
        })?;

        let project_path = Self::project_path(&self.root);
        let project_json =
            serde_json::to_string_pretty(&self.project).map_err(|e| ProjectError::ParseError {
                path: project_path.clone(),
                source: e,
            })?;
        std::fs::write(&project_path, project_json).map_err(|e| ProjectError::IoError {
            path: project_path,
            source: e,
        })?;

        Ok(())
    }

    /// Create a new project on disk with the standard directory structure.
    pub fn create(root: impl AsRef<Path>, name: impl Into<String>) -> Result<Self, ProjectError> {
        let root = root.as_ref().to_path_buf();

        for subdir in &["sources", "meta", "exports"] {
            std::fs::create_dir_all(root.join(subdir)).map_err(|e| ProjectError::IoError {
                path: root.join(subdir),
                source: e,
            })?;
        }

        let loaded = Self {
            root,
            project: CaptionProject::new(name),
        };
        loaded.save()?;
        Ok(loaded)
    }

    /// Resolve the source video path against the project root.
    pub fn source_path(&self) -> Option<PathBuf> {
        self.project.source.as_ref().map(|s| {
            let path = PathBuf::from(&s.path);
            if path.is_absolute() {
                path
            } else {
                self.root.join(path)
            }
        })
    }

    /// Default location for rendered output.
    pub fn exports_dir(&self) -> PathBuf {
        self.root.join("exports")
    }

    /// Report problems that would make the project unusable or surprising:
    /// missing source media, duplicate ids, inverted spans, bad style values.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = vec![];

        match self.source_path() {
            Some(path) if !path.exists() => {
                errors.push(format!("Source video missing: {}", path.display()));
            }
            None => errors.push("No source video set".to_string()),
            _ => {}
        }

        let mut seen = HashSet::new();
        for caption in &self.project.captions {
            if !seen.insert(caption.id.as_str()) {
                errors.push(format!("Duplicate caption id: {}", caption.id));
            }
            if caption.end <= caption.start {
                errors.push(format!(
                    "Caption {} has an empty or inverted span ({})",
                    caption.id,
                    caption.time_range_label()
                ));
            }
        }

        for issue in self.project.style.validate() {
            errors.push(format!("Global style: {issue}"));
        }
        for caption in &self.project.captions {
            if let Some(style_override) = &caption.style_override {
                for issue in style_override.merge_onto(&self.project.style).validate() {
                    errors.push(format!("Caption {} style: {issue}", caption.id));
                }
            }
        }

        errors
    }
}

/// Errors that can occur when working with projects.
#[derive(Debug, thiserror::Error)]
pub enum ProjectError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid project: {message}")]
    ValidationError { message: String },
}
