//! Subburn Project Model
//!
//! Defines the core data contracts for caption projects:
//! - **Time codes:** Canonical `HH:MM:SS.mmm` text and its tolerant parser
//! - **Styles:** Global caption style and per-caption partial overrides
//! - **Captions:** Timed text spans and their lifecycle (import, add, split)
//! - **Project:** Top-level metadata, source media, and on-disk layout
//!
//! Caption times are seconds held at millisecond resolution; every value
//! written by an editing operation goes through [`timecode::canonicalize`].

pub mod caption;
pub mod project;
pub mod style;
pub mod timecode;

pub use caption::*;
pub use project::*;
pub use style::*;
pub use timecode::*;
