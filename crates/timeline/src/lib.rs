//! Subburn Timeline
//!
//! Interactive caption timing on a zoomable horizontal axis:
//! - **View:** pixel/time mapping, zoom bounds, hit testing, ruler ticks
//! - **Controller:** the pointer-drag state machine that moves and resizes
//!   caption spans and scrubs the playhead
//!
//! The controller never owns captions. Each pointer event returns at most
//! one [`TimelineAction`] for the application to apply to its own list.

pub mod controller;
pub mod view;

pub use controller::*;
pub use view::*;
