//! Dashboard view state and terminal screen.
//!
//! The view is an explicit state object owned by the UI loop: poll results
//! arrive as [`ViewUpdate`]s and are rendered into their region, replacing
//! whatever the region showed before.

pub mod screen;
pub mod state;

pub use screen::Screen;
pub use state::{DashboardView, ViewUpdate};
