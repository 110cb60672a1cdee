//! Terminal output
//!
//! Everything that draws to the terminal lives here; commands decide what
//! to show, these modules decide how it looks.

pub mod list;
pub mod progress;
pub mod theme;

pub use progress::ProgressLine;
pub use theme::Theme;
