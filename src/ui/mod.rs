pub mod controls;

pub use controls::{format_duration, progress_percent, ControlsView};
