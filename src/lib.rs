pub mod audio;
pub mod config;
pub mod error;
pub mod kernel;
pub mod outputs;
pub mod ui;

// Re-export specific items for convenient access
pub use config::PlaybackConfig;
pub use error::PlaybackError;
pub use kernel::event::StreamEvent;
pub use kernel::reactor::{PlaybackController, PlaybackHandle};
pub use kernel::state::{PlaybackAction, PlaybackState, PlaybackStatus};
pub use kernel::view::PlaybackView;
