use crate::outputs::OutputError;

#[derive(Debug, thiserror::Error)]
pub enum PlaybackError {
    #[error("output session: {0}")]
    Output(#[from] OutputError),

    #[error("playback controller is no longer running")]
    ControllerClosed,

    #[error("invalid configuration: {0}")]
    Config(String),
}
