//! Platform output session.
//!
//! The transport controller is the only owner of an output session and of the
//! single source playing through it.

pub mod mock_audio;
pub mod rodio_output;

use std::time::Duration;

use tokio::sync::mpsc;

use crate::audio::decode::DecodedBuffer;
use crate::kernel::event::InternalEvent;

pub use mock_audio::{MockBackend, MockOutput};
pub use rodio_output::{RodioBackend, RodioOutput};

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("no output device available: {0}")]
    Unavailable(String),

    #[error("output session is closed")]
    Closed,

    #[error("a source is already active")]
    SourceActive,

    #[error("no active source")]
    NoSource,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputState {
    Running,
    Suspended,
    Closed,
}

/// One-shot "ended" notification for a started source.
#[derive(Debug)]
pub struct EndedSignal {
    source_id: u64,
    clip_id: String,
    events: mpsc::UnboundedSender<InternalEvent>,
}

impl EndedSignal {
    pub(crate) fn new(source_id: u64, clip_id: String, events: mpsc::UnboundedSender<InternalEvent>) -> Self {
        Self {
            source_id,
            clip_id,
            events,
        }
    }

    pub fn source_id(&self) -> u64 {
        self.source_id
    }

    pub fn clip_id(&self) -> &str {
        &self.clip_id
    }

    pub fn fire(self) {
        let _ = self.events.send(InternalEvent::SourceEnded {
            source_id: self.source_id,
            clip_id: self.clip_id,
        });
    }
}

/// An open output context all sources connect to.
pub trait AudioOutput {
    fn state(&self) -> OutputState;

    fn resume(&mut self) -> Result<(), OutputError>;

    fn suspend(&mut self) -> Result<(), OutputError>;

    fn close(&mut self) -> Result<(), OutputError>;

    /// Session clock. Does not advance while suspended.
    fn current_time(&self) -> Duration;

    /// Starts playing `buffer`. `ended` fires once when it drains naturally.
    fn start_source(&mut self, buffer: &DecodedBuffer, ended: EndedSignal) -> Result<(), OutputError>;

    fn stop_source(&mut self) -> Result<(), OutputError>;
}

/// Opens output sessions on demand.
pub trait OutputBackend {
    fn open(&mut self) -> Result<Box<dyn AudioOutput>, OutputError>;
}
