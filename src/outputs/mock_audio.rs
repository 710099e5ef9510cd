use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{AudioOutput, EndedSignal, OutputBackend, OutputError, OutputState};
use crate::audio::decode::DecodedBuffer;

#[derive(Debug)]
struct MockSource {
    ended: EndedSignal,
    length: Duration,
    started_at: Duration,
}

#[derive(Debug, Default)]
struct MockSession {
    opened: usize,
    state: Option<OutputState>,
    clock: Duration,
    started: Vec<String>,
    stopped_sources: usize,
    active: Option<MockSource>,
}

/// Headless output with a manually driven clock. Clones share one recorded session.
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    session: Arc<Mutex<MockSession>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockSession> {
        self.session.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Number of sessions opened so far.
    pub fn opened(&self) -> usize {
        self.lock().opened
    }

    pub fn state(&self) -> Option<OutputState> {
        self.lock().state
    }

    /// Clip ids in the order their sources were started.
    pub fn started(&self) -> Vec<String> {
        self.lock().started.clone()
    }

    pub fn stopped_sources(&self) -> usize {
        self.lock().stopped_sources
    }

    pub fn active_clip(&self) -> Option<String> {
        self.lock()
            .active
            .as_ref()
            .map(|source| source.ended.clip_id().to_string())
    }

    /// Playback time left on the active source.
    pub fn active_remaining(&self) -> Option<Duration> {
        let session = self.lock();
        let source = session.active.as_ref()?;
        let played = session.clock.saturating_sub(source.started_at);
        Some(source.length.saturating_sub(played))
    }

    /// Moves the session clock forward, as long as the session is running.
    pub fn advance(&self, by: Duration) {
        let mut session = self.lock();
        if session.state == Some(OutputState::Running) {
            session.clock += by;
        }
    }

    /// Simulates the active source draining. Returns false when nothing is playing.
    pub fn finish_active(&self) -> bool {
        let source = self.lock().active.take();
        match source {
            Some(source) => {
                source.ended.fire();
                true
            }
            None => false,
        }
    }
}

impl OutputBackend for MockBackend {
    fn open(&mut self) -> Result<Box<dyn AudioOutput>, OutputError> {
        let mut session = self.lock();
        session.opened += 1;
        session.state = Some(OutputState::Running);
        session.clock = Duration::ZERO;
        session.active = None;
        drop(session);
        Ok(Box::new(MockOutput {
            backend: self.clone(),
        }))
    }
}

#[derive(Debug)]
pub struct MockOutput {
    backend: MockBackend,
}

impl MockOutput {
    fn transition(&mut self, to: OutputState) -> Result<(), OutputError> {
        let mut session = self.backend.lock();
        if session.state == Some(OutputState::Closed) {
            return Err(OutputError::Closed);
        }
        session.state = Some(to);
        Ok(())
    }
}

impl AudioOutput for MockOutput {
    fn state(&self) -> OutputState {
        self.backend.lock().state.unwrap_or(OutputState::Closed)
    }

    fn resume(&mut self) -> Result<(), OutputError> {
        self.transition(OutputState::Running)
    }

    fn suspend(&mut self) -> Result<(), OutputError> {
        self.transition(OutputState::Suspended)
    }

    fn close(&mut self) -> Result<(), OutputError> {
        self.transition(OutputState::Closed)?;
        self.backend.lock().active = None;
        Ok(())
    }

    fn current_time(&self) -> Duration {
        self.backend.lock().clock
    }

    fn start_source(&mut self, buffer: &DecodedBuffer, ended: EndedSignal) -> Result<(), OutputError> {
        let mut session = self.backend.lock();
        if session.state == Some(OutputState::Closed) {
            return Err(OutputError::Closed);
        }
        if session.active.is_some() {
            return Err(OutputError::SourceActive);
        }
        session.started.push(ended.clip_id().to_string());
        let started_at = session.clock;
        session.active = Some(MockSource {
            ended,
            length: buffer.duration(),
            started_at,
        });
        Ok(())
    }

    fn stop_source(&mut self) -> Result<(), OutputError> {
        let mut session = self.backend.lock();
        session.active.take().ok_or(OutputError::NoSource)?;
        session.stopped_sources += 1;
        Ok(())
    }
}
