use std::sync::Arc;
use std::time::Duration;

use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, OutputStreamBuilder, Sink};
use tracing::{debug, info};

use super::{AudioOutput, EndedSignal, OutputBackend, OutputError, OutputState};
use crate::audio::decode::DecodedBuffer;
use crate::kernel::time::SessionClock;

/// Opens sessions on the default output device.
#[derive(Debug, Default)]
pub struct RodioBackend;

impl OutputBackend for RodioBackend {
    fn open(&mut self) -> Result<Box<dyn AudioOutput>, OutputError> {
        Ok(Box::new(RodioOutput::open_default()?))
    }
}

pub struct RodioOutput {
    stream: Option<OutputStream>,
    // One sink per source; the watcher thread holds a second handle.
    sink: Option<Arc<Sink>>,
    clock: SessionClock,
    state: OutputState,
}

impl RodioOutput {
    pub fn open_default() -> Result<Self, OutputError> {
        let mut stream = OutputStreamBuilder::open_default_stream()
            .map_err(|e| OutputError::Unavailable(e.to_string()))?;
        stream.log_on_drop(false);
        info!("audio output session opened on default device");

        let mut clock = SessionClock::new();
        clock.resume();
        Ok(Self {
            stream: Some(stream),
            sink: None,
            clock,
            state: OutputState::Running,
        })
    }
}

impl AudioOutput for RodioOutput {
    fn state(&self) -> OutputState {
        self.state
    }

    fn resume(&mut self) -> Result<(), OutputError> {
        if self.state == OutputState::Closed {
            return Err(OutputError::Closed);
        }
        if let Some(sink) = &self.sink {
            sink.play();
        }
        self.clock.resume();
        self.state = OutputState::Running;
        Ok(())
    }

    fn suspend(&mut self) -> Result<(), OutputError> {
        if self.state == OutputState::Closed {
            return Err(OutputError::Closed);
        }
        if let Some(sink) = &self.sink {
            sink.pause();
        }
        self.clock.suspend();
        self.state = OutputState::Suspended;
        Ok(())
    }

    fn close(&mut self) -> Result<(), OutputError> {
        if self.state == OutputState::Closed {
            return Err(OutputError::Closed);
        }
        if let Some(sink) = self.sink.take() {
            sink.stop();
        }
        self.stream = None;
        self.clock.suspend();
        self.state = OutputState::Closed;
        debug!("audio output session closed");
        Ok(())
    }

    fn current_time(&self) -> Duration {
        self.clock.now()
    }

    fn start_source(&mut self, buffer: &DecodedBuffer, ended: EndedSignal) -> Result<(), OutputError> {
        let Some(stream) = &self.stream else {
            return Err(OutputError::Closed);
        };
        if self.sink.as_ref().is_some_and(|sink| !sink.empty()) {
            return Err(OutputError::SourceActive);
        }

        let sink = Sink::connect_new(stream.mixer());
        if self.state == OutputState::Suspended {
            sink.pause();
        }
        sink.append(SamplesBuffer::new(
            buffer.channels,
            buffer.sample_rate,
            buffer.samples.to_vec(),
        ));

        let sink = Arc::new(sink);
        let watcher = Arc::clone(&sink);
        std::thread::spawn(move || {
            watcher.sleep_until_end();
            ended.fire();
        });
        self.sink = Some(sink);
        Ok(())
    }

    fn stop_source(&mut self) -> Result<(), OutputError> {
        let sink = self.sink.take().ok_or(OutputError::NoSource)?;
        sink.stop();
        Ok(())
    }
}
