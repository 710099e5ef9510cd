use std::collections::VecDeque;

use super::event::TelemetryEvent;
use super::metrics::{compute_snapshot, TelemetrySnapshot};

// Roughly an hour of busy streaming; older events fall off the front.
const MAX_EVENTS: usize = 10_000;

#[derive(Debug)]
pub struct TelemetryRecorder {
    buffer: VecDeque<TelemetryEvent>,
}

impl TelemetryRecorder {
    pub fn new() -> Self {
        Self {
            buffer: VecDeque::with_capacity(MAX_EVENTS),
        }
    }

    pub fn record(&mut self, event: TelemetryEvent) {
        if self.buffer.len() >= MAX_EVENTS {
            self.buffer.pop_front();
        }
        self.buffer.push_back(event);
    }

    pub fn events(&self) -> impl Iterator<Item = &TelemetryEvent> {
        self.buffer.iter()
    }

    /// Totals over everything still in the ring.
    pub fn snapshot(&self) -> TelemetrySnapshot {
        compute_snapshot(&self.buffer)
    }

    /// Totals for the latest voice session only: events from its
    /// `SessionStarted` onward. Falls back to the whole ring when no session
    /// start is left in it.
    pub fn session_snapshot(&self) -> TelemetrySnapshot {
        let start = self
            .buffer
            .iter()
            .rposition(|event| *event == TelemetryEvent::SessionStarted)
            .unwrap_or(0);
        // VecDeque isn't contiguous, so copy the tail out
        let tail: VecDeque<TelemetryEvent> = self.buffer.range(start..).cloned().collect();
        compute_snapshot(&tail)
    }

    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for TelemetryRecorder {
    fn default() -> Self {
        Self::new()
    }
}
