use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::decode::{AudioDecoder, DecodeError, DecodedBuffer};
use crate::kernel::cancel::DecodeScope;
use crate::kernel::event::InternalEvent;
use crate::kernel::state::PlaybackState;
use crate::kernel::time::as_millis;

/// What the controller should do with a finished decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeOutcome {
    Ready { duration_ms: u64 },
    Failed,
    Stale,
}

/// Turns complete clips into decoded buffers, at most once per clip id.
///
/// Owns the decoded cache; the transport only reads it through [`DecodePipeline::get`].
pub struct DecodePipeline {
    decoder: Arc<dyn AudioDecoder>,
    events: mpsc::UnboundedSender<InternalEvent>,
    session_id: Option<String>,
    scope: DecodeScope,
    cache: HashMap<String, DecodedBuffer>,
    in_flight: HashSet<String>,
    failed: HashSet<String>,
}

impl DecodePipeline {
    pub fn new(decoder: Arc<dyn AudioDecoder>, events: mpsc::UnboundedSender<InternalEvent>) -> Self {
        Self {
            decoder,
            events,
            session_id: None,
            scope: DecodeScope::new(),
            cache: HashMap::new(),
            in_flight: HashSet::new(),
            failed: HashSet::new(),
        }
    }

    /// Observes the clip list and spawns decode work for every new complete clip.
    /// Returns the number of decodes started.
    pub fn sync(&mut self, state: &PlaybackState) -> usize {
        if state.session_id != self.session_id {
            if self.session_id.is_some() {
                debug!(
                    from = ?self.session_id,
                    to = ?state.session_id,
                    in_flight = self.in_flight.len(),
                    "session changed, discarding decode state"
                );
            }
            self.clear();
            self.session_id = state.session_id.clone();
        }

        let pending: Vec<_> = state
            .clips
            .iter()
            .filter(|clip| clip.is_playable())
            .filter(|clip| {
                let id = clip.clip_id.as_str();
                !(self.cache.contains_key(id) || self.in_flight.contains(id) || self.failed.contains(id))
            })
            .collect();
        if pending.is_empty() {
            return 0;
        }

        // Left unscheduled; the next sync inside a runtime picks them up.
        let Ok(runtime) = Handle::try_current() else {
            warn!(pending = pending.len(), "no tokio runtime, decode deferred");
            return 0;
        };
        for clip in &pending {
            self.spawn(&runtime, clip.clip_id.clone(), clip.mime_type.clone(), clip.payload());
        }
        pending.len()
    }

    fn spawn(&mut self, runtime: &Handle, clip_id: String, mime_type: String, payload: bytes::Bytes) {
        self.in_flight.insert(clip_id.clone());

        let token = self.scope.child_token();
        let generation = self.scope.generation();
        let decoder = Arc::clone(&self.decoder);
        let events = self.events.clone();

        runtime.spawn(async move {
            let started = Instant::now();
            let job = tokio::task::spawn_blocking(move || decoder.decode(&mime_type, payload));
            let outcome = tokio::select! {
                _ = token.cancelled() => {
                    debug!(%clip_id, "decode cancelled");
                    return;
                }
                joined = job => joined.unwrap_or_else(|e| Err(DecodeError::Aborted(e.to_string()))),
            };
            if token.is_cancelled() {
                return;
            }
            let _ = events.send(InternalEvent::Decoded {
                generation,
                clip_id,
                elapsed_ms: as_millis(started.elapsed()),
                outcome,
            });
        });
    }

    /// Records a decode result. Results from a superseded scope are dropped.
    pub fn accept(
        &mut self,
        generation: u64,
        clip_id: &str,
        outcome: Result<DecodedBuffer, DecodeError>,
    ) -> DecodeOutcome {
        if !self.scope.is_current(generation) || !self.in_flight.remove(clip_id) {
            return DecodeOutcome::Stale;
        }
        match outcome {
            Ok(buffer) => {
                let duration_ms = buffer.duration_ms();
                self.cache.insert(clip_id.to_string(), buffer);
                DecodeOutcome::Ready { duration_ms }
            }
            Err(e) => {
                warn!(%clip_id, error = %e, "failed to decode clip");
                self.failed.insert(clip_id.to_string());
                DecodeOutcome::Failed
            }
        }
    }

    pub fn get(&self, clip_id: &str) -> Option<&DecodedBuffer> {
        self.cache.get(clip_id)
    }

    pub fn is_decoded(&self, clip_id: &str) -> bool {
        self.cache.contains_key(clip_id)
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// Cancels in-flight work and forgets every decoded buffer.
    pub fn clear(&mut self) {
        self.scope.supersede();
        self.cache.clear();
        self.in_flight.clear();
        self.failed.clear();
        self.session_id = None;
    }
}
