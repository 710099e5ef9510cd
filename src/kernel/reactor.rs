use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use super::event::{Command, Input, InternalEvent, StreamEvent};
use super::state::{reduce, PlaybackAction, PlaybackState, PlaybackStatus};
use super::telemetry::event::TelemetryEvent;
use super::telemetry::recorder::TelemetryRecorder;
use super::time::as_millis;
use super::view::PlaybackView;
use crate::audio::decode::{AudioDecoder, DecodeError, DecodedBuffer};
use crate::audio::pipeline::{DecodeOutcome, DecodePipeline};
use crate::config::PlaybackConfig;
use crate::error::PlaybackError;
use crate::outputs::{AudioOutput, EndedSignal, OutputBackend, OutputError, OutputState};

#[derive(Debug, Clone, PartialEq, Eq)]
struct ActiveSource {
    source_id: u64,
    clip_id: String,
}

/// Transport controller: owns the reducer state, the decode pipeline and the
/// single output session, and sequences clips through it one at a time.
///
/// Decoding is scheduled on the ambient Tokio runtime. Dispatching outside one
/// defers decodes until a later state change happens inside a runtime.
pub struct PlaybackController {
    config: PlaybackConfig,
    state: Arc<PlaybackState>,
    pipeline: DecodePipeline,
    backend: Box<dyn OutputBackend>,
    output: Option<Box<dyn AudioOutput>>,
    active: Option<ActiveSource>,
    next_source_id: u64,
    // Output clock reading when the current clip's source started.
    clip_started_at: Option<Duration>,
    progress_ms: u64,
    internal_tx: mpsc::UnboundedSender<InternalEvent>,
    internal_rx: mpsc::UnboundedReceiver<InternalEvent>,
    view_tx: watch::Sender<PlaybackView>,
    pub telemetry: TelemetryRecorder,
}

impl PlaybackController {
    pub fn new(
        config: PlaybackConfig,
        decoder: Arc<dyn AudioDecoder>,
        backend: Box<dyn OutputBackend>,
    ) -> Self {
        let (internal_tx, internal_rx) = mpsc::unbounded_channel();
        let (view_tx, _) = watch::channel(PlaybackView::default());
        Self {
            config,
            state: Arc::new(PlaybackState::new()),
            pipeline: DecodePipeline::new(decoder, internal_tx.clone()),
            backend,
            output: None,
            active: None,
            next_source_id: 0,
            clip_started_at: None,
            progress_ms: 0,
            internal_tx,
            internal_rx,
            view_tx,
            telemetry: TelemetryRecorder::new(),
        }
    }

    /// Creates the async surface for this controller and the input stream `run` consumes.
    pub fn connect(&self) -> (PlaybackHandle, mpsc::Receiver<Input>) {
        let (inputs, rx) = mpsc::channel(self.config.event_buffer);
        let handle = PlaybackHandle {
            inputs,
            view: self.view_tx.subscribe(),
        };
        (handle, rx)
    }

    pub fn state(&self) -> &Arc<PlaybackState> {
        &self.state
    }

    pub fn pipeline(&self) -> &DecodePipeline {
        &self.pipeline
    }

    pub fn progress_ms(&self) -> u64 {
        self.progress_ms
    }

    pub fn view(&self) -> PlaybackView {
        PlaybackView::project(&self.state, self.progress_ms)
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackView> {
        self.view_tx.subscribe()
    }

    /// Applies one action and runs the effects that observe state changes.
    pub fn dispatch(&mut self, action: PlaybackAction) {
        if self.apply(action) {
            self.after_change();
        }
    }

    pub fn ingest(&mut self, event: StreamEvent) {
        self.dispatch(event.into());
    }

    // Reduce only. Returns whether the state changed.
    fn apply(&mut self, action: PlaybackAction) -> bool {
        let next = reduce(&self.state, action);
        if Arc::ptr_eq(&next, &self.state) {
            return false;
        }

        if next.session_id != self.state.session_id {
            // Sources of a superseded session never keep playing.
            self.stop_active_source();
            self.clip_started_at = None;
            if let Some(session_id) = &next.session_id {
                info!(%session_id, "voice session started");
                self.telemetry.record(TelemetryEvent::SessionStarted);
            }
        }
        self.state = next;
        true
    }

    fn after_change(&mut self) {
        // 1. Decode whatever just became complete
        self.pipeline.sync(&self.state);

        // 2. Transport
        self.maybe_auto_play();
        self.start_current_if_ready();
        if self.state.status == PlaybackStatus::Idle {
            self.progress_ms = 0;
        }

        // 3. Observers
        self.publish();
    }

    /// Resumes (or lazily opens) the output session and starts the current clip
    /// as soon as its decoded buffer exists.
    pub fn play(&mut self) -> Result<(), PlaybackError> {
        self.ensure_output_running()?;
        self.apply(PlaybackAction::SetStatus(PlaybackStatus::Playing));
        self.after_change();
        Ok(())
    }

    /// Suspends the output session and halts the progress clock. The active
    /// source stays in place.
    pub fn pause(&mut self) -> Result<(), PlaybackError> {
        if let Some(output) = self.output.as_mut() {
            if output.state() == OutputState::Running {
                output.suspend()?;
            }
        }
        self.dispatch(PlaybackAction::SetStatus(PlaybackStatus::Paused));
        Ok(())
    }

    /// Resets playback and releases every resource. Safe in any state.
    pub fn stop(&mut self) -> Result<(), PlaybackError> {
        self.teardown();
        self.pipeline.clear();
        self.apply(PlaybackAction::Reset);
        self.progress_ms = 0;
        self.telemetry.record(TelemetryEvent::Reset);
        self.publish();
        Ok(())
    }

    fn ensure_output_running(&mut self) -> Result<(), OutputError> {
        let reusable = self
            .output
            .as_ref()
            .is_some_and(|output| output.state() != OutputState::Closed);
        if !reusable {
            self.output = Some(self.backend.open()?);
            self.active = None;
            self.clip_started_at = None;
        }
        if let Some(output) = self.output.as_mut() {
            if output.state() == OutputState::Suspended {
                output.resume()?;
            }
        }
        Ok(())
    }

    fn maybe_auto_play(&mut self) {
        if !self.config.auto_play
            || !self.state.is_voice_active
            || self.state.status != PlaybackStatus::Idle
        {
            return;
        }
        let clip_id = match self.state.current_clip() {
            Some(clip) if clip.is_complete && self.pipeline.is_decoded(&clip.clip_id) => clip.clip_id.clone(),
            _ => return,
        };

        if let Err(e) = self.ensure_output_running() {
            warn!(error = %e, "auto-play could not open the output session");
            return;
        }
        debug!(%clip_id, "auto-play");
        self.apply(PlaybackAction::SetStatus(PlaybackStatus::Playing));
    }

    // Single-flight: never starts a source while another one is referenced.
    fn start_current_if_ready(&mut self) {
        if self.state.status != PlaybackStatus::Playing || self.active.is_some() {
            return;
        }
        let Some(clip) = self.state.current_clip() else {
            return;
        };
        if !clip.is_complete {
            return;
        }
        let clip_id = clip.clip_id.clone();
        let Some(buffer) = self.pipeline.get(&clip_id) else {
            return;
        };
        let Some(output) = self.output.as_mut() else {
            return;
        };

        self.next_source_id += 1;
        let source_id = self.next_source_id;
        let ended = EndedSignal::new(source_id, clip_id.clone(), self.internal_tx.clone());
        match output.start_source(buffer, ended) {
            Ok(()) => {
                info!(%clip_id, index = self.state.current_clip_index, "clip playback started");
                self.clip_started_at = Some(output.current_time());
                self.telemetry.record(TelemetryEvent::SourceStarted {
                    clip_index: self.state.current_clip_index,
                });
                self.active = Some(ActiveSource { source_id, clip_id });
            }
            Err(e) => warn!(%clip_id, error = %e, "failed to start clip source"),
        }
    }

    pub fn handle_input(&mut self, input: Input) {
        match input {
            Input::Stream(event) => self.ingest(event),
            Input::Command(command) => self.handle_command(command),
        }
    }

    fn handle_command(&mut self, command: Command) {
        match command {
            Command::Play(reply) => reply_with(reply, self.play()),
            Command::Pause(reply) => reply_with(reply, self.pause()),
            Command::Stop(reply) => reply_with(reply, self.stop()),
        }
    }

    pub fn handle_internal(&mut self, event: InternalEvent) {
        match event {
            InternalEvent::Decoded {
                generation,
                clip_id,
                elapsed_ms,
                outcome,
            } => self.on_decoded(generation, &clip_id, elapsed_ms, outcome),
            InternalEvent::SourceEnded { source_id, clip_id } => self.on_source_ended(source_id, clip_id),
        }
    }

    fn on_decoded(
        &mut self,
        generation: u64,
        clip_id: &str,
        elapsed_ms: u64,
        outcome: Result<DecodedBuffer, DecodeError>,
    ) {
        let clip_index = self.state.clips.iter().position(|clip| clip.clip_id == clip_id);
        match self.pipeline.accept(generation, clip_id, outcome) {
            DecodeOutcome::Stale => {
                debug!(%clip_id, "dropping stale decode result");
                self.telemetry.record(TelemetryEvent::DecodeDiscarded);
            }
            DecodeOutcome::Failed => {
                self.telemetry.record(TelemetryEvent::DecodeFailed {
                    clip_index: clip_index.unwrap_or_default(),
                });
            }
            DecodeOutcome::Ready { duration_ms } => {
                self.telemetry.record(TelemetryEvent::ClipDecoded {
                    clip_index: clip_index.unwrap_or_default(),
                    decode_ms: elapsed_ms,
                    duration_ms,
                });
                let known = self.state.clip(clip_id).and_then(|clip| clip.duration_ms);
                let drifted = known.map_or(true, |known| {
                    known.abs_diff(duration_ms) > self.config.duration_tolerance_ms
                });
                if drifted {
                    self.apply(PlaybackAction::UpdateClipDuration {
                        clip_id: clip_id.to_string(),
                        duration_ms,
                    });
                }
                self.apply(PlaybackAction::ClipReady {
                    clip_id: clip_id.to_string(),
                });
                self.after_change();
            }
        }
    }

    fn on_source_ended(&mut self, source_id: u64, clip_id: String) {
        if self.active.as_ref().map(|active| active.source_id) != Some(source_id) {
            debug!(%clip_id, source_id, "ignoring end of inactive source");
            return;
        }
        self.active = None;
        self.clip_started_at = self.output.as_ref().map(|output| output.current_time());

        let clip_index = self.state.current_clip_index;
        let advanced = self.state.status != PlaybackStatus::Paused;
        self.telemetry.record(TelemetryEvent::SourceEnded { clip_index, advanced });
        if advanced {
            debug!(%clip_id, "clip finished, advancing");
            self.apply(PlaybackAction::AdvanceClip { clip_id });
        }
        self.after_change();
    }

    /// Waits for the next async result and applies it. Returns false once no
    /// more results can arrive.
    pub async fn process_next(&mut self) -> bool {
        match self.internal_rx.recv().await {
            Some(event) => {
                self.handle_internal(event);
                true
            }
            None => false,
        }
    }

    /// Applies every async result that is already waiting.
    pub fn drain_internal(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(event) = self.internal_rx.try_recv() {
            self.handle_internal(event);
            handled += 1;
        }
        handled
    }

    /// One progress clock tick. No-op unless playing.
    pub fn poll_progress(&mut self) {
        if self.state.status != PlaybackStatus::Playing {
            return;
        }
        self.progress_ms = self.compute_progress();
        self.publish();
    }

    fn compute_progress(&self) -> u64 {
        let before = self.state.elapsed_before_current_ms();
        let running = match (self.clip_started_at, self.output.as_ref()) {
            (Some(started), Some(output)) => as_millis(output.current_time().saturating_sub(started)),
            _ => 0,
        };
        let cap = self
            .state
            .current_clip()
            .and_then(|clip| clip.duration_ms)
            .unwrap_or(running);
        (before + running.min(cap)).min(self.state.total_duration_ms())
    }

    fn publish(&self) {
        let view = self.view();
        self.view_tx.send_if_modified(|current| {
            if *current == view {
                return false;
            }
            *current = view;
            true
        });
    }

    fn stop_active_source(&mut self) {
        if self.active.take().is_none() {
            return;
        }
        if let Some(output) = self.output.as_mut() {
            // Double stop is an expected race.
            let _ = output.stop_source();
        }
    }

    // Best effort: every failure here is an expected race.
    fn teardown(&mut self) {
        self.stop_active_source();
        if let Some(mut output) = self.output.take() {
            let _ = output.close();
        }
        self.clip_started_at = None;
    }

    /// Driver loop: inbound inputs, async results and the progress clock.
    pub async fn run(mut self, mut inputs: mpsc::Receiver<Input>) {
        info!(
            auto_play = self.config.auto_play,
            progress_ms = self.config.progress_interval_ms,
            "playback controller started"
        );

        let mut progress = interval(self.config.progress_interval());
        progress.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            let playing = self.state.status == PlaybackStatus::Playing;
            tokio::select! {
                input = inputs.recv() => match input {
                    Some(input) => self.handle_input(input),
                    None => break,
                },
                Some(event) = self.internal_rx.recv() => self.handle_internal(event),
                _ = progress.tick(), if playing => self.poll_progress(),
            }
        }

        // Shutdown summary for the last session
        let summary = self.telemetry.session_snapshot();
        info!(
            decoded = summary.decode_stats.decoded,
            failed = summary.decode_stats.failed,
            avg_decode_ms = summary.decode_stats.avg_decode_ms,
            clips_played = summary.source_stats.ended,
            "playback controller stopped"
        );
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn reply_with(reply: oneshot::Sender<Result<(), PlaybackError>>, result: Result<(), PlaybackError>) {
    if let Err(e) = &result {
        warn!(error = %e, "transport command failed");
    }
    let _ = reply.send(result);
}

/// Async outbound surface of a running controller.
#[derive(Debug, Clone)]
pub struct PlaybackHandle {
    inputs: mpsc::Sender<Input>,
    view: watch::Receiver<PlaybackView>,
}

impl PlaybackHandle {
    pub async fn send(&self, event: StreamEvent) -> Result<(), PlaybackError> {
        self.inputs
            .send(Input::Stream(event))
            .await
            .map_err(|_| PlaybackError::ControllerClosed)
    }

    pub async fn play(&self) -> Result<(), PlaybackError> {
        self.command(Command::Play).await
    }

    pub async fn pause(&self) -> Result<(), PlaybackError> {
        self.command(Command::Pause).await
    }

    pub async fn stop(&self) -> Result<(), PlaybackError> {
        self.command(Command::Stop).await
    }

    async fn command(
        &self,
        make: impl FnOnce(oneshot::Sender<Result<(), PlaybackError>>) -> Command,
    ) -> Result<(), PlaybackError> {
        let (reply, done) = oneshot::channel();
        self.inputs
            .send(Input::Command(make(reply)))
            .await
            .map_err(|_| PlaybackError::ControllerClosed)?;
        done.await.map_err(|_| PlaybackError::ControllerClosed)?
    }

    pub fn view(&self) -> PlaybackView {
        self.view.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<PlaybackView> {
        self.view.clone()
    }
}
