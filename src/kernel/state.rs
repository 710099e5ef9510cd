use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Playing,
    Paused,
}

/// One unit of synthesized speech: encoded audio chunks plus its transcript fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct Clip {
    pub clip_id: String,
    pub mime_type: String,
    /// Append order is payload order.
    pub buffers: Vec<Bytes>,
    pub text: Option<String>,
    pub duration_ms: Option<u64>,
    pub size_bytes: Option<u64>,
    pub is_complete: bool,
    // Fragment merged by the last finalize, so a repeated finalize is a no-op.
    finalize_text: Option<String>,
}

impl Clip {
    fn new(clip_id: &str, mime_type: &str) -> Self {
        Self {
            clip_id: clip_id.to_string(),
            mime_type: mime_type.to_string(),
            buffers: Vec::new(),
            text: None,
            duration_ms: None,
            size_bytes: None,
            is_complete: false,
            finalize_text: None,
        }
    }

    /// Complete and carrying at least one chunk.
    pub fn is_playable(&self) -> bool {
        self.is_complete && !self.buffers.is_empty()
    }

    /// Concatenation of every chunk in append order.
    pub fn payload(&self) -> Bytes {
        match self.buffers.as_slice() {
            [single] => single.clone(),
            chunks => {
                let total: usize = chunks.iter().map(Bytes::len).sum();
                let mut joined = Vec::with_capacity(total);
                for chunk in chunks {
                    joined.extend_from_slice(chunk);
                }
                Bytes::from(joined)
            }
        }
    }
}

/// Strict action set. This is the ONLY way playback state changes.
#[derive(Debug, Clone)]
pub enum PlaybackAction {
    Reset,
    StartSession {
        session_id: String,
    },
    EnqueueChunk {
        session_id: String,
        clip_id: String,
        mime_type: String,
        buffer: Bytes,
        text: Option<String>,
    },
    FinalizeClip {
        session_id: String,
        clip_id: String,
        duration_ms: Option<u64>,
        size_bytes: Option<u64>,
        text: Option<String>,
        mime_type: Option<String>,
    },
    SetStatus(PlaybackStatus),
    AdvanceClip {
        clip_id: String,
    },
    UpdateClipDuration {
        clip_id: String,
        duration_ms: u64,
    },
    ClipReady {
        clip_id: String,
    },
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlaybackState {
    pub session_id: Option<String>,
    pub clips: Vec<Clip>,
    pub status: PlaybackStatus,
    /// Next or currently playing clip. May equal `clips.len()`.
    pub current_clip_index: usize,
    pub is_voice_active: bool,
    /// Advisory only.
    pub last_ready_clip_id: Option<String>,
}

impl PlaybackState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clip(&self, clip_id: &str) -> Option<&Clip> {
        self.clips.iter().find(|clip| clip.clip_id == clip_id)
    }

    pub fn current_clip(&self) -> Option<&Clip> {
        self.clips.get(self.current_clip_index)
    }

    pub fn has_audio(&self) -> bool {
        self.clips.iter().any(Clip::is_playable)
    }

    /// Sum of every known clip duration.
    pub fn total_duration_ms(&self) -> u64 {
        self.clips.iter().filter_map(|clip| clip.duration_ms).sum()
    }

    /// Sum of known durations strictly before the current clip.
    pub fn elapsed_before_current_ms(&self) -> u64 {
        self.clips
            .iter()
            .take(self.current_clip_index)
            .filter_map(|clip| clip.duration_ms)
            .sum()
    }

    fn clip_position(&self, clip_id: &str) -> Option<usize> {
        self.clips.iter().position(|clip| clip.clip_id == clip_id)
    }

    fn fresh_session(session_id: &str) -> Self {
        Self {
            session_id: Some(session_id.to_string()),
            is_voice_active: true,
            ..Self::default()
        }
    }
}

/// Pure reduction: State + Action -> State.
///
/// Every no-op (unknown clip, session mismatch, unchanged status) hands back the
/// same `Arc`, so callers can skip effects with `Arc::ptr_eq`.
pub fn reduce(state: &Arc<PlaybackState>, action: PlaybackAction) -> Arc<PlaybackState> {
    match action {
        PlaybackAction::Reset => {
            if **state == PlaybackState::default() {
                return Arc::clone(state);
            }
            Arc::new(PlaybackState::default())
        }
        PlaybackAction::StartSession { session_id } => start_session(state, &session_id),
        PlaybackAction::EnqueueChunk {
            session_id,
            clip_id,
            mime_type,
            buffer,
            text,
        } => {
            let state = ensure_session(state, &session_id);
            append_chunk(&state, &clip_id, &mime_type, buffer, text.as_deref())
        }
        PlaybackAction::FinalizeClip {
            session_id,
            clip_id,
            duration_ms,
            size_bytes,
            text,
            mime_type,
        } => finalize_clip(
            state,
            &session_id,
            &clip_id,
            ClipOverrides {
                duration_ms,
                size_bytes,
                text,
                mime_type,
            },
        ),
        PlaybackAction::SetStatus(status) => {
            if state.status == status {
                return Arc::clone(state);
            }
            let mut next = (**state).clone();
            next.status = status;
            Arc::new(next)
        }
        PlaybackAction::AdvanceClip { clip_id } => advance_clip(state, &clip_id),
        PlaybackAction::UpdateClipDuration {
            clip_id,
            duration_ms,
        } => {
            let Some(index) = state.clip_position(&clip_id) else {
                return Arc::clone(state);
            };
            if state.clips[index].duration_ms == Some(duration_ms) {
                return Arc::clone(state);
            }
            let mut next = (**state).clone();
            next.clips[index].duration_ms = Some(duration_ms);
            Arc::new(next)
        }
        PlaybackAction::ClipReady { clip_id } => {
            if state.last_ready_clip_id.as_deref() == Some(clip_id.as_str()) {
                return Arc::clone(state);
            }
            let mut next = (**state).clone();
            next.last_ready_clip_id = Some(clip_id);
            Arc::new(next)
        }
    }
}

fn start_session(state: &Arc<PlaybackState>, session_id: &str) -> Arc<PlaybackState> {
    if state.session_id.as_deref() != Some(session_id) {
        return Arc::new(PlaybackState::fresh_session(session_id));
    }
    if state.is_voice_active && state.last_ready_clip_id.is_none() {
        return Arc::clone(state);
    }
    let mut next = (**state).clone();
    next.is_voice_active = true;
    next.last_ready_clip_id = None;
    Arc::new(next)
}

/// First half of an enqueue: a chunk for another session replaces the state wholesale.
pub fn ensure_session(state: &Arc<PlaybackState>, session_id: &str) -> Arc<PlaybackState> {
    if state.session_id.as_deref() == Some(session_id) {
        return Arc::clone(state);
    }
    Arc::new(PlaybackState::fresh_session(session_id))
}

/// Second half of an enqueue. Assumes the session already matches.
pub fn append_chunk(
    state: &Arc<PlaybackState>,
    clip_id: &str,
    mime_type: &str,
    buffer: Bytes,
    text: Option<&str>,
) -> Arc<PlaybackState> {
    let mut next = (**state).clone();
    match next.clip_position(clip_id) {
        Some(index) => {
            let clip = &mut next.clips[index];
            clip.buffers.push(buffer);
            clip.mime_type = mime_type.to_string();
            clip.text = merge_text(clip.text.as_deref(), text);
        }
        None => {
            let mut clip = Clip::new(clip_id, mime_type);
            clip.buffers.push(buffer);
            clip.text = merge_text(None, text);
            next.clips.push(clip);
        }
    }
    next.is_voice_active = true;
    Arc::new(next)
}

struct ClipOverrides {
    duration_ms: Option<u64>,
    size_bytes: Option<u64>,
    text: Option<String>,
    mime_type: Option<String>,
}

fn finalize_clip(
    state: &Arc<PlaybackState>,
    session_id: &str,
    clip_id: &str,
    overrides: ClipOverrides,
) -> Arc<PlaybackState> {
    if state.session_id.as_deref() != Some(session_id) {
        return Arc::clone(state);
    }
    let Some(index) = state.clip_position(clip_id) else {
        return Arc::clone(state);
    };

    let current = &state.clips[index];
    let mut clip = current.clone();
    clip.is_complete = true;
    if let Some(mime_type) = overrides.mime_type {
        clip.mime_type = mime_type;
    }
    if overrides.duration_ms.is_some() {
        clip.duration_ms = overrides.duration_ms;
    }
    if overrides.size_bytes.is_some() {
        clip.size_bytes = overrides.size_bytes;
    }
    let fragment = overrides.text.as_deref().filter(|text| !text.trim().is_empty());
    let repeated = current.is_complete && fragment.is_some() && current.finalize_text.as_deref() == fragment;
    if !repeated && fragment.is_some() {
        clip.text = merge_text(clip.text.as_deref(), fragment);
        clip.finalize_text = fragment.map(str::to_string);
    }

    if clip == *current {
        return Arc::clone(state);
    }
    let mut next = (**state).clone();
    next.clips[index] = clip;
    Arc::new(next)
}

fn advance_clip(state: &Arc<PlaybackState>, clip_id: &str) -> Arc<PlaybackState> {
    match state.current_clip() {
        Some(clip) if clip.clip_id == clip_id => {}
        _ => return Arc::clone(state),
    }

    let mut next = (**state).clone();
    next.current_clip_index = (next.current_clip_index + 1).min(next.clips.len());
    if next.current_clip_index >= next.clips.len() {
        next.status = PlaybackStatus::Idle;
        next.last_ready_clip_id = None;
    }
    Arc::new(next)
}

/// Joins transcript fragments with single spaces. An empty side yields the other untouched.
pub fn merge_text(existing: Option<&str>, fragment: Option<&str>) -> Option<String> {
    let existing = existing.filter(|text| !text.trim().is_empty());
    let fragment = fragment.filter(|text| !text.trim().is_empty());
    match (existing, fragment) {
        (None, None) => None,
        (Some(text), None) | (None, Some(text)) => Some(text.to_string()),
        (Some(existing), Some(fragment)) => Some(normalize_whitespace(&format!(
            "{} {}",
            existing, fragment
        ))),
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
