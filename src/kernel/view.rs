use serde::Serialize;

use super::state::{PlaybackState, PlaybackStatus};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TranscriptLine {
    pub clip_id: String,
    pub text: String,
}

/// Read-only projection published to the UI layer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct PlaybackView {
    pub status: PlaybackStatus,
    pub progress_ms: u64,
    pub total_duration_ms: u64,
    pub current_clip_id: Option<String>,
    pub has_audio: bool,
    pub is_voice_active: bool,
    pub transcript: Vec<TranscriptLine>,
}

impl PlaybackView {
    pub fn project(state: &PlaybackState, progress_ms: u64) -> Self {
        Self {
            status: state.status,
            progress_ms,
            total_duration_ms: state.total_duration_ms(),
            current_clip_id: state.current_clip().map(|clip| clip.clip_id.clone()),
            has_audio: state.has_audio(),
            is_voice_active: state.is_voice_active,
            transcript: state
                .clips
                .iter()
                .filter_map(|clip| {
                    let text = clip.text.as_deref()?.trim();
                    (!text.is_empty()).then(|| TranscriptLine {
                        clip_id: clip.clip_id.clone(),
                        text: text.to_string(),
                    })
                })
                .collect(),
        }
    }
}
