use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::oneshot;

use super::state::PlaybackAction;
use crate::audio::decode::{DecodeError, DecodedBuffer};
use crate::error::PlaybackError;

/// Events emitted by the upstream streaming transport for one spoken reply.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StreamEvent {
    StartSession {
        session_id: String,
    },
    EnqueueChunk {
        session_id: String,
        clip_id: String,
        mime_type: String,
        buffer: Bytes,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    FinalizeClip {
        session_id: String,
        clip_id: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        duration_ms: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        size_bytes: Option<u64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        mime_type: Option<String>,
    },
}

impl From<StreamEvent> for PlaybackAction {
    fn from(event: StreamEvent) -> Self {
        match event {
            StreamEvent::StartSession { session_id } => PlaybackAction::StartSession { session_id },
            StreamEvent::EnqueueChunk {
                session_id,
                clip_id,
                mime_type,
                buffer,
                text,
            } => PlaybackAction::EnqueueChunk {
                session_id,
                clip_id,
                mime_type,
                buffer,
                text,
            },
            StreamEvent::FinalizeClip {
                session_id,
                clip_id,
                duration_ms,
                size_bytes,
                text,
                mime_type,
            } => PlaybackAction::FinalizeClip {
                session_id,
                clip_id,
                duration_ms,
                size_bytes,
                text,
                mime_type,
            },
        }
    }
}

/// Transport commands. Each carries an acknowledgement channel.
#[derive(Debug)]
pub enum Command {
    Play(oneshot::Sender<Result<(), PlaybackError>>),
    Pause(oneshot::Sender<Result<(), PlaybackError>>),
    Stop(oneshot::Sender<Result<(), PlaybackError>>),
}

/// Everything the driver loop accepts from the outside, in receipt order.
#[derive(Debug)]
pub enum Input {
    Stream(StreamEvent),
    Command(Command),
}

/// Async results flowing back into the controller. Never produced by callers.
#[derive(Debug)]
pub enum InternalEvent {
    Decoded {
        generation: u64,
        clip_id: String,
        elapsed_ms: u64,
        outcome: Result<DecodedBuffer, DecodeError>,
    },
    SourceEnded {
        source_id: u64,
        clip_id: String,
    },
}
