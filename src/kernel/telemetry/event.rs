use serde::{Deserialize, Serialize};

// Allowed: ordinals, durations, counts, enums
// Forbidden: audio bytes, transcript text

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    SessionStarted,

    ClipDecoded {
        clip_index: usize,
        decode_ms: u64,
        duration_ms: u64,
    },

    DecodeFailed {
        clip_index: usize,
    },

    /// A decode result arrived for a superseded session and was dropped.
    DecodeDiscarded,

    SourceStarted {
        clip_index: usize,
    },

    SourceEnded {
        clip_index: usize,
        advanced: bool,
    },

    Reset,
}
