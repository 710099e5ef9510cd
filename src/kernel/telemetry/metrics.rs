use std::collections::VecDeque;

use super::event::TelemetryEvent;

#[derive(Debug, Clone, Default)]
pub struct TelemetrySnapshot {
    pub sessions: u64,
    pub resets: u64,
    pub decode_stats: DecodeStats,
    pub source_stats: SourceStats,
}

#[derive(Debug, Clone, Default)]
pub struct DecodeStats {
    pub decoded: u64,
    pub failed: u64,
    pub discarded: u64,
    pub total_decode_ms: u64,
    pub avg_decode_ms: f64,
    pub max_decode_ms: u64,
    pub decoded_audio_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct SourceStats {
    pub started: u64,
    pub ended: u64,
    /// Ends that did not advance because playback was paused.
    pub held: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    for event in events {
        match event {
            TelemetryEvent::SessionStarted => snap.sessions += 1,
            TelemetryEvent::Reset => snap.resets += 1,
            TelemetryEvent::ClipDecoded {
                decode_ms,
                duration_ms,
                ..
            } => {
                let stats = &mut snap.decode_stats;
                stats.decoded += 1;
                stats.total_decode_ms += decode_ms;
                stats.max_decode_ms = stats.max_decode_ms.max(*decode_ms);
                stats.decoded_audio_ms += duration_ms;
            }
            TelemetryEvent::DecodeFailed { .. } => snap.decode_stats.failed += 1,
            TelemetryEvent::DecodeDiscarded => snap.decode_stats.discarded += 1,
            TelemetryEvent::SourceStarted { .. } => snap.source_stats.started += 1,
            TelemetryEvent::SourceEnded { advanced, .. } => {
                snap.source_stats.ended += 1;
                if !advanced {
                    snap.source_stats.held += 1;
                }
            }
        }
    }

    if snap.decode_stats.decoded > 0 {
        snap.decode_stats.avg_decode_ms =
            snap.decode_stats.total_decode_ms as f64 / snap.decode_stats.decoded as f64;
    }

    snap
}
