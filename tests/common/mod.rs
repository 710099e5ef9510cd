#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use atlas_voice::audio::{AudioDecoder, DecodeError, DecodedBuffer};
use atlas_voice::outputs::MockBackend;
use atlas_voice::{PlaybackAction, PlaybackConfig, PlaybackController};
use bytes::Bytes;

pub const SESSION: &str = "s1";

/// Decodes one payload byte into one millisecond of mono silence.
///
/// `audio/broken` always fails; `audio/slow` blocks for [`SLOW_DECODE`] first.
#[derive(Default)]
pub struct ScriptedDecoder {
    calls: AtomicUsize,
    decoded: Mutex<Vec<String>>,
}

pub const SLOW_DECODE: Duration = Duration::from_millis(150);

impl ScriptedDecoder {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn payloads(&self) -> Vec<String> {
        self.decoded.lock().unwrap().clone()
    }
}

impl AudioDecoder for ScriptedDecoder {
    fn decode(&self, mime_type: &str, payload: Bytes) -> Result<DecodedBuffer, DecodeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.decoded
            .lock()
            .unwrap()
            .push(String::from_utf8_lossy(&payload).into_owned());
        match mime_type {
            "audio/broken" => return Err(DecodeError::EmptyPayload),
            "audio/slow" => std::thread::sleep(SLOW_DECODE),
            _ => {}
        }
        Ok(DecodedBuffer::new(vec![0.0; payload.len()], 1, 1000))
    }
}

pub fn controller(decoder: Arc<ScriptedDecoder>, auto_play: bool) -> (PlaybackController, MockBackend) {
    let mock = MockBackend::new();
    let config = PlaybackConfig {
        auto_play,
        ..PlaybackConfig::default()
    };
    let controller = PlaybackController::new(config, decoder, Box::new(mock.clone()));
    (controller, mock)
}

pub fn start(session_id: &str) -> PlaybackAction {
    PlaybackAction::StartSession {
        session_id: session_id.to_string(),
    }
}

pub fn chunk(session_id: &str, clip_id: &str, data: &'static [u8], text: Option<&str>) -> PlaybackAction {
    chunk_typed(session_id, clip_id, "audio/webm", data, text)
}

pub fn chunk_typed(
    session_id: &str,
    clip_id: &str,
    mime_type: &str,
    data: &'static [u8],
    text: Option<&str>,
) -> PlaybackAction {
    PlaybackAction::EnqueueChunk {
        session_id: session_id.to_string(),
        clip_id: clip_id.to_string(),
        mime_type: mime_type.to_string(),
        buffer: Bytes::from_static(data),
        text: text.map(str::to_string),
    }
}

pub fn finalize(session_id: &str, clip_id: &str, duration_ms: Option<u64>, text: Option<&str>) -> PlaybackAction {
    PlaybackAction::FinalizeClip {
        session_id: session_id.to_string(),
        clip_id: clip_id.to_string(),
        duration_ms,
        size_bytes: None,
        text: text.map(str::to_string),
        mime_type: None,
    }
}

/// Applies the next async result, failing the test if none arrives in time.
pub async fn settle(controller: &mut PlaybackController) {
    let handled = tokio::time::timeout(Duration::from_secs(2), controller.process_next())
        .await
        .expect("no async result arrived");
    assert!(handled, "internal channel closed");
}

/// Queues one complete clip whose decoded length equals `data.len()` milliseconds.
pub fn queue_clip(controller: &mut PlaybackController, clip_id: &str, data: &'static [u8]) {
    controller.dispatch(chunk(SESSION, clip_id, data, Some(clip_id)));
    controller.dispatch(finalize(SESSION, clip_id, None, None));
}
