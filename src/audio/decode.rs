use std::io::Cursor;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use rodio::Source;
use tracing::debug;

use super::mime;

#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("unsupported content type: {0}")]
    UnsupportedContentType(String),

    #[error("empty payload")]
    EmptyPayload,

    #[error(transparent)]
    Decoder(#[from] rodio::decoder::DecoderError),

    #[error("invalid sample rate: {0}")]
    InvalidSampleRate(u32),

    #[error("invalid channel count: {0}")]
    InvalidChannelCount(u16),

    #[error("decode task aborted: {0}")]
    Aborted(String),
}

/// Fully decoded, randomly seekable PCM for one clip. Samples are interleaved.
#[derive(Debug, Clone)]
pub struct DecodedBuffer {
    pub samples: Arc<[f32]>,
    pub channels: u16,
    pub sample_rate: u32,
}

impl DecodedBuffer {
    pub fn new(samples: Vec<f32>, channels: u16, sample_rate: u32) -> Self {
        Self {
            samples: samples.into(),
            channels,
            sample_rate,
        }
    }

    pub fn frames(&self) -> usize {
        self.samples.len() / usize::from(self.channels.max(1))
    }

    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    /// Duration rounded to the nearest millisecond.
    pub fn duration_ms(&self) -> u64 {
        (self.duration().as_secs_f64() * 1000.0).round() as u64
    }
}

/// The platform audio-decoding primitive. Called off the async runtime.
pub trait AudioDecoder: Send + Sync + 'static {
    fn decode(&self, mime_type: &str, payload: Bytes) -> Result<DecodedBuffer, DecodeError>;
}

/// Decodes any container/codec rodio's symphonia backend can probe.
#[derive(Debug, Clone, Copy, Default)]
pub struct RodioDecoder;

impl AudioDecoder for RodioDecoder {
    fn decode(&self, mime_type: &str, payload: Bytes) -> Result<DecodedBuffer, DecodeError> {
        if !mime::is_audio(mime_type) {
            return Err(DecodeError::UnsupportedContentType(mime_type.to_string()));
        }
        if payload.is_empty() {
            return Err(DecodeError::EmptyPayload);
        }

        let size = payload.len();
        let source = rodio::Decoder::new(Cursor::new(payload))?;

        let sample_rate = source.sample_rate();
        if sample_rate == 0 {
            return Err(DecodeError::InvalidSampleRate(sample_rate));
        }
        let channels = source.channels();
        if channels == 0 {
            return Err(DecodeError::InvalidChannelCount(channels));
        }

        let samples: Vec<f32> = source.collect();
        let decoded = DecodedBuffer::new(samples, channels, sample_rate);
        debug!(
            container = mime::extension_hint(mime_type).unwrap_or("unknown"),
            size,
            sample_rate,
            channels,
            duration_ms = decoded.duration_ms(),
            "decoded clip payload"
        );
        Ok(decoded)
    }
}
