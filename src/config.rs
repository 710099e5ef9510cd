use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::PlaybackError;

pub const AUTOPLAY_ENV: &str = "ATLAS_VOICE_AUTOPLAY";
pub const PROGRESS_ENV: &str = "ATLAS_VOICE_PROGRESS_MS";

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Start playing on its own once the first clip is decoded.
    pub auto_play: bool,
    /// Progress polling cadence while playing.
    pub progress_interval_ms: u64,
    /// Decoded durations within this distance of the announced one are ignored.
    pub duration_tolerance_ms: u64,
    /// Capacity of the inbound event channel.
    pub event_buffer: usize,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            auto_play: false,
            progress_interval_ms: 16,
            duration_tolerance_ms: 10,
            event_buffer: 256,
        }
    }
}

impl PlaybackConfig {
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, PlaybackError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PlaybackError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, PlaybackError> {
        let config: Self = serde_json::from_str(raw).map_err(|e| PlaybackError::Config(e.to_string()))?;
        config.validated()
    }

    /// Applies `ATLAS_VOICE_*` overrides from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, PlaybackError> {
        self.with_overrides(|key| std::env::var(key).ok())
    }

    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, PlaybackError> {
        if let Some(raw) = lookup(AUTOPLAY_ENV) {
            self.auto_play = match raw.trim().to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                other => return Err(PlaybackError::Config(format!("{}={}", AUTOPLAY_ENV, other))),
            };
        }
        if let Some(raw) = lookup(PROGRESS_ENV) {
            self.progress_interval_ms = raw
                .trim()
                .parse()
                .map_err(|_| PlaybackError::Config(format!("{}={}", PROGRESS_ENV, raw)))?;
        }
        self.validated()
    }

    fn validated(self) -> Result<Self, PlaybackError> {
        if self.progress_interval_ms == 0 {
            return Err(PlaybackError::Config("progress_interval_ms must be positive".into()));
        }
        if self.event_buffer == 0 {
            return Err(PlaybackError::Config("event_buffer must be positive".into()));
        }
        Ok(self)
    }

    pub fn progress_interval(&self) -> Duration {
        Duration::from_millis(self.progress_interval_ms)
    }
}
