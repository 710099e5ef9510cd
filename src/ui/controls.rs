use crate::kernel::state::PlaybackStatus;
use crate::kernel::view::PlaybackView;

pub const TRANSCRIPT_PLACEHOLDER: &str = "Waiting for the assistant to speak...";

/// Presentational model of the playback controls. Holds no state of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlsView {
    pub is_playing: bool,
    pub is_paused: bool,
    pub toggle_label: &'static str,
    pub progress_percent: f64,
    pub elapsed: String,
    pub total: String,
    pub transcript: Vec<String>,
}

impl ControlsView {
    pub fn from_view(view: &PlaybackView) -> Self {
        let is_playing = view.status == PlaybackStatus::Playing;
        let mut transcript: Vec<String> = Vec::with_capacity(view.transcript.len());
        let mut seen_clips: Vec<&str> = Vec::with_capacity(view.transcript.len());
        for line in &view.transcript {
            if seen_clips.contains(&line.clip_id.as_str()) {
                continue;
            }
            seen_clips.push(&line.clip_id);
            transcript.push(line.text.clone());
        }

        Self {
            is_playing,
            is_paused: view.status == PlaybackStatus::Paused,
            toggle_label: if is_playing { "Pause" } else { "Play" },
            progress_percent: progress_percent(view.progress_ms, view.total_duration_ms),
            elapsed: format_duration(view.progress_ms),
            total: format_duration(view.total_duration_ms),
            transcript,
        }
    }

    pub fn transcript_or_placeholder(&self) -> Vec<&str> {
        if self.transcript.is_empty() {
            return vec![TRANSCRIPT_PLACEHOLDER];
        }
        self.transcript.iter().map(String::as_str).collect()
    }

    /// Single terminal line: `[>] ####------ 0:03 / 0:10 paused`.
    pub fn render(&self, width: usize) -> String {
        let icon = if self.is_playing {
            "[>]"
        } else if self.is_paused {
            "[||]"
        } else {
            "[ ]"
        };
        let filled = ((self.progress_percent / 100.0) * width as f64).round() as usize;
        let filled = filled.min(width);
        let mut line = format!(
            "{} {}{} {} / {}",
            icon,
            "#".repeat(filled),
            "-".repeat(width - filled),
            self.elapsed,
            self.total
        );
        if self.is_paused {
            line.push_str(" paused");
        }
        line
    }
}

pub fn progress_percent(progress_ms: u64, total_ms: u64) -> f64 {
    if total_ms == 0 {
        return 0.0;
    }
    (progress_ms as f64 / total_ms as f64 * 100.0).min(100.0)
}

/// `M:SS`, minutes unbounded.
pub fn format_duration(ms: u64) -> String {
    let total_seconds = ms / 1000;
    format!("{}:{:02}", total_seconds / 60, total_seconds % 60)
}
