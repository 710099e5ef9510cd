use atlas_voice::kernel::view::TranscriptLine;
use atlas_voice::ui::controls::TRANSCRIPT_PLACEHOLDER;
use atlas_voice::ui::{format_duration, progress_percent, ControlsView};
use atlas_voice::{PlaybackStatus, PlaybackView};

fn line(clip_id: &str, text: &str) -> TranscriptLine {
    TranscriptLine {
        clip_id: clip_id.to_string(),
        text: text.to_string(),
    }
}

#[test]
fn test_progress_percent() {
    assert_eq!(progress_percent(0, 0), 0.0);
    assert_eq!(progress_percent(500, 0), 0.0);
    assert_eq!(progress_percent(250, 1_000), 25.0);
    assert_eq!(progress_percent(1_000, 1_000), 100.0);
    assert_eq!(progress_percent(1_500, 1_000), 100.0);
}

#[test]
fn test_format_duration() {
    assert_eq!(format_duration(0), "0:00");
    assert_eq!(format_duration(999), "0:00");
    assert_eq!(format_duration(5_400), "0:05");
    assert_eq!(format_duration(65_000), "1:05");
    assert_eq!(format_duration(3_600_000), "60:00");
}

#[test]
fn test_transcript_dedups_by_clip_and_falls_back_to_placeholder() {
    let empty = ControlsView::from_view(&PlaybackView::default());
    assert_eq!(empty.transcript_or_placeholder(), vec![TRANSCRIPT_PLACEHOLDER]);
    assert_eq!(empty.toggle_label, "Play");

    let view = PlaybackView {
        transcript: vec![line("c1", "Hello"), line("c2", "there"), line("c1", "again")],
        ..PlaybackView::default()
    };
    let controls = ControlsView::from_view(&view);
    assert_eq!(controls.transcript_or_placeholder(), vec!["Hello", "there"]);
}

#[test]
fn test_render_reflects_status() {
    let playing = ControlsView::from_view(&PlaybackView {
        status: PlaybackStatus::Playing,
        progress_ms: 3_000,
        total_duration_ms: 12_000,
        ..PlaybackView::default()
    });
    assert!(playing.is_playing);
    assert_eq!(playing.toggle_label, "Pause");
    assert_eq!(playing.render(8), "[>] ##------ 0:03 / 0:12");

    let paused = ControlsView::from_view(&PlaybackView {
        status: PlaybackStatus::Paused,
        progress_ms: 12_000,
        total_duration_ms: 12_000,
        ..PlaybackView::default()
    });
    assert!(paused.is_paused);
    assert_eq!(paused.toggle_label, "Play");
    assert_eq!(paused.render(4), "[||] #### 0:12 / 0:12 paused");

    let idle = ControlsView::from_view(&PlaybackView::default());
    assert_eq!(idle.render(3), "[ ] --- 0:00 / 0:00");
}
