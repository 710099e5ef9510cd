mod common;

use std::time::Duration;

use atlas_voice::kernel::event::InternalEvent;
use atlas_voice::outputs::{AudioOutput, OutputBackend, OutputError, OutputState};
use atlas_voice::{PlaybackAction, PlaybackConfig, PlaybackController, PlaybackError, PlaybackStatus};
use common::{controller, finalize, queue_clip, settle, start, ScriptedDecoder, SESSION};

#[tokio::test]
async fn test_play_before_decode_waits_then_starts() {
    let decoder = ScriptedDecoder::new();
    let (mut controller, mock) = controller(decoder, false);

    controller.dispatch(start(SESSION));
    queue_clip(&mut controller, "c1", b"hello");

    controller.play().unwrap();
    assert_eq!(controller.state().status, PlaybackStatus::Playing);
    assert_eq!(mock.opened(), 1);
    assert!(mock.started().is_empty(), "nothing decoded yet, nothing may start");

    // Decode completes -> clip_ready -> source starts without a second play()
    settle(&mut controller).await;
    assert_eq!(controller.state().last_ready_clip_id.as_deref(), Some("c1"));
    assert_eq!(mock.started(), vec!["c1".to_string()]);
}

#[tokio::test]
async fn test_natural_end_of_last_clip_goes_idle() {
    let (mut controller, mock) = controller(ScriptedDecoder::new(), false);
    controller.dispatch(start(SESSION));
    queue_clip(&mut controller, "c1", b"hello");
    controller.play().unwrap();
    settle(&mut controller).await;

    assert!(mock.finish_active());
    settle(&mut controller).await;

    let state = controller.state();
    assert_eq!(state.current_clip_index, 1);
    assert_eq!(state.current_clip_index, state.clips.len());
    assert_eq!(state.status, PlaybackStatus::Idle);
    assert_eq!(controller.progress_ms(), 0);
}

#[tokio::test]
async fn test_pause_suppresses_advance() {
    let (mut controller, mock) = controller(ScriptedDecoder::new(), false);
    controller.dispatch(start(SESSION));
    queue_clip(&mut controller, "c1", b"hello");
    controller.play().unwrap();
    settle(&mut controller).await;

    controller.pause().unwrap();
    assert_eq!(controller.state().status, PlaybackStatus::Paused);
    assert_eq!(mock.state(), Some(OutputState::Suspended));

    assert!(mock.finish_active());
    settle(&mut controller).await;

    assert_eq!(controller.state().current_clip_index, 0, "paused end must not advance");
    assert_eq!(controller.state().status, PlaybackStatus::Paused);
    assert_eq!(controller.telemetry.snapshot().source_stats.held, 1);

    // Resume restarts the held clip
    controller.play().unwrap();
    assert_eq!(mock.state(), Some(OutputState::Running));
    assert_eq!(mock.started(), vec!["c1".to_string(), "c1".to_string()]);
}

#[tokio::test]
async fn test_clips_play_one_at_a_time_in_order() {
    let (mut controller, mock) = controller(ScriptedDecoder::new(), false);
    controller.dispatch(start(SESSION));
    queue_clip(&mut controller, "c1", b"first");
    queue_clip(&mut controller, "c2", b"second");
    controller.play().unwrap();
    settle(&mut controller).await;
    settle(&mut controller).await;

    assert_eq!(mock.started(), vec!["c1".to_string()], "single-flight");

    mock.finish_active();
    settle(&mut controller).await;
    assert_eq!(mock.started(), vec!["c1".to_string(), "c2".to_string()]);
    assert_eq!(controller.state().current_clip_index, 1);
    assert_eq!(controller.state().status, PlaybackStatus::Playing);
    assert_eq!(controller.view().current_clip_id.as_deref(), Some("c2"));
}

#[tokio::test]
async fn test_progress_is_clamped_and_resets_on_idle() {
    let (mut controller, mock) = controller(ScriptedDecoder::new(), false);
    controller.dispatch(start(SESSION));
    queue_clip(&mut controller, "c1", &[0u8; 500]);
    queue_clip(&mut controller, "c2", &[0u8; 300]);
    controller.play().unwrap();
    settle(&mut controller).await;
    settle(&mut controller).await;
    assert_eq!(controller.state().total_duration_ms(), 800);

    mock.advance(Duration::from_millis(200));
    controller.poll_progress();
    assert_eq!(controller.progress_ms(), 200);

    // Never runs past the active clip's own duration
    mock.advance(Duration::from_millis(1_000));
    controller.poll_progress();
    assert_eq!(controller.progress_ms(), 500);

    mock.finish_active();
    settle(&mut controller).await;
    mock.advance(Duration::from_millis(100));
    controller.poll_progress();
    assert_eq!(controller.progress_ms(), 600);
    assert!(controller.progress_ms() <= controller.view().total_duration_ms);

    mock.finish_active();
    settle(&mut controller).await;
    assert_eq!(controller.state().status, PlaybackStatus::Idle);
    assert_eq!(controller.progress_ms(), 0);
}

#[tokio::test]
async fn test_progress_halts_while_paused() {
    let (mut controller, mock) = controller(ScriptedDecoder::new(), false);
    controller.dispatch(start(SESSION));
    queue_clip(&mut controller, "c1", &[0u8; 500]);
    controller.play().unwrap();
    settle(&mut controller).await;

    mock.advance(Duration::from_millis(120));
    controller.poll_progress();
    controller.pause().unwrap();

    mock.advance(Duration::from_millis(300));
    controller.poll_progress();
    assert_eq!(controller.progress_ms(), 120);

    controller.play().unwrap();
    mock.advance(Duration::from_millis(30));
    controller.poll_progress();
    assert_eq!(controller.progress_ms(), 150);
}

#[tokio::test]
async fn test_stop_tears_everything_down() {
    let (mut controller, mock) = controller(ScriptedDecoder::new(), false);
    controller.dispatch(start(SESSION));
    queue_clip(&mut controller, "c1", b"hello");
    controller.play().unwrap();
    settle(&mut controller).await;

    controller.stop().unwrap();
    assert_eq!(**controller.state(), atlas_voice::PlaybackState::default());
    assert_eq!(mock.state(), Some(OutputState::Closed));
    assert_eq!(mock.stopped_sources(), 1);
    assert!(!controller.pipeline().is_decoded("c1"));
    assert_eq!(controller.view().progress_ms, 0);

    // Safe in any state
    controller.stop().unwrap();
    assert_eq!(controller.telemetry.snapshot().resets, 2);

    // A later play() opens a fresh session lazily
    controller.play().unwrap();
    assert_eq!(mock.opened(), 2);
}

#[tokio::test]
async fn test_new_session_stops_previous_source() {
    let (mut controller, mock) = controller(ScriptedDecoder::new(), false);
    controller.dispatch(start(SESSION));
    queue_clip(&mut controller, "c1", b"hello");
    controller.play().unwrap();
    settle(&mut controller).await;
    assert_eq!(mock.active_clip().as_deref(), Some("c1"));

    controller.dispatch(start("s2"));
    assert_eq!(mock.active_clip(), None);
    assert_eq!(mock.stopped_sources(), 1);
    assert_eq!(controller.state().status, PlaybackStatus::Idle);
    assert!(controller.state().clips.is_empty());
    assert_eq!(controller.telemetry.snapshot().sessions, 2);
}

#[tokio::test]
async fn test_stale_end_notification_is_ignored() {
    let (mut controller, mock) = controller(ScriptedDecoder::new(), false);
    controller.dispatch(start(SESSION));
    queue_clip(&mut controller, "c1", b"hello");
    controller.play().unwrap();
    settle(&mut controller).await;

    // Session replaced while c1 was playing
    controller.dispatch(start("s2"));
    queue_clip_in(&mut controller, "s2", "d1");
    controller.play().unwrap();
    settle(&mut controller).await;
    assert_eq!(mock.active_clip().as_deref(), Some("d1"));

    // A late end notification from the first source changes nothing
    controller.handle_internal(InternalEvent::SourceEnded {
        source_id: 1,
        clip_id: "c1".to_string(),
    });
    assert_eq!(controller.state().current_clip_index, 0);
    assert_eq!(controller.state().status, PlaybackStatus::Playing);
    assert_eq!(mock.active_clip().as_deref(), Some("d1"));
}

fn queue_clip_in(controller: &mut atlas_voice::PlaybackController, session_id: &str, clip_id: &str) {
    controller.dispatch(common::chunk(session_id, clip_id, b"abc", None));
    controller.dispatch(finalize(session_id, clip_id, None, None));
}

#[tokio::test]
async fn test_auto_play_starts_when_first_clip_is_ready() {
    let (mut controller, mock) = controller(ScriptedDecoder::new(), true);
    controller.dispatch(start(SESSION));
    queue_clip(&mut controller, "c1", b"hello");
    assert_eq!(controller.state().status, PlaybackStatus::Idle);

    settle(&mut controller).await;
    assert_eq!(controller.state().status, PlaybackStatus::Playing);
    assert_eq!(mock.started(), vec!["c1".to_string()]);
    assert_eq!(mock.opened(), 1);

    // Runs dry, then resumes on its own when the next clip lands
    mock.finish_active();
    settle(&mut controller).await;
    assert_eq!(controller.state().status, PlaybackStatus::Idle);

    queue_clip(&mut controller, "c2", b"again");
    settle(&mut controller).await;
    assert_eq!(controller.state().status, PlaybackStatus::Playing);
    assert_eq!(mock.started(), vec!["c1".to_string(), "c2".to_string()]);
    assert_eq!(mock.opened(), 1);
}

#[tokio::test]
async fn test_auto_play_respects_pause_and_stop() {
    let (mut controller, mock) = controller(ScriptedDecoder::new(), true);
    controller.dispatch(start(SESSION));
    queue_clip(&mut controller, "c1", b"hello");
    controller.pause().unwrap();

    settle(&mut controller).await;
    assert_eq!(controller.state().status, PlaybackStatus::Paused);
    assert!(mock.started().is_empty());

    controller.stop().unwrap();
    controller.dispatch(PlaybackAction::SetStatus(PlaybackStatus::Idle));
    assert!(!controller.state().is_voice_active);
    assert!(mock.started().is_empty());
}

#[tokio::test]
async fn test_auto_play_disabled_stays_idle() {
    let (mut controller, mock) = controller(ScriptedDecoder::new(), false);
    controller.dispatch(start(SESSION));
    queue_clip(&mut controller, "c1", b"hello");
    settle(&mut controller).await;

    assert_eq!(controller.state().status, PlaybackStatus::Idle);
    assert_eq!(mock.opened(), 0);
    assert!(controller.view().has_audio);
}

struct NoDevice;

impl OutputBackend for NoDevice {
    fn open(&mut self) -> Result<Box<dyn AudioOutput>, OutputError> {
        Err(OutputError::Unavailable("no default device".into()))
    }
}

#[tokio::test]
async fn test_play_surfaces_output_failure() {
    let mut controller = PlaybackController::new(
        PlaybackConfig::default(),
        ScriptedDecoder::new(),
        Box::new(NoDevice),
    );
    controller.dispatch(start(SESSION));
    queue_clip(&mut controller, "c1", b"hello");
    settle(&mut controller).await;

    let result = controller.play();
    assert!(matches!(
        result,
        Err(PlaybackError::Output(OutputError::Unavailable(_)))
    ));
    assert_eq!(controller.state().status, PlaybackStatus::Idle);

    // Stop stays safe with no session open
    controller.stop().unwrap();
}
