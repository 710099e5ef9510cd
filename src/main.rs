use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use tracing_subscriber::{EnvFilter, FmtSubscriber};
use uuid::Uuid;

use atlas_voice::audio::mime::content_type_for_extension;
use atlas_voice::audio::RodioDecoder;
use atlas_voice::outputs::{MockBackend, OutputBackend, RodioBackend};
use atlas_voice::ui::ControlsView;
use atlas_voice::{PlaybackConfig, PlaybackController, PlaybackHandle, PlaybackStatus, StreamEvent};

const CHUNK_BYTES: usize = 4096;
const BAR_WIDTH: usize = 30;
// Simulated playback runs five times faster than real time.
const DRY_RUN_STEP: Duration = Duration::from_millis(20);
const DRY_RUN_ADVANCE: Duration = Duration::from_millis(100);

struct Args {
    config: Option<PathBuf>,
    dry_run: bool,
    files: Vec<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut args = Args {
        config: None,
        dry_run: false,
        files: Vec::new(),
    };
    let mut raw = std::env::args().skip(1);
    while let Some(arg) = raw.next() {
        match arg.as_str() {
            "--config" => {
                let path = raw.next().context("--config needs a file")?;
                args.config = Some(PathBuf::from(path));
            }
            "--dry-run" => args.dry_run = true,
            "-h" | "--help" => {
                println!("usage: atlas-voice [--config FILE] [--dry-run] FILE...");
                std::process::exit(0);
            }
            flag if flag.starts_with("--") => bail!("unknown flag {}", flag),
            file => args.files.push(PathBuf::from(file)),
        }
    }
    if args.files.is_empty() {
        bail!("no audio files given (usage: atlas-voice [--config FILE] [--dry-run] FILE...)");
    }
    Ok(args)
}

#[tokio::main]
async fn main() -> Result<()> {
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber).context("setting default subscriber failed")?;

    let args = parse_args()?;
    let config = match &args.config {
        Some(path) => PlaybackConfig::from_json_file(path)?,
        None => PlaybackConfig::default(),
    }
    .with_env_overrides()?;

    let mock = args.dry_run.then(MockBackend::new);
    let backend: Box<dyn OutputBackend> = match &mock {
        Some(mock) => Box::new(mock.clone()),
        None => Box::new(RodioBackend),
    };

    let controller = PlaybackController::new(config.clone(), Arc::new(RodioDecoder), backend);
    let (handle, inputs) = controller.connect();

    tracing::info!(files = args.files.len(), dry_run = args.dry_run, "atlas-voice starting");

    let (_, outcome) = tokio::join!(
        controller.run(inputs),
        drive(handle, &args.files, config.auto_play, mock)
    );
    outcome
}

/// Feeds the files as one session, follows playback to the end, then stops.
async fn drive(
    handle: PlaybackHandle,
    files: &[PathBuf],
    auto_play: bool,
    mock: Option<MockBackend>,
) -> Result<()> {
    stream_files(&handle, files).await?;
    if !auto_play {
        handle.play().await?;
    }

    let mut views = handle.subscribe();
    let mut started = false;
    let mut last_line = String::new();
    loop {
        let view = views.borrow_and_update().clone();
        let controls = ControlsView::from_view(&view);
        let line = controls.render(BAR_WIDTH);
        if line != last_line {
            eprint!("\r{}", line);
            let _ = std::io::stderr().flush();
            last_line = line;
        }

        match view.status {
            PlaybackStatus::Playing => started = true,
            PlaybackStatus::Idle if started => break,
            _ => {}
        }

        tokio::select! {
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
            }
            _ = tokio::time::sleep(DRY_RUN_STEP), if mock.is_some() => {
                if let Some(mock) = &mock {
                    simulate_step(mock);
                }
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("interrupted");
                break;
            }
        }
    }
    eprintln!();

    let view = handle.view();
    for line in ControlsView::from_view(&view).transcript_or_placeholder() {
        println!("{}", line);
    }
    handle.stop().await?;
    Ok(())
}

fn simulate_step(mock: &MockBackend) {
    mock.advance(DRY_RUN_ADVANCE);
    if mock.active_remaining() == Some(Duration::ZERO) {
        mock.finish_active();
    }
}

async fn stream_files(handle: &PlaybackHandle, files: &[PathBuf]) -> Result<()> {
    let session_id = Uuid::new_v4().to_string();
    handle
        .send(StreamEvent::StartSession {
            session_id: session_id.clone(),
        })
        .await?;

    for (index, path) in files.iter().enumerate() {
        let data = Bytes::from(
            tokio::fs::read(path)
                .await
                .with_context(|| format!("reading {}", path.display()))?,
        );
        let clip_id = format!("clip-{}", index);
        let mime_type = mime_for(path);
        let mut text = transcript_for(path);

        let mut offset = 0;
        while offset < data.len() {
            let end = (offset + CHUNK_BYTES).min(data.len());
            handle
                .send(StreamEvent::EnqueueChunk {
                    session_id: session_id.clone(),
                    clip_id: clip_id.clone(),
                    mime_type: mime_type.to_string(),
                    buffer: data.slice(offset..end),
                    text: text.take(),
                })
                .await?;
            offset = end;
        }

        handle
            .send(StreamEvent::FinalizeClip {
                session_id: session_id.clone(),
                clip_id,
                duration_ms: None,
                size_bytes: Some(data.len() as u64),
                text: None,
                mime_type: None,
            })
            .await?;
    }
    Ok(())
}

fn mime_for(path: &Path) -> &'static str {
    let extension = path.extension().and_then(|ext| ext.to_str()).unwrap_or_default();
    content_type_for_extension(extension)
}

fn transcript_for(path: &Path) -> Option<String> {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().replace(['_', '-'], " "))
}
