use anyhow::{Context, Result};
use signcast::config::{DisplayMode, PlayerSettings, SourceSettings};
use signcast::playback::{ControllerOptions, PlaybackController};
use signcast::schedule::LocalClock;
use signcast::source::{subscribe, FileSource, RealtimeDbSource, SnapshotSource};
use signcast::surface::LogSurface;
use signcast::ui::run_kiosk;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    // signcast [CONFIG_PATH]
    let config_arg = std::env::args_os().nth(1).map(PathBuf::from);
    let (settings, settings_path) =
        PlayerSettings::load(config_arg.as_deref()).context("failed to load settings")?;

    init_logging(&settings.log_filter);
    match &settings_path {
        Some(path) => info!(path = %path.display(), "settings loaded"),
        None => info!("using default settings"),
    }

    // Create tokio runtime for async operations
    let rt = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;
    let source = build_source(&settings.source)?;

    match settings.display {
        DisplayMode::Headless => rt.block_on(run_headless(settings, source)),
        DisplayMode::Window => run_kiosk(rt, settings, settings_path, source),
    }
}

/// RUST_LOG wins over the configured filter
fn init_logging(fallback: &str) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn build_source(settings: &SourceSettings) -> Result<Box<dyn SnapshotSource>> {
    let source: Box<dyn SnapshotSource> = match settings {
        SourceSettings::File { path, .. } => Box::new(FileSource::new(path)),
        SourceSettings::RealtimeDb {
            database_url,
            path,
            auth_token,
            ..
        } => Box::new(
            RealtimeDbSource::new(database_url, path, auth_token.clone())
                .context("failed to create realtime database client")?,
        ),
    };
    info!(source = source.name(), every_ms = settings.poll_interval().as_millis() as u64, "playlist source");
    Ok(source)
}

/// Play with no display until Ctrl-C
async fn run_headless(settings: PlayerSettings, source: Box<dyn SnapshotSource>) -> Result<()> {
    let subscription = subscribe(source, settings.source.poll_interval());
    let (controller, handle) = PlaybackController::new(
        LogSurface::new("headless"),
        LocalClock,
        ControllerOptions {
            reevaluate_every: settings.reevaluate_every(),
        },
    );
    let controller_task = tokio::spawn(controller.run(subscription));

    let mut status = handle.watch_status();
    tokio::spawn(async move {
        while status.changed().await.is_ok() {
            let s = status.borrow_and_update().clone();
            debug!(
                state = ?s.state,
                playlist = s.playlist_name.as_deref().unwrap_or("-"),
                item = s.item_name.as_deref().unwrap_or("-"),
                index = s.item_index,
                candidates = s.candidates.len(),
                "status"
            );
        }
    });

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    info!("ctrl-c received, shutting down");

    handle.shutdown().await;
    let surface = controller_task.await.context("playback controller task failed")?;
    info!(presented = surface.presented(), "headless player stopped");
    Ok(())
}
