use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::info;

use crate::playback::{ControllerSettings, PlaybackController, Speed};
use crate::state::Config;
use crate::tui;

pub async fn run(
    files: &[PathBuf],
    start: Option<usize>,
    speed: Option<Speed>,
    config: &Config,
) -> Result<()> {
    let mut settings = ControllerSettings::from(config);
    if let Some(speed) = speed {
        settings.speed = speed;
    }

    let controller = spawn_controller(config, settings).await?;

    if !files.is_empty() {
        let report = controller.add_entries(files.to_vec()).await?;
        for failure in &report.failures {
            eprintln!("skipped: {}", failure);
        }
        info!(accepted = report.accepted, skipped = report.failures.len(), "playlist loaded");

        if let Some(index) = start {
            controller.play_at(index).await?;
        }
    }

    let result = tui::run(&controller).await;
    controller.shutdown().await;
    result
}

#[cfg(unix)]
async fn spawn_controller(config: &Config, settings: ControllerSettings) -> Result<PlaybackController> {
    use crate::playback::MpvEngine;

    let engine = MpvEngine::spawn(&config.mpv_path)
        .await
        .with_context(|| format!("Failed to start mpv ({})", config.mpv_path.display()))?;
    Ok(PlaybackController::spawn(engine, settings))
}

#[cfg(not(unix))]
async fn spawn_controller(_config: &Config, _settings: ControllerSettings) -> Result<PlaybackController> {
    anyhow::bail!("The mpv gateway needs Unix domain sockets and is not available on this platform")
}
