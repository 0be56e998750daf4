use std::{path::PathBuf, time::Duration};

use tokio::{
    sync::{mpsc, oneshot, watch},
    task::JoinHandle,
    time::MissedTickBehavior,
};
use tracing::{debug, info, warn};

use crate::error::PlaybackError;
use crate::playback::engine::{Engine, PlaybackOptions};
use crate::playback::events::TaggedEvent;
use crate::playback::player::Player;
use crate::playback::speed::Speed;
use crate::playback::status::Snapshot;
use crate::state::{AddReport, Config};

#[derive(Debug)]
pub enum Command {
    Play,
    PlayAt(usize),
    Pause,
    Stop,
    Next,
    Previous,
    AddEntries {
        paths: Vec<PathBuf>,
        reply: oneshot::Sender<AddReport>,
    },
    Clear,
    BeginSeek,
    EndSeek(f64),
    CancelSeek,
    SetSpeed(Speed),
    Shutdown,
}

#[derive(Debug, Clone)]
pub struct ControllerSettings {
    pub poll_interval: Duration,
    pub options: PlaybackOptions,
    pub speed: Speed,
    pub command_buffer: usize,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for ControllerSettings {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            options: config.playback_options(),
            speed: config.default_speed,
            command_buffer: config.command_buffer.max(1),
        }
    }
}

/// Handle to the playback task.
///
/// Commands, engine events and position polls are all handled on that one
/// task, in arrival order. Dropping the handle shuts playback down.
#[derive(Debug)]
pub struct PlaybackController {
    commands: mpsc::Sender<Command>,
    snapshots: watch::Receiver<Snapshot>,
    task: Option<JoinHandle<()>>,
}

impl PlaybackController {
    pub fn spawn<E: Engine>(engine: E, settings: ControllerSettings) -> Self {
        let (command_tx, command_rx) = mpsc::channel(settings.command_buffer);
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let player = Player::new(engine, settings.options, settings.speed, event_tx);
        let (snapshot_tx, snapshot_rx) = watch::channel(player.snapshot());

        let task = tokio::spawn(run(
            player,
            command_rx,
            event_rx,
            snapshot_tx,
            settings.poll_interval,
        ));

        Self {
            commands: command_tx,
            snapshots: snapshot_rx,
            task: Some(task),
        }
    }

    pub async fn send(&self, command: Command) -> Result<(), PlaybackError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| PlaybackError::ControllerClosed)
    }

    /// Non-blocking variant for UI loops. A full queue drops the command.
    pub fn try_send(&self, command: Command) -> Result<(), PlaybackError> {
        match self.commands.try_send(command) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(command)) => {
                warn!(?command, "command queue full, dropping");
                Ok(())
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PlaybackError::ControllerClosed),
        }
    }

    pub async fn play(&self) -> Result<(), PlaybackError> {
        self.send(Command::Play).await
    }

    pub async fn play_at(&self, index: usize) -> Result<(), PlaybackError> {
        self.send(Command::PlayAt(index)).await
    }

    pub async fn pause(&self) -> Result<(), PlaybackError> {
        self.send(Command::Pause).await
    }

    pub async fn stop(&self) -> Result<(), PlaybackError> {
        self.send(Command::Stop).await
    }

    pub async fn next(&self) -> Result<(), PlaybackError> {
        self.send(Command::Next).await
    }

    pub async fn previous(&self) -> Result<(), PlaybackError> {
        self.send(Command::Previous).await
    }

    pub async fn clear(&self) -> Result<(), PlaybackError> {
        self.send(Command::Clear).await
    }

    pub async fn begin_seek(&self) -> Result<(), PlaybackError> {
        self.send(Command::BeginSeek).await
    }

    pub async fn end_seek(&self, fraction: f64) -> Result<(), PlaybackError> {
        self.send(Command::EndSeek(fraction)).await
    }

    pub async fn set_speed(&self, speed: Speed) -> Result<(), PlaybackError> {
        self.send(Command::SetSpeed(speed)).await
    }

    /// Validates and appends files, returning the per-file outcome.
    pub async fn add_entries(&self, paths: Vec<PathBuf>) -> Result<AddReport, PlaybackError> {
        let (reply, rx) = oneshot::channel();
        self.send(Command::AddEntries { paths, reply }).await?;
        rx.await.map_err(|_| PlaybackError::ControllerClosed)
    }

    pub fn snapshot(&self) -> Snapshot {
        self.snapshots.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.snapshots.clone()
    }

    /// Stops playback, releases the engine and waits for the task to end.
    pub async fn shutdown(mut self) {
        let _ = self.commands.send(Command::Shutdown).await;
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                warn!(%e, "playback task ended abnormally");
            }
        }
    }
}

async fn run<E: Engine>(
    mut player: Player<E>,
    mut commands: mpsc::Receiver<Command>,
    mut events: mpsc::UnboundedReceiver<TaggedEvent>,
    snapshots: watch::Sender<Snapshot>,
    poll_interval: Duration,
) {
    let mut ticker = tokio::time::interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(?poll_interval, "playback task started");

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(Command::Shutdown) | None => break,
                Some(command) => dispatch(&mut player, command).await,
            },
            Some(event) = events.recv() => player.handle_event(event).await,
            _ = ticker.tick() => {
                if !player.poll().await {
                    continue;
                }
            }
        }
        publish(&player, &snapshots);
    }

    player.shutdown().await;
    publish(&player, &snapshots);
}

async fn dispatch<E: Engine>(player: &mut Player<E>, command: Command) {
    debug!(?command, "command");
    match command {
        Command::Play => player.play().await,
        Command::PlayAt(index) => player.play_at(index).await,
        Command::Pause => player.pause().await,
        Command::Stop => player.stop().await,
        Command::Next => player.next().await,
        Command::Previous => player.previous().await,
        Command::AddEntries { paths, reply } => {
            let report = player.add_entries(&paths);
            let _ = reply.send(report);
        }
        Command::Clear => player.clear().await,
        Command::BeginSeek => player.begin_seek(),
        Command::EndSeek(fraction) => player.end_seek(fraction).await,
        Command::CancelSeek => player.cancel_seek(),
        Command::SetSpeed(speed) => player.set_speed(speed).await,
        Command::Shutdown => {}
    }
}

fn publish<E: Engine>(player: &Player<E>, snapshots: &watch::Sender<Snapshot>) {
    let next = player.snapshot();
    snapshots.send_if_modified(|current| {
        if *current == next {
            false
        } else {
            *current = next;
            true
        }
    });
}
