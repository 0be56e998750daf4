use std::{path::Path, sync::Arc};

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::error::{EngineError, PlaybackError};
use crate::playback::engine::{Engine, PlaybackOptions};
use crate::playback::events::{EngineEvent, EventSink, Generation, PlaybackState, TaggedEvent};
use crate::playback::position::PositionTracker;
use crate::playback::speed::{RateRequest, Speed, SpeedController};
use crate::playback::status::{Level, Report, Snapshot};
use crate::state::{AddReport, MediaEntry, Playlist};

/// Playback state machine.
///
/// Owns the playlist, the current index and the engine. Every method runs to
/// completion before the next one starts; [`super::PlaybackController`] drives
/// it from a single task.
pub struct Player<E: Engine> {
    engine: E,
    playlist: Playlist,
    entries: Arc<Vec<MediaEntry>>,
    current: Option<usize>,
    state: PlaybackState,
    generation: Generation,
    tracker: PositionTracker,
    speed: SpeedController,
    options: PlaybackOptions,
    events: mpsc::UnboundedSender<TaggedEvent>,
    report: Option<Report>,
    report_seq: u64,
    poll_failed: bool,
    released: bool,
}

impl<E: Engine> Player<E> {
    pub fn new(
        engine: E,
        options: PlaybackOptions,
        speed: Speed,
        events: mpsc::UnboundedSender<TaggedEvent>,
    ) -> Self {
        Self {
            engine,
            playlist: Playlist::new(),
            entries: Arc::default(),
            current: None,
            state: PlaybackState::Idle,
            generation: Generation::default(),
            tracker: PositionTracker::default(),
            speed: SpeedController::new(speed),
            options,
            events,
            report: None,
            report_seq: 0,
            poll_failed: false,
            released: false,
        }
    }

    #[cfg(test)]
    pub fn state(&self) -> &PlaybackState {
        &self.state
    }

    #[cfg(test)]
    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    #[cfg(test)]
    pub fn position(&self) -> crate::playback::position::DisplayPosition {
        self.tracker.position()
    }

    #[cfg(test)]
    pub fn generation(&self) -> Generation {
        self.generation
    }

    #[cfg(test)]
    pub fn last_report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn snapshot(&self) -> Snapshot {
        debug_assert!(
            !matches!(self.state, PlaybackState::Playing | PlaybackState::Paused)
                || self.current.is_some()
        );
        Snapshot {
            state: self.state.clone(),
            current_index: self.current,
            entries: Arc::clone(&self.entries),
            position: self.tracker.position(),
            speed: self.speed.selected(),
            speed_pending: self.speed.is_pending(),
            adjusting: self.tracker.is_adjusting(),
            report: self.report.clone(),
            report_seq: self.report_seq,
        }
    }

    fn report(&mut self, level: Level, text: impl Into<String>) {
        let text = text.into();
        match level {
            Level::Info => info!("{}", text),
            Level::Warning => warn!("{}", text),
            Level::Error => error!("{}", text),
        }
        self.report = Some(Report { level, text });
        self.report_seq += 1;
    }

    fn transient(&mut self, operation: &'static str, err: EngineError) {
        let err = PlaybackError::TransientControl {
            operation,
            reason: err.to_string(),
        };
        self.report(Level::Warning, err.to_string());
    }

    fn fail(&mut self, err: PlaybackError) {
        let message = err.to_string();
        self.state = PlaybackState::Error(message.clone());
        self.report(Level::Error, message);
    }

    fn current_name(&self) -> String {
        self.current
            .and_then(|i| self.playlist.entry_at(i).ok())
            .map(|e| e.display_name().to_string())
            .unwrap_or_default()
    }

    fn refresh_entries(&mut self) {
        self.entries = Arc::new(self.playlist.entries().to_vec());
    }

    /// Validates `paths` and appends the accepted files.
    pub fn add_entries<P: AsRef<Path>>(&mut self, paths: &[P]) -> AddReport {
        let report = self.playlist.add_entries(paths);
        self.after_append(report.accepted, report.failures.len());
        report
    }

    #[cfg(test)]
    pub(crate) fn append(&mut self, entries: Vec<MediaEntry>, skipped: usize) {
        let accepted = entries.len();
        self.playlist.push_validated(entries);
        self.after_append(accepted, skipped);
    }

    fn after_append(&mut self, accepted: usize, skipped: usize) {
        if accepted > 0 {
            self.refresh_entries();
        }
        if skipped > 0 {
            self.report(
                Level::Warning,
                format!("Loaded {} file(s), skipped {} invalid", accepted, skipped),
            );
        } else {
            self.report(Level::Info, format!("Loaded {} file(s)", accepted));
        }
    }

    /// Stops playback and empties the playlist.
    pub async fn clear(&mut self) {
        if self.playlist.is_empty() {
            return;
        }
        self.force_stop().await;
        self.playlist.clear();
        self.refresh_entries();
        self.current = None;
        self.tracker.clear();
        self.report(Level::Info, "Playlist cleared");
    }

    pub async fn play(&mut self) {
        match self.state {
            PlaybackState::Playing => {
                debug!("play ignored: already playing");
                return;
            }
            PlaybackState::Paused => {
                match self.engine.resume().await {
                    Ok(()) => {
                        self.enter_playing().await;
                        let name = self.current_name();
                        self.report(Level::Info, format!("Playing: {}", name));
                    }
                    Err(e) => self.fail(PlaybackError::Load {
                        name: self.current_name(),
                        reason: e.to_string(),
                    }),
                }
                return;
            }
            _ => {}
        }

        if self.playlist.is_empty() {
            self.report(Level::Warning, "No media loaded");
            return;
        }

        match (self.current, self.state.is_error()) {
            (None, _) => self.play_at(0).await,
            (Some(index), true) => self.play_at(index).await,
            (Some(_), false) => match self.engine.play().await {
                Ok(()) => {
                    self.enter_playing().await;
                    let name = self.current_name();
                    self.report(Level::Info, format!("Playing: {}", name));
                }
                Err(e) => self.fail(PlaybackError::Load {
                    name: self.current_name(),
                    reason: e.to_string(),
                }),
            },
        }
    }

    /// Loads and starts the entry at `index`, superseding whatever was
    /// playing before.
    pub async fn play_at(&mut self, index: usize) {
        let entry = match self.playlist.entry_at(index) {
            Ok(entry) => entry.clone(),
            Err(e) => {
                debug!(%e, "play_at ignored");
                self.report(Level::Warning, format!("No media at position {}", index + 1));
                return;
            }
        };

        self.generation = self.generation.next();
        let sink = EventSink::new(self.generation, self.events.clone());
        debug!(index, generation = self.generation.0, path = %entry.path().display(), "play_at");

        if let Err(e) = self.engine.stop().await {
            warn!(%e, "stop before load failed");
        }

        let started = match self.engine.load(entry.path(), &self.options, sink).await {
            Ok(()) => self.engine.play().await,
            Err(e) => Err(e),
        };

        match started {
            Ok(()) => {
                self.current = Some(index);
                self.tracker.clear();
                if self.speed.selected() != Speed::X1 {
                    self.speed.restore_pending();
                }
                self.enter_playing().await;
                self.report(Level::Info, format!("Playing: {}", entry.display_name()));
            }
            Err(e) => {
                // The engine may still hold this attempt's sink.
                self.generation = self.generation.next();
                self.fail(PlaybackError::Load {
                    name: entry.display_name().to_string(),
                    reason: e.to_string(),
                });
            }
        }
    }

    async fn enter_playing(&mut self) {
        self.state = PlaybackState::Playing;
        if let Some(speed) = self.speed.take_pending() {
            match self.engine.set_rate(speed.multiplier()).await {
                Ok(()) => debug!(%speed, "applied pending speed"),
                Err(e) => self.transient("speed change", e),
            }
        }
    }

    fn reject_after_error(&mut self) -> bool {
        if self.state.is_error() {
            self.report(Level::Warning, "Playback failed; press play to retry");
            return true;
        }
        false
    }

    pub async fn pause(&mut self) {
        if self.reject_after_error() {
            return;
        }
        if self.state != PlaybackState::Playing {
            debug!(state = %self.state, "pause ignored");
            return;
        }
        match self.engine.pause().await {
            Ok(()) => {
                self.state = PlaybackState::Paused;
                self.report(Level::Info, "Paused");
            }
            Err(e) => self.transient("pause", e),
        }
    }

    pub async fn stop(&mut self) {
        if self.reject_after_error() {
            return;
        }
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            debug!(state = %self.state, "stop ignored");
            return;
        }
        match self.engine.stop().await {
            Ok(()) => {
                self.state = PlaybackState::Stopped;
                self.tracker.reset();
                self.report(Level::Info, "Stopped");
            }
            Err(e) => self.transient("stop", e),
        }
    }

    /// Stops regardless of state. Used by clear, end of playlist and shutdown.
    async fn force_stop(&mut self) {
        if self.state == PlaybackState::Idle {
            return;
        }
        if let Err(e) = self.engine.stop().await {
            warn!(%e, "forced stop failed");
        }
        self.state = PlaybackState::Stopped;
        self.tracker.reset();
    }

    pub async fn next(&mut self) {
        if self.playlist.is_empty() {
            self.report(Level::Warning, "No media loaded");
            return;
        }
        if self.reject_after_error() {
            return;
        }
        match self.current {
            None => self.play_at(0).await,
            Some(i) if i + 1 >= self.playlist.len() => {
                self.report(Level::Info, "Already at last media");
            }
            Some(i) => self.play_at(i + 1).await,
        }
    }

    pub async fn previous(&mut self) {
        if self.playlist.is_empty() {
            self.report(Level::Warning, "No media loaded");
            return;
        }
        if self.reject_after_error() {
            return;
        }
        match self.current {
            Some(i) if i > 0 => self.play_at(i - 1).await,
            _ => self.report(Level::Info, "Already at first media"),
        }
    }

    pub async fn handle_event(&mut self, tagged: TaggedEvent) {
        if tagged.generation != self.generation {
            debug!(
                event = ?tagged.event,
                stale = tagged.generation.0,
                current = self.generation.0,
                "discarding stale engine event"
            );
            return;
        }
        debug!(event = ?tagged.event, "engine event");

        match tagged.event {
            EngineEvent::Finished => {
                if !matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
                    debug!(state = %self.state, "finished ignored");
                    return;
                }
                match self.current {
                    Some(i) if i + 1 < self.playlist.len() => self.play_at(i + 1).await,
                    _ => {
                        self.force_stop().await;
                        self.report(Level::Info, "Playlist finished");
                    }
                }
            }
            EngineEvent::Error(message) => {
                error!(%message, "engine reported an error");
                self.state = PlaybackState::Error(message.clone());
                self.report(Level::Error, PlaybackError::EngineAsync(message).to_string());
            }
            EngineEvent::Playing => {
                if self.current.is_some()
                    && !self.state.is_error()
                    && self.state != PlaybackState::Playing
                {
                    self.enter_playing().await;
                }
            }
            EngineEvent::Paused => {
                if self.current.is_some()
                    && !self.state.is_error()
                    && self.state != PlaybackState::Paused
                {
                    self.state = PlaybackState::Paused;
                }
            }
            EngineEvent::Stopped => {
                if matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
                    self.state = PlaybackState::Stopped;
                    self.tracker.reset();
                }
            }
        }
    }

    /// One position-tracker tick. Returns true if anything observable changed.
    pub async fn poll(&mut self) -> bool {
        if !self.tracker.should_poll(&self.state) {
            return false;
        }
        match self.engine.status().await {
            Ok(status) => {
                self.poll_failed = false;
                self.tracker.apply(status)
            }
            Err(e) => {
                if self.poll_failed {
                    debug!(%e, "status poll still failing");
                    return false;
                }
                self.poll_failed = true;
                self.transient("position update", e);
                true
            }
        }
    }

    pub fn begin_seek(&mut self) {
        self.tracker.begin_adjust();
    }

    pub fn cancel_seek(&mut self) {
        self.tracker.cancel_adjust();
    }

    pub async fn end_seek(&mut self, fraction: f64) {
        let fraction = self.tracker.end_adjust(fraction);
        if !matches!(self.state, PlaybackState::Playing | PlaybackState::Paused) {
            self.report(Level::Info, "Nothing to seek");
            return;
        }
        match self.engine.set_position(fraction).await {
            Ok(()) => {
                debug!(fraction, "seek");
                self.tracker.show_seek(fraction);
            }
            Err(e) => self.transient("seek", e),
        }
    }

    pub async fn set_speed(&mut self, speed: Speed) {
        let playing = self.state == PlaybackState::Playing;
        match self.speed.request(speed, playing) {
            RateRequest::Apply(rate) => match self.engine.set_rate(rate).await {
                Ok(()) => self.report(Level::Info, format!("Playback speed: {}", speed)),
                Err(e) => self.transient("speed change", e),
            },
            RateRequest::Deferred => {
                self.report(
                    Level::Info,
                    format!("Playback speed {} will apply on resume", speed),
                );
            }
        }
    }

    /// Final stop and engine release. Safe to call more than once.
    pub async fn shutdown(&mut self) {
        if self.released {
            return;
        }
        self.force_stop().await;
        if let Err(e) = self.engine.release().await {
            warn!(%e, "engine release failed");
        }
        self.released = true;
        info!("player shut down");
    }
}
