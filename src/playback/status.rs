use std::{fmt, sync::Arc};

use crate::playback::events::PlaybackState;
use crate::playback::position::DisplayPosition;
use crate::playback::speed::Speed;
use crate::state::MediaEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Warning,
    Error,
}

/// A user-facing status message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub level: Level,
    pub text: String,
}

impl fmt::Display for Report {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// Read-only projection of the controller, republished after every change.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Snapshot {
    pub state: PlaybackState,
    pub current_index: Option<usize>,
    pub entries: Arc<Vec<MediaEntry>>,
    pub position: DisplayPosition,
    pub speed: Speed,
    pub speed_pending: bool,
    pub adjusting: bool,
    pub report: Option<Report>,
    /// Bumped for every new report, including repeats of the same text.
    pub report_seq: u64,
}

impl Snapshot {
    pub fn current_entry(&self) -> Option<&MediaEntry> {
        self.current_index.and_then(|i| self.entries.get(i))
    }

    pub fn controls(&self) -> Controls {
        Controls::from(self)
    }
}

/// Which transport actions currently do something.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Controls {
    pub play: bool,
    pub pause: bool,
    pub stop: bool,
    pub next: bool,
    pub previous: bool,
    pub clear: bool,
}

impl From<&Snapshot> for Controls {
    fn from(snapshot: &Snapshot) -> Self {
        let has_media = !snapshot.entries.is_empty();
        let failed = snapshot.state.is_error();
        let playing = snapshot.state == PlaybackState::Playing;
        let paused = snapshot.state == PlaybackState::Paused;
        let last = snapshot.entries.len().saturating_sub(1);

        Controls {
            play: has_media && !playing,
            pause: playing,
            stop: playing || paused,
            next: has_media && !failed && snapshot.current_index.map_or(true, |i| i < last),
            previous: !failed && snapshot.current_index.is_some_and(|i| i > 0),
            clear: has_media,
        }
    }
}
