use std::fmt;

use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
    Paused,
    Stopped,
    Error(String),
}

impl PlaybackState {
    pub fn is_error(&self) -> bool {
        matches!(self, PlaybackState::Error(_))
    }
}

impl fmt::Display for PlaybackState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlaybackState::Idle => write!(f, "Idle"),
            PlaybackState::Playing => write!(f, "Playing"),
            PlaybackState::Paused => write!(f, "Paused"),
            PlaybackState::Stopped => write!(f, "Stopped"),
            PlaybackState::Error(msg) => write!(f, "Error: {}", msg),
        }
    }
}

/// Notifications pushed by an engine.
#[derive(Debug, Clone, PartialEq)]
pub enum EngineEvent {
    Playing,
    Paused,
    Stopped,
    Finished,
    Error(String),
}

/// Identifies one `PlayAt` attempt. Increases monotonically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Generation(pub u64);

impl Generation {
    pub fn next(self) -> Self {
        Generation(self.0 + 1)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaggedEvent {
    pub generation: Generation,
    pub event: EngineEvent,
}

/// Handle an engine uses to report events for the media it was loaded with.
///
/// Each sink is stamped with the generation of the load that created it, so
/// events sent through a sink from an earlier load are recognisably stale.
#[derive(Debug, Clone)]
pub struct EventSink {
    generation: Generation,
    tx: mpsc::UnboundedSender<TaggedEvent>,
}

impl EventSink {
    pub fn new(generation: Generation, tx: mpsc::UnboundedSender<TaggedEvent>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> Generation {
        self.generation
    }

    /// Returns false once the controller has gone away.
    pub fn emit(&self, event: EngineEvent) -> bool {
        self.tx
            .send(TaggedEvent {
                generation: self.generation,
                event,
            })
            .is_ok()
    }
}
