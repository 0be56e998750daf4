use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Speed {
    #[default]
    #[serde(rename = "1x")]
    X1,
    #[serde(rename = "2x")]
    X2,
    #[serde(rename = "4x")]
    X4,
    #[serde(rename = "8x")]
    X8,
}

impl Speed {
    pub const ALL: [Speed; 4] = [Speed::X1, Speed::X2, Speed::X4, Speed::X8];

    pub fn multiplier(self) -> f64 {
        match self {
            Speed::X1 => 1.0,
            Speed::X2 => 2.0,
            Speed::X4 => 4.0,
            Speed::X8 => 8.0,
        }
    }
}

impl fmt::Display for Speed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Speed::X1 => write!(f, "1x"),
            Speed::X2 => write!(f, "2x"),
            Speed::X4 => write!(f, "4x"),
            Speed::X8 => write!(f, "8x"),
        }
    }
}

impl FromStr for Speed {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_suffix('x')
            .or_else(|| trimmed.strip_suffix('X'))
            .unwrap_or(trimmed);
        match digits {
            "1" => Ok(Speed::X1),
            "2" => Ok(Speed::X2),
            "4" => Ok(Speed::X4),
            "8" => Ok(Speed::X8),
            _ => Err(format!("unknown speed '{}', expected one of 1x, 2x, 4x, 8x", s)),
        }
    }
}

/// What to do with a speed selection right now.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RateRequest {
    /// Send this multiplier to the engine.
    Apply(f64),
    /// Remember the selection until playback resumes.
    Deferred,
}

/// Tracks the selected speed and whether the engine has been told about it.
///
/// A selection made while not playing is kept pending and handed out by
/// [`SpeedController::take_pending`] once playback is running again.
#[derive(Debug, Default)]
pub struct SpeedController {
    selected: Speed,
    pending: bool,
}

impl SpeedController {
    pub fn new(initial: Speed) -> Self {
        Self {
            selected: initial,
            pending: initial != Speed::X1,
        }
    }

    pub fn selected(&self) -> Speed {
        self.selected
    }

    pub fn is_pending(&self) -> bool {
        self.pending
    }

    pub fn request(&mut self, speed: Speed, playing: bool) -> RateRequest {
        self.selected = speed;
        if playing {
            self.pending = false;
            RateRequest::Apply(speed.multiplier())
        } else {
            self.pending = true;
            RateRequest::Deferred
        }
    }

    pub fn take_pending(&mut self) -> Option<Speed> {
        if self.pending {
            self.pending = false;
            Some(self.selected)
        } else {
            None
        }
    }

    /// Re-arms the selected speed so it is applied to newly loaded media.
    pub fn restore_pending(&mut self) {
        self.pending = true;
    }
}
