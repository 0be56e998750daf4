//! Error types for the player core.
//!
//! Ingestion failures never reach the state machine. Everything else is
//! turned into either a `PlaybackState::Error` or a status report by the
//! controller.

use std::path::PathBuf;

use thiserror::Error;

/// A candidate file rejected at ingestion time.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("file not found: {}", .0.display())]
    NotFound(PathBuf),

    #[error("not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("unsupported media type: {}", .path.display())]
    UnsupportedExtension { path: PathBuf },

    #[error("cannot read file {}: {source}", .path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failures surfaced by the playback controller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// The engine rejected a load or play request.
    #[error("failed to play {name}: {reason}")]
    Load { name: String, reason: String },

    /// A seek or rate change failed. Playback state is left untouched.
    #[error("{operation} failed: {reason}")]
    TransientControl {
        operation: &'static str,
        reason: String,
    },

    /// The engine pushed an error event for the current media.
    #[error("engine error: {0}")]
    EngineAsync(String),

    #[error("index {index} out of range for playlist of {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("playback controller has shut down")]
    ControllerClosed,
}

/// Failures raised by an engine gateway implementation.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("engine rejected request: {0}")]
    Rejected(String),

    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine protocol error: {0}")]
    Protocol(String),

    #[error("engine connection closed")]
    Closed,

    #[error("engine did not answer within {0:?}")]
    Timeout(std::time::Duration),
}
