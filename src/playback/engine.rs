use std::path::Path;

use async_trait::async_trait;

use crate::error::EngineError;
use crate::playback::events::EventSink;

/// Per-media options applied when a file is loaded.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PlaybackOptions {
    pub aspect_ratio: Option<String>,
    /// Show the file name as an overlay when playback starts.
    pub show_title: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineStatus {
    pub is_playing: bool,
    pub elapsed_ms: i64,
    pub total_ms: i64,
}

/// Gateway to the native media engine.
///
/// Calls return once the engine has accepted the request; whether playback
/// actually starts, finishes or fails is reported later through the
/// [`EventSink`] given to [`Engine::load`].
#[async_trait]
pub trait Engine: Send + 'static {
    async fn load(
        &mut self,
        path: &Path,
        options: &PlaybackOptions,
        sink: EventSink,
    ) -> Result<(), EngineError>;

    /// Starts the loaded media from its current position.
    async fn play(&mut self) -> Result<(), EngineError>;

    async fn pause(&mut self) -> Result<(), EngineError>;

    async fn resume(&mut self) -> Result<(), EngineError>;

    /// Must succeed when nothing is playing.
    async fn stop(&mut self) -> Result<(), EngineError>;

    async fn set_position(&mut self, fraction: f64) -> Result<(), EngineError>;

    async fn set_rate(&mut self, rate: f64) -> Result<(), EngineError>;

    async fn status(&mut self) -> Result<EngineStatus, EngineError>;

    /// Frees the engine. Called exactly once, after a final stop.
    async fn release(&mut self) -> Result<(), EngineError>;
}
