//! Recording engine double shared by the playback tests.

use std::{
    collections::HashSet,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

use async_trait::async_trait;

use crate::error::EngineError;
use crate::playback::engine::{Engine, EngineStatus, PlaybackOptions};
use crate::playback::events::{EngineEvent, EventSink};

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Load(PathBuf),
    Play,
    Pause,
    Resume,
    Stop,
    SetPosition(f64),
    SetRate(f64),
    Status,
    Release,
}

#[derive(Debug, Default)]
struct Inner {
    calls: Vec<Call>,
    sinks: Vec<EventSink>,
    status: EngineStatus,
    failing_ops: HashSet<&'static str>,
    failing_files: HashSet<String>,
}

/// Cloneable so a test keeps a handle after moving the engine away.
#[derive(Debug, Clone, Default)]
pub struct FakeEngine {
    inner: Arc<Mutex<Inner>>,
}

impl FakeEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<Call> {
        self.inner.lock().unwrap().calls.clone()
    }

    /// Calls other than status polls.
    pub fn commands(&self) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|c| *c != Call::Status)
            .collect()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().unwrap().calls.clear();
    }

    pub fn count(&self, call: &Call) -> usize {
        self.calls().iter().filter(|c| *c == call).count()
    }

    pub fn set_status(&self, elapsed_ms: i64, total_ms: i64) {
        let mut inner = self.inner.lock().unwrap();
        inner.status.elapsed_ms = elapsed_ms;
        inner.status.total_ms = total_ms;
    }

    /// Makes the named trait method fail until [`FakeEngine::heal`].
    pub fn fail(&self, op: &'static str) {
        self.inner.lock().unwrap().failing_ops.insert(op);
    }

    pub fn heal(&self, op: &'static str) {
        self.inner.lock().unwrap().failing_ops.remove(op);
    }

    pub fn fail_file(&self, name: &str) {
        self.inner.lock().unwrap().failing_files.insert(name.to_string());
    }

    pub fn heal_file(&self, name: &str) {
        self.inner.lock().unwrap().failing_files.remove(name);
    }

    pub fn sink(&self, nth: usize) -> EventSink {
        self.inner.lock().unwrap().sinks[nth].clone()
    }

    /// Emits through the sink of the most recent load.
    pub fn emit(&self, event: EngineEvent) {
        let sink = self
            .inner
            .lock()
            .unwrap()
            .sinks
            .last()
            .cloned()
            .expect("no media loaded");
        sink.emit(event);
    }

    fn record(&self, call: Call, op: &'static str) -> Result<(), EngineError> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        if inner.failing_ops.contains(op) {
            Err(EngineError::Rejected(format!("{op} refused")))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Engine for FakeEngine {
    async fn load(
        &mut self,
        path: &Path,
        _options: &PlaybackOptions,
        sink: EventSink,
    ) -> Result<(), EngineError> {
        self.record(Call::Load(path.to_path_buf()), "load")?;
        let mut inner = self.inner.lock().unwrap();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        if inner.failing_files.contains(&name) {
            return Err(EngineError::Rejected(format!("cannot open {name}")));
        }
        inner.sinks.push(sink);
        inner.status = EngineStatus::default();
        Ok(())
    }

    async fn play(&mut self) -> Result<(), EngineError> {
        self.record(Call::Play, "play")?;
        self.inner.lock().unwrap().status.is_playing = true;
        Ok(())
    }

    async fn pause(&mut self) -> Result<(), EngineError> {
        self.record(Call::Pause, "pause")?;
        self.inner.lock().unwrap().status.is_playing = false;
        Ok(())
    }

    async fn resume(&mut self) -> Result<(), EngineError> {
        self.record(Call::Resume, "resume")?;
        self.inner.lock().unwrap().status.is_playing = true;
        Ok(())
    }

    async fn stop(&mut self) -> Result<(), EngineError> {
        self.record(Call::Stop, "stop")?;
        self.inner.lock().unwrap().status.is_playing = false;
        Ok(())
    }

    async fn set_position(&mut self, fraction: f64) -> Result<(), EngineError> {
        self.record(Call::SetPosition(fraction), "set_position")?;
        let mut inner = self.inner.lock().unwrap();
        inner.status.elapsed_ms = (fraction * inner.status.total_ms as f64) as i64;
        Ok(())
    }

    async fn set_rate(&mut self, rate: f64) -> Result<(), EngineError> {
        self.record(Call::SetRate(rate), "set_rate")
    }

    async fn status(&mut self) -> Result<EngineStatus, EngineError> {
        self.record(Call::Status, "status")?;
        Ok(self.inner.lock().unwrap().status)
    }

    async fn release(&mut self) -> Result<(), EngineError> {
        self.record(Call::Release, "release")
    }
}
