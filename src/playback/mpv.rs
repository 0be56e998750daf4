//! Engine gateway driving an external `mpv` process over its JSON IPC socket.

use std::{
    collections::HashMap,
    path::{Path, PathBuf},
    process::Stdio,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
    time::Duration,
};

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::{
        unix::{OwnedReadHalf, OwnedWriteHalf},
        UnixStream,
    },
    process::{Child, Command},
    sync::oneshot,
    task::JoinHandle,
    time::{sleep, timeout, Instant},
};
use tracing::{debug, info, warn};

use crate::error::EngineError;
use crate::playback::engine::{Engine, EngineStatus, PlaybackOptions};
use crate::playback::events::{EngineEvent, EventSink};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const REPLY_TIMEOUT: Duration = Duration::from_secs(2);
const QUIT_TIMEOUT: Duration = Duration::from_secs(2);
const PAUSE_OBSERVER: u64 = 1;

struct Reply {
    error: String,
    data: Value,
}

/// Where engine events go. mpv tags file events with a playlist entry id,
/// which is bound to the sink of the load that queued it.
#[derive(Debug, Default)]
struct Routes {
    pending: Option<EventSink>,
    by_entry: HashMap<i64, EventSink>,
    active: Option<EventSink>,
}

#[derive(Default)]
struct Shared {
    replies: Mutex<HashMap<u64, oneshot::Sender<Reply>>>,
    routes: Mutex<Routes>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, PartialEq)]
enum Message {
    StartFile { entry: i64 },
    EndFile {
        entry: Option<i64>,
        event: Option<EngineEvent>,
    },
    Active(EngineEvent),
    Ignored,
}

fn classify(value: &Value) -> Message {
    let entry = value.get("playlist_entry_id").and_then(Value::as_i64);
    match value.get("event").and_then(Value::as_str) {
        Some("start-file") => match entry {
            Some(entry) => Message::StartFile { entry },
            None => Message::Ignored,
        },
        Some("end-file") => {
            let event = match value.get("reason").and_then(Value::as_str) {
                Some("eof") => Some(EngineEvent::Finished),
                Some("error") => Some(EngineEvent::Error(
                    value
                        .get("file_error")
                        .and_then(Value::as_str)
                        .unwrap_or("playback error")
                        .to_string(),
                )),
                Some("stop") | Some("quit") => Some(EngineEvent::Stopped),
                _ => None,
            };
            Message::EndFile { entry, event }
        }
        Some("file-loaded") => Message::Active(EngineEvent::Playing),
        Some("property-change")
            if value.get("id").and_then(Value::as_u64) == Some(PAUSE_OBSERVER) =>
        {
            match value.get("data").and_then(Value::as_bool) {
                Some(true) => Message::Active(EngineEvent::Paused),
                Some(false) => Message::Active(EngineEvent::Playing),
                None => Message::Ignored,
            }
        }
        _ => Message::Ignored,
    }
}

fn route(routes: &mut Routes, message: Message) {
    match message {
        Message::StartFile { entry } => {
            if let Some(sink) = routes.pending.take() {
                routes.by_entry.insert(entry, sink.clone());
                routes.active = Some(sink);
            }
        }
        Message::EndFile { entry, event } => {
            let sink = match entry {
                Some(id) => routes.by_entry.remove(&id),
                None => routes.active.clone(),
            };
            let Some(sink) = sink else {
                debug!(?entry, "end-file for unknown entry");
                return;
            };
            if routes
                .active
                .as_ref()
                .is_some_and(|a| a.generation() == sink.generation())
            {
                routes.active = None;
            }
            if let Some(event) = event {
                sink.emit(event);
            }
        }
        Message::Active(event) => {
            if let Some(sink) = &routes.active {
                sink.emit(event);
            }
        }
        Message::Ignored => {}
    }
}

fn handle_line(shared: &Shared, line: &str) {
    let value: Value = match serde_json::from_str(line) {
        Ok(value) => value,
        Err(e) => {
            warn!(%e, line, "unparseable mpv message");
            return;
        }
    };

    if value.get("event").is_some() {
        let message = classify(&value);
        if message != Message::Ignored {
            debug!(?message, "mpv event");
        }
        route(&mut lock(&shared.routes), message);
        return;
    }

    let Some(id) = value.get("request_id").and_then(Value::as_u64) else {
        return;
    };
    if let Some(reply) = lock(&shared.replies).remove(&id) {
        let _ = reply.send(Reply {
            error: value
                .get("error")
                .and_then(Value::as_str)
                .unwrap_or("unknown")
                .to_string(),
            data: value.get("data").cloned().unwrap_or(Value::Null),
        });
    }
}

async fn read_loop(reader: OwnedReadHalf, shared: Arc<Shared>) {
    let mut lines = BufReader::new(reader).lines();
    loop {
        match lines.next_line().await {
            Ok(Some(line)) => handle_line(&shared, &line),
            Ok(None) => break,
            Err(e) => {
                warn!(%e, "mpv socket read failed");
                break;
            }
        }
    }

    lock(&shared.replies).clear();
    if let Some(sink) = lock(&shared.routes).active.take() {
        sink.emit(EngineEvent::Error("media engine exited".to_string()));
    }
    info!("mpv connection closed");
}

pub struct MpvEngine {
    child: Child,
    writer: OwnedWriteHalf,
    shared: Arc<Shared>,
    reader: JoinHandle<()>,
    socket_path: PathBuf,
    next_request: u64,
    last_load: Option<(PathBuf, EventSink)>,
    stopped: bool,
    released: bool,
}

impl MpvEngine {
    /// Starts `mpv_path` in idle mode and connects to its IPC socket.
    pub async fn spawn(mpv_path: &Path) -> Result<Self, EngineError> {
        let socket_path =
            std::env::temp_dir().join(format!("reel-mpv-{}.sock", std::process::id()));
        let _ = std::fs::remove_file(&socket_path);

        let mut child = Command::new(mpv_path)
            .arg("--idle=yes")
            .arg("--force-window=yes")
            .arg("--keep-open=no")
            .arg("--no-terminal")
            .arg(format!("--input-ipc-server={}", socket_path.display()))
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        info!(mpv = %mpv_path.display(), socket = %socket_path.display(), "spawned mpv");

        let deadline = Instant::now() + CONNECT_TIMEOUT;
        let stream = loop {
            match UnixStream::connect(&socket_path).await {
                Ok(stream) => break stream,
                Err(e) => {
                    if let Some(status) = child.try_wait()? {
                        return Err(EngineError::Protocol(format!(
                            "mpv exited during startup ({})",
                            status
                        )));
                    }
                    if Instant::now() >= deadline {
                        let _ = child.kill().await;
                        return Err(EngineError::Io(e));
                    }
                    sleep(Duration::from_millis(50)).await;
                }
            }
        };

        let (read_half, writer) = stream.into_split();
        let shared = Arc::new(Shared::default());
        let reader = tokio::spawn(read_loop(read_half, Arc::clone(&shared)));

        let mut engine = Self {
            child,
            writer,
            shared,
            reader,
            socket_path,
            next_request: 0,
            last_load: None,
            stopped: true,
            released: false,
        };
        engine
            .command(json!(["observe_property", PAUSE_OBSERVER, "pause"]))
            .await?;
        Ok(engine)
    }

    async fn command(&mut self, args: Value) -> Result<Value, EngineError> {
        self.next_request += 1;
        let id = self.next_request;

        let mut line = serde_json::to_vec(&json!({ "command": args, "request_id": id }))
            .map_err(|e| EngineError::Protocol(e.to_string()))?;
        line.push(b'\n');

        let (tx, rx) = oneshot::channel();
        lock(&self.shared.replies).insert(id, tx);

        if let Err(e) = self.writer.write_all(&line).await {
            lock(&self.shared.replies).remove(&id);
            return Err(e.into());
        }

        match timeout(REPLY_TIMEOUT, rx).await {
            Err(_) => {
                lock(&self.shared.replies).remove(&id);
                Err(EngineError::Timeout(REPLY_TIMEOUT))
            }
            Ok(Err(_)) => Err(EngineError::Closed),
            Ok(Ok(reply)) if reply.error == "success" => Ok(reply.data),
            Ok(Ok(reply)) => Err(EngineError::Rejected(reply.error)),
        }
    }

    async fn set_property(&mut self, name: &str, value: Value) -> Result<(), EngineError> {
        self.command(json!(["set_property", name, value]))
            .await
            .map(|_| ())
    }

    /// Reads a property, treating "unavailable" (no file loaded) as `null`.
    async fn get_property(&mut self, name: &str) -> Result<Value, EngineError> {
        match self.command(json!(["get_property", name])).await {
            Ok(value) => Ok(value),
            Err(EngineError::Rejected(reason)) => {
                debug!(name, %reason, "property unavailable");
                Ok(Value::Null)
            }
            Err(e) => Err(e),
        }
    }

    async fn loadfile(&mut self, path: &Path, sink: EventSink) -> Result<(), EngineError> {
        lock(&self.shared.routes).pending = Some(sink);
        let result = self
            .command(json!(["loadfile", path.to_string_lossy(), "replace"]))
            .await;
        if result.is_err() {
            lock(&self.shared.routes).pending = None;
        }
        result.map(|_| ())
    }
}

#[async_trait]
impl Engine for MpvEngine {
    async fn load(
        &mut self,
        path: &Path,
        options: &PlaybackOptions,
        sink: EventSink,
    ) -> Result<(), EngineError> {
        let aspect = options.aspect_ratio.as_deref().unwrap_or("-1");
        self.set_property("video-aspect-override", json!(aspect)).await?;
        let title = if options.show_title { "${filename}" } else { "" };
        self.set_property("osd-playing-msg", json!(title)).await?;

        self.loadfile(path, sink.clone()).await?;
        self.last_load = Some((path.to_path_buf(), sink));
        self.stopped = false;
        Ok(())
    }

    async fn play(&mut self) -> Result<(), EngineError> {
        if self.stopped {
            let (path, sink) = self
                .last_load
                .clone()
                .ok_or_else(|| EngineError::Rejected("nothing loaded".to_string()))?;
            self.loadfile(&path, sink).await?;
            self.stopped = false;
        }
        self.set_property("pause", json!(false)).await
    }

    async fn pause(&mut self) -> Result<(), EngineError> {
        self.set_property("pause", json!(true)).await
    }

    async fn resume(&mut self) -> Result<(), EngineError> {
        self.set_property("pause", json!(false)).await
    }

    async fn stop(&mut self) -> Result<(), EngineError> {
        self.command(json!(["stop"])).await?;
        self.stopped = true;
        Ok(())
    }

    async fn set_position(&mut self, fraction: f64) -> Result<(), EngineError> {
        let percent = (fraction * 100.0).clamp(0.0, 100.0);
        self.command(json!(["seek", percent, "absolute-percent"]))
            .await
            .map(|_| ())
    }

    async fn set_rate(&mut self, rate: f64) -> Result<(), EngineError> {
        self.set_property("speed", json!(rate)).await
    }

    async fn status(&mut self) -> Result<EngineStatus, EngineError> {
        let elapsed = self.get_property("time-pos").await?.as_f64().unwrap_or(0.0);
        let total = self.get_property("duration").await?.as_f64().unwrap_or(0.0);
        let paused = self.get_property("pause").await?.as_bool().unwrap_or(false);
        Ok(EngineStatus {
            is_playing: !self.stopped && !paused,
            elapsed_ms: (elapsed * 1000.0) as i64,
            total_ms: (total * 1000.0) as i64,
        })
    }

    async fn release(&mut self) -> Result<(), EngineError> {
        if self.released {
            return Ok(());
        }
        self.released = true;

        if let Err(e) = self.command(json!(["quit"])).await {
            debug!(%e, "quit command not acknowledged");
        }
        if timeout(QUIT_TIMEOUT, self.child.wait()).await.is_err() {
            warn!("mpv did not exit, killing it");
            self.child.kill().await?;
        }
        self.reader.abort();
        let _ = std::fs::remove_file(&self.socket_path);
        info!("mpv released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::events::{Generation, TaggedEvent};
    use tokio::sync::mpsc;

    fn sink(generation: u64, tx: &mpsc::UnboundedSender<TaggedEvent>) -> EventSink {
        EventSink::new(Generation(generation), tx.clone())
    }

    #[test]
    fn end_file_reasons_map_to_events() {
        let eof = json!({"event": "end-file", "reason": "eof", "playlist_entry_id": 3});
        assert_eq!(
            classify(&eof),
            Message::EndFile {
                entry: Some(3),
                event: Some(EngineEvent::Finished)
            }
        );

        let error = json!({"event": "end-file", "reason": "error", "file_error": "unrecognized file format"});
        assert_eq!(
            classify(&error),
            Message::EndFile {
                entry: None,
                event: Some(EngineEvent::Error("unrecognized file format".into()))
            }
        );

        let stop = json!({"event": "end-file", "reason": "stop", "playlist_entry_id": 1});
        assert!(matches!(
            classify(&stop),
            Message::EndFile {
                event: Some(EngineEvent::Stopped),
                ..
            }
        ));
    }

    #[test]
    fn pause_observer_maps_to_playing_and_paused() {
        let paused = json!({"event": "property-change", "id": 1, "name": "pause", "data": true});
        let resumed = json!({"event": "property-change", "id": 1, "name": "pause", "data": false});
        let other = json!({"event": "property-change", "id": 7, "name": "volume", "data": 50});

        assert_eq!(classify(&paused), Message::Active(EngineEvent::Paused));
        assert_eq!(classify(&resumed), Message::Active(EngineEvent::Playing));
        assert_eq!(classify(&other), Message::Ignored);
    }

    #[test]
    fn events_follow_the_sink_that_loaded_the_file() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut routes = Routes::default();

        routes.pending = Some(sink(1, &tx));
        route(&mut routes, Message::StartFile { entry: 10 });

        routes.pending = Some(sink(2, &tx));
        route(
            &mut routes,
            Message::EndFile {
                entry: Some(10),
                event: Some(EngineEvent::Stopped),
            },
        );
        route(&mut routes, Message::StartFile { entry: 11 });
        route(&mut routes, Message::Active(EngineEvent::Playing));

        let first = rx.try_recv().unwrap();
        assert_eq!((first.generation, first.event), (Generation(1), EngineEvent::Stopped));
        let second = rx.try_recv().unwrap();
        assert_eq!((second.generation, second.event), (Generation(2), EngineEvent::Playing));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn unknown_entries_are_dropped() {
        let (tx, mut rx) = mpsc::unbounded_channel();
        let mut routes = Routes {
            active: Some(sink(4, &tx)),
            ..Routes::default()
        };
        route(
            &mut routes,
            Message::EndFile {
                entry: Some(99),
                event: Some(EngineEvent::Finished),
            },
        );
        assert!(rx.try_recv().is_err());
        assert!(routes.active.is_some());
    }

    #[test]
    fn replies_are_matched_by_request_id() {
        let shared = Shared::default();
        let (tx, mut rx) = oneshot::channel();
        lock(&shared.replies).insert(7, tx);

        handle_line(&shared, r#"{"request_id":7,"error":"success","data":12.5}"#);
        let reply = rx.try_recv().unwrap();
        assert_eq!(reply.error, "success");
        assert_eq!(reply.data, json!(12.5));
    }
}
