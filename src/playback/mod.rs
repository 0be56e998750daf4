pub mod controller;
pub mod engine;
pub mod events;
#[cfg(unix)]
pub mod mpv;
pub mod player;
pub mod position;
pub mod speed;
pub mod status;
#[cfg(test)]
pub(crate) mod testing;

pub use controller::{Command, ControllerSettings, PlaybackController};
pub use engine::PlaybackOptions;
pub use events::PlaybackState;
#[cfg(unix)]
pub use mpv::MpvEngine;
pub use position::format_time;
pub use speed::Speed;
pub use status::{Level, Snapshot};
