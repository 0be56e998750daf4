mod config;
pub mod playlist;

pub use config::Config;
pub use playlist::{AddReport, MediaEntry, Playlist};
