pub mod commands;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::playback::Speed;

#[derive(Parser, Debug)]
#[command(name = "reel")]
#[command(about = "Terminal media player with a playlist, driving mpv")]
#[command(version)]
pub struct Cli {
    /// Config file to use instead of the default location
    #[arg(long, global = true, env = "REEL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Write logs to this file (the player screen never shows them)
    #[arg(long, global = true, env = "REEL_LOG_FILE")]
    pub log_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open the player with the given files
    Play {
        files: Vec<PathBuf>,

        /// Playlist index to start at
        #[arg(short, long)]
        start: Option<usize>,

        /// Initial playback speed (1x, 2x, 4x, 8x)
        #[arg(long)]
        speed: Option<Speed>,
    },

    /// Validate files without playing them
    Check {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the effective configuration
    Config {
        /// Save it to the config path
        #[arg(long)]
        write: bool,
    },
}
