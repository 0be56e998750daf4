mod cli;
mod error;
mod playback;
mod state;
mod tui;

use std::{fs::File, io, sync::Mutex};

use anyhow::{Context, Result};
use clap::Parser;
use cli::{commands, Cli, Commands};
use state::Config;
use tracing_subscriber::EnvFilter;

fn init_logging(cli: &Cli) -> Result<()> {
    let filter = if cli.verbose {
        EnvFilter::new("reel=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("reel=info"))
    };

    match (&cli.log_file, &cli.command) {
        (Some(path), _) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {:?}", path))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        // The player owns the terminal; logging there would tear the screen.
        (None, Commands::Play { .. }) => {}
        (None, _) => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_logging(&cli)?;

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let config = Config::load_or_default(&config_path)?;

    match &cli.command {
        Commands::Play { files, start, speed } => {
            commands::play::run(files, *start, *speed, &config).await
        }
        Commands::Check { files } => commands::check::run(files),
        Commands::Config { write } => commands::config::run(&config, &config_path, *write),
    }
}
