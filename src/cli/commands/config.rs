use std::path::Path;

use anyhow::{Context, Result};

use crate::state::Config;

pub fn run(config: &Config, path: &Path, write: bool) -> Result<()> {
    let content = toml::to_string_pretty(config).context("Failed to serialize config to TOML")?;
    println!("# {}", path.display());
    print!("{}", content);

    if write {
        config.save(path)?;
        println!("\nSaved to {}", path.display());
    }
    Ok(())
}
