use std::path::PathBuf;

use anyhow::{bail, Result};

use crate::state::playlist::validate_all;

pub fn run(files: &[PathBuf]) -> Result<()> {
    let (accepted, failures) = validate_all(files);

    println!("\nAccepted: {}\n", accepted.len());
    for (i, entry) in accepted.iter().enumerate() {
        println!("{}. {}", i, entry.display_name());
    }

    if !failures.is_empty() {
        println!("\nRejected: {}\n", failures.len());
        for failure in &failures {
            println!("  {}", failure);
        }
    }

    if accepted.is_empty() {
        bail!("No playable files");
    }
    Ok(())
}
