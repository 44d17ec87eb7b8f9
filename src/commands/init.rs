use std::path::Path;

use anyhow::Context as _;

use crate::config::{self, TourConfig};

pub fn run(config_path: &Path) -> anyhow::Result<()> {
    if config_path.exists() {
        println!("Config already exists at {}", config_path.display());
        return Ok(());
    }
    config::save_config(config_path, &TourConfig::default())
        .with_context(|| format!("Failed to write {}", config_path.display()))?;
    println!("Wrote {}", config_path.display());
    Ok(())
}
