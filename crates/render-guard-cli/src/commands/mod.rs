//! CLI command implementations

pub mod check;
pub mod config;

use anyhow::{Context, Result};
use render_guard_config::{Config, ConfigLoader};
use std::path::Path;

/// Load configuration from `path`, or from the current directory upwards
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let mut loader = ConfigLoader::new();
    match path {
        Some(path) => loader
            .load_from_file(path)
            .with_context(|| format!("Failed to load config: {}", path.display())),
        None => {
            let cwd = std::env::current_dir().context("Failed to read current directory")?;
            loader
                .load_from_directory(&cwd)
                .context("Failed to load configuration")
        }
    }
}
