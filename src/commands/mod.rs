// src/commands/mod.rs
//! Command handlers for the repoclosure CLI

mod fetch;
pub mod progress;
mod resolve;

pub use fetch::cmd_fetch;
pub use resolve::{cmd_resolve, ResolveOptions};

use anyhow::Result;
use repoclosure::Config;
use std::path::Path;

/// Load the configuration, applying a `--cache-dir` override
fn load_config(path: &Path, cache_dir: Option<&Path>) -> Result<Config> {
    let mut config = Config::load(path)?;
    if let Some(dir) = cache_dir {
        config.cache_dir = dir.to_path_buf();
    }
    Ok(config)
}
