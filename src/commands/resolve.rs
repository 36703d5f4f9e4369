// src/commands/resolve.rs
//! Dependency resolution command

use super::load_config;
use anyhow::{Context, Result};
use repoclosure::resolver::{self, ResolutionRequest, DEFAULT_LOCALE};
use repoclosure::Universe;
use std::path::{Path, PathBuf};
use tracing::info;

/// Options for `repoclosure resolve`
pub struct ResolveOptions {
    pub packages: Vec<String>,
    pub config: Option<PathBuf>,
    pub cache_dir: Option<PathBuf>,
    pub inputs: Vec<PathBuf>,
    pub filelists: Vec<PathBuf>,
    pub locale: Option<String>,
    pub arches: Vec<String>,
    pub json: bool,
}

pub fn cmd_resolve(options: ResolveOptions) -> Result<()> {
    let config = match &options.config {
        Some(path) => Some(load_config(path, options.cache_dir.as_deref())?),
        None => None,
    };

    let universe = if options.inputs.is_empty() {
        let config = config
            .as_ref()
            .context("a configuration file is required without --input")?;
        Universe::load_cached(config)?
    } else {
        load_inputs(&options.inputs, &options.filelists)?
    };
    info!("Loaded {} packages", universe.len());

    let defaults = config.as_ref().map(|c| &c.resolve);
    let locale = options
        .locale
        .or_else(|| defaults.map(|d| d.locale.clone()))
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string());
    let arches = if options.arches.is_empty() {
        defaults.map(|d| d.arches.clone()).unwrap_or_default()
    } else {
        options.arches
    };

    let request = ResolutionRequest::new(options.packages)
        .with_locale(locale)
        .with_arches(arches);
    let resolution = resolver::resolve(&universe, &request)?;

    if options.json {
        println!("{}", resolution.to_json()?);
    } else {
        for package in &resolution.packages {
            println!("{}", package);
        }
    }

    Ok(())
}

/// Build a universe from explicit metadata files
fn load_inputs(inputs: &[PathBuf], filelists: &[PathBuf]) -> Result<Universe> {
    let mut builder = Universe::builder();

    for path in inputs {
        let count = builder.add_primary_file(&input_name(path), path)?;
        info!("Loaded {} packages from {}", count, path.display());
    }
    for path in filelists {
        let count = builder.add_filelists_file(path)?;
        info!("Merged file lists of {} packages from {}", count, path.display());
    }

    Ok(builder.build())
}

/// Repository name reported for packages from a direct input
fn input_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
