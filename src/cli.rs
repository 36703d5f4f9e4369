// src/cli.rs
//! CLI definitions for repoclosure
//!
//! This module contains the command-line interface definitions using clap.
//! The actual command implementations are in the `commands` module.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "repoclosure")]
#[command(version)]
#[command(about = "Reproducible RPM dependency closures from verified repository metadata", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Fetch and verify metadata for every enabled repository
    Fetch {
        /// Repository configuration file
        #[arg(short, long)]
        config: PathBuf,

        /// Override the metadata cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,
    },

    /// Resolve the dependency closure of one or more packages
    Resolve {
        /// Package names to resolve
        #[arg(required = true)]
        packages: Vec<String>,

        /// Repository configuration file (loads fetched metadata from its cache)
        #[arg(short, long, required_unless_present = "input")]
        config: Option<PathBuf>,

        /// Override the metadata cache directory
        #[arg(long)]
        cache_dir: Option<PathBuf>,

        /// Load a primary metadata file directly instead of the cache
        #[arg(short, long = "input")]
        input: Vec<PathBuf>,

        /// Filelists metadata to merge into the direct inputs
        #[arg(long, requires = "input")]
        filelists: Vec<PathBuf>,

        /// Locale used to pick language packs
        #[arg(short, long)]
        locale: Option<String>,

        /// Allowed architecture (repeatable; noarch is always allowed)
        #[arg(long = "arch")]
        arches: Vec<String>,

        /// Print the resolution as JSON
        #[arg(long)]
        json: bool,
    },
}
