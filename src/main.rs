// src/main.rs

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;
use cli::{Cli, Commands};

fn main() -> Result<()> {
    // Initialize tracing subscriber for logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Fetch { config, cache_dir } => commands::cmd_fetch(&config, cache_dir.as_deref()),
        Commands::Resolve {
            packages,
            config,
            cache_dir,
            input,
            filelists,
            locale,
            arches,
            json,
        } => commands::cmd_resolve(commands::ResolveOptions {
            packages,
            config,
            cache_dir,
            inputs: input,
            filelists,
            locale,
            arches,
            json,
        }),
    }
}
