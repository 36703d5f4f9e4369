// src/commands/fetch.rs
//! Repository fetch command

use super::load_config;
use super::progress::FetchProgress;
use anyhow::Result;
use repoclosure::repository::{MetadataCache, RepoFetcher, RepositoryClient};
use std::path::Path;
use tracing::info;

/// Fetch and verify metadata for every enabled repository
///
/// Stops at the first repository that fails; earlier repositories stay cached.
pub fn cmd_fetch(config_path: &Path, cache_dir: Option<&Path>) -> Result<()> {
    let config = load_config(config_path, cache_dir)?;
    let repositories: Vec<_> = config.enabled_repositories().collect();

    if repositories.is_empty() {
        println!("No enabled repositories in {}", config_path.display());
        return Ok(());
    }

    info!(
        "Fetching {} repositories into {}",
        repositories.len(),
        config.cache_dir.display()
    );
    let fetcher = RepoFetcher::new(RepositoryClient::new()?, MetadataCache::new(&config.cache_dir));
    let progress = FetchProgress::new();

    for repo in repositories {
        let spinner = progress.start(&repo.name);
        match fetcher.fetch_repository(repo) {
            Ok(fetched) => spinner.succeed(&format!("mirror {}", fetched.mirror)),
            Err(e) => {
                spinner.fail(&e.root().to_string());
                return Err(e.into());
            }
        }
    }

    println!("Metadata cached in {}", config.cache_dir.display());
    Ok(())
}
