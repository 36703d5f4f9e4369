// src/config.rs
//! Repository configuration
//!
//! TOML configuration files with the following sections:
//! - `cache_dir` - where fetched metadata is persisted
//! - `[resolve]` - default locale and architecture filter
//! - `[[repository]]` - one entry per repository, with a metalink or a base URL

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

/// TOML configuration file structure
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    /// Root of the metadata cache
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,

    /// Resolution defaults
    #[serde(default)]
    pub resolve: ResolveSection,

    /// Repositories in priority order
    #[serde(default, rename = "repository")]
    pub repositories: Vec<RepositoryConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cache_dir: default_cache_dir(),
            resolve: ResolveSection::default(),
            repositories: Vec::new(),
        }
    }
}

fn default_cache_dir() -> PathBuf {
    PathBuf::from(".repoclosure-cache")
}

/// Resolution defaults, overridable from the command line
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolveSection {
    /// Locale used to pick language packs
    #[serde(default = "default_locale")]
    pub locale: String,

    /// Allowed architectures (empty = everything except source packages)
    #[serde(default)]
    pub arches: Vec<String>,
}

impl Default for ResolveSection {
    fn default() -> Self {
        Self {
            locale: default_locale(),
            arches: Vec::new(),
        }
    }
}

fn default_locale() -> String {
    "en".to_string()
}

/// A single configured repository
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RepositoryConfig {
    /// Repository identity, also the cache subdirectory
    pub name: String,

    /// Metalink URL listing mirrors for repomd.xml
    #[serde(default)]
    pub metalink: Option<String>,

    /// Direct base URL (the directory holding `repodata/`)
    #[serde(default)]
    pub baseurl: Option<String>,

    /// Skip this repository during fetch and load
    #[serde(default)]
    pub disabled: bool,
}

/// Where a repository's index comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RepositorySource<'a> {
    Metalink(&'a str),
    BaseUrl(&'a str),
}

impl RepositoryConfig {
    pub fn with_metalink(name: impl Into<String>, metalink: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metalink: Some(metalink.into()),
            baseurl: None,
            disabled: false,
        }
    }

    pub fn with_baseurl(name: impl Into<String>, baseurl: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            metalink: None,
            baseurl: Some(baseurl.into()),
            disabled: false,
        }
    }

    /// The declared index source
    ///
    /// Only meaningful on a validated configuration, where exactly one
    /// source is present.
    pub fn source(&self) -> Result<RepositorySource<'_>> {
        match (&self.metalink, &self.baseurl) {
            (Some(metalink), None) => Ok(RepositorySource::Metalink(metalink)),
            (None, Some(baseurl)) => Ok(RepositorySource::BaseUrl(baseurl)),
            (Some(_), Some(_)) => Err(Error::Config(format!(
                "repository '{}' sets both metalink and baseurl",
                self.name
            ))),
            (None, None) => Err(Error::Config(format!(
                "repository '{}' needs a metalink or a baseurl",
                self.name
            ))),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Config("repository name must not be empty".to_string()));
        }
        if self.name == "." || self.name == ".." || self.name.contains(['/', '\\']) {
            return Err(Error::Config(format!(
                "repository name '{}' cannot be used as a cache directory",
                self.name
            )));
        }

        let url = match self.source()? {
            RepositorySource::Metalink(url) | RepositorySource::BaseUrl(url) => url,
        };
        Url::parse(url).map_err(|e| {
            Error::Config(format!("repository '{}': invalid URL '{}': {}", self.name, url, e))
        })?;

        Ok(())
    }
}

impl Config {
    /// Load configuration from a TOML file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("failed to read config file {}", path.display()), e))?;

        Self::from_toml_str(&content).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{}: {}", path.display(), msg)),
            other => other,
        })
    }

    /// Parse and validate a configuration document
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for repo in &self.repositories {
            repo.validate()?;
            if !seen.insert(repo.name.as_str()) {
                return Err(Error::Config(format!(
                    "repository '{}' is declared more than once",
                    repo.name
                )));
            }
        }

        if self.resolve.locale.trim().is_empty() {
            return Err(Error::Config("resolve.locale must not be empty".to_string()));
        }

        Ok(())
    }

    /// Enabled repositories in configuration order
    pub fn enabled_repositories(&self) -> impl Iterator<Item = &RepositoryConfig> {
        self.repositories.iter().filter(|r| !r.disabled)
    }
}
