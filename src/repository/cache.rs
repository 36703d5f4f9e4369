// src/repository/cache.rs

//! On-disk metadata cache
//!
//! One directory per repository under the cache root, holding the raw
//! metalink, `repomd.xml` and the typed metadata files under the basename
//! of their href:
//!
//! ```text
//! <root>/fedora/metalink
//! <root>/fedora/repomd.xml
//! <root>/fedora/a3f7...-primary.xml.gz
//! ```
//!
//! Files are truncated and rewritten on every fetch.

use crate::error::{Error, Result};
use std::fs::{self, File};
use std::path::{Path, PathBuf};

/// Cache file name of the metalink document
pub const METALINK_FILE: &str = "metalink";

/// Cache file name of the repository index
pub const REPOMD_FILE: &str = "repomd.xml";

/// Handle on the cache root
#[derive(Debug, Clone)]
pub struct MetadataCache {
    root: PathBuf,
}

impl MetadataCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding a repository's files
    pub fn repo_dir(&self, repository: &str) -> PathBuf {
        self.root.join(repository)
    }

    /// Path of a cached file
    pub fn path(&self, repository: &str, file_name: &str) -> PathBuf {
        self.repo_dir(repository).join(file_name)
    }

    /// Create (or truncate) a cached file for writing
    pub fn create(&self, repository: &str, file_name: &str) -> Result<File> {
        let dir = self.repo_dir(repository);
        fs::create_dir_all(&dir)
            .map_err(|e| Error::io(format!("failed to create cache directory {}", dir.display()), e))?;

        let path = dir.join(file_name);
        File::create(&path)
            .map_err(|e| Error::io(format!("failed to create {}", path.display()), e))
    }

    /// Read a cached text document
    pub fn read_to_string(&self, repository: &str, file_name: &str) -> Result<String> {
        let path = self.path(repository, file_name);
        fs::read_to_string(&path)
            .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))
    }
}

/// Cache file name for a typed metadata href (its last path segment)
pub fn file_name_from_href(href: &str) -> Result<&str> {
    let trimmed = href.trim().trim_end_matches('/');
    let name = trimmed
        .rsplit('/')
        .next()
        .map(|n| n.split(['?', '#']).next().unwrap_or(n))
        .unwrap_or(trimmed);

    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::MalformedMetadata {
            document: REPOMD_FILE.to_string(),
            reason: format!("location href '{}' has no file name", href),
        });
    }
    Ok(name)
}
