// src/repository/fetch.rs

//! Repository fetcher
//!
//! Per repository the fetch runs through three stages:
//!
//! 1. **Metalink** (metalink repositories only): download and persist the
//!    metalink, derive the https mirror list and the expected checksum of
//!    `repomd.xml`. Base URL repositories have a single candidate instead.
//! 2. **Index**: try the candidate `repomd.xml` URLs in order. Network and
//!    parse failures move on to the next candidate; a checksum mismatch
//!    against the metalink is fatal. The first good index pins the mirror.
//! 3. **Typed files**: fetch primary and filelists from the pinned mirror,
//!    verifying each against the index while it is written to the cache.
//!    Nothing here is retried against another mirror.
//!
//! A failure anywhere fails the repository, and [`RepoFetcher::fetch`]
//! stops at the first failed repository.

use super::cache::{self, MetadataCache, METALINK_FILE, REPOMD_FILE};
use super::client::Transport;
use super::metadata::{Metalink, Repomd};
use super::mirror::{index_url_from_baseurl, mirror_base, resolve_href, resolve_mirrors};
use crate::config::{RepositoryConfig, RepositorySource};
use crate::error::{Error, FetchStage, Result};
use crate::hash::{verify_stream, Hash, StreamError, VerifyError};
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::io::{self, BufWriter, Read, Write};
use std::path::PathBuf;
use tracing::{debug, info, warn};
use url::Url;

/// Metadata types fetched for every repository
pub const TYPED_FILES: [&str; 2] = ["primary", "filelists"];

/// A repository whose metadata is verified and persisted
#[derive(Debug, Clone)]
pub struct FetchedRepository {
    pub name: String,
    /// Index URL that produced the verified `repomd.xml`
    pub index_url: String,
    /// Base URL typed files were fetched from
    pub mirror: Url,
    pub repomd: Repomd,
    /// Cached path per metadata type
    pub files: BTreeMap<&'static str, PathBuf>,
}

impl FetchedRepository {
    pub fn file(&self, kind: &str) -> Option<&PathBuf> {
        self.files.get(kind)
    }
}

/// Outcome of one index candidate
enum IndexAttempt {
    /// Mirror-level failure, try the next candidate
    Recoverable(Error),
    /// Chain of trust broken or local failure, stop the repository
    Fatal(Error),
}

/// Drives the per-repository fetch state machine
pub struct RepoFetcher<T: Transport> {
    transport: T,
    cache: MetadataCache,
}

impl<T: Transport> RepoFetcher<T> {
    pub fn new(transport: T, cache: MetadataCache) -> Self {
        Self { transport, cache }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn cache(&self) -> &MetadataCache {
        &self.cache
    }

    /// Fetch every repository in order, stopping at the first failure
    pub fn fetch<'a>(
        &self,
        repositories: impl IntoIterator<Item = &'a RepositoryConfig>,
    ) -> Result<Vec<FetchedRepository>> {
        let mut fetched = Vec::new();
        for repo in repositories {
            if repo.disabled {
                debug!("Skipping disabled repository {}", repo.name);
                continue;
            }
            fetched.push(self.fetch_repository(repo)?);
        }
        Ok(fetched)
    }

    /// Fetch a single repository
    ///
    /// Errors are wrapped in [`Error::Repository`] naming the failed stage.
    pub fn fetch_repository(&self, repo: &RepositoryConfig) -> Result<FetchedRepository> {
        let name = repo.name.as_str();

        let (candidates, expected) = match repo.source()? {
            RepositorySource::Metalink(url) => self
                .fetch_metalink(name, url)
                .map_err(|e| e.in_repository(name, FetchStage::Metalink))?,
            RepositorySource::BaseUrl(baseurl) => (vec![index_url_from_baseurl(baseurl)], None),
        };

        let (index_url, repomd) = self
            .resolve_index(name, &candidates, expected.as_ref())
            .map_err(|e| e.in_repository(name, FetchStage::Index))?;
        let mirror = mirror_base(&index_url).map_err(|e| e.in_repository(name, FetchStage::Index))?;
        info!("Pinned mirror {} for {}", mirror, name);

        // Mirror is pinned: typed files are independent of each other
        let results: Vec<Result<(&'static str, PathBuf)>> = TYPED_FILES
            .par_iter()
            .map(|&kind| {
                self.fetch_typed_file(name, &repomd, &mirror, kind)
                    .map(|path| (kind, path))
                    .map_err(|e| e.in_repository(name, FetchStage::TypedFile(kind)))
            })
            .collect();

        let mut files = BTreeMap::new();
        for result in results {
            let (kind, path) = result?;
            files.insert(kind, path);
        }

        info!("Fetched repository {} ({} metadata files)", name, files.len());
        Ok(FetchedRepository {
            name: name.to_string(),
            index_url,
            mirror,
            repomd,
            files,
        })
    }

    fn fetch_metalink(&self, name: &str, url: &str) -> Result<(Vec<String>, Option<Hash>)> {
        info!("Fetching metalink for {} from {}", name, url);
        let mut body = self.transport.get(url)?;

        let mut file = BufWriter::new(self.cache.create(name, METALINK_FILE)?);
        io::copy(&mut body, &mut file)
            .and_then(|_| file.flush())
            .map_err(|e| Error::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })?;
        drop(file);

        let metalink = Metalink::parse(&self.cache.read_to_string(name, METALINK_FILE)?)?;
        let mirrors = resolve_mirrors(&metalink, url)?;
        let expected = match metalink.repomd_file() {
            Some(entry) => entry.expected_checksum()?,
            None => None,
        };

        match &expected {
            Some(hash) => debug!("{} repomd.xml expected {}", name, hash.to_prefixed_string()),
            None => warn!("Metalink for {} lists no usable repomd.xml checksum", name),
        }
        debug!("{} candidate mirrors for {}", mirrors.len(), name);

        Ok((mirrors, expected))
    }

    fn resolve_index(
        &self,
        name: &str,
        candidates: &[String],
        expected: Option<&Hash>,
    ) -> Result<(String, Repomd)> {
        let mut attempts = Vec::new();

        // Strictly sequential: the first good index pins the mirror
        for url in candidates {
            info!("Fetching repomd.xml for {} from {}", name, url);
            match self.try_index(name, url, expected) {
                Ok(repomd) => return Ok((url.clone(), repomd)),
                Err(IndexAttempt::Fatal(e)) => return Err(e),
                Err(IndexAttempt::Recoverable(e)) => {
                    warn!("Mirror {} failed for {}: {}", url, name, e);
                    attempts.push(attempt_note(url, &e));
                }
            }
        }

        Err(Error::MirrorsExhausted {
            artifact: REPOMD_FILE.to_string(),
            attempts,
        })
    }

    fn try_index(
        &self,
        name: &str,
        url: &str,
        expected: Option<&Hash>,
    ) -> std::result::Result<Repomd, IndexAttempt> {
        let mut body = self.transport.get(url).map_err(IndexAttempt::Recoverable)?;
        let file = self
            .cache
            .create(name, REPOMD_FILE)
            .map_err(IndexAttempt::Fatal)?;

        match expected {
            Some(expected) => {
                persist_verified(&mut body, file, expected, url).map_err(|e| match e {
                    e @ Error::ChecksumMismatch { .. } => IndexAttempt::Fatal(e),
                    e => IndexAttempt::Recoverable(e),
                })?;
            }
            None => {
                let mut file = BufWriter::new(file);
                io::copy(&mut body, &mut file)
                    .and_then(|_| file.flush())
                    .map_err(|e| {
                        IndexAttempt::Recoverable(Error::Download {
                            url: url.to_string(),
                            reason: e.to_string(),
                        })
                    })?;
            }
        }

        // Parse what was persisted, not a second copy of the stream
        let xml = self
            .cache
            .read_to_string(name, REPOMD_FILE)
            .map_err(IndexAttempt::Recoverable)?;
        Repomd::parse(&xml).map_err(IndexAttempt::Recoverable)
    }

    fn fetch_typed_file(
        &self,
        name: &str,
        repomd: &Repomd,
        mirror: &Url,
        kind: &str,
    ) -> Result<PathBuf> {
        let entry = repomd.require(kind)?;
        let href = entry.href()?;
        // Unknown algorithms fail here, before anything is downloaded
        let expected = entry.checksum()?;
        let url = resolve_href(mirror, href)?;
        let file_name = cache::file_name_from_href(href)?;

        info!("Fetching {} metadata for {} from {}", kind, name, url);
        let mut body = self.transport.get(&url).map_err(|e| Error::MirrorsExhausted {
            artifact: url.clone(),
            attempts: vec![attempt_note(&url, &e)],
        })?;

        let file = self.cache.create(name, file_name)?;
        let verified = persist_verified(&mut body, file, &expected, &url).map_err(|e| match e {
            Error::Download { reason, .. } => Error::MirrorsExhausted {
                artifact: url.clone(),
                attempts: vec![format!("{}: {}", url, reason)],
            },
            other => other,
        })?;

        debug!(
            "{} {} verified ({} bytes, {})",
            name,
            kind,
            verified,
            expected.to_prefixed_string()
        );
        Ok(self.cache.path(name, file_name))
    }
}

/// Stream `body` into `file` while hashing, then compare against `expected`
///
/// On mismatch the written file stays on disk for inspection.
fn persist_verified<R: Read>(
    body: &mut R,
    file: std::fs::File,
    expected: &Hash,
    url: &str,
) -> Result<u64> {
    match verify_stream(body, BufWriter::new(file), expected) {
        Ok(verified) => Ok(verified.bytes),
        Err(StreamError::Io(e)) => Err(Error::Download {
            url: url.to_string(),
            reason: e.to_string(),
        }),
        Err(StreamError::Mismatch(VerifyError {
            expected,
            actual,
            algorithm,
        })) => Err(Error::ChecksumMismatch {
            artifact: url.to_string(),
            algorithm: algorithm.to_string(),
            expected,
            actual,
        }),
    }
}

/// One line of a `MirrorsExhausted` report
fn attempt_note(url: &str, err: &Error) -> String {
    match err {
        Error::Download { reason, .. } => format!("{}: {}", url, reason),
        other => format!("{}: {}", url, other),
    }
}
