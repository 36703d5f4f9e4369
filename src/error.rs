// src/error.rs

//! Crate-wide error type
//!
//! Mirror-level failures are recovered inside the fetcher and only show up
//! here once every candidate is exhausted. Everything else is a hard error.

use std::fmt;
use thiserror::Error;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Stage of a repository fetch, used to tell the user where it stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStage {
    /// Downloading and parsing the metalink document
    Metalink,
    /// Resolving repomd.xml across the candidate mirrors
    Index,
    /// Downloading a typed metadata file (primary, filelists, ...)
    TypedFile(&'static str),
}

impl fmt::Display for FetchStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Metalink => write!(f, "metalink"),
            Self::Index => write!(f, "repomd.xml"),
            Self::TypedFile(kind) => write!(f, "{kind} metadata"),
        }
    }
}

#[derive(Error, Debug)]
pub enum Error {
    /// The metalink lists no https mirror for repomd.xml
    #[error("metalink {metalink} lists no https mirror for repomd.xml")]
    NoSecureMirror { metalink: String },

    /// A downloaded artifact did not hash to the trusted digest
    #[error("{algorithm} checksum mismatch for {artifact}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        artifact: String,
        algorithm: String,
        expected: String,
        actual: String,
    },

    /// Every candidate URL failed for an artifact
    #[error("all mirrors failed for {artifact}:\n  {}", attempts.join("\n  "))]
    MirrorsExhausted {
        artifact: String,
        attempts: Vec<String>,
    },

    /// A metadata document is missing a required field or cannot be parsed
    #[error("malformed metadata in {document}: {reason}")]
    MalformedMetadata { document: String, reason: String },

    /// Checksum algorithm we cannot verify
    #[error("unknown checksum algorithm '{0}'")]
    UnknownChecksumAlgorithm(String),

    /// A requested package name is not in the loaded universe
    #[error("package '{0}' not found in any loaded repository")]
    UnknownPackage(String),

    /// No consistent package set exists
    #[error("dependency resolution failed:\n{explanation}")]
    Unsatisfiable { explanation: String },

    /// Transport-level failure for a single URL
    #[error("failed to download {url}: {reason}")]
    Download { url: String, reason: String },

    /// A repository reached the failed state
    #[error("repository '{repository}' failed at {stage}: {source}")]
    Repository {
        repository: String,
        stage: FetchStage,
        #[source]
        source: Box<Error>,
    },

    /// Invalid configuration
    #[error("configuration error: {0}")]
    Config(String),

    /// Parse error outside of repository metadata (versions, config files)
    #[error("parse error: {0}")]
    Parse(String),

    /// I/O error with context
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Wrap an I/O error with a short description of what was being done
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Attach repository and stage context
    pub fn in_repository(self, repository: &str, stage: FetchStage) -> Self {
        Self::Repository {
            repository: repository.to_string(),
            stage,
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping repository context wrappers
    pub fn root(&self) -> &Error {
        match self {
            Self::Repository { source, .. } => source.root(),
            other => other,
        }
    }
}
