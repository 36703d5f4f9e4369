// src/repository/mod.rs

//! Repository metadata acquisition
//!
//! This module provides functionality for:
//! - Parsing metalink and repomd.xml documents
//! - Selecting https mirrors from a metalink
//! - Fetching the index and typed metadata files with checksum verification
//! - Persisting everything to the on-disk cache

mod cache;
mod client;
mod fetch;
mod metadata;
mod mirror;

// Re-export main types and functions
pub use cache::{file_name_from_href, MetadataCache, METALINK_FILE, REPOMD_FILE};
pub use client::{RepositoryClient, Transport};
pub use fetch::{FetchedRepository, RepoFetcher, TYPED_FILES};
pub use metadata::{
    ChecksumElement, Location, Metalink, MetalinkFile, MirrorUrl, Repomd, RepomdData,
};
pub use mirror::{index_url_from_baseurl, mirror_base, resolve_href, resolve_mirrors};
