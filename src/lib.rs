// src/lib.rs

//! Repoclosure
//!
//! Computes reproducible RPM dependency closures from cryptographically
//! verified repository metadata, for hermetic build systems.
//!
//! # Architecture
//!
//! - Fetch: metalink → mirror → `repomd.xml` → primary/filelists, every
//!   artifact verified against a digest from an already-trusted document
//! - Universe: the union of all repositories' packages, indexed by capability
//! - Resolve: closure pruning, obsoletes, then a SAT solve with one version
//!   per package name
//!
//! ```ignore
//! use repoclosure::{Config, Universe, resolver};
//!
//! let config = Config::load("repos.toml".as_ref())?;
//! let universe = Universe::load_cached(&config)?;
//! let request = resolver::ResolutionRequest::new(["bash"]);
//! let resolution = resolver::resolve(&universe, &request)?;
//! ```

pub mod compression;
pub mod config;
mod error;
pub mod hash;
pub mod repository;
pub mod resolver;
pub mod universe;
pub mod version;

pub use config::{Config, RepositoryConfig};
pub use error::{Error, FetchStage, Result};
pub use hash::{Hash, HashAlgorithm, Hasher};
pub use repository::{MetadataCache, RepoFetcher, RepositoryClient, Transport};
pub use resolver::{resolve, Resolution, ResolutionRequest, ResolvedPackage};
pub use universe::{Capability, Package, PackageId, Universe};
pub use version::{DepFlag, RpmVersion};
