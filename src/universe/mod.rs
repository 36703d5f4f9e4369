// src/universe/mod.rs

//! Package universe
//!
//! The verified primary and filelists documents of every repository are
//! loaded into one [`Universe`]: an immutable list of packages plus a
//! [`CapabilityIndex`] mapping each provided capability to its providers.
//! Both are built once by [`UniverseBuilder`] and never mutated afterwards,
//! so the resolver can share them freely.

mod package;
mod primary;

pub use package::{Capability, Package, PackageChecksum, PackageId};

use crate::compression::open_metadata;
use crate::config::Config;
use crate::error::{Error, Result};
use crate::hash::hash_reader;
use crate::repository::{file_name_from_href, MetadataCache, Repomd, REPOMD_FILE};
use crate::version::RpmVersion;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info, warn};

/// Identity of a package within one universe
type PackageKey = (String, String, RpmVersion);

/// Capability name to providing packages
///
/// Built once from the final package list; includes self-provides and file
/// provides.
#[derive(Debug, Default)]
pub struct CapabilityIndex {
    providers: HashMap<String, Vec<(PackageId, usize)>>,
}

impl CapabilityIndex {
    fn build(packages: &[Package]) -> Self {
        let mut providers: HashMap<String, Vec<(PackageId, usize)>> = HashMap::new();
        for (index, package) in packages.iter().enumerate() {
            let id = PackageId(index as u32);
            for (slot, provide) in package.provides.iter().enumerate() {
                providers
                    .entry(provide.name.clone())
                    .or_default()
                    .push((id, slot));
            }
        }
        Self { providers }
    }

    /// Number of distinct capability names
    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }
}

/// Immutable snapshot of every loaded package
#[derive(Debug, Default)]
pub struct Universe {
    packages: Vec<Package>,
    by_name: BTreeMap<String, Vec<PackageId>>,
    capabilities: CapabilityIndex,
    repositories: Vec<String>,
}

impl Universe {
    pub fn builder() -> UniverseBuilder {
        UniverseBuilder::default()
    }

    /// Load every enabled repository from the metadata cache
    ///
    /// Repositories are loaded in configuration order, so on duplicate
    /// packages the first configured repository wins. Each cached file is
    /// re-verified against its cached `repomd.xml` before it is parsed.
    pub fn load_cached(config: &Config) -> Result<Universe> {
        let cache = MetadataCache::new(&config.cache_dir);
        let mut builder = Universe::builder();

        for repo in config.enabled_repositories() {
            let name = repo.name.as_str();
            let xml = cache.read_to_string(name, REPOMD_FILE).map_err(|e| match e {
                Error::Io { context, source } => Error::Io {
                    context: format!("repository '{}' is not fetched ({})", name, context),
                    source,
                },
                other => other,
            })?;
            let repomd = Repomd::parse(&xml)?;

            for kind in ["primary", "filelists"] {
                let entry = repomd.require(kind)?;
                let file_name = file_name_from_href(entry.href()?)?;
                let path = cache.path(name, file_name);
                verify_cached(&path, &entry.checksum()?)?;

                match kind {
                    "primary" => builder.add_primary_file(name, &path)?,
                    _ => builder.add_filelists_file(&path)?,
                };
            }
        }

        Ok(builder.build())
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn package(&self, id: PackageId) -> &Package {
        &self.packages[id.index()]
    }

    pub fn packages(&self) -> impl Iterator<Item = (PackageId, &Package)> {
        self.packages
            .iter()
            .enumerate()
            .map(|(i, p)| (PackageId(i as u32), p))
    }

    /// All packages whose own name is `name`, in load order
    pub fn packages_named(&self, name: &str) -> &[PackageId] {
        self.by_name.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Packages providing a capability that satisfies `wanted`
    ///
    /// Ordered by package id and free of duplicates.
    pub fn providers(&self, wanted: &Capability) -> Vec<PackageId> {
        let Some(entries) = self.capabilities.providers.get(&wanted.name) else {
            return Vec::new();
        };

        let mut ids: Vec<PackageId> = entries
            .iter()
            .filter(|(id, slot)| self.packages[id.index()].provides[*slot].range_overlaps(wanted))
            .map(|(id, _)| *id)
            .collect();
        ids.dedup();
        ids
    }

    /// Repositories in load order; earlier ones take precedence
    pub fn repositories(&self) -> &[String] {
        &self.repositories
    }

    /// Position of a repository in load order (unknown repositories sort last)
    pub fn repository_rank(&self, repository: &str) -> usize {
        self.repositories
            .iter()
            .position(|r| r == repository)
            .unwrap_or(self.repositories.len())
    }
}

/// Collects packages and file lists, then freezes them into a [`Universe`]
#[derive(Debug, Default)]
pub struct UniverseBuilder {
    packages: Vec<Package>,
    keys: HashSet<PackageKey>,
    files: HashMap<PackageKey, Vec<String>>,
    repositories: Vec<String>,
}

impl UniverseBuilder {
    /// Add one package
    ///
    /// Returns false when a package with the same name, arch and version
    /// is already present; the earlier one is kept.
    pub fn add_package(&mut self, mut package: Package) -> bool {
        let key = (
            package.name.clone(),
            package.arch.clone(),
            package.version.clone(),
        );
        if self.keys.contains(&key) {
            warn!(
                "Ignoring duplicate package {} from {}",
                package.nevra(),
                package.repository
            );
            return false;
        }

        if !self.repositories.contains(&package.repository) {
            self.repositories.push(package.repository.clone());
        }
        package.ensure_self_provide();
        self.keys.insert(key);
        self.packages.push(package);
        true
    }

    /// Add every package of a primary document
    ///
    /// Returns the number of packages actually added.
    pub fn add_primary<R: std::io::BufRead>(
        &mut self,
        repository: &str,
        document: &str,
        reader: R,
    ) -> Result<usize> {
        if !self.repositories.iter().any(|r| r == repository) {
            self.repositories.push(repository.to_string());
        }
        let packages = primary::parse_primary(reader, document, repository)?;
        let total = packages.len();
        let mut added = 0;
        for package in packages {
            if self.add_package(package) {
                added += 1;
            }
        }
        debug!("{}: {} of {} packages from {}", repository, added, total, document);
        Ok(added)
    }

    /// Add a primary file from disk, decompressing as needed
    pub fn add_primary_file(&mut self, repository: &str, path: &Path) -> Result<usize> {
        let reader = open_metadata(path).map_err(|e| malformed_file(path, e))?;
        let added = self.add_primary(repository, &path.display().to_string(), reader)?;
        info!("Loaded {} packages from {}", added, path.display());
        Ok(added)
    }

    /// Record file lists to merge into the matching packages' provides
    ///
    /// Packages are matched by name, arch and version when the universe
    /// is built, so file lists may be added before or after their primary.
    pub fn add_filelists<R: std::io::BufRead>(&mut self, document: &str, reader: R) -> Result<usize> {
        let entries = primary::parse_filelists(reader, document)?;
        let count = entries.len();
        for (name, arch, version, files) in entries {
            self.files
                .entry((name, arch, version))
                .or_default()
                .extend(files);
        }
        Ok(count)
    }

    /// Add a filelists file from disk, decompressing as needed
    pub fn add_filelists_file(&mut self, path: &Path) -> Result<usize> {
        let reader = open_metadata(path).map_err(|e| malformed_file(path, e))?;
        let count = self.add_filelists(&path.display().to_string(), reader)?;
        debug!("Loaded file lists for {} packages from {}", count, path.display());
        Ok(count)
    }

    /// Merge file provides and freeze
    pub fn build(mut self) -> Universe {
        for package in &mut self.packages {
            let key = (
                package.name.clone(),
                package.arch.clone(),
                package.version.clone(),
            );
            let Some(files) = self.files.remove(&key) else {
                continue;
            };
            let mut known: HashSet<String> = package
                .provides
                .iter()
                .filter(|p| p.is_file())
                .map(|p| p.name.clone())
                .collect();
            for file in files {
                if !file.is_empty() && known.insert(file.clone()) {
                    package.provides.push(Capability::unversioned(file));
                }
            }
        }
        if !self.files.is_empty() {
            debug!("{} file lists matched no package", self.files.len());
        }

        let mut by_name: BTreeMap<String, Vec<PackageId>> = BTreeMap::new();
        for (index, package) in self.packages.iter().enumerate() {
            by_name
                .entry(package.name.clone())
                .or_default()
                .push(PackageId(index as u32));
        }
        let capabilities = CapabilityIndex::build(&self.packages);

        info!(
            "Universe: {} packages, {} capabilities",
            self.packages.len(),
            capabilities.len()
        );
        Universe {
            packages: self.packages,
            by_name,
            capabilities,
            repositories: self.repositories,
        }
    }
}

fn malformed_file(path: &Path, err: crate::compression::CompressionError) -> Error {
    Error::MalformedMetadata {
        document: path.display().to_string(),
        reason: err.to_string(),
    }
}

/// Re-check a cached file against the digest its index declares
fn verify_cached(path: &Path, expected: &crate::hash::Hash) -> Result<()> {
    let file = File::open(path)
        .map_err(|e| Error::io(format!("failed to open {}", path.display()), e))?;
    let actual = hash_reader(expected.algorithm, &mut BufReader::new(file))
        .map_err(|e| Error::io(format!("failed to read {}", path.display()), e))?;

    if actual.value != expected.value {
        return Err(Error::ChecksumMismatch {
            artifact: path.display().to_string(),
            algorithm: expected.algorithm.to_string(),
            expected: expected.value.clone(),
            actual: actual.value,
        });
    }
    Ok(())
}
