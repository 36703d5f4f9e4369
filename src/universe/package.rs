// src/universe/package.rs

//! Package and capability model

use crate::version::{ranges_overlap, DepFlag, RpmVersion};
use serde::Serialize;
use std::fmt;

/// Index of a package inside a [`Universe`](super::Universe)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct PackageId(pub u32);

impl PackageId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// A named, optionally versioned capability
///
/// Used for provides, requires, conflicts, obsoletes and the weak
/// dependency lists alike.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Capability {
    pub name: String,
    pub constraint: Option<(DepFlag, RpmVersion)>,
}

impl Capability {
    pub fn unversioned(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            constraint: None,
        }
    }

    pub fn versioned(name: impl Into<String>, flag: DepFlag, version: RpmVersion) -> Self {
        Self {
            name: name.into(),
            constraint: Some((flag, version)),
        }
    }

    /// Version range test alone; callers match names through the index
    pub fn range_overlaps(&self, other: &Capability) -> bool {
        ranges_overlap(
            self.constraint.as_ref().map(|(f, v)| (*f, v)),
            other.constraint.as_ref().map(|(f, v)| (*f, v)),
        )
    }

    /// Is this a file path capability such as `/usr/bin/sh`?
    pub fn is_file(&self) -> bool {
        self.name.starts_with('/')
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.constraint {
            Some((flag, version)) => write!(f, "{} {} {}", self.name, flag, version),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Checksum of the package artifact as published in primary.xml
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageChecksum {
    pub algorithm: String,
    pub value: String,
}

/// A package record loaded from primary metadata
#[derive(Debug, Clone)]
pub struct Package {
    pub name: String,
    pub arch: String,
    pub version: RpmVersion,
    pub checksum: Option<PackageChecksum>,
    pub summary: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub license: Option<String>,
    pub vendor: Option<String>,
    pub sourcerpm: Option<String>,
    pub location_href: Option<String>,
    /// Repository the package was loaded from
    pub repository: String,
    /// Provides, including the self-provide and file provides
    pub provides: Vec<Capability>,
    pub requires: Vec<Capability>,
    pub conflicts: Vec<Capability>,
    pub obsoletes: Vec<Capability>,
    pub recommends: Vec<Capability>,
    pub suggests: Vec<Capability>,
    pub enhances: Vec<Capability>,
    pub supplements: Vec<Capability>,
}

impl Package {
    /// Create a package with no dependencies and no pass-through fields
    pub fn new(name: impl Into<String>, arch: impl Into<String>, version: RpmVersion) -> Self {
        Self {
            name: name.into(),
            arch: arch.into(),
            version,
            checksum: None,
            summary: None,
            description: None,
            url: None,
            license: None,
            vendor: None,
            sourcerpm: None,
            location_href: None,
            repository: String::new(),
            provides: Vec::new(),
            requires: Vec::new(),
            conflicts: Vec::new(),
            obsoletes: Vec::new(),
            recommends: Vec::new(),
            suggests: Vec::new(),
            enhances: Vec::new(),
            supplements: Vec::new(),
        }
    }

    /// `name = evr`, always provided by the package itself
    pub fn self_provide(&self) -> Capability {
        Capability::versioned(self.name.clone(), DepFlag::Eq, self.version.clone())
    }

    /// Add the self-provide unless primary.xml already listed it
    pub(crate) fn ensure_self_provide(&mut self) {
        let own = self.self_provide();
        if !self.provides.contains(&own) {
            self.provides.insert(0, own);
        }
    }

    /// `name-[epoch:]version-release.arch`
    pub fn nevra(&self) -> String {
        format!("{}-{}.{}", self.name, self.version, self.arch)
    }

    /// Source packages never take part in resolution
    pub fn is_source(&self) -> bool {
        self.arch == "src" || self.arch == "nosrc"
    }
}

impl fmt::Display for Package {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.nevra())
    }
}
