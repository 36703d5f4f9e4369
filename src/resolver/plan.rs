// src/resolver/plan.rs

//! Resolution result data structures
//!
//! Contains the output handed to build-file generators.

use crate::universe::{PackageChecksum, PackageId, Universe};
use serde::Serialize;
use std::fmt;

/// Result of dependency resolution: one package per name, sorted by name
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Resolution {
    pub packages: Vec<ResolvedPackage>,
}

/// A selected package
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedPackage {
    pub name: String,
    pub arch: String,
    pub epoch: u64,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<PackageChecksum>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    pub repository: String,
}

impl ResolvedPackage {
    fn from_universe(universe: &Universe, id: PackageId) -> Self {
        let package = universe.package(id);
        Self {
            name: package.name.clone(),
            arch: package.arch.clone(),
            epoch: package.version.epoch,
            version: package.version.version.clone(),
            release: package.version.release.clone(),
            checksum: package.checksum.clone(),
            location: package.location_href.clone(),
            repository: package.repository.clone(),
        }
    }

    /// `[epoch:]version[-release]`
    pub fn evr(&self) -> String {
        let mut evr = String::new();
        if self.epoch > 0 {
            evr.push_str(&format!("{}:", self.epoch));
        }
        evr.push_str(&self.version);
        if let Some(release) = &self.release {
            evr.push('-');
            evr.push_str(release);
        }
        evr
    }
}

impl fmt::Display for ResolvedPackage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}.{}", self.name, self.evr(), self.arch)
    }
}

impl Resolution {
    /// Build from the selected package ids, sorting by name
    pub(crate) fn from_selection(universe: &Universe, selection: &[PackageId]) -> Self {
        let mut packages: Vec<ResolvedPackage> = selection
            .iter()
            .map(|id| ResolvedPackage::from_universe(universe, *id))
            .collect();
        packages.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.arch.cmp(&b.arch)));
        Self { packages }
    }

    pub fn len(&self) -> usize {
        self.packages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.packages.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&ResolvedPackage> {
        self.packages.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.packages.iter().map(|p| p.name.as_str())
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}
