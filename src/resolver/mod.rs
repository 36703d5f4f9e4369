// src/resolver/mod.rs

//! Dependency resolution
//!
//! Resolution runs in three steps over an immutable [`Universe`]:
//!
//! 1. Find the requested packages and compute the closure of packages
//!    reachable through their requirements, applying the architecture and
//!    locale filters ([`closure`]).
//! 2. Apply obsoletes as a pre-filter on that closure.
//! 3. Hand the closure to the resolvo SAT solver, one resolvo name per
//!    package name, with candidates in deterministic preference order
//!    ([`provider`]).
//!
//! The result has exactly one package per name. Two runs over the same
//! universe and request produce the same result.

mod closure;
mod plan;
mod provider;
pub mod requirement;

pub use closure::PackageFilter;
pub use plan::{Resolution, ResolvedPackage};

use crate::error::{Error, Result};
use crate::universe::{PackageId, Universe};
use closure::Closure;
use provider::RpmProvider;
use resolvo::{Problem, Solver, UnsolvableOrCancelled};
use std::collections::BTreeSet;
use tracing::{debug, info};

/// Default locale when none is requested
pub const DEFAULT_LOCALE: &str = "en";

/// Architecture preferred among otherwise equal packages unless configured
pub const DEFAULT_PRIMARY_ARCH: &str = "x86_64";

/// What to resolve
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolutionRequest {
    /// Requested top-level package names
    pub names: Vec<String>,
    /// Locale used to choose between language packs
    pub locale: String,
    /// Allowed architectures; empty means everything except source packages
    pub arches: Vec<String>,
    /// Preferred architecture when a name and version exist for several
    pub primary_arch: String,
}

impl ResolutionRequest {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            locale: DEFAULT_LOCALE.to_string(),
            arches: Vec::new(),
            primary_arch: DEFAULT_PRIMARY_ARCH.to_string(),
        }
    }

    pub fn with_locale(mut self, locale: impl Into<String>) -> Self {
        self.locale = locale.into();
        self
    }

    pub fn with_arches<I, S>(mut self, arches: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arches = arches.into_iter().map(Into::into).collect();
        if let Some(first) = self.arches.iter().find(|a| *a != "noarch") {
            self.primary_arch = first.clone();
        }
        self
    }

    pub fn with_primary_arch(mut self, arch: impl Into<String>) -> Self {
        self.primary_arch = arch.into();
        self
    }
}

/// Resolve the closure of the requested packages
///
/// Fails with [`Error::UnknownPackage`] when a requested name has no
/// usable package and with [`Error::Unsatisfiable`] when no consistent
/// package set exists. Never returns a partial set.
pub fn resolve(universe: &Universe, request: &ResolutionRequest) -> Result<Resolution> {
    let filter =
        PackageFilter::new(&request.arches, &request.locale).with_primary_arch(&request.primary_arch);

    let names: BTreeSet<&str> = request.names.iter().map(String::as_str).collect();
    let mut roots: Vec<PackageId> = Vec::new();
    for name in &names {
        let candidates: Vec<PackageId> = universe
            .packages_named(name)
            .iter()
            .copied()
            .filter(|id| filter.allows_arch(universe.package(*id)))
            .collect();
        if candidates.is_empty() {
            return Err(Error::UnknownPackage(name.to_string()));
        }
        roots.extend(candidates);
    }

    info!("Computing closure of {} requested packages", names.len());
    let closure = Closure::compute(universe, &roots, &filter);

    let mut provider = RpmProvider::new(universe, &closure, &filter);
    let mut requirements = Vec::with_capacity(names.len());
    for name in &names {
        let requirement = provider
            .root_requirement(name)
            .ok_or_else(|| Error::UnknownPackage(name.to_string()))?;
        requirements.push(requirement);
    }
    let packages = provider.solvable_packages();

    info!(
        "Solving over {} candidate packages",
        closure.involved.len() + closure.excluded.len()
    );
    let mut solver = Solver::new(provider);
    let problem = Problem::default().requirements(requirements);
    let solution = solver.solve(problem).map_err(|e| match e {
        UnsolvableOrCancelled::Unsolvable(conflict) => Error::Unsatisfiable {
            explanation: conflict.display_user_friendly(&solver).to_string(),
        },
        UnsolvableOrCancelled::Cancelled(_) => Error::Unsatisfiable {
            explanation: "resolution was cancelled".to_string(),
        },
    })?;

    let selection: Vec<PackageId> = solution
        .into_iter()
        .map(|solvable| packages[solvable.0 as usize])
        .collect();
    debug!("Selected {} packages", selection.len());

    Ok(Resolution::from_selection(universe, &selection))
}
