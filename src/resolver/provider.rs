// src/resolver/provider.rs

//! resolvo dependency provider over a package closure
//!
//! Each package name is one resolvo name, so at most one package per name
//! can be selected. Solvable ids are handed out in preference order (highest
//! EVR first, then name, the primary architecture ahead of noarch ahead of
//! the rest, arch name and repository order), which makes candidate
//! sorting and the order of alternatives in a union the same total order.
//!
//! Everything is computed up front in [`RpmProvider::new`]; the resolvo
//! callbacks are plain lookups.

use super::closure::{Closure, PackageFilter};
use crate::universe::{PackageId, Universe};
use resolvo::{
    Candidates, Condition, ConditionId, ConditionalRequirement, Dependencies, DependencyProvider,
    HintDependenciesAvailable, Interner, KnownDependencies, NameId, Requirement, SolvableId,
    SolverCache, StringId, VersionSetId, VersionSetUnionId,
};
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt::Display;

/// Which solvables of a name a version set admits
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum SetKind {
    Any,
    /// Sorted solvable ids
    OneOf(Vec<u32>),
    /// Sorted solvable ids
    NoneOf(Vec<u32>),
}

impl SetKind {
    fn contains(&self, solvable: SolvableId) -> bool {
        match self {
            SetKind::Any => true,
            SetKind::OneOf(ids) => ids.binary_search(&solvable.0).is_ok(),
            SetKind::NoneOf(ids) => ids.binary_search(&solvable.0).is_err(),
        }
    }
}

#[derive(Debug)]
struct VersionSet {
    name: NameId,
    kind: SetKind,
    label: String,
}

#[derive(Debug)]
struct Solvable {
    package: PackageId,
    name: NameId,
}

#[derive(Debug, Clone, Copy)]
enum Req {
    Single(VersionSetId),
    Union(VersionSetUnionId),
}

#[derive(Debug)]
enum Deps {
    Known {
        requirements: Vec<Req>,
        constrains: Vec<VersionSetId>,
    },
    Unknown(StringId),
}

/// Preference order between two packages: newest first
fn preference(universe: &Universe, filter: &PackageFilter<'_>, a: PackageId, b: PackageId) -> Ordering {
    let pa = universe.package(a);
    let pb = universe.package(b);
    pb.version
        .cmp(&pa.version)
        .then_with(|| pa.name.cmp(&pb.name))
        .then_with(|| filter.arch_rank(pa).cmp(&filter.arch_rank(pb)))
        .then_with(|| pa.arch.cmp(&pb.arch))
        .then_with(|| {
            universe
                .repository_rank(&pa.repository)
                .cmp(&universe.repository_rank(&pb.repository))
        })
        .then_with(|| a.cmp(&b))
}

pub(crate) struct RpmProvider<'u> {
    universe: &'u Universe,
    names: Vec<String>,
    name_lookup: HashMap<String, NameId>,
    solvables: Vec<Solvable>,
    solvable_lookup: HashMap<PackageId, SolvableId>,
    candidates: Vec<Vec<SolvableId>>,
    excluded: Vec<Vec<(SolvableId, StringId)>>,
    version_sets: Vec<VersionSet>,
    set_lookup: HashMap<(NameId, SetKind, String), VersionSetId>,
    unions: Vec<Vec<VersionSetId>>,
    strings: Vec<String>,
    dependencies: Vec<Deps>,
}

impl<'u> RpmProvider<'u> {
    pub fn new(universe: &'u Universe, closure: &Closure, filter: &PackageFilter<'_>) -> Self {
        let mut members: Vec<PackageId> = closure
            .involved
            .iter()
            .chain(closure.excluded.keys())
            .copied()
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        members.sort_by(|a, b| preference(universe, filter, *a, *b));

        let mut provider = Self {
            universe,
            names: Vec::new(),
            name_lookup: HashMap::new(),
            solvables: Vec::with_capacity(members.len()),
            solvable_lookup: HashMap::with_capacity(members.len()),
            candidates: Vec::new(),
            excluded: Vec::new(),
            version_sets: Vec::new(),
            set_lookup: HashMap::new(),
            unions: Vec::new(),
            strings: Vec::new(),
            dependencies: Vec::with_capacity(members.len()),
        };

        // Solvable ids follow preference order
        for package in members {
            let name = provider.intern_name(&universe.package(package).name);
            let id = SolvableId(provider.solvables.len() as u32);
            provider.solvables.push(Solvable { package, name });
            provider.solvable_lookup.insert(package, id);
            provider.candidates[name.0 as usize].push(id);
        }

        for (&target, &by) in &closure.excluded {
            let reason = provider.intern_string(format!("obsoleted by {}", universe.package(by).nevra()));
            let solvable = provider.solvable_lookup[&target];
            let name = provider.solvables[solvable.0 as usize].name;
            provider.excluded[name.0 as usize].push((solvable, reason));
        }

        for index in 0..provider.solvables.len() {
            let deps = provider.build_dependencies(closure, SolvableId(index as u32));
            provider.dependencies.push(deps);
        }

        provider
    }

    /// Package behind each solvable, indexed by solvable id
    pub fn solvable_packages(&self) -> Vec<PackageId> {
        self.solvables.iter().map(|s| s.package).collect()
    }

    /// Top-level requirement for a requested package name
    pub fn root_requirement(&mut self, name: &str) -> Option<ConditionalRequirement> {
        let name_id = *self.name_lookup.get(name)?;
        let set = self.intern_version_set(name_id, SetKind::Any, format!("(requested {})", name));
        Some(ConditionalRequirement {
            condition: None,
            requirement: Requirement::Single(set),
        })
    }

    fn intern_name(&mut self, name: &str) -> NameId {
        if let Some(id) = self.name_lookup.get(name) {
            return *id;
        }
        let id = NameId(self.names.len() as u32);
        self.names.push(name.to_string());
        self.name_lookup.insert(name.to_string(), id);
        self.candidates.push(Vec::new());
        self.excluded.push(Vec::new());
        id
    }

    fn intern_string(&mut self, value: String) -> StringId {
        let id = StringId(self.strings.len() as u32);
        self.strings.push(value);
        id
    }

    fn intern_version_set(&mut self, name: NameId, kind: SetKind, label: String) -> VersionSetId {
        let key = (name, kind, label);
        if let Some(id) = self.set_lookup.get(&key) {
            return *id;
        }
        let id = VersionSetId(self.version_sets.len() as u32);
        self.version_sets.push(VersionSet {
            name: key.0,
            kind: key.1.clone(),
            label: key.2.clone(),
        });
        self.set_lookup.insert(key, id);
        id
    }

    /// Best (lowest) solvable id a version set admits
    fn best_in(&self, set: VersionSetId) -> u32 {
        let set = &self.version_sets[set.0 as usize];
        self.candidates[set.name.0 as usize]
            .iter()
            .find(|s| set.kind.contains(**s))
            .map(|s| s.0)
            .unwrap_or(u32::MAX)
    }

    fn build_dependencies(&mut self, closure: &Closure, solvable: SolvableId) -> Deps {
        let universe = self.universe;
        let package_id = self.solvables[solvable.0 as usize].package;
        let package = universe.package(package_id);

        // Obsoleted packages are never installed, their dependencies do not matter
        if closure.excluded.contains_key(&package_id) {
            return Deps::Known {
                requirements: Vec::new(),
                constrains: Vec::new(),
            };
        }

        let Some(requirements) = closure.requirements.get(&package_id) else {
            return Deps::Known {
                requirements: Vec::new(),
                constrains: Vec::new(),
            };
        };

        if let Some(missing) = &requirements.missing {
            let reason = self.intern_string(format!("nothing provides {} needed by {}", missing, package.nevra()));
            return Deps::Unknown(reason);
        }

        let mut reqs = Vec::with_capacity(requirements.clauses.len());
        for clause in &requirements.clauses {
            let mut by_name: BTreeMap<NameId, Vec<u32>> = BTreeMap::new();
            for provider in &clause.providers {
                if let Some(s) = self.solvable_lookup.get(provider) {
                    by_name
                        .entry(self.solvables[s.0 as usize].name)
                        .or_default()
                        .push(s.0);
                }
            }

            let mut sets: Vec<VersionSetId> = Vec::with_capacity(by_name.len());
            for (name, mut ids) in by_name {
                ids.sort_unstable();
                ids.dedup();
                let kind = if ids.len() == self.candidates[name.0 as usize].len() {
                    SetKind::Any
                } else {
                    SetKind::OneOf(ids)
                };
                sets.push(self.intern_version_set(name, kind, clause.label.clone()));
            }
            sets.sort_by_key(|set| self.best_in(*set));

            match sets.as_slice() {
                [] => {}
                [single] => reqs.push(Req::Single(*single)),
                _ => {
                    let union = VersionSetUnionId(self.unions.len() as u32);
                    self.unions.push(sets);
                    reqs.push(Req::Union(union));
                }
            }
        }

        let own_name = self.solvables[solvable.0 as usize].name;
        let mut constrains = Vec::new();
        for conflict in &package.conflicts {
            let mut by_name: BTreeMap<NameId, Vec<u32>> = BTreeMap::new();
            for provider in universe.providers(conflict) {
                if !closure.involved.contains(&provider) {
                    continue;
                }
                let Some(s) = self.solvable_lookup.get(&provider) else {
                    continue;
                };
                let name = self.solvables[s.0 as usize].name;
                if name != own_name {
                    by_name.entry(name).or_default().push(s.0);
                }
            }

            for (name, mut ids) in by_name {
                ids.sort_unstable();
                ids.dedup();
                let set = self.intern_version_set(name, SetKind::NoneOf(ids), format!("not providing {}", conflict));
                if !constrains.contains(&set) {
                    constrains.push(set);
                }
            }
        }

        Deps::Known {
            requirements: reqs,
            constrains,
        }
    }
}

impl Interner for RpmProvider<'_> {
    fn display_solvable(&self, solvable: SolvableId) -> impl Display + '_ {
        self.universe
            .package(self.solvables[solvable.0 as usize].package)
            .nevra()
    }

    fn display_solvable_name(&self, solvable: SolvableId) -> impl Display + '_ {
        self.names[self.solvables[solvable.0 as usize].name.0 as usize].as_str()
    }

    fn display_merged_solvables(&self, solvables: &[SolvableId]) -> impl Display + '_ {
        solvables
            .iter()
            .map(|s| {
                let package = self.universe.package(self.solvables[s.0 as usize].package);
                format!("{}.{}", package.version, package.arch)
            })
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn display_name(&self, name: NameId) -> impl Display + '_ {
        self.names[name.0 as usize].as_str()
    }

    fn display_version_set(&self, version_set: VersionSetId) -> impl Display + '_ {
        self.version_sets[version_set.0 as usize].label.as_str()
    }

    fn display_string(&self, string_id: StringId) -> impl Display + '_ {
        self.strings[string_id.0 as usize].as_str()
    }

    fn version_set_name(&self, version_set: VersionSetId) -> NameId {
        self.version_sets[version_set.0 as usize].name
    }

    fn solvable_name(&self, solvable: SolvableId) -> NameId {
        self.solvables[solvable.0 as usize].name
    }

    fn version_sets_in_union(
        &self,
        version_set_union: VersionSetUnionId,
    ) -> impl Iterator<Item = VersionSetId> {
        self.unions[version_set_union.0 as usize].clone().into_iter()
    }

    fn resolve_condition(&self, condition: ConditionId) -> Condition {
        // No conditional requirements are generated; mirror the id scheme anyway
        Condition::Requirement(VersionSetId(condition.as_u32()))
    }
}

impl DependencyProvider for RpmProvider<'_> {
    async fn filter_candidates(
        &self,
        candidates: &[SolvableId],
        version_set: VersionSetId,
        inverse: bool,
    ) -> Vec<SolvableId> {
        let kind = &self.version_sets[version_set.0 as usize].kind;
        candidates
            .iter()
            .copied()
            .filter(|s| kind.contains(*s) != inverse)
            .collect()
    }

    async fn get_candidates(&self, name: NameId) -> Option<Candidates> {
        let candidates = self.candidates.get(name.0 as usize)?;
        Some(Candidates {
            candidates: candidates.clone(),
            favored: None,
            locked: None,
            hint_dependencies_available: HintDependenciesAvailable::None,
            excluded: self.excluded[name.0 as usize].clone(),
        })
    }

    async fn sort_candidates(&self, _solver: &SolverCache<Self>, solvables: &mut [SolvableId]) {
        // Ids were assigned in preference order
        solvables.sort_by_key(|s| s.0);
    }

    async fn get_dependencies(&self, solvable: SolvableId) -> Dependencies {
        match &self.dependencies[solvable.0 as usize] {
            Deps::Unknown(reason) => Dependencies::Unknown(*reason),
            Deps::Known {
                requirements,
                constrains,
            } => Dependencies::Known(KnownDependencies {
                requirements: requirements
                    .iter()
                    .map(|req| ConditionalRequirement {
                        condition: None,
                        requirement: match *req {
                            Req::Single(set) => Requirement::Single(set),
                            Req::Union(union) => Requirement::Union(union),
                        },
                    })
                    .collect(),
                constrains: constrains.clone(),
            }),
        }
    }
}
