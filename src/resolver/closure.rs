// src/resolver/closure.rs

//! Candidate reduction before solving
//!
//! Only packages reachable from the requested names through requirement
//! providers can end up in a solution, so the solver only ever sees that
//! closure. Obsoletes are applied here as a pre-filter: a reachable package
//! obsoleted by another reachable package is excluded, and the closure and
//! its exclusions are recomputed until the exclusions stop changing.

use super::requirement::{is_foreign_locale, normalize};
use super::DEFAULT_PRIMARY_ARCH;
use crate::universe::{Package, PackageId, Universe};
use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};
use tracing::{debug, warn};

/// Architecture and locale restrictions on candidate packages
#[derive(Debug, Clone)]
pub struct PackageFilter<'a> {
    arches: &'a [String],
    locale: &'a str,
    primary_arch: &'a str,
}

impl<'a> PackageFilter<'a> {
    pub fn new(arches: &'a [String], locale: &'a str) -> Self {
        Self {
            arches,
            locale,
            primary_arch: DEFAULT_PRIMARY_ARCH,
        }
    }

    /// Architecture preferred when the same package exists for several
    pub fn with_primary_arch(mut self, arch: &'a str) -> Self {
        self.primary_arch = arch;
        self
    }

    /// Lower is better: the primary arch, then noarch, then the rest
    pub fn arch_rank(&self, package: &Package) -> u8 {
        if package.arch == self.primary_arch {
            0
        } else if package.arch == "noarch" {
            1
        } else {
            2
        }
    }

    /// Empty arch list means everything except source packages
    pub fn allows_arch(&self, package: &Package) -> bool {
        if self.arches.is_empty() {
            return !package.is_source();
        }
        package.arch == "noarch" || self.arches.iter().any(|a| *a == package.arch)
    }

    pub fn is_foreign(&self, name: &str) -> bool {
        is_foreign_locale(name, self.locale)
    }

    pub fn allows(&self, package: &Package) -> bool {
        self.allows_arch(package) && !self.is_foreign(&package.name)
    }
}

/// One requirement clause with its usable providers
#[derive(Debug, Clone)]
pub struct ResolvedClause {
    /// Human-readable form, e.g. `libbar >= 1.5` or `a or b`
    pub label: String,
    /// Allowed providers in package id order, never empty
    pub providers: Vec<PackageId>,
}

/// All requirements of one package after normalisation and filtering
#[derive(Debug, Clone, Default)]
pub struct PackageRequirements {
    pub clauses: Vec<ResolvedClause>,
    /// First requirement nothing provides, if any
    pub missing: Option<String>,
}

impl PackageRequirements {
    fn resolve(universe: &Universe, package: &Package, filter: &PackageFilter<'_>) -> Self {
        let mut result = PackageRequirements::default();

        for requirement in &package.requires {
            let Some(clauses) = normalize(requirement) else {
                continue;
            };

            for clause in clauses {
                let mut locale_filtered = false;
                let mut providers = BTreeSet::new();
                let mut labels = Vec::new();

                for alternative in &clause {
                    if filter.is_foreign(&alternative.name) {
                        locale_filtered = true;
                        continue;
                    }
                    labels.push(alternative.to_string());
                    for id in universe.providers(alternative) {
                        let provider = universe.package(id);
                        if filter.allows(provider) {
                            providers.insert(id);
                        } else if filter.allows_arch(provider) {
                            locale_filtered = true;
                        }
                    }
                }

                if providers.is_empty() {
                    let label = clause
                        .iter()
                        .map(ToString::to_string)
                        .collect::<Vec<_>>()
                        .join(" or ");
                    if locale_filtered {
                        debug!(
                            "{}: dropping '{}', only other locales provide it",
                            package.nevra(),
                            label
                        );
                    } else if result.missing.is_none() {
                        result.missing = Some(label);
                    }
                    continue;
                }

                result.clauses.push(ResolvedClause {
                    label: labels.join(" or "),
                    providers: providers.into_iter().collect(),
                });
            }
        }

        result
    }
}

/// Packages the solver gets to choose from
#[derive(Debug, Default)]
pub struct Closure {
    /// Reachable and not obsoleted
    pub involved: BTreeSet<PackageId>,
    /// Obsoleted package to the package obsoleting it
    pub excluded: BTreeMap<PackageId, PackageId>,
    /// Requirements of every package that was ever reachable
    pub requirements: HashMap<PackageId, PackageRequirements>,
}

impl Closure {
    /// Compute the closure of `roots` and apply obsoletes to a fixpoint
    ///
    /// Each pass derives the exclusions from scratch out of the packages
    /// the previous pass reached, so an obsoleter that is no longer
    /// reachable stops excluding anything.
    pub fn compute(universe: &Universe, roots: &[PackageId], filter: &PackageFilter<'_>) -> Self {
        let mut closure = Closure::default();
        let max_passes = universe.len() + 1;

        for pass in 1.. {
            let (involved, blocked) = closure.traverse(universe, roots, filter);
            closure.involved = involved;

            let excluded = closure.obsoleted(universe, &blocked);
            if excluded == closure.excluded {
                break;
            }
            if pass >= max_passes {
                warn!("Obsoletes did not settle after {} passes, keeping the last closure", pass);
                break;
            }
            debug!(
                "Pass {}: {} packages obsoleted, recomputing closure",
                pass,
                excluded.len()
            );
            closure.excluded = excluded;
        }

        debug!(
            "Closure: {} involved, {} obsoleted",
            closure.involved.len(),
            closure.excluded.len()
        );
        closure
    }

    /// Walk requirement providers from `roots`
    ///
    /// Returns the reachable packages and the excluded packages the walk
    /// ran into.
    fn traverse(
        &mut self,
        universe: &Universe,
        roots: &[PackageId],
        filter: &PackageFilter<'_>,
    ) -> (BTreeSet<PackageId>, BTreeSet<PackageId>) {
        let mut involved = BTreeSet::new();
        let mut blocked = BTreeSet::new();
        let mut queue = VecDeque::new();

        for &root in roots {
            if self.excluded.contains_key(&root) {
                blocked.insert(root);
            } else {
                queue.push_back(root);
            }
        }

        while let Some(id) = queue.pop_front() {
            if !involved.insert(id) {
                continue;
            }
            let requirements = self
                .requirements
                .entry(id)
                .or_insert_with(|| PackageRequirements::resolve(universe, universe.package(id), filter));

            for clause in &requirements.clauses {
                for provider in &clause.providers {
                    if self.excluded.contains_key(provider) {
                        blocked.insert(*provider);
                    } else if !involved.contains(provider) {
                        queue.push_back(*provider);
                    }
                }
            }
        }

        (involved, blocked)
    }

    /// Packages obsoleted by an involved package
    ///
    /// Obsoleters are visited in id order and one that is already
    /// excluded obsoletes nothing, so of two packages obsoleting each
    /// other the first one wins.
    fn obsoleted(
        &self,
        universe: &Universe,
        blocked: &BTreeSet<PackageId>,
    ) -> BTreeMap<PackageId, PackageId> {
        let mut excluded = BTreeMap::new();

        for &obsoleter in &self.involved {
            if excluded.contains_key(&obsoleter) {
                continue;
            }
            let package = universe.package(obsoleter);

            for obsolete in &package.obsoletes {
                if obsolete.name == package.name {
                    continue;
                }
                for &target in universe.packages_named(&obsolete.name) {
                    if excluded.contains_key(&target)
                        || !(self.involved.contains(&target) || blocked.contains(&target))
                    {
                        continue;
                    }
                    if universe.package(target).self_provide().range_overlaps(obsolete) {
                        debug!(
                            "{} obsoletes {}",
                            package.nevra(),
                            universe.package(target).nevra()
                        );
                        excluded.insert(target, obsoleter);
                    }
                }
            }
        }

        excluded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::universe::Capability;
    use crate::version::{DepFlag, RpmVersion};

    fn pkg(name: &str, version: &str) -> Package {
        let mut p = Package::new(name, "x86_64", RpmVersion::parse(version).unwrap());
        p.repository = "test".to_string();
        p
    }

    fn ids(universe: &Universe, set: &BTreeSet<PackageId>) -> Vec<String> {
        set.iter().map(|id| universe.package(*id).nevra()).collect()
    }

    #[test]
    fn test_closure_follows_requirements() {
        let mut a = pkg("a", "1-1");
        a.requires.push(Capability::unversioned("b"));
        let mut b = pkg("b", "1-1");
        b.requires.push(Capability::unversioned("/bin/sh"));
        let mut bash = pkg("bash", "5-1");
        bash.provides.push(Capability::unversioned("/bin/sh"));

        let mut builder = Universe::builder();
        for p in [a, b, bash, pkg("unrelated", "1-1")] {
            builder.add_package(p);
        }
        let universe = builder.build();

        let filter = PackageFilter::new(&[], "en");
        let closure = Closure::compute(&universe, universe.packages_named("a"), &filter);
        assert_eq!(
            ids(&universe, &closure.involved),
            vec!["a-1-1.x86_64", "b-1-1.x86_64", "bash-5-1.x86_64"]
        );
        assert!(closure.excluded.is_empty());
    }

    #[test]
    fn test_missing_requirement_is_recorded() {
        let mut a = pkg("a", "1-1");
        a.requires.push(Capability::versioned(
            "b",
            DepFlag::Ge,
            RpmVersion::parse("2").unwrap(),
        ));
        let mut builder = Universe::builder();
        builder.add_package(a);
        builder.add_package(pkg("b", "1-1"));
        let universe = builder.build();

        let filter = PackageFilter::new(&[], "en");
        let closure = Closure::compute(&universe, universe.packages_named("a"), &filter);
        let reqs = &closure.requirements[&universe.packages_named("a")[0]];
        assert_eq!(reqs.missing.as_deref(), Some("b >= 2"));
        assert!(reqs.clauses.is_empty());
    }

    #[test]
    fn test_obsoletes_exclude_reachable_packages() {
        let mut app = pkg("app", "2-1");
        app.requires.push(Capability::unversioned("app-runtime"));
        app.provides.push(Capability::unversioned("app-runtime"));
        app.obsoletes.push(Capability::versioned(
            "app-legacy",
            DepFlag::Lt,
            RpmVersion::parse("2").unwrap(),
        ));
        let mut legacy = pkg("app-legacy", "1-1");
        legacy.provides.push(Capability::unversioned("app-runtime"));
        legacy.requires.push(Capability::unversioned("legacy-only"));

        let mut builder = Universe::builder();
        for p in [app, legacy, pkg("legacy-only", "1-1")] {
            builder.add_package(p);
        }
        let universe = builder.build();

        let filter = PackageFilter::new(&[], "en");
        let closure = Closure::compute(&universe, universe.packages_named("app"), &filter);
        assert_eq!(ids(&universe, &closure.involved), vec!["app-2-1.x86_64"]);

        let legacy_id = universe.packages_named("app-legacy")[0];
        assert_eq!(closure.excluded.get(&legacy_id), Some(&universe.packages_named("app")[0]));
    }

    #[test]
    fn test_exclusions_follow_reachable_obsoleters() {
        // m obsoletes q but is only reachable through l, which n obsoletes
        let mut r = pkg("r", "1-1");
        r.requires.push(Capability::unversioned("x"));
        r.requires.push(Capability::unversioned("q"));
        let mut l = pkg("l", "1-1");
        l.provides.push(Capability::unversioned("x"));
        l.requires.push(Capability::unversioned("m"));
        let mut n = pkg("n", "1-1");
        n.provides.push(Capability::unversioned("x"));
        n.obsoletes.push(Capability::unversioned("l"));
        let mut m = pkg("m", "1-1");
        m.obsoletes.push(Capability::unversioned("q"));

        let mut builder = Universe::builder();
        for p in [r, l, n, m, pkg("q", "1-1")] {
            builder.add_package(p);
        }
        let universe = builder.build();

        let filter = PackageFilter::new(&[], "en");
        let closure = Closure::compute(&universe, universe.packages_named("r"), &filter);
        assert_eq!(
            ids(&universe, &closure.involved),
            vec!["r-1-1.x86_64", "n-1-1.x86_64", "q-1-1.x86_64"]
        );

        let l_id = universe.packages_named("l")[0];
        let n_id = universe.packages_named("n")[0];
        assert_eq!(closure.excluded.len(), 1);
        assert_eq!(closure.excluded.get(&l_id), Some(&n_id));
    }

    #[test]
    fn test_mutual_obsoletes_keep_first() {
        let mut a = pkg("a", "1-1");
        a.requires.push(Capability::unversioned("b"));
        a.obsoletes.push(Capability::unversioned("b"));
        let mut b = pkg("b", "1-1");
        b.obsoletes.push(Capability::unversioned("a"));

        let mut builder = Universe::builder();
        for p in [a, b] {
            builder.add_package(p);
        }
        let universe = builder.build();

        let filter = PackageFilter::new(&[], "en");
        let closure = Closure::compute(&universe, universe.packages_named("a"), &filter);
        assert_eq!(ids(&universe, &closure.involved), vec!["a-1-1.x86_64"]);
        assert_eq!(
            closure.excluded.get(&universe.packages_named("b")[0]),
            Some(&universe.packages_named("a")[0])
        );
    }

    #[test]
    fn test_foreign_locale_requirement_is_dropped() {
        let mut glibc = pkg("glibc", "2.39-1");
        glibc.requires.push(Capability::unversioned("glibc-langpack-de"));
        glibc.requires.push(Capability::unversioned("glibc-langpack"));
        let mut de = pkg("glibc-langpack-de", "2.39-1");
        de.provides.push(Capability::unversioned("glibc-langpack"));
        let mut en = pkg("glibc-langpack-en", "2.39-1");
        en.provides.push(Capability::unversioned("glibc-langpack"));

        let mut builder = Universe::builder();
        for p in [glibc, de, en] {
            builder.add_package(p);
        }
        let universe = builder.build();

        let filter = PackageFilter::new(&[], "en_US.UTF-8");
        let closure = Closure::compute(&universe, universe.packages_named("glibc"), &filter);
        assert_eq!(
            ids(&universe, &closure.involved),
            vec!["glibc-2.39-1.x86_64", "glibc-langpack-en-2.39-1.x86_64"]
        );
        let reqs = &closure.requirements[&universe.packages_named("glibc")[0]];
        assert!(reqs.missing.is_none());
        assert_eq!(reqs.clauses.len(), 1);
    }

    #[test]
    fn test_arch_filter() {
        let mut builder = Universe::builder();
        builder.add_package(pkg("a", "1-1"));
        let mut i686 = Package::new("a", "i686", RpmVersion::parse("1-1").unwrap());
        i686.repository = "test".to_string();
        builder.add_package(i686);
        builder.add_package(Package::new("a", "src", RpmVersion::parse("1-1").unwrap()));
        builder.add_package(Package::new("doc", "noarch", RpmVersion::parse("1-1").unwrap()));
        let universe = builder.build();

        let arches = vec!["x86_64".to_string()];
        let filter = PackageFilter::new(&arches, "en");
        let allowed: Vec<String> = universe
            .packages()
            .filter(|(_, p)| filter.allows(p))
            .map(|(_, p)| p.nevra())
            .collect();
        assert_eq!(allowed, vec!["a-1-1.x86_64", "doc-1-1.noarch"]);

        let any = PackageFilter::new(&[], "en");
        assert_eq!(universe.packages().filter(|(_, p)| any.allows(p)).count(), 3);
    }

    #[test]
    fn test_arch_rank() {
        let x86_64 = Package::new("a", "x86_64", RpmVersion::parse("1-1").unwrap());
        let i686 = Package::new("a", "i686", RpmVersion::parse("1-1").unwrap());
        let noarch = Package::new("a", "noarch", RpmVersion::parse("1-1").unwrap());

        let filter = PackageFilter::new(&[], "en");
        assert_eq!(filter.arch_rank(&x86_64), 0);
        assert_eq!(filter.arch_rank(&noarch), 1);
        assert_eq!(filter.arch_rank(&i686), 2);

        let filter = filter.with_primary_arch("i686");
        assert_eq!(filter.arch_rank(&i686), 0);
        assert_eq!(filter.arch_rank(&x86_64), 2);
    }
}
