// tests/resolve.rs

//! Dependency resolution integration tests
//!
//! Universes are built from generated primary/filelists documents, the same
//! way they are loaded from a fetched cache.

mod common;

use common::*;
use repoclosure::resolver::{resolve, ResolutionRequest};
use repoclosure::{Error, Resolution, Universe};

fn universe(repos: &[(&str, Vec<PackageXml>)]) -> Universe {
    let mut builder = Universe::builder();
    for (name, packages) in repos {
        let xml = primary_xml(packages);
        builder
            .add_primary(name, &format!("{name}/primary.xml"), xml.as_bytes())
            .unwrap();
    }
    builder.build()
}

fn lines(resolution: &Resolution) -> Vec<String> {
    resolution.packages.iter().map(ToString::to_string).collect()
}

#[test]
fn test_highest_satisfying_version_wins() {
    let u = universe(&[(
        "main",
        vec![
            PackageXml::new("libfoo", "x86_64", "2.0-1")
                .requires(EntryXml::versioned("libbar", "GE", "1.5")),
            PackageXml::new("libbar", "x86_64", "1.4-1"),
            PackageXml::new("libbar", "x86_64", "1.6-1"),
        ],
    )]);

    let resolution = resolve(&u, &ResolutionRequest::new(["libfoo"])).unwrap();
    assert_eq!(lines(&resolution), vec!["libbar-1.6-1.x86_64", "libfoo-2.0-1.x86_64"]);

    let bar = resolution.get("libbar").unwrap();
    assert_eq!(bar.location.as_deref(), Some("Packages/libbar-1.6-1.x86_64.rpm"));
    assert_eq!(bar.checksum.as_ref().unwrap().algorithm, "sha256");
    assert_eq!(bar.repository, "main");
}

#[test]
fn test_upper_bound_selects_older_version() {
    let u = universe(&[(
        "main",
        vec![
            PackageXml::new("app", "noarch", "1-1")
                .requires(EntryXml::versioned("python3", "LT", "3.13")),
            PackageXml::new("python3", "x86_64", "3.12.4-1"),
            PackageXml::new("python3", "x86_64", "3.13.0-1"),
        ],
    )]);

    let resolution = resolve(&u, &ResolutionRequest::new(["app"])).unwrap();
    assert_eq!(resolution.get("python3").unwrap().version, "3.12.4");
}

#[test]
fn test_capability_and_file_providers() {
    let u = universe(&[(
        "main",
        vec![
            PackageXml::new("script", "noarch", "1-1")
                .requires(EntryXml::new("/bin/sh"))
                .requires(EntryXml::new("libz.so.1()(64bit)")),
            PackageXml::new("bash", "x86_64", "5.2-1").file("/bin/sh"),
            PackageXml::new("zlib", "x86_64", "1.3-1").provides(EntryXml::new("libz.so.1()(64bit)")),
            PackageXml::new("unrelated", "x86_64", "1-1"),
        ],
    )]);

    let resolution = resolve(&u, &ResolutionRequest::new(["script"])).unwrap();
    assert_eq!(
        resolution.names().collect::<Vec<_>>(),
        vec!["bash", "script", "zlib"]
    );
}

#[test]
fn test_file_provides_from_filelists() {
    let mut builder = Universe::builder();
    let primary = primary_xml(&[
        PackageXml::new("tool", "x86_64", "1-1").requires(EntryXml::new("/usr/libexec/helper")),
        PackageXml::new("helper", "x86_64", "2-1"),
    ]);
    builder.add_primary("main", "primary.xml", primary.as_bytes()).unwrap();
    let files: &[&str] = &["/usr/libexec/helper"];
    let filelists = filelists_xml(&[("helper", "x86_64", "2-1", files)]);
    builder.add_filelists("filelists.xml", filelists.as_bytes()).unwrap();
    let u = builder.build();

    let resolution = resolve(&u, &ResolutionRequest::new(["tool"])).unwrap();
    assert_eq!(lines(&resolution), vec!["helper-2-1.x86_64", "tool-1-1.x86_64"]);
}

#[test]
fn test_obsoleting_package_replaces_obsoleted() {
    let u = universe(&[(
        "main",
        vec![
            PackageXml::new("app", "x86_64", "1-1").requires(EntryXml::new("app-data")),
            PackageXml::new("app-data-legacy", "noarch", "1-1").provides(EntryXml::new("app-data")),
            PackageXml::new("app-data-ng", "noarch", "2-1")
                .provides(EntryXml::new("app-data"))
                .obsoletes(EntryXml::versioned("app-data-legacy", "LT", "2")),
        ],
    )]);

    let resolution = resolve(&u, &ResolutionRequest::new(["app"])).unwrap();
    assert_eq!(resolution.names().collect::<Vec<_>>(), vec!["app", "app-data-ng"]);
}

#[test]
fn test_requesting_obsoleted_package_is_unsatisfiable() {
    let u = universe(&[(
        "main",
        vec![
            PackageXml::new("old", "noarch", "1-1"),
            PackageXml::new("new", "noarch", "2-1").obsoletes(EntryXml::new("old")),
        ],
    )]);

    let err = resolve(&u, &ResolutionRequest::new(["new", "old"])).unwrap_err();
    match err {
        Error::Unsatisfiable { explanation } => {
            assert!(explanation.contains("obsoleted by new-2-1.noarch"), "{explanation}");
        }
        other => panic!("expected unsatisfiable, got {other:?}"),
    }
}

#[test]
fn test_conflicting_requirements_are_unsatisfiable() {
    let u = universe(&[(
        "main",
        vec![
            PackageXml::new("server", "x86_64", "1-1").conflicts(EntryXml::new("legacy-server")),
            PackageXml::new("legacy-server", "x86_64", "1-1"),
        ],
    )]);

    let err = resolve(&u, &ResolutionRequest::new(["server", "legacy-server"])).unwrap_err();
    assert!(matches!(err, Error::Unsatisfiable { .. }));
}

#[test]
fn test_conflict_from_dependency_is_unsatisfiable() {
    // b is the only provider of c, and b's own dependency conflicts with c
    let u = universe(&[(
        "main",
        vec![
            PackageXml::new("a", "x86_64", "1-1").requires(EntryXml::new("c")),
            PackageXml::new("b", "x86_64", "1-1")
                .provides(EntryXml::new("c"))
                .requires(EntryXml::new("d")),
            PackageXml::new("d", "x86_64", "1-1").conflicts(EntryXml::new("c")),
        ],
    )]);

    let err = resolve(&u, &ResolutionRequest::new(["a"])).unwrap_err();
    assert!(matches!(err, Error::Unsatisfiable { .. }), "{err:?}");
}

#[test]
fn test_conflict_steers_to_other_version() {
    let u = universe(&[(
        "main",
        vec![
            PackageXml::new("a", "noarch", "1-1")
                .requires(EntryXml::new("b"))
                .conflicts(EntryXml::versioned("b", "GE", "2")),
            PackageXml::new("b", "noarch", "1-1"),
            PackageXml::new("b", "noarch", "2-1"),
        ],
    )]);

    let resolution = resolve(&u, &ResolutionRequest::new(["a"])).unwrap();
    assert_eq!(resolution.get("b").unwrap().version, "1");
}

#[test]
fn test_missing_provider_names_the_requirement() {
    let u = universe(&[(
        "main",
        vec![PackageXml::new("a", "noarch", "1-1").requires(EntryXml::versioned("ghost", "GE", "3"))],
    )]);

    let err = resolve(&u, &ResolutionRequest::new(["a"])).unwrap_err();
    match err {
        Error::Unsatisfiable { explanation } => {
            assert!(explanation.contains("nothing provides ghost >= 3"), "{explanation}");
        }
        other => panic!("expected unsatisfiable, got {other:?}"),
    }
}

#[test]
fn test_unknown_package() {
    let u = universe(&[("main", vec![PackageXml::new("a", "noarch", "1-1")])]);
    let err = resolve(&u, &ResolutionRequest::new(["a", "missing"])).unwrap_err();
    assert!(matches!(err, Error::UnknownPackage(name) if name == "missing"));
}

#[test]
fn test_duplicate_requests_resolve_once() {
    let u = universe(&[("main", vec![PackageXml::new("a", "noarch", "1-1")])]);
    let resolution = resolve(&u, &ResolutionRequest::new(["a", "a", "a"])).unwrap();
    assert_eq!(resolution.len(), 1);
}

#[test]
fn test_rich_or_dependency() {
    let u = universe(&[(
        "main",
        vec![
            PackageXml::new("web", "noarch", "1-1").requires(EntryXml::new("(nginx or httpd)")),
            PackageXml::new("httpd", "x86_64", "2.4-1"),
        ],
    )]);

    let resolution = resolve(&u, &ResolutionRequest::new(["web"])).unwrap();
    assert_eq!(resolution.names().collect::<Vec<_>>(), vec!["httpd", "web"]);
}

#[test]
fn test_rich_and_dependency() {
    let u = universe(&[(
        "main",
        vec![
            PackageXml::new("suite", "noarch", "1-1")
                .requires(EntryXml::new("(tool-a and tool-b >= 2)")),
            PackageXml::new("tool-a", "noarch", "1-1"),
            PackageXml::new("tool-b", "noarch", "1-1"),
            PackageXml::new("tool-b", "noarch", "2-1"),
        ],
    )]);

    let resolution = resolve(&u, &ResolutionRequest::new(["suite"])).unwrap();
    assert_eq!(lines(&resolution), vec![
        "suite-1-1.noarch",
        "tool-a-1-1.noarch",
        "tool-b-2-1.noarch",
    ]);
}

#[test]
fn test_conditional_rich_dependency_is_ignored() {
    let u = universe(&[(
        "main",
        vec![PackageXml::new("plugin", "noarch", "1-1")
            .requires(EntryXml::new("(plugin-gnome if gnome-shell)"))],
    )]);

    let resolution = resolve(&u, &ResolutionRequest::new(["plugin"])).unwrap();
    assert_eq!(resolution.len(), 1);
}

#[test]
fn test_locale_selects_matching_langpack() {
    let packages = vec![
        PackageXml::new("glibc", "x86_64", "2.39-1").requires(EntryXml::new("glibc-langpack")),
        PackageXml::new("glibc-langpack-de", "x86_64", "2.39-1").provides(EntryXml::new("glibc-langpack")),
        PackageXml::new("glibc-langpack-en", "x86_64", "2.39-1").provides(EntryXml::new("glibc-langpack")),
    ];
    let u = universe(&[("main", packages)]);

    let en = resolve(&u, &ResolutionRequest::new(["glibc"])).unwrap();
    assert_eq!(en.names().collect::<Vec<_>>(), vec!["glibc", "glibc-langpack-en"]);

    let de = resolve(&u, &ResolutionRequest::new(["glibc"]).with_locale("de_DE.UTF-8")).unwrap();
    assert_eq!(de.names().collect::<Vec<_>>(), vec!["glibc", "glibc-langpack-de"]);
}

#[test]
fn test_requirement_only_foreign_locales_provide_is_dropped() {
    let u = universe(&[(
        "main",
        vec![
            PackageXml::new("docs", "noarch", "1-1").requires(EntryXml::new("docs-langpack-fr")),
            PackageXml::new("docs-langpack-fr", "noarch", "1-1"),
        ],
    )]);

    let resolution = resolve(&u, &ResolutionRequest::new(["docs"])).unwrap();
    assert_eq!(resolution.names().collect::<Vec<_>>(), vec!["docs"]);
}

#[test]
fn test_arch_filter() {
    let u = universe(&[(
        "main",
        vec![
            PackageXml::new("lib", "i686", "2-1"),
            PackageXml::new("lib", "x86_64", "1-1"),
            PackageXml::new("lib", "src", "3-1"),
        ],
    )]);

    let x86_64 = resolve(&u, &ResolutionRequest::new(["lib"]).with_arches(["x86_64"])).unwrap();
    assert_eq!(lines(&x86_64), vec!["lib-1-1.x86_64"]);

    let any = resolve(&u, &ResolutionRequest::new(["lib"])).unwrap();
    assert_eq!(lines(&any), vec!["lib-2-1.i686"]);

    let err = resolve(&u, &ResolutionRequest::new(["lib"]).with_arches(["aarch64"])).unwrap_err();
    assert!(matches!(err, Error::UnknownPackage(_)));
}

#[test]
fn test_primary_arch_preferred_over_other_multilib_arch() {
    let u = universe(&[(
        "main",
        vec![
            PackageXml::new("glibc", "i686", "2.39-1"),
            PackageXml::new("glibc", "x86_64", "2.39-1"),
            PackageXml::new("app", "x86_64", "1-1").requires(EntryXml::new("glibc")),
        ],
    )]);

    let resolution = resolve(&u, &ResolutionRequest::new(["glibc"])).unwrap();
    assert_eq!(lines(&resolution), vec!["glibc-2.39-1.x86_64"]);

    let resolution = resolve(&u, &ResolutionRequest::new(["app"])).unwrap();
    assert_eq!(lines(&resolution), vec!["app-1-1.x86_64", "glibc-2.39-1.x86_64"]);

    let request = ResolutionRequest::new(["glibc"]).with_arches(["i686", "x86_64"]);
    assert_eq!(lines(&resolve(&u, &request).unwrap()), vec!["glibc-2.39-1.i686"]);
}

#[test]
fn test_unreachable_obsoleter_excludes_nothing() {
    // n replaces l, so m (needed only by l) never joins and cannot obsolete q
    let u = universe(&[(
        "main",
        vec![
            PackageXml::new("r", "x86_64", "1-1")
                .requires(EntryXml::new("x"))
                .requires(EntryXml::new("q")),
            PackageXml::new("l", "x86_64", "1-1")
                .provides(EntryXml::new("x"))
                .requires(EntryXml::new("m")),
            PackageXml::new("n", "x86_64", "1-1")
                .provides(EntryXml::new("x"))
                .obsoletes(EntryXml::new("l")),
            PackageXml::new("m", "x86_64", "1-1").obsoletes(EntryXml::new("q")),
            PackageXml::new("q", "x86_64", "1-1"),
        ],
    )]);

    let resolution = resolve(&u, &ResolutionRequest::new(["r"])).unwrap();
    assert_eq!(
        lines(&resolution),
        vec!["n-1-1.x86_64", "q-1-1.x86_64", "r-1-1.x86_64"]
    );
}

#[test]
fn test_first_repository_wins_on_duplicates() {
    let u = universe(&[
        ("fedora", vec![PackageXml::new("a", "noarch", "1-1")]),
        ("updates", vec![PackageXml::new("a", "noarch", "1-1")]),
    ]);
    assert_eq!(u.len(), 1);

    let resolution = resolve(&u, &ResolutionRequest::new(["a"])).unwrap();
    assert_eq!(resolution.get("a").unwrap().repository, "fedora");
}

#[test]
fn test_epoch_beats_version() {
    let u = universe(&[(
        "main",
        vec![
            PackageXml::new("tz", "noarch", "1:2020a-1"),
            PackageXml::new("tz", "noarch", "2024b-1"),
        ],
    )]);

    let resolution = resolve(&u, &ResolutionRequest::new(["tz"])).unwrap();
    assert_eq!(lines(&resolution), vec!["tz-1:2020a-1.noarch"]);
}

#[test]
fn test_resolution_is_deterministic() {
    let build = || {
        universe(&[
            (
                "main",
                vec![
                    PackageXml::new("top", "noarch", "1-1")
                        .requires(EntryXml::new("mail-transport"))
                        .requires(EntryXml::new("libc")),
                    PackageXml::new("postfix", "x86_64", "3-1").provides(EntryXml::new("mail-transport")),
                    PackageXml::new("exim", "x86_64", "4-1").provides(EntryXml::new("mail-transport")),
                    PackageXml::new("glibc", "x86_64", "2.39-1").provides(EntryXml::new("libc")),
                ],
            ),
            ("extra", vec![PackageXml::new("sendmail", "x86_64", "8-1").provides(EntryXml::new("mail-transport"))]),
        ])
    };

    let first = resolve(&build(), &ResolutionRequest::new(["top"])).unwrap();
    for _ in 0..5 {
        let again = resolve(&build(), &ResolutionRequest::new(["top"])).unwrap();
        assert_eq!(first, again);
    }
    assert_eq!(first.len(), 3);
    assert_eq!(
        first.to_json().unwrap(),
        resolve(&build(), &ResolutionRequest::new(["top"])).unwrap().to_json().unwrap()
    );
}

#[test]
fn test_json_output() {
    let u = universe(&[("main", vec![PackageXml::new("a", "noarch", "1:1.0-2")])]);
    let resolution = resolve(&u, &ResolutionRequest::new(["a"])).unwrap();

    let value: serde_json::Value = serde_json::from_str(&resolution.to_json().unwrap()).unwrap();
    let package = &value["packages"][0];
    assert_eq!(package["name"], "a");
    assert_eq!(package["epoch"], 1);
    assert_eq!(package["version"], "1.0");
    assert_eq!(package["release"], "2");
    assert_eq!(package["location"], "Packages/a-1.0-2.noarch.rpm");
    assert_eq!(package["repository"], "main");
}
