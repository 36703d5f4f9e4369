// src/universe/primary.rs

//! primary.xml and filelists.xml parsing
//!
//! Elements in the `rpm:` namespace are matched by local name, with the
//! prefixed spelling accepted as an alias.

use super::package::{Capability, Package, PackageChecksum};
use crate::error::{Error, Result};
use crate::version::{DepFlag, RpmVersion};
use serde::Deserialize;
use std::io::BufRead;

#[derive(Debug, Deserialize)]
pub(crate) struct PrimaryDocument {
    #[serde(rename = "package", default)]
    pub packages: Vec<PrimaryPackage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct PrimaryPackage {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub version: Option<VersionElement>,
    #[serde(default)]
    pub checksum: Option<ChecksumValue>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub location: Option<LocationElement>,
    #[serde(default)]
    pub format: Format,
}

#[derive(Debug, Deserialize)]
pub(crate) struct VersionElement {
    #[serde(rename = "@epoch", default)]
    pub epoch: Option<String>,
    #[serde(rename = "@ver", default)]
    pub ver: Option<String>,
    #[serde(rename = "@rel", default)]
    pub rel: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ChecksumValue {
    #[serde(rename = "@type", default)]
    pub algorithm: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LocationElement {
    #[serde(rename = "@href", default)]
    pub href: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct Format {
    #[serde(rename = "license", alias = "rpm:license", default)]
    pub license: Option<String>,
    #[serde(rename = "vendor", alias = "rpm:vendor", default)]
    pub vendor: Option<String>,
    #[serde(rename = "sourcerpm", alias = "rpm:sourcerpm", default)]
    pub sourcerpm: Option<String>,
    #[serde(rename = "provides", alias = "rpm:provides", default)]
    pub provides: EntryList,
    #[serde(rename = "requires", alias = "rpm:requires", default)]
    pub requires: EntryList,
    #[serde(rename = "conflicts", alias = "rpm:conflicts", default)]
    pub conflicts: EntryList,
    #[serde(rename = "obsoletes", alias = "rpm:obsoletes", default)]
    pub obsoletes: EntryList,
    #[serde(rename = "recommends", alias = "rpm:recommends", default)]
    pub recommends: EntryList,
    #[serde(rename = "suggests", alias = "rpm:suggests", default)]
    pub suggests: EntryList,
    #[serde(rename = "enhances", alias = "rpm:enhances", default)]
    pub enhances: EntryList,
    #[serde(rename = "supplements", alias = "rpm:supplements", default)]
    pub supplements: EntryList,
    #[serde(rename = "file", default)]
    pub files: Vec<FileElement>,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct EntryList {
    #[serde(rename = "entry", alias = "rpm:entry", default)]
    pub entries: Vec<Entry>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct Entry {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@flags", default)]
    pub flags: Option<String>,
    #[serde(rename = "@epoch", default)]
    pub epoch: Option<String>,
    #[serde(rename = "@ver", default)]
    pub ver: Option<String>,
    #[serde(rename = "@rel", default)]
    pub rel: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FileElement {
    #[serde(rename = "@type", default)]
    pub kind: Option<String>,
    #[serde(rename = "$text", default)]
    pub path: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FilelistsDocument {
    #[serde(rename = "package", default)]
    pub packages: Vec<FilelistsPackage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FilelistsPackage {
    #[serde(rename = "@name", default)]
    pub name: Option<String>,
    #[serde(rename = "@arch", default)]
    pub arch: Option<String>,
    #[serde(default)]
    pub version: Option<VersionElement>,
    #[serde(rename = "file", default)]
    pub files: Vec<FileElement>,
}

/// Parse a (decompressed) primary document into packages
///
/// `document` names the source in errors.
pub(crate) fn parse_primary<R: BufRead>(
    reader: R,
    document: &str,
    repository: &str,
) -> Result<Vec<Package>> {
    let doc: PrimaryDocument = quick_xml::de::from_reader(reader).map_err(|e| malformed(document, e))?;

    doc.packages
        .into_iter()
        .enumerate()
        .map(|(index, raw)| convert_package(raw, index, document, repository))
        .collect()
}

/// Parse a (decompressed) filelists document
///
/// Returns `(name, arch, version, files)` per package.
pub(crate) fn parse_filelists<R: BufRead>(
    reader: R,
    document: &str,
) -> Result<Vec<(String, String, RpmVersion, Vec<String>)>> {
    let doc: FilelistsDocument =
        quick_xml::de::from_reader(reader).map_err(|e| malformed(document, e))?;

    doc.packages
        .into_iter()
        .enumerate()
        .map(|(index, raw)| {
            let name = required(raw.name, document, index, "name")?;
            let arch = required(raw.arch, document, index, "arch")?;
            let version = convert_version(raw.version.as_ref(), document, &name)?;
            let files = raw.files.into_iter().map(|f| f.path.trim().to_string()).collect();
            Ok((name, arch, version, files))
        })
        .collect()
}

fn convert_package(
    raw: PrimaryPackage,
    index: usize,
    document: &str,
    repository: &str,
) -> Result<Package> {
    let name = required(raw.name, document, index, "name")?;
    let arch = required(raw.arch, document, index, "arch")?;
    let version = convert_version(raw.version.as_ref(), document, &name)?;

    let mut package = Package::new(name, arch, version);
    package.repository = repository.to_string();
    package.checksum = raw
        .checksum
        .filter(|c| !c.value.trim().is_empty())
        .map(|c| PackageChecksum {
            algorithm: c.algorithm,
            value: c.value.trim().to_string(),
        });
    package.summary = non_empty(raw.summary);
    package.description = non_empty(raw.description);
    package.url = non_empty(raw.url);
    package.location_href = raw.location.and_then(|l| non_empty(l.href));

    let format = raw.format;
    package.license = non_empty(format.license);
    package.vendor = non_empty(format.vendor);
    package.sourcerpm = non_empty(format.sourcerpm);

    let context = package.nevra();
    package.provides = convert_entries(format.provides, document, &context)?;
    package.requires = convert_entries(format.requires, document, &context)?;
    package.conflicts = convert_entries(format.conflicts, document, &context)?;
    package.obsoletes = convert_entries(format.obsoletes, document, &context)?;
    package.recommends = convert_entries(format.recommends, document, &context)?;
    package.suggests = convert_entries(format.suggests, document, &context)?;
    package.enhances = convert_entries(format.enhances, document, &context)?;
    package.supplements = convert_entries(format.supplements, document, &context)?;

    // Files listed in primary are the commonly required ones (/usr/bin/*, /etc/*)
    for file in format.files {
        let path = file.path.trim();
        if !path.is_empty() {
            package.provides.push(Capability::unversioned(path));
        }
    }

    package.ensure_self_provide();
    Ok(package)
}

fn convert_version(
    raw: Option<&VersionElement>,
    document: &str,
    package: &str,
) -> Result<RpmVersion> {
    let raw = raw.ok_or_else(|| Error::MalformedMetadata {
        document: document.to_string(),
        reason: format!("package {} has no <version>", package),
    })?;
    let ver = raw.ver.as_deref().unwrap_or("");
    RpmVersion::from_parts(raw.epoch.as_deref(), ver, raw.rel.as_deref()).map_err(|e| {
        Error::MalformedMetadata {
            document: document.to_string(),
            reason: format!("package {}: {}", package, e),
        }
    })
}

fn convert_entries(list: EntryList, document: &str, package: &str) -> Result<Vec<Capability>> {
    list.entries
        .into_iter()
        .map(|entry| convert_entry(entry, document, package))
        .collect()
}

fn convert_entry(entry: Entry, document: &str, package: &str) -> Result<Capability> {
    let malformed_entry = |reason: String| Error::MalformedMetadata {
        document: document.to_string(),
        reason: format!("package {}: {}", package, reason),
    };

    let name = entry
        .name
        .filter(|n| !n.trim().is_empty())
        .ok_or_else(|| malformed_entry("dependency entry without a name".to_string()))?;

    let (Some(flags), Some(ver)) = (entry.flags.as_deref(), entry.ver.as_deref()) else {
        return Ok(Capability::unversioned(name));
    };

    let flag = DepFlag::from_repodata(flags).map_err(|e| malformed_entry(e.to_string()))?;
    let version = RpmVersion::from_parts(entry.epoch.as_deref(), ver, entry.rel.as_deref())
        .map_err(|e| malformed_entry(format!("{}: {}", name, e)))?;

    Ok(Capability::versioned(name, flag, version))
}

fn required(value: Option<String>, document: &str, index: usize, field: &str) -> Result<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| Error::MalformedMetadata {
            document: document.to_string(),
            reason: format!("package #{} has no {}", index + 1, field),
        })
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn malformed(document: &str, err: quick_xml::DeError) -> Error {
    Error::MalformedMetadata {
        document: document.to_string(),
        reason: err.to_string(),
    }
}
