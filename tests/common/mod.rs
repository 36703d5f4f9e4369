// tests/common/mod.rs

//! Shared test utilities and helpers for integration tests.
//!
//! Nothing here touches the network: repositories are served from an
//! in-memory [`Transport`] that records every requested URL.

#![allow(dead_code)]

use flate2::write::GzEncoder;
use flate2::Compression;
use repoclosure::hash::{hash_bytes, HashAlgorithm};
use repoclosure::{Error, Result, Transport};
use std::collections::HashMap;
use std::io::{Cursor, Read, Write};
use std::sync::Mutex;

/// Canned response for one URL
#[derive(Clone)]
enum Response {
    Body(Vec<u8>),
    Failure(String),
}

/// In-memory transport; unknown URLs fail like a 404
#[derive(Default)]
pub struct MemoryTransport {
    responses: HashMap<String, Response>,
    requests: Mutex<Vec<String>>,
}

impl MemoryTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn serve(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.responses.insert(url.to_string(), Response::Body(body.into()));
        self
    }

    pub fn fail(mut self, url: &str, reason: &str) -> Self {
        self.responses
            .insert(url.to_string(), Response::Failure(reason.to_string()));
        self
    }

    /// Every URL requested so far, in order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    pub fn request_count(&self, url: &str) -> usize {
        self.requests().iter().filter(|u| *u == url).count()
    }
}

impl Transport for MemoryTransport {
    fn get(&self, url: &str) -> Result<Box<dyn Read + Send>> {
        self.requests.lock().unwrap().push(url.to_string());
        match self.responses.get(url) {
            Some(Response::Body(body)) => Ok(Box::new(Cursor::new(body.clone()))),
            Some(Response::Failure(reason)) => Err(Error::Download {
                url: url.to_string(),
                reason: reason.clone(),
            }),
            None => Err(Error::Download {
                url: url.to_string(),
                reason: "HTTP 404 Not Found".to_string(),
            }),
        }
    }
}

pub fn sha256_hex(data: &[u8]) -> String {
    hash_bytes(HashAlgorithm::Sha256, data).value
}

pub fn gzip(data: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    encoder.finish().unwrap()
}

/// One `<rpm:entry>` as (name, flags, epoch, ver, rel)
#[derive(Debug, Clone, Default)]
pub struct EntryXml {
    pub name: String,
    pub flags: Option<&'static str>,
    pub epoch: Option<String>,
    pub ver: Option<String>,
    pub rel: Option<String>,
}

impl EntryXml {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    /// `flags` as in repodata (`EQ`, `GE`, ...), `evr` as `[e:]v[-r]`
    pub fn versioned(name: &str, flags: &'static str, evr: &str) -> Self {
        let (epoch, rest) = match evr.split_once(':') {
            Some((e, rest)) => (Some(e.to_string()), rest),
            None => (None, evr),
        };
        let (ver, rel) = match rest.rsplit_once('-') {
            Some((v, r)) => (v.to_string(), Some(r.to_string())),
            None => (rest.to_string(), None),
        };
        Self {
            name: name.to_string(),
            flags: Some(flags),
            epoch,
            ver: Some(ver),
            rel,
        }
    }

    fn to_xml(&self) -> String {
        let mut xml = format!(r#"<rpm:entry name="{}""#, escape(&self.name));
        if let Some(flags) = self.flags {
            xml.push_str(&format!(r#" flags="{}""#, flags));
        }
        if let Some(epoch) = &self.epoch {
            xml.push_str(&format!(r#" epoch="{}""#, epoch));
        }
        if let Some(ver) = &self.ver {
            xml.push_str(&format!(r#" ver="{}""#, ver));
        }
        if let Some(rel) = &self.rel {
            xml.push_str(&format!(r#" rel="{}""#, rel));
        }
        xml.push_str("/>");
        xml
    }
}

fn escape(value: &str) -> String {
    value
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

/// Builder for one package in a primary document
#[derive(Debug, Clone)]
pub struct PackageXml {
    pub name: String,
    pub arch: String,
    pub epoch: String,
    pub ver: String,
    pub rel: String,
    pub provides: Vec<EntryXml>,
    pub requires: Vec<EntryXml>,
    pub conflicts: Vec<EntryXml>,
    pub obsoletes: Vec<EntryXml>,
    pub files: Vec<String>,
}

impl PackageXml {
    /// `evr` as `[e:]v-r`
    pub fn new(name: &str, arch: &str, evr: &str) -> Self {
        let (epoch, rest) = evr.split_once(':').unwrap_or(("0", evr));
        let (ver, rel) = rest.rsplit_once('-').unwrap_or((rest, "1"));
        Self {
            name: name.to_string(),
            arch: arch.to_string(),
            epoch: epoch.to_string(),
            ver: ver.to_string(),
            rel: rel.to_string(),
            provides: Vec::new(),
            requires: Vec::new(),
            conflicts: Vec::new(),
            obsoletes: Vec::new(),
            files: Vec::new(),
        }
    }

    pub fn provides(mut self, entry: EntryXml) -> Self {
        self.provides.push(entry);
        self
    }

    pub fn requires(mut self, entry: EntryXml) -> Self {
        self.requires.push(entry);
        self
    }

    pub fn conflicts(mut self, entry: EntryXml) -> Self {
        self.conflicts.push(entry);
        self
    }

    pub fn obsoletes(mut self, entry: EntryXml) -> Self {
        self.obsoletes.push(entry);
        self
    }

    pub fn file(mut self, path: &str) -> Self {
        self.files.push(path.to_string());
        self
    }

    fn to_xml(&self) -> String {
        let mut xml = String::new();
        xml.push_str("<package type=\"rpm\">\n");
        xml.push_str(&format!("  <name>{}</name>\n", escape(&self.name)));
        xml.push_str(&format!("  <arch>{}</arch>\n", self.arch));
        xml.push_str(&format!(
            "  <version epoch=\"{}\" ver=\"{}\" rel=\"{}\"/>\n",
            self.epoch, self.ver, self.rel
        ));
        xml.push_str(&format!(
            "  <checksum type=\"sha256\" pkgid=\"YES\">{}</checksum>\n",
            sha256_hex(self.nevra().as_bytes())
        ));
        xml.push_str(&format!("  <summary>{} package</summary>\n", escape(&self.name)));
        xml.push_str(&format!(
            "  <location href=\"Packages/{}.rpm\"/>\n",
            escape(&self.nevra())
        ));
        xml.push_str("  <format>\n");
        xml.push_str("    <rpm:license>MIT</rpm:license>\n");
        for (tag, entries) in [
            ("provides", &self.provides),
            ("requires", &self.requires),
            ("conflicts", &self.conflicts),
            ("obsoletes", &self.obsoletes),
        ] {
            if entries.is_empty() {
                continue;
            }
            xml.push_str(&format!("    <rpm:{}>\n", tag));
            for entry in entries {
                xml.push_str(&format!("      {}\n", entry.to_xml()));
            }
            xml.push_str(&format!("    </rpm:{}>\n", tag));
        }
        for file in &self.files {
            xml.push_str(&format!("    <file>{}</file>\n", escape(file)));
        }
        xml.push_str("  </format>\n");
        xml.push_str("</package>\n");
        xml
    }

    pub fn nevra(&self) -> String {
        format!("{}-{}-{}.{}", self.name, self.ver, self.rel, self.arch)
    }
}

pub fn primary_xml(packages: &[PackageXml]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<metadata xmlns=\"http://linux.duke.edu/metadata/common\" xmlns:rpm=\"http://linux.duke.edu/metadata/rpm\" packages=\"{}\">\n",
        packages.len()
    );
    for package in packages {
        xml.push_str(&package.to_xml());
    }
    xml.push_str("</metadata>\n");
    xml
}

/// Filelists document from (name, arch, evr, files)
pub fn filelists_xml(packages: &[(&str, &str, &str, &[&str])]) -> String {
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<filelists xmlns=\"http://linux.duke.edu/metadata/filelists\" packages=\"{}\">\n",
        packages.len()
    );
    for (name, arch, evr, files) in packages {
        let (epoch, rest) = evr.split_once(':').unwrap_or(("0", evr));
        let (ver, rel) = rest.rsplit_once('-').unwrap_or((rest, "1"));
        xml.push_str(&format!(
            "<package pkgid=\"x\" name=\"{}\" arch=\"{}\">\n  <version epoch=\"{}\" ver=\"{}\" rel=\"{}\"/>\n",
            name, arch, epoch, ver, rel
        ));
        for file in *files {
            xml.push_str(&format!("  <file>{}</file>\n", escape(file)));
        }
        xml.push_str("</package>\n");
    }
    xml.push_str("</filelists>\n");
    xml
}

/// A typed file entry for a repomd document
pub struct RepomdEntry<'a> {
    pub kind: &'a str,
    pub href: &'a str,
    pub algorithm: &'a str,
    pub checksum: String,
}

impl<'a> RepomdEntry<'a> {
    /// Entry whose sha256 matches `body`
    pub fn for_body(kind: &'a str, href: &'a str, body: &[u8]) -> Self {
        Self {
            kind,
            href,
            algorithm: "sha256",
            checksum: sha256_hex(body),
        }
    }
}

pub fn repomd_xml(entries: &[RepomdEntry<'_>]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<repomd xmlns=\"http://linux.duke.edu/metadata/repo\" xmlns:rpm=\"http://linux.duke.edu/metadata/rpm\">\n  <revision>1718000000</revision>\n",
    );
    for entry in entries {
        xml.push_str(&format!(
            "  <data type=\"{}\">\n    <checksum type=\"{}\">{}</checksum>\n    <location href=\"{}\"/>\n    <timestamp>1718000000</timestamp>\n  </data>\n",
            entry.kind, entry.algorithm, entry.checksum, entry.href
        ));
    }
    xml.push_str("</repomd>\n");
    xml
}

/// Metalink for repomd.xml with an optional sha256 and (protocol, url) mirrors
pub fn metalink_xml(repomd_sha256: Option<&str>, mirrors: &[(&str, &str)]) -> String {
    let mut xml = String::from(
        "<?xml version=\"1.0\" encoding=\"utf-8\"?>\n<metalink version=\"3.0\" xmlns=\"http://www.metalinker.org/\" type=\"dynamic\">\n <files>\n  <file name=\"repomd.xml\">\n",
    );
    if let Some(digest) = repomd_sha256 {
        xml.push_str(&format!(
            "   <verification>\n    <hash type=\"sha256\">{}</hash>\n   </verification>\n",
            digest
        ));
    }
    xml.push_str("   <resources maxconnections=\"1\">\n");
    for (index, (protocol, url)) in mirrors.iter().enumerate() {
        xml.push_str(&format!(
            "    <url protocol=\"{}\" type=\"{}\" location=\"US\" preference=\"{}\">{}</url>\n",
            protocol,
            protocol,
            100 - index,
            url
        ));
    }
    xml.push_str("   </resources>\n  </file>\n </files>\n</metalink>\n");
    xml
}

/// A complete mirror: gzipped primary + filelists and the repomd indexing them
pub struct MirrorFixture {
    pub repomd: String,
    pub primary: Vec<u8>,
    pub filelists: Vec<u8>,
}

pub const PRIMARY_HREF: &str = "repodata/primary.xml.gz";
pub const FILELISTS_HREF: &str = "repodata/filelists.xml.gz";

impl MirrorFixture {
    pub fn new(packages: &[PackageXml]) -> Self {
        let primary = gzip(primary_xml(packages).as_bytes());
        let filelists = gzip(filelists_xml(&[]).as_bytes());
        let repomd = repomd_xml(&[
            RepomdEntry::for_body("primary", PRIMARY_HREF, &primary),
            RepomdEntry::for_body("filelists", FILELISTS_HREF, &filelists),
        ]);
        Self {
            repomd,
            primary,
            filelists,
        }
    }

    pub fn repomd_sha256(&self) -> String {
        sha256_hex(self.repomd.as_bytes())
    }

    /// Serve this mirror under `base` (with trailing slash)
    pub fn serve(&self, transport: MemoryTransport, base: &str) -> MemoryTransport {
        transport
            .serve(&format!("{}repodata/repomd.xml", base), self.repomd.clone())
            .serve(&format!("{}{}", base, PRIMARY_HREF), self.primary.clone())
            .serve(&format!("{}{}", base, FILELISTS_HREF), self.filelists.clone())
    }
}
