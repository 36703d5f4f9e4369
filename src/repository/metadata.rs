// src/repository/metadata.rs

//! Repository index and metalink documents
//!
//! Serde models for `repomd.xml` and the metalink mirror list. Only the
//! fields the fetcher needs are modelled; anything else in the documents is
//! ignored.

use crate::error::{Error, Result};
use crate::hash::{Hash, HashAlgorithm, HashError};
use serde::Deserialize;

/// Parsed `repomd.xml`
#[derive(Debug, Clone, Deserialize)]
pub struct Repomd {
    #[serde(default)]
    pub revision: Option<String>,
    #[serde(rename = "data", default)]
    pub data: Vec<RepomdData>,
}

/// One `<data type="...">` entry of the repository index
#[derive(Debug, Clone, Deserialize)]
pub struct RepomdData {
    #[serde(rename = "@type")]
    pub kind: String,
    #[serde(default)]
    pub checksum: Option<ChecksumElement>,
    #[serde(rename = "open-checksum", default)]
    pub open_checksum: Option<ChecksumElement>,
    #[serde(default)]
    pub location: Option<Location>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub size: Option<u64>,
    #[serde(rename = "open-size", default)]
    pub open_size: Option<u64>,
}

/// `<checksum type="sha256">digest</checksum>`
#[derive(Debug, Clone, Deserialize)]
pub struct ChecksumElement {
    #[serde(rename = "@type")]
    pub algorithm: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

/// `<location href="repodata/...-primary.xml.gz"/>`
#[derive(Debug, Clone, Deserialize)]
pub struct Location {
    #[serde(rename = "@href", default)]
    pub href: Option<String>,
}

impl Repomd {
    pub fn parse(xml: &str) -> Result<Self> {
        quick_xml::de::from_str(xml).map_err(|e| Error::MalformedMetadata {
            document: "repomd.xml".to_string(),
            reason: e.to_string(),
        })
    }

    /// Look up the entry for a metadata type such as `primary`
    pub fn data(&self, kind: &str) -> Option<&RepomdData> {
        self.data.iter().find(|d| d.kind == kind)
    }

    /// Entry for a metadata type, or a `MalformedMetadata` error if absent
    pub fn require(&self, kind: &str) -> Result<&RepomdData> {
        self.data(kind).ok_or_else(|| Error::MalformedMetadata {
            document: "repomd.xml".to_string(),
            reason: format!("no <data type=\"{}\"> entry", kind),
        })
    }
}

impl RepomdData {
    /// Location href of this file, relative to the repository root
    pub fn href(&self) -> Result<&str> {
        self.location
            .as_ref()
            .and_then(|l| l.href.as_deref())
            .filter(|h| !h.trim().is_empty())
            .ok_or_else(|| Error::MalformedMetadata {
                document: "repomd.xml".to_string(),
                reason: format!("{} entry has no location href", self.kind),
            })
    }

    /// The checksum of the compressed file as a verifiable digest
    pub fn checksum(&self) -> Result<Hash> {
        let element = self.checksum.as_ref().ok_or_else(|| Error::MalformedMetadata {
            document: "repomd.xml".to_string(),
            reason: format!("{} entry has no checksum", self.kind),
        })?;
        element.to_hash(&format!("{} checksum", self.kind))
    }
}

impl ChecksumElement {
    fn to_hash(&self, what: &str) -> Result<Hash> {
        Hash::from_metadata(&self.algorithm, &self.value).map_err(|e| match e {
            HashError::UnknownAlgorithm(name) => Error::UnknownChecksumAlgorithm(name),
            other => Error::MalformedMetadata {
                document: "repomd.xml".to_string(),
                reason: format!("{}: {}", what, other),
            },
        })
    }
}

/// Parsed metalink document
#[derive(Debug, Clone, Deserialize)]
pub struct Metalink {
    #[serde(default)]
    pub files: MetalinkFiles,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MetalinkFiles {
    #[serde(rename = "file", default)]
    pub files: Vec<MetalinkFile>,
}

/// A `<file name="...">` entry with its hashes and mirror URLs
#[derive(Debug, Clone, Deserialize)]
pub struct MetalinkFile {
    #[serde(rename = "@name")]
    pub name: String,
    #[serde(default)]
    pub verification: Verification,
    #[serde(default)]
    pub resources: Resources,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Verification {
    #[serde(rename = "hash", default)]
    pub hashes: Vec<MetalinkHash>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetalinkHash {
    #[serde(rename = "@type")]
    pub algorithm: String,
    #[serde(rename = "$text", default)]
    pub value: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Resources {
    #[serde(rename = "url", default)]
    pub urls: Vec<MirrorUrl>,
}

/// A candidate mirror URL for a file
#[derive(Debug, Clone, Deserialize)]
pub struct MirrorUrl {
    #[serde(rename = "@protocol", default)]
    pub protocol: Option<String>,
    #[serde(rename = "@type", default)]
    pub kind: Option<String>,
    #[serde(rename = "@location", default)]
    pub location: Option<String>,
    #[serde(rename = "@preference", default)]
    pub preference: Option<u32>,
    #[serde(rename = "$text", default)]
    pub url: String,
}

/// Hash algorithms accepted for the index cross-check, strongest first
const METALINK_HASH_PREFERENCE: [HashAlgorithm; 4] = [
    HashAlgorithm::Sha512,
    HashAlgorithm::Sha384,
    HashAlgorithm::Sha256,
    HashAlgorithm::Sha224,
];

impl Metalink {
    pub fn parse(xml: &str) -> Result<Self> {
        quick_xml::de::from_str(xml).map_err(|e| Error::MalformedMetadata {
            document: "metalink".to_string(),
            reason: e.to_string(),
        })
    }

    /// The entry describing `repomd.xml`
    pub fn repomd_file(&self) -> Option<&MetalinkFile> {
        self.files.files.iter().find(|f| f.name == "repomd.xml")
    }
}

impl MetalinkFile {
    /// Strongest supported hash listed for this file
    ///
    /// Returns `None` when no supported hash is present; weaker or unknown
    /// algorithms (md5, sha1) are never used for the cross-check.
    pub fn expected_checksum(&self) -> Result<Option<Hash>> {
        for algorithm in METALINK_HASH_PREFERENCE {
            let listed = self
                .verification
                .hashes
                .iter()
                .find(|h| h.algorithm.parse::<HashAlgorithm>().ok() == Some(algorithm));
            if let Some(hash) = listed {
                let digest = Hash::new(algorithm, hash.value.as_str()).map_err(|e| {
                    Error::MalformedMetadata {
                        document: "metalink".to_string(),
                        reason: format!("repomd.xml {} hash: {}", algorithm, e),
                    }
                })?;
                return Ok(Some(digest));
            }
        }
        Ok(None)
    }
}
