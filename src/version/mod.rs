// src/version/mod.rs

//! RPM version handling
//!
//! Parsing and ordering of `[epoch:]version[-release]` strings, the
//! comparison flags used by dependency entries, and the range overlap test
//! used to decide whether a provide satisfies a requirement.
//!
//! # Ordering
//!
//! Versions order by epoch, then version, then release. An absent epoch is
//! epoch 0, so `1.0` and `0:1.0` are equal and `1:1.0` beats both.
//! Version and release strings are compared with [`rpmvercmp`]:
//!
//! - Runs of digits and runs of letters form segments; every other
//!   character only separates segments.
//! - Digit segments compare numerically (`2.10 > 2.9`, leading zeros
//!   ignored); letter segments compare bytewise (`2.0a < 2.0b`).
//! - A digit segment is newer than a letter segment (`1.0 > 1.a`).
//! - `~` sorts before anything, even the end of the string
//!   (`1.0~rc1 < 1.0`).
//! - `^` sorts after the end of the string but before any further
//!   segment (`1.0 < 1.0^git1 < 1.0.1`).
//! - Otherwise the string with segments left over is newer (`1.0.1 > 1.0`).

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// Compare two version or release strings using RPM's segment rules
pub fn rpmvercmp(a: &str, b: &str) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }

    let mut one = a.as_bytes();
    let mut two = b.as_bytes();

    loop {
        one = skip_separators(one);
        two = skip_separators(two);

        // Tilde sorts before everything
        let t1 = one.first() == Some(&b'~');
        let t2 = two.first() == Some(&b'~');
        if t1 || t2 {
            if !t1 {
                return Ordering::Greater;
            }
            if !t2 {
                return Ordering::Less;
            }
            one = &one[1..];
            two = &two[1..];
            continue;
        }

        // Caret sorts after end of string but before any other segment
        let c1 = one.first() == Some(&b'^');
        let c2 = two.first() == Some(&b'^');
        if c1 || c2 {
            if one.is_empty() {
                return Ordering::Less;
            }
            if two.is_empty() {
                return Ordering::Greater;
            }
            if !c1 {
                return Ordering::Greater;
            }
            if !c2 {
                return Ordering::Less;
            }
            one = &one[1..];
            two = &two[1..];
            continue;
        }

        if one.is_empty() || two.is_empty() {
            break;
        }

        let numeric = one[0].is_ascii_digit();
        let (seg1, rest1) = take_segment(one, numeric);
        let (seg2, rest2) = take_segment(two, numeric);
        one = rest1;
        two = rest2;

        // Segment types differ: numeric is newer
        if seg2.is_empty() {
            return if numeric {
                Ordering::Greater
            } else {
                Ordering::Less
            };
        }

        let ord = if numeric {
            let n1 = trim_leading_zeros(seg1);
            let n2 = trim_leading_zeros(seg2);
            n1.len().cmp(&n2.len()).then_with(|| n1.cmp(n2))
        } else {
            seg1.cmp(seg2)
        };
        if ord != Ordering::Equal {
            return ord;
        }
    }

    match (one.is_empty(), two.is_empty()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        _ => Ordering::Greater,
    }
}

fn skip_separators(s: &[u8]) -> &[u8] {
    let start = s
        .iter()
        .position(|&c| c.is_ascii_alphanumeric() || c == b'~' || c == b'^')
        .unwrap_or(s.len());
    &s[start..]
}

fn take_segment(s: &[u8], numeric: bool) -> (&[u8], &[u8]) {
    let end = s
        .iter()
        .position(|c| {
            if numeric {
                !c.is_ascii_digit()
            } else {
                !c.is_ascii_alphabetic()
            }
        })
        .unwrap_or(s.len());
    s.split_at(end)
}

fn trim_leading_zeros(s: &[u8]) -> &[u8] {
    let start = s.iter().position(|&c| c != b'0').unwrap_or(s.len());
    &s[start..]
}

/// One comparable unit of a version string, as [`rpmvercmp`] sees it
#[derive(Debug, PartialEq, Eq, Hash)]
enum Segment<'a> {
    Tilde,
    Caret,
    Numeric(&'a [u8]),
    Alpha(&'a [u8]),
}

/// Split a string into the segments that [`rpmvercmp`] compares
///
/// Two strings compare equal exactly when their segment lists are equal.
fn segments(s: &str) -> Vec<Segment<'_>> {
    let mut rest = s.as_bytes();
    let mut out = Vec::new();
    loop {
        rest = skip_separators(rest);
        let Some(&first) = rest.first() else {
            return out;
        };
        match first {
            b'~' => {
                out.push(Segment::Tilde);
                rest = &rest[1..];
            }
            b'^' => {
                out.push(Segment::Caret);
                rest = &rest[1..];
            }
            c => {
                let numeric = c.is_ascii_digit();
                let (seg, tail) = take_segment(rest, numeric);
                out.push(if numeric {
                    Segment::Numeric(trim_leading_zeros(seg))
                } else {
                    Segment::Alpha(seg)
                });
                rest = tail;
            }
        }
    }
}

/// A parsed RPM version with epoch, version, and release components
///
/// Equality and hashing follow the ordering, so `1.0-1` and `1.00-1` are
/// the same version even though they print differently.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpmVersion {
    pub epoch: u64,
    pub version: String,
    pub release: Option<String>,
}

impl RpmVersion {
    pub fn new(epoch: u64, version: impl Into<String>, release: Option<String>) -> Self {
        Self {
            epoch,
            version: version.into(),
            release,
        }
    }

    /// Build from the separate attributes used in repodata XML
    ///
    /// Missing or empty epoch means 0; an empty release means none.
    pub fn from_parts(epoch: Option<&str>, version: &str, release: Option<&str>) -> Result<Self> {
        let epoch = match epoch.map(str::trim) {
            None | Some("") => 0,
            Some(e) => e
                .parse::<u64>()
                .map_err(|err| Error::Parse(format!("invalid epoch '{}': {}", e, err)))?,
        };
        if version.is_empty() {
            return Err(Error::Parse("empty version".to_string()));
        }
        Ok(Self {
            epoch,
            version: version.to_string(),
            release: release.filter(|r| !r.is_empty()).map(str::to_string),
        })
    }

    /// Parse an RPM version string
    ///
    /// Format: [epoch:]version[-release]
    /// Examples:
    /// - "1.2.3" → epoch=0, version="1.2.3", release=None
    /// - "2:1.2.3" → epoch=2, version="1.2.3", release=None
    /// - "1:2.3.4-5.el8" → epoch=1, version="2.3.4", release=Some("5.el8")
    pub fn parse(s: &str) -> Result<Self> {
        let s = s.trim();
        let (epoch, rest) = match s.split_once(':') {
            Some((e, r)) => (Some(e), r),
            None => (None, s),
        };

        // The release is everything after the last dash
        let (version, release) = match rest.rsplit_once('-') {
            Some((v, r)) => (v, Some(r)),
            None => (rest, None),
        };

        Self::from_parts(epoch, version, release)
            .map_err(|e| Error::Parse(format!("invalid version '{}': {}", s, e)))
    }

    /// Compare version and release, ignoring the release when either side lacks one
    ///
    /// This is the comparison used for dependency matching: `>= 1.5`
    /// accepts `1.5-3` because the requirement does not name a release.
    pub fn compare_for_match(&self, other: &RpmVersion) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| rpmvercmp(&self.version, &other.version))
            .then_with(|| match (&self.release, &other.release) {
                (Some(a), Some(b)) => rpmvercmp(a, b),
                _ => Ordering::Equal,
            })
    }
}

impl fmt::Display for RpmVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.epoch > 0 {
            write!(f, "{}:", self.epoch)?;
        }
        write!(f, "{}", self.version)?;
        if let Some(ref release) = self.release {
            write!(f, "-{}", release)?;
        }
        Ok(())
    }
}

impl FromStr for RpmVersion {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl Ord for RpmVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        self.epoch
            .cmp(&other.epoch)
            .then_with(|| rpmvercmp(&self.version, &other.version))
            .then_with(|| {
                rpmvercmp(
                    self.release.as_deref().unwrap_or(""),
                    other.release.as_deref().unwrap_or(""),
                )
            })
    }
}

impl PartialOrd for RpmVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for RpmVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for RpmVersion {}

impl Hash for RpmVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.epoch.hash(state);
        segments(&self.version).hash(state);
        segments(self.release.as_deref().unwrap_or("")).hash(state);
    }
}

/// Comparison flag of a dependency entry (`flags="GE"` in repodata)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum DepFlag {
    #[serde(rename = "EQ")]
    Eq,
    #[serde(rename = "LT")]
    Lt,
    #[serde(rename = "LE")]
    Le,
    #[serde(rename = "GT")]
    Gt,
    #[serde(rename = "GE")]
    Ge,
}

impl DepFlag {
    pub fn from_repodata(s: &str) -> Result<Self> {
        match s {
            "EQ" => Ok(Self::Eq),
            "LT" => Ok(Self::Lt),
            "LE" => Ok(Self::Le),
            "GT" => Ok(Self::Gt),
            "GE" => Ok(Self::Ge),
            other => Err(Error::Parse(format!("unknown dependency flag '{}'", other))),
        }
    }

    /// Parse the operator spelling used in rich dependencies and spec files
    pub fn from_operator(s: &str) -> Option<Self> {
        match s {
            "=" | "==" => Some(Self::Eq),
            "<" => Some(Self::Lt),
            "<=" | "=<" => Some(Self::Le),
            ">" => Some(Self::Gt),
            ">=" | "=>" => Some(Self::Ge),
            _ => None,
        }
    }

    fn less(self) -> bool {
        matches!(self, Self::Lt | Self::Le)
    }

    fn greater(self) -> bool {
        matches!(self, Self::Gt | Self::Ge)
    }

    fn equal(self) -> bool {
        matches!(self, Self::Eq | Self::Le | Self::Ge)
    }

    pub fn operator(self) -> &'static str {
        match self {
            Self::Eq => "=",
            Self::Lt => "<",
            Self::Le => "<=",
            Self::Gt => ">",
            Self::Ge => ">=",
        }
    }
}

impl fmt::Display for DepFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.operator())
    }
}

/// Check whether two versioned ranges overlap
///
/// `None` on either side means "any version". This is RPM's rule for
/// matching a provide against a requirement, a conflict or an obsolete.
pub fn ranges_overlap(
    a: Option<(DepFlag, &RpmVersion)>,
    b: Option<(DepFlag, &RpmVersion)>,
) -> bool {
    let (Some((af, av)), Some((bf, bv))) = (a, b) else {
        return true;
    };

    match av.compare_for_match(bv) {
        Ordering::Less => af.greater() || bf.less(),
        Ordering::Greater => af.less() || bf.greater(),
        Ordering::Equal => {
            (af.equal() && bf.equal()) || (af.less() && bf.less()) || (af.greater() && bf.greater())
        }
    }
}
