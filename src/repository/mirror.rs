// src/repository/mirror.rs

//! Mirror selection from metalink documents
//!
//! Turns the `repomd.xml` entry of a metalink into the ordered list of
//! candidate index URLs. Only https mirrors are eligible; document order is
//! kept since mirror managers already list the preferred mirrors first.

use super::metadata::Metalink;
use crate::error::{Error, Result};
use tracing::debug;
use url::Url;

/// Extract the ordered https candidate URLs for `repomd.xml`
///
/// `source` names the metalink in errors. Performs no network I/O.
pub fn resolve_mirrors(metalink: &Metalink, source: &str) -> Result<Vec<String>> {
    let file = metalink
        .repomd_file()
        .ok_or_else(|| Error::MalformedMetadata {
            document: "metalink".to_string(),
            reason: "no <file name=\"repomd.xml\"> entry".to_string(),
        })?;

    let mut mirrors = Vec::new();
    for candidate in &file.resources.urls {
        let url = candidate.url.trim();
        if is_secure(candidate.protocol.as_deref(), url) {
            mirrors.push(url.to_string());
        } else {
            debug!("Skipping insecure mirror {}", url);
        }
    }

    if mirrors.is_empty() {
        return Err(Error::NoSecureMirror {
            metalink: source.to_string(),
        });
    }

    Ok(mirrors)
}

/// Both the declared protocol (when present) and the URL scheme must be https
fn is_secure(protocol: Option<&str>, url: &str) -> bool {
    if protocol.is_some_and(|p| !p.eq_ignore_ascii_case("https")) {
        return false;
    }
    Url::parse(url).is_ok_and(|u| u.scheme() == "https")
}

/// Index URL for a repository configured with a direct base URL
pub fn index_url_from_baseurl(baseurl: &str) -> String {
    format!("{}/repodata/repomd.xml", baseurl.trim_end_matches('/'))
}

/// Base of the pinned mirror, derived from the index URL that succeeded
///
/// `https://m/fedora/repodata/repomd.xml` gives `https://m/fedora/`, which
/// typed file hrefs (`repodata/...-primary.xml.gz`) are joined to.
pub fn mirror_base(index_url: &str) -> Result<Url> {
    let url = Url::parse(index_url).map_err(|e| Error::Download {
        url: index_url.to_string(),
        reason: format!("invalid URL: {}", e),
    })?;

    let mut base = url.join("./").map_err(|e| Error::Download {
        url: index_url.to_string(),
        reason: format!("cannot derive mirror base: {}", e),
    })?;

    if base.path().trim_end_matches('/').ends_with("/repodata") {
        base = base.join("../").map_err(|e| Error::Download {
            url: index_url.to_string(),
            reason: format!("cannot derive mirror base: {}", e),
        })?;
    }
    base.set_query(None);
    base.set_fragment(None);

    Ok(base)
}

/// Resolve a typed file href against the pinned mirror
///
/// Absolute hrefs are used as-is.
pub fn resolve_href(base: &Url, href: &str) -> Result<String> {
    base.join(href.trim())
        .map(String::from)
        .map_err(|e| Error::MalformedMetadata {
            document: "repomd.xml".to_string(),
            reason: format!("invalid location href '{}': {}", href, e),
        })
}
