// src/repository/client.rs

//! HTTP client for repository operations
//!
//! The fetcher talks to the network through the [`Transport`] trait so the
//! mirror state machine can be driven by an in-memory transport in tests.
//! [`RepositoryClient`] is the production implementation on top of
//! reqwest's blocking client.

use crate::error::{Error, Result};
use reqwest::blocking::Client;
use std::io::Read;
use std::time::Duration;
use tracing::debug;

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout for establishing a connection to a mirror
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Source of response bodies
///
/// Implementations must return an error for anything but a successful
/// response; the body is streamed, never buffered whole.
pub trait Transport: Send + Sync {
    fn get(&self, url: &str) -> Result<Box<dyn Read + Send>>;
}

/// Blocking HTTP transport
///
/// Performs exactly one request per call. Retrying is the caller's
/// business (the fetcher moves on to the next mirror instead).
pub struct RepositoryClient {
    client: Client,
}

impl RepositoryClient {
    /// Create a new repository client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .connect_timeout(CONNECT_TIMEOUT)
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Download {
                url: String::new(),
                reason: format!("failed to create HTTP client: {e}"),
            })?;

        Ok(Self { client })
    }
}

impl Transport for RepositoryClient {
    fn get(&self, url: &str) -> Result<Box<dyn Read + Send>> {
        debug!("GET {}", url);
        let response = self.client.get(url).send().map_err(|e| Error::Download {
            url: url.to_string(),
            reason: e.to_string(),
        })?;

        if !response.status().is_success() {
            return Err(Error::Download {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        Ok(Box::new(response))
    }
}
