//! Manifest retrieval outside the catalog client
//!
//! Some accounts are paired with a device that hands out manifest URLs for
//! protected high-resolution streams. [`DeviceManifestLocator`] asks that device;
//! [`HttpManifestFetcher`] downloads the playlist the URL points at.

use super::ManifestDocument;
use crate::error::{Error, Result};
use crate::types::Account;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use url::Url;

/// Timeout for one manifest download
const MANIFEST_FETCH_TIMEOUT_SECS: u64 = 30;

/// Downloads a manifest document from a URL
#[async_trait::async_trait]
pub trait ManifestFetcher: Send + Sync {
    /// Fetch the document at `url`
    async fn fetch(&self, url: &Url) -> Result<ManifestDocument>;
}

/// Production [`ManifestFetcher`] backed by reqwest
#[derive(Clone, Debug)]
pub struct HttpManifestFetcher {
    client: reqwest::Client,
}

impl HttpManifestFetcher {
    /// Create a fetcher with the default timeout
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(MANIFEST_FETCH_TIMEOUT_SECS))
            .build()
            .map_err(|e| Error::Other(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Wrap an existing client (shared connection pool, custom TLS, ...)
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait::async_trait]
impl ManifestFetcher for HttpManifestFetcher {
    async fn fetch(&self, url: &Url) -> Result<ManifestDocument> {
        let response = self.client.get(url.clone()).send().await.map_err(|e| {
            if e.is_timeout() {
                Error::FetchFailure(format!("timeout fetching manifest {url}"))
            } else {
                Error::Network(e)
            }
        })?;

        if !response.status().is_success() {
            return Err(Error::FetchFailure(format!(
                "HTTP {} fetching manifest {}",
                response.status(),
                url
            )));
        }

        // Redirects change the base relative URIs resolve against
        let final_url = response.url().clone();
        let body = response.text().await?;
        tracing::debug!(url = %final_url, bytes = body.len(), "Fetched manifest");
        Ok(ManifestDocument::new(final_url, body))
    }
}

/// Looks up a manifest URL for an item out of band
#[async_trait::async_trait]
pub trait ManifestLocator: Send + Sync {
    /// Manifest URL for `item_id`, or `None` if the source has nothing for it
    async fn locate(&self, item_id: &str, account: &Account) -> Result<Option<Url>>;
}

/// [`ManifestLocator`] that queries the account's device endpoint over TCP
///
/// Request: one length byte followed by the item id. Response: one line holding
/// the manifest URL, empty when the device has none.
#[derive(Clone, Debug)]
pub struct DeviceManifestLocator {
    timeout: Duration,
}

impl DeviceManifestLocator {
    /// Create a locator giving up after `timeout`
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    async fn query(endpoint: &str, item_id: &str) -> Result<Option<Url>> {
        let id = item_id.as_bytes();
        let len = u8::try_from(id.len()).map_err(|_| {
            Error::FetchFailure(format!("item id too long for device request: {item_id}"))
        })?;

        let mut stream = TcpStream::connect(endpoint).await?;
        stream.write_all(&[len]).await?;
        stream.write_all(id).await?;
        stream.flush().await?;

        let mut reader = BufReader::new(stream);
        let mut line = String::new();
        reader.read_line(&mut line).await?;

        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        Url::parse(line)
            .map(Some)
            .map_err(|e| Error::FetchFailure(format!("device returned invalid URL {line}: {e}")))
    }
}

#[async_trait::async_trait]
impl ManifestLocator for DeviceManifestLocator {
    async fn locate(&self, item_id: &str, account: &Account) -> Result<Option<Url>> {
        let Some(endpoint) = account.device_endpoint.as_deref() else {
            return Ok(None);
        };

        match tokio::time::timeout(self.timeout, Self::query(endpoint, item_id)).await {
            Ok(result) => {
                if let Ok(Some(url)) = &result {
                    tracing::debug!(item_id, endpoint, url = %url, "Device returned manifest");
                }
                result
            }
            Err(_) => Err(Error::FetchFailure(format!(
                "device endpoint {endpoint} timed out after {:?}",
                self.timeout
            ))),
        }
    }
}
