//! reqwest-backed [`Fetcher`] implementation.
//!
//! `HttpClient` is created once per run and cloned into every task, so all
//! fetches share one connection pool.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, Proxy, StatusCode};
use tracing::{debug, instrument};
use url::Url;

use super::constants::{BROWSER_USER_AGENT, CONNECT_TIMEOUT_SECS};
use super::error::DownloadError;
use super::fetcher::{FetchedBody, Fetcher, ResponseKind};

/// HTTP client for result pages and image payloads.
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use image_harvester::download::{Fetcher, HttpClient};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let client = HttpClient::new();
/// let bytes = client
///     .fetch_bytes("https://example.com/a.png", Duration::from_secs(10))
///     .await?;
/// println!("fetched {} bytes", bytes.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self::new()
    }
}

impl HttpClient {
    /// Creates a client with the default connect timeout and no proxy.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client builder fails with the static
    /// configuration. This should never happen in practice.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn new() -> Self {
        let client = base_client_builder()
            .build()
            .expect("failed to build HTTP client with static configuration");
        Self { client }
    }

    /// Creates a client that routes every request through `proxy`
    /// (`host:port` or a full proxy URL).
    ///
    /// # Errors
    ///
    /// Returns the reqwest error if the proxy address cannot be parsed or
    /// the client cannot be built.
    #[instrument(level = "debug")]
    pub fn with_proxy(proxy: &str) -> Result<Self, reqwest::Error> {
        let proxy_url = if proxy.contains("://") {
            proxy.to_string()
        } else {
            format!("http://{proxy}")
        };
        let client = base_client_builder()
            .proxy(Proxy::all(&proxy_url)?)
            .build()?;
        Ok(Self { client })
    }

    /// Returns a reference to the underlying reqwest client.
    #[must_use]
    pub fn inner(&self) -> &Client {
        &self.client
    }

    async fn send_request(
        &self,
        url: &str,
        timeout: Duration,
    ) -> Result<reqwest::Response, DownloadError> {
        Url::parse(url).map_err(|_| DownloadError::invalid_url(url))?;

        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;

        // Only 200 counts as a usable body; redirects are already followed.
        if response.status() != StatusCode::OK {
            return Err(DownloadError::http_status(url, response.status().as_u16()));
        }

        Ok(response)
    }
}

#[async_trait]
impl Fetcher for HttpClient {
    #[instrument(skip(self), fields(url = %url))]
    async fn fetch(
        &self,
        url: &str,
        kind: ResponseKind,
        timeout: Duration,
    ) -> Result<FetchedBody, DownloadError> {
        debug!("starting fetch");
        let response = self.send_request(url, timeout).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_reqwest_error(url, e))?;
        debug!(bytes = bytes.len(), "fetch complete");

        match kind {
            ResponseKind::Bytes => Ok(FetchedBody::Bytes(bytes.to_vec())),
            ResponseKind::Text => Ok(FetchedBody::Text(
                String::from_utf8_lossy(&bytes).into_owned(),
            )),
        }
    }
}

fn map_reqwest_error(url: &str, error: reqwest::Error) -> DownloadError {
    if error.is_timeout() {
        DownloadError::timeout(url)
    } else {
        DownloadError::network(url, error)
    }
}

fn base_client_builder() -> ClientBuilder {
    Client::builder()
        .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
        .gzip(true)
        .user_agent(BROWSER_USER_AGENT)
}
