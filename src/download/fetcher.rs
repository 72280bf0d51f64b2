//! The network collaborator seam.
//!
//! The pipeline never talks to reqwest directly; it goes through [`Fetcher`]
//! so tests can substitute canned pages and failures.

use std::time::Duration;

use async_trait::async_trait;

use super::DownloadError;

/// Whether the caller wants the raw body or decoded text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// Raw bytes (image payloads).
    Bytes,
    /// UTF-8 text (result markup).
    Text,
}

/// A successfully fetched response body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchedBody {
    /// Body requested with [`ResponseKind::Bytes`].
    Bytes(Vec<u8>),
    /// Body requested with [`ResponseKind::Text`].
    Text(String),
}

impl FetchedBody {
    /// Returns the body as bytes regardless of how it was fetched.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            Self::Bytes(bytes) => bytes,
            Self::Text(text) => text.into_bytes(),
        }
    }

    /// Returns the body as text, decoding bytes lossily.
    #[must_use]
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) => text,
            Self::Bytes(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        }
    }
}

/// Fetches one URL within a timeout budget.
///
/// Implementations must map any status other than 200 to
/// [`DownloadError::HttpStatus`] and an exceeded budget to
/// [`DownloadError::Timeout`].
#[async_trait]
pub trait Fetcher: Send + Sync {
    /// Fetches `url` and returns its body in the requested form.
    async fn fetch(
        &self,
        url: &str,
        kind: ResponseKind,
        timeout: Duration,
    ) -> Result<FetchedBody, DownloadError>;

    /// Convenience wrapper for text fetches.
    async fn fetch_text(&self, url: &str, timeout: Duration) -> Result<String, DownloadError> {
        Ok(self
            .fetch(url, ResponseKind::Text, timeout)
            .await?
            .into_text())
    }

    /// Convenience wrapper for byte fetches.
    async fn fetch_bytes(&self, url: &str, timeout: Duration) -> Result<Vec<u8>, DownloadError> {
        Ok(self
            .fetch(url, ResponseKind::Bytes, timeout)
            .await?
            .into_bytes())
    }
}
