//! Multi-page result retrieval.
//!
//! A single result page holds at most [`PAGE_SIZE`](super::constants::PAGE_SIZE)
//! results; more need a scrolling browser session. That session lives behind
//! [`Paginator`] so the pipeline only ever sees one markup string.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use super::fetcher::Fetcher;

/// Returns the concatenated markup of `pages` result pages for `url`.
#[async_trait]
pub trait Paginator: Send + Sync {
    /// Returns `None` when nothing could be retrieved.
    async fn fetch_pages(&self, url: &str, pages: u32, timeout: Duration) -> Option<String>;
}

/// Paginator without a browser: fetches the first page only.
#[derive(Clone)]
pub struct SinglePagePaginator {
    fetcher: Arc<dyn Fetcher>,
}

impl SinglePagePaginator {
    /// Creates a paginator that fetches through `fetcher`.
    #[must_use]
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }
}

impl std::fmt::Debug for SinglePagePaginator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SinglePagePaginator").finish_non_exhaustive()
    }
}

#[async_trait]
impl Paginator for SinglePagePaginator {
    async fn fetch_pages(&self, url: &str, pages: u32, timeout: Duration) -> Option<String> {
        if pages > 1 {
            warn!(
                requested_pages = pages,
                "no browser session configured; only the first result page is available"
            );
        }
        match self.fetcher.fetch_text(url, timeout).await {
            Ok(page) => {
                debug!(bytes = page.len(), "fetched first result page");
                Some(page)
            }
            Err(e) => {
                warn!(error = %e, "result page fetch failed");
                None
            }
        }
    }
}

/// Number of result pages needed to reach `limit` results.
#[must_use]
pub fn pages_for_limit(limit: u32, page_size: u32) -> u32 {
    limit.div_ceil(page_size.max(1)).max(1)
}
