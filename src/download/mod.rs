//! Network side of the harvester: fetching pages and image payloads.
//!
//! # Features
//!
//! - [`Fetcher`] seam with a reqwest implementation ([`HttpClient`])
//! - Typed failures: non-200 responses carry the URL and status code
//! - Per-fetch timeout budget with a 2 second floor
//! - Bounded retry ([`RetryPolicy`]) for timeouts and other transient errors
//! - [`Paginator`] seam for result sets larger than one page

mod client;
pub mod constants;
mod error;
mod fetcher;
mod pagination;
mod retry;

pub use client::HttpClient;
pub use constants::{PAGE_SIZE, effective_timeout};
pub use error::DownloadError;
pub use fetcher::{FetchedBody, Fetcher, ResponseKind};
pub use pagination::{Paginator, SinglePagePaginator, pages_for_limit};
pub use retry::{DEFAULT_MAX_RETRIES, FailureType, RetryDecision, RetryPolicy, classify_error};
