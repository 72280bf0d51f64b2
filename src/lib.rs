//! Image Harvester Library
//!
//! This library provides the core functionality for the image harvester,
//! which turns keyword lists and search options into result-page queries
//! against an image search index and saves the matching images to disk.
//!
//! # Architecture
//!
//! The library is organized into the following modules:
//! - [`config`] - Raw option records, config files, filter tables
//! - [`query`] - Expansion of raw records into concrete queries
//! - [`search`] - Search URL assembly and similar-image resolution
//! - [`scanner`] - Result-page metadata extraction
//! - [`download`] - HTTP fetching with timeouts and retry
//! - [`storage`] - File naming, persistence, and the source log
//! - [`pipeline`] - Concurrent acquisition of every query's results

// Clippy lints - strict for library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod download;
pub mod pipeline;
pub mod query;
pub mod scanner;
pub mod search;
pub mod storage;

#[cfg(test)]
mod test_support;

// Re-export commonly used types
pub use config::{ConfigError, FilterTable, RawQuery, load_records};
pub use download::{
    DEFAULT_MAX_RETRIES, DownloadError, FailureType, Fetcher, HttpClient, RetryDecision,
    RetryPolicy, classify_error,
};
pub use pipeline::{
    DEFAULT_CONCURRENCY, DownloadOutcome, EngineError, FailureKind, Pipeline, PipelineConfig,
    RunReport,
};
pub use query::{QueryRecord, SearchMode, expand};
pub use scanner::{ResultMetadata, scan_page};
pub use search::{SearchEndpoints, build_search_url};
pub use storage::{CollisionPolicy, FsPersister, Persister};
