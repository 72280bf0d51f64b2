//! Concurrent acquisition pipeline.
//!
//! Every [`QueryRecord`] is planned in its own task: its search URL is built,
//! the result page fetched and scanned, and one acquisition task spawned per
//! accepted result. A shared semaphore bounds how many fetches run at once.
//! The pipeline awaits every planned and dispatched task before returning
//! the [`RunReport`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use image_harvester::config::{FilterTable, RawQuery};
//! use image_harvester::download::HttpClient;
//! use image_harvester::pipeline::{Pipeline, PipelineConfig};
//! use image_harvester::query::expand;
//! use image_harvester::storage::FsPersister;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let raw = RawQuery {
//!     keywords: Some("cat,dog".to_string()),
//!     ..RawQuery::default()
//! };
//! let pipeline = Pipeline::new(
//!     Arc::new(HttpClient::new()),
//!     Arc::new(FsPersister),
//!     FilterTable::builtin(),
//!     PipelineConfig::default(),
//! )?;
//! let report = pipeline.run(expand(&raw)?).await;
//! println!("saved {} of {}", report.succeeded(), report.total());
//! # Ok(())
//! # }
//! ```

/// Per-record progress: `info!`, or `debug!` for a silent record.
macro_rules! narrate {
    ($silent:expr, $($arg:tt)+) => {
        if $silent {
            tracing::debug!($($arg)+);
        } else {
            tracing::info!($($arg)+);
        }
    };
}

/// Per-record recoverable failure: `warn!`, or `debug!` for a silent record.
macro_rules! alert {
    ($silent:expr, $($arg:tt)+) => {
        if $silent {
            tracing::debug!($($arg)+);
        } else {
            tracing::warn!($($arg)+);
        }
    };
}

mod outcome;
mod plan;
mod task;

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use futures_util::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};

use crate::config::FilterTable;
use crate::download::{Fetcher, Paginator, RetryPolicy, SinglePagePaginator};
use crate::query::QueryRecord;
use crate::search::SearchEndpoints;
use crate::storage::{CollisionPolicy, Persister, SourceLog};

pub use outcome::{DownloadOutcome, FailureKind, RunReport};
pub use plan::THUMBNAIL_DIRECTORY;

/// Minimum allowed concurrency value.
const MIN_CONCURRENCY: usize = 1;

/// Maximum allowed concurrency value.
const MAX_CONCURRENCY: usize = 100;

/// Default concurrency if not specified.
pub const DEFAULT_CONCURRENCY: usize = 10;

/// Error type for pipeline construction.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// Invalid concurrency value provided.
    #[error(
        "invalid concurrency value {value}: must be between {MIN_CONCURRENCY} and {MAX_CONCURRENCY}"
    )]
    InvalidConcurrency {
        /// The invalid value that was provided.
        value: usize,
    },
}

/// Run-wide settings.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum simultaneous fetches (1-100).
    pub concurrency: usize,
    /// Retry policy for every fetch.
    pub retry_policy: RetryPolicy,
    /// What to do when a target file already exists.
    pub collision_policy: CollisionPolicy,
    /// Image index endpoints.
    pub endpoints: SearchEndpoints,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            retry_policy: RetryPolicy::default(),
            collision_policy: CollisionPolicy::default(),
            endpoints: SearchEndpoints::default(),
        }
    }
}

/// State shared read-only by every planning and acquisition task.
pub(crate) struct Shared {
    fetcher: Arc<dyn Fetcher>,
    persister: Arc<dyn Persister>,
    paginator: Arc<dyn Paginator>,
    filters: Arc<FilterTable>,
    semaphore: Semaphore,
    retry_policy: RetryPolicy,
    collision_policy: CollisionPolicy,
    endpoints: SearchEndpoints,
    source_logs: Mutex<HashMap<PathBuf, Arc<SourceLog>>>,
}

impl Shared {
    /// The single log writer for `path`, created on first use.
    fn source_log(&self, path: &Path) -> Arc<SourceLog> {
        let mut logs = self
            .source_logs
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        Arc::clone(logs.entry(path.to_path_buf()).or_insert_with(|| {
            Arc::new(SourceLog::new(path, Arc::clone(&self.persister)))
        }))
    }
}

/// Runs expanded records to completion.
pub struct Pipeline {
    shared: Arc<Shared>,
    concurrency: usize,
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("concurrency", &self.concurrency)
            .field("retry_policy", &self.shared.retry_policy)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    /// Creates a pipeline over the given collaborators.
    ///
    /// Result sets larger than one page go through a
    /// [`SinglePagePaginator`] unless [`Pipeline::with_paginator`] replaces
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::InvalidConcurrency`] if `config.concurrency`
    /// is outside 1-100.
    #[instrument(level = "debug", skip(fetcher, persister, filters))]
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        persister: Arc<dyn Persister>,
        filters: FilterTable,
        config: PipelineConfig,
    ) -> Result<Self, EngineError> {
        if !(MIN_CONCURRENCY..=MAX_CONCURRENCY).contains(&config.concurrency) {
            return Err(EngineError::InvalidConcurrency {
                value: config.concurrency,
            });
        }

        debug!(
            concurrency = config.concurrency,
            max_attempts = config.retry_policy.max_attempts(),
            "creating pipeline"
        );

        let paginator = Arc::new(SinglePagePaginator::new(Arc::clone(&fetcher)));
        Ok(Self {
            concurrency: config.concurrency,
            shared: Arc::new(Shared {
                fetcher,
                persister,
                paginator,
                filters: Arc::new(filters),
                semaphore: Semaphore::new(config.concurrency),
                retry_policy: config.retry_policy,
                collision_policy: config.collision_policy,
                endpoints: config.endpoints,
                source_logs: Mutex::new(HashMap::new()),
            }),
        })
    }

    /// Replaces the paginator used for multi-page result sets.
    ///
    /// Must be called before [`Pipeline::run`].
    #[must_use]
    pub fn with_paginator(mut self, paginator: Arc<dyn Paginator>) -> Self {
        match Arc::get_mut(&mut self.shared) {
            Some(shared) => shared.paginator = paginator,
            None => warn!("pipeline already shared; paginator not replaced"),
        }
        self
    }

    /// Returns the configured concurrency limit.
    #[must_use]
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Plans every record concurrently, then awaits every dispatched task.
    ///
    /// Individual failures never abort the run; they are reported as
    /// [`DownloadOutcome::Failed`] entries or in
    /// [`RunReport::records_failed`].
    #[instrument(skip_all, fields(records = records.len()))]
    pub async fn run(&self, records: Vec<QueryRecord>) -> RunReport {
        let mut report = RunReport {
            records: records.len(),
            ..RunReport::default()
        };

        info!("starting run");

        let planners: Vec<_> = records
            .into_iter()
            .map(|record| tokio::spawn(plan::plan_record(Arc::clone(&self.shared), record)))
            .collect();

        let mut tasks = Vec::new();
        for planned in join_all(planners).await {
            match planned {
                Ok(plan) => {
                    if plan.page_failed {
                        report.records_failed += 1;
                    }
                    report.outcomes.extend(plan.decided);
                    tasks.extend(plan.tasks);
                }
                Err(e) => {
                    warn!(error = %e, "record planning task panicked");
                    report.records_failed += 1;
                }
            }
        }

        debug!(task_count = tasks.len(), "waiting for downloads to complete");

        for handle in tasks {
            match handle.await {
                Ok(outcome) => report.outcomes.push(outcome),
                Err(e) => {
                    warn!(error = %e, "download task panicked");
                    report.outcomes.push(DownloadOutcome::Failed {
                        kind: FailureKind::Task,
                        detail: e.to_string(),
                    });
                }
            }
        }

        info!(
            succeeded = report.succeeded(),
            skipped = report.skipped(),
            failed = report.failed(),
            records_failed = report.records_failed,
            total = report.total(),
            "run complete"
        );

        report
    }
}
