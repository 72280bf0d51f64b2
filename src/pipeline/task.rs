//! One acquisition task: fetch a result's bytes, retry, persist.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info, instrument};

use super::Shared;
use super::outcome::{DownloadOutcome, FailureKind};
use crate::download::{
    DownloadError, Fetcher, FetchedBody, ResponseKind, RetryDecision, RetryPolicy, classify_error,
};
use crate::storage::{FileNaming, SourceLog, format_size, persist};

/// What a task fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum JobKind {
    Image,
    Thumbnail,
}

/// Everything one task needs; owned so the task can be spawned.
#[derive(Debug)]
pub(super) struct DownloadJob {
    pub kind: JobKind,
    /// Link to fetch, possibly percent-escaped.
    pub fetch_url: String,
    /// Link the file name is derived from.
    pub name_url: String,
    pub dir: PathBuf,
    pub naming: FileNaming,
    pub timeout: Duration,
    pub print_size: bool,
    /// Log progress at debug level only.
    pub silent: bool,
    pub source_log: Option<Arc<SourceLog>>,
}

/// Percent-decodes `url`, keeping it as-is if the escapes are not UTF-8.
pub(super) fn unescape_url(url: &str) -> String {
    urlencoding::decode(url).map_or_else(|_| url.to_string(), std::borrow::Cow::into_owned)
}

/// Runs `job` to completion. Never panics outward; every failure becomes
/// a [`DownloadOutcome::Failed`].
#[instrument(skip_all, fields(kind = ?job.kind, url = %job.fetch_url))]
pub(super) async fn run_job(shared: Arc<Shared>, job: DownloadJob) -> DownloadOutcome {
    let url = unescape_url(&job.fetch_url);
    let file_name = job.naming.file_name(&unescape_url(&job.name_url));

    let Ok(_permit) = shared.semaphore.acquire().await else {
        return DownloadOutcome::Failed {
            kind: FailureKind::Task,
            detail: "concurrency limiter closed".to_string(),
        };
    };

    let bytes = match fetch_with_retry(
        shared.fetcher.as_ref(),
        &url,
        ResponseKind::Bytes,
        job.timeout,
        &shared.retry_policy,
    )
    .await
    {
        Ok(body) => body.into_bytes(),
        Err((error, attempts)) => {
            alert!(job.silent, url = %url, error = %error, attempts, "file not written");
            return DownloadOutcome::from_error(&error);
        }
    };

    let path = match persist(
        shared.persister.as_ref(),
        &job.dir,
        &file_name,
        &bytes,
        shared.collision_policy,
    )
    .await
    {
        Ok(path) => path,
        Err(error) => {
            alert!(job.silent, url = %url, error = %error, "file not written");
            return DownloadOutcome::from_error(&error);
        }
    };

    let size = bytes.len() as u64;
    if job.print_size {
        narrate!(job.silent, path = %path.display(), size = %format_size(size), "finished downloading");
    } else {
        narrate!(job.silent, path = %path.display(), "finished downloading");
    }

    if let Some(log) = &job.source_log
        && let Err(error) = log.record(&path, &url).await
    {
        alert!(
            job.silent,
            log = %log.path().display(),
            error = %error,
            "failed to append to source log"
        );
    }

    DownloadOutcome::Success { path, bytes: size }
}

/// Routes planning-time fetches (similar-image lookups) through the same
/// concurrency bound and retry policy as page and image fetches.
pub(super) struct BoundedFetcher<'a> {
    shared: &'a Shared,
}

impl<'a> BoundedFetcher<'a> {
    pub(super) fn new(shared: &'a Shared) -> Self {
        Self { shared }
    }
}

#[async_trait]
impl Fetcher for BoundedFetcher<'_> {
    async fn fetch(
        &self,
        url: &str,
        kind: ResponseKind,
        timeout: Duration,
    ) -> Result<FetchedBody, DownloadError> {
        // Held for one request only so the page fetch after it can proceed.
        // The semaphore is never closed while a run is in flight.
        let _permit = self.shared.semaphore.acquire().await.ok();
        fetch_with_retry(
            self.shared.fetcher.as_ref(),
            url,
            kind,
            timeout,
            &self.shared.retry_policy,
        )
        .await
        .map_err(|(error, _)| error)
    }
}

/// Fetches `url`, retrying transient failures under `policy`.
///
/// # Returns
///
/// - `Ok(body)` on the first successful attempt
/// - `Err((error, attempts))` with the last error once retrying stops
pub(super) async fn fetch_with_retry(
    fetcher: &dyn Fetcher,
    url: &str,
    kind: ResponseKind,
    timeout: Duration,
    policy: &RetryPolicy,
) -> Result<FetchedBody, (DownloadError, u32)> {
    let mut attempt = 0u32;

    loop {
        attempt += 1;
        debug!(attempt, "attempting fetch");

        match fetcher.fetch(url, kind, timeout).await {
            Ok(body) => return Ok(body),
            Err(e) => match policy.should_retry(classify_error(&e), attempt) {
                RetryDecision::Retry {
                    delay,
                    attempt: next_attempt,
                } => {
                    info!(
                        url = %url,
                        attempt = next_attempt,
                        max_attempts = policy.max_attempts(),
                        delay_ms = delay.as_millis(),
                        error = %e,
                        "retrying fetch"
                    );
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
                RetryDecision::DoNotRetry { reason } => {
                    debug!(url = %url, attempt, %reason, "not retrying");
                    return Err((e, attempt));
                }
            },
        }
    }
}
