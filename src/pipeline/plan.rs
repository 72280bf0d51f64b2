//! Per-record planning: build the URL, fetch and scan the page, dispatch.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use super::Shared;
use super::outcome::DownloadOutcome;
use super::task::{BoundedFetcher, DownloadJob, JobKind, fetch_with_retry, run_job};
use crate::download::{PAGE_SIZE, ResponseKind, effective_timeout, pages_for_limit};
use crate::query::{QueryRecord, SearchMode};
use crate::scanner::{ResultMetadata, scan_page};
use crate::search::build_search_url;
use crate::storage::{FileNaming, SourceLog};

/// Name of the directory thumbnails are written to.
pub const THUMBNAIL_DIRECTORY: &str = "thumbnail";

/// What one record turned into.
#[derive(Debug, Default)]
pub(super) struct RecordPlan {
    /// Spawned acquisition tasks.
    pub tasks: Vec<JoinHandle<DownloadOutcome>>,
    /// Outcomes decided without spawning (skips).
    pub decided: Vec<DownloadOutcome>,
    /// The result page could not be fetched.
    pub page_failed: bool,
}

/// Carries `record` from URL building to dispatched tasks.
#[instrument(skip_all, fields(mode = ?record.mode))]
pub(super) async fn plan_record(shared: Arc<Shared>, record: QueryRecord) -> RecordPlan {
    let options = &record.options;
    let silent = options.silent_mode;
    let timeout = effective_timeout(options.socket_timeout);
    let naming = FileNaming::new(options.prefix.clone(), options.suffix.clone());
    let root = options.output_directory.as_path();
    let source_log = options
        .save_source
        .as_ref()
        .map(|name| shared.source_log(&root.join(name)));

    let mut plan = RecordPlan::default();

    if let SearchMode::SingleImage(url) = &record.mode {
        narrate!(silent, url = %url, "downloading single image");
        let job = DownloadJob {
            kind: JobKind::Image,
            fetch_url: url.clone(),
            name_url: url.clone(),
            dir: root.to_path_buf(),
            naming,
            timeout,
            print_size: options.print_size,
            silent,
            source_log,
        };
        plan.tasks.push(tokio::spawn(run_job(Arc::clone(&shared), job)));
        return plan;
    }

    let Some(url) = build_search_url(
        &record,
        &shared.filters,
        &shared.endpoints,
        &BoundedFetcher::new(&shared),
        timeout,
    )
    .await
    else {
        return plan;
    };

    let Some(page) = fetch_page(&shared, &url, options.limit, timeout, silent).await else {
        plan.page_failed = true;
        return plan;
    };

    let scan = scan_page(&page, options.offset, options.limit);
    if scan.results.is_empty() {
        narrate!(silent, url = %url, malformed = scan.malformed, "no results for query");
        return plan;
    }
    narrate!(
        silent,
        url = %url,
        results = scan.results.len(),
        "dispatching downloads"
    );

    let sub_directory = record.sub_directory();
    let image_dir = if sub_directory.is_empty() {
        root.to_path_buf()
    } else {
        root.join(&sub_directory)
    };
    let thumbnail_dir = image_dir.join(THUMBNAIL_DIRECTORY);

    for result in scan.results {
        dispatch_result(
            &shared,
            &record,
            &result,
            &image_dir,
            &thumbnail_dir,
            &naming,
            timeout,
            source_log.as_ref(),
            &mut plan,
        );
    }

    plan
}

/// Fetches the result page, through the paginator when one page cannot
/// hold `limit` results.
async fn fetch_page(
    shared: &Shared,
    url: &str,
    limit: u32,
    timeout: Duration,
    silent: bool,
) -> Option<String> {
    let Ok(_permit) = shared.semaphore.acquire().await else {
        warn!("concurrency limiter closed before page fetch");
        return None;
    };

    let page = if limit > PAGE_SIZE {
        let pages = pages_for_limit(limit, PAGE_SIZE);
        debug!(pages, "requesting paginated results");
        shared.paginator.fetch_pages(url, pages, timeout).await
    } else {
        match fetch_with_retry(
            shared.fetcher.as_ref(),
            url,
            ResponseKind::Text,
            timeout,
            &shared.retry_policy,
        )
        .await
        {
            Ok(body) => Some(body.into_text()),
            Err((error, attempts)) => {
                alert!(silent, url = %url, error = %error, attempts, "result page fetch failed");
                None
            }
        }
    };

    page.filter(|body| {
        if body.is_empty() {
            alert!(silent, url = %url, "result page was empty");
        }
        !body.is_empty()
    })
}

#[allow(clippy::too_many_arguments)]
fn dispatch_result(
    shared: &Arc<Shared>,
    record: &QueryRecord,
    result: &ResultMetadata,
    image_dir: &Path,
    thumbnail_dir: &Path,
    naming: &FileNaming,
    timeout: Duration,
    source_log: Option<&Arc<SourceLog>>,
    plan: &mut RecordPlan,
) {
    let options = &record.options;
    let silent = options.silent_mode;
    let image_link = &result.image_link;

    if let Some(pattern) = options
        .ignore_urls
        .iter()
        .find(|pattern| image_link.contains(pattern.as_str()))
    {
        narrate!(silent, url = %image_link, %pattern, "url ignored");
        plan.decided.push(DownloadOutcome::skipped("ignored url"));
        return;
    }

    if options.print_urls || options.no_download {
        narrate!(silent, url = %image_link, "image url");
    }
    if options.no_download {
        plan.decided.push(DownloadOutcome::skipped("no download"));
        return;
    }

    let job = |kind: JobKind, fetch_url: &str, dir: &Path| DownloadJob {
        kind,
        fetch_url: fetch_url.to_string(),
        name_url: image_link.clone(),
        dir: dir.to_path_buf(),
        naming: naming.clone(),
        timeout,
        print_size: options.print_size,
        silent,
        source_log: source_log.cloned(),
    };

    if !options.thumbnail_only {
        let image = job(JobKind::Image, image_link, image_dir);
        plan.tasks
            .push(tokio::spawn(run_job(Arc::clone(shared), image)));
    }
    if options.thumbnail || options.thumbnail_only {
        let thumbnail = job(JobKind::Thumbnail, &result.thumbnail_link, thumbnail_dir);
        plan.tasks
            .push(tokio::spawn(run_job(Arc::clone(shared), thumbnail)));
    }
}
