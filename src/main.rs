//! CLI entry point for the image harvester.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use image_harvester::config::non_empty;
use image_harvester::{
    CollisionPolicy, FilterTable, FsPersister, HttpClient, Pipeline, PipelineConfig, RawQuery,
    RetryPolicy, SearchEndpoints, expand, load_records,
};
use tracing::{debug, info, warn};

mod cli;

use cli::Args;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse CLI arguments first (before tracing, so --help works without logs)
    let args = Args::parse();

    // Priority: RUST_LOG env var > quiet/silent flag > verbose flag > default (info)
    let default_level = if args.quiet || args.silent_mode {
        "error"
    } else {
        match args.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();

    debug!(?args, "CLI arguments parsed");

    let base = args.to_raw_query();
    let raw_records: Vec<RawQuery> = match &args.config_file {
        Some(path) => load_records(path, &base)?,
        None => vec![base],
    };

    let filters = match &args.filter_table {
        Some(path) => FilterTable::load(path)?,
        None => FilterTable::builtin(),
    };

    // Everything that can be rejected is rejected before the first fetch.
    let mut records = Vec::new();
    for raw in &raw_records {
        filters.validate(&raw.filter_selection())?;
        records.extend(expand(raw)?);
    }

    info!(
        records = records.len(),
        sources = raw_records.len(),
        "Image harvester starting"
    );

    let proxy = raw_records
        .iter()
        .find_map(|raw| non_empty(raw.proxy.as_ref()));
    if raw_records
        .iter()
        .filter_map(|raw| non_empty(raw.proxy.as_ref()))
        .any(|other| Some(other) != proxy)
    {
        warn!("records name different proxies; using the first one for the whole run");
    }
    let client = match proxy {
        Some(proxy) => {
            debug!(proxy, "routing requests through proxy");
            HttpClient::with_proxy(proxy)
                .with_context(|| format!("invalid proxy address {proxy:?}"))?
        }
        None => HttpClient::new(),
    };

    let config = PipelineConfig {
        concurrency: usize::from(args.concurrency),
        retry_policy: RetryPolicy::with_max_attempts(u32::from(args.max_retries)),
        collision_policy: if args.rename_collisions {
            CollisionPolicy::Rename
        } else {
            CollisionPolicy::Overwrite
        },
        endpoints: SearchEndpoints::default(),
    };

    let pipeline = Pipeline::new(
        Arc::new(client),
        Arc::new(FsPersister),
        filters,
        config,
    )?;

    let report = pipeline.run(records).await;

    info!(
        succeeded = report.succeeded(),
        skipped = report.skipped(),
        failed = report.failed(),
        total = report.total(),
        records_failed = report.records_failed,
        "Harvest complete"
    );

    Ok(())
}
