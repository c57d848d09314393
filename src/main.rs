//! QuakeTrack - earthquake feed ingestion and regional alerting.
//!
//! Pulls the JMA quake list, reverse-geocodes each epicenter, stores events
//! idempotently in SQLite and raises alerts for strong, recent quakes in a
//! chosen prefecture.

use std::io;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};

mod cli;
mod codec;
mod config;
mod dedup;
mod errors;
mod feed;
mod geocoder;
mod ingest;
mod models;
mod monitor;
mod normalize;
mod output;
mod pacing;
mod store;

use cli::{Cli, Command};
use config::{FeedSettings, GeocoderSettings, IngestSettings, MonitorConfig};
use feed::FeedClient;
use geocoder::Geocoder;
use ingest::IngestionJob;
use monitor::{AlertMonitor, ConsoleSink};
use pacing::Pacer;
use store::{EventQuery, Store};

/// Lower bound on every feed polling interval.
const MIN_POLL_INTERVAL_SECS: u64 = 30;

fn main() -> ExitCode {
    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e:#}");
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity
    init_tracing(cli.verbose, cli.quiet);

    let runtime = tokio::runtime::Runtime::new().context("failed to create tokio runtime")?;

    match cli.command {
        Command::Ingest(args) => runtime.block_on(cmd_ingest(args)),
        Command::Monitor(args) => runtime.block_on(cmd_monitor(args)),
        Command::Run(args) => runtime.block_on(cmd_run(args)),
        Command::Query(args) => runtime.block_on(cmd_query(args)),
    }
}

/// Initialize tracing subscriber.
fn init_tracing(verbose: bool, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

/// Build the feed client and the shared, paced geocoder.
fn build_sources(args: &cli::SourceArgs) -> Result<(FeedClient, Geocoder)> {
    let feed = FeedClient::new(&FeedSettings {
        url: args.feed_url.clone(),
    })
    .context("failed to create feed client")?;

    let settings = GeocoderSettings {
        base_url: args.geocoder_url.clone(),
        ..GeocoderSettings::default()
    };
    let pacer = Pacer::every(settings.cooldown);
    info!("geocoding paced at one call per {:?}", pacer.cooldown());
    let geocoder = Geocoder::new(&settings, pacer).context("failed to create geocoder")?;

    Ok((feed, geocoder))
}

/// Seconds between feed fetches, raised to [`MIN_POLL_INTERVAL_SECS`].
fn polling_interval(secs: u64, what: &str) -> Duration {
    let clamped = secs.max(MIN_POLL_INTERVAL_SECS);
    if clamped != secs {
        warn!("{what} clamped to minimum of {MIN_POLL_INTERVAL_SECS} seconds");
    }
    Duration::from_secs(clamped)
}

fn monitor_config(args: &cli::AlertArgs) -> MonitorConfig {
    MonitorConfig {
        region: args.region.clone(),
        magnitude_threshold: args.min_magnitude,
        poll_interval: polling_interval(args.poll_interval, "poll interval"),
        dedupe: !args.repeat_alerts,
        ..MonitorConfig::default()
    }
}

async fn open_store(path: &str) -> Result<Store> {
    Store::open(path)
        .await
        .with_context(|| format!("failed to open database {path}"))
}

/// Execute the `ingest` command - one run, or repeated with `--every`.
async fn cmd_ingest(args: cli::IngestArgs) -> Result<()> {
    let settings = IngestSettings {
        db_path: args.store.db,
        every: args.every.map(|secs| polling_interval(secs, "ingest interval")),
    };

    let (feed, geocoder) = build_sources(&args.source)?;
    let store = open_store(&settings.db_path).await?;
    let job = IngestionJob::new(feed, geocoder, store);

    match settings.every {
        Some(interval) => {
            job.run_every(interval).await;
            Ok(())
        }
        None => {
            let report = job.run_once().await.context("ingestion failed")?;
            let total = job.store().count().await.context("failed to count events")?;
            println!("{report}; {total} events stored");
            Ok(())
        }
    }
}

/// Execute the `monitor` command - alert loop.
async fn cmd_monitor(args: cli::MonitorArgs) -> Result<()> {
    let (feed, geocoder) = build_sources(&args.source)?;
    let sink = Arc::new(ConsoleSink {
        format: args.alert.format,
    });

    let mut monitor = AlertMonitor::new(monitor_config(&args.alert), feed, geocoder, sink);
    monitor.run().await;
    Ok(())
}

/// Execute the `run` command - ingestion and monitoring as independent tasks.
async fn cmd_run(args: cli::RunArgs) -> Result<()> {
    let (feed, geocoder) = build_sources(&args.source)?;
    let store = open_store(&args.store.db).await?;

    // Both tasks share one geocoder, and with it one pacer.
    let job = IngestionJob::new(feed.clone(), geocoder.clone(), store);
    let sink = Arc::new(ConsoleSink {
        format: args.alert.format,
    });
    let mut monitor = AlertMonitor::new(monitor_config(&args.alert), feed, geocoder, sink);

    let ingest_interval = polling_interval(args.ingest_interval, "ingest interval");
    info!("ingesting every {}s", ingest_interval.as_secs());

    let ingest_task = tokio::spawn(async move { job.run_every(ingest_interval).await });
    let monitor_task = tokio::spawn(async move { monitor.run().await });

    let (ingest, monitor) = tokio::join!(ingest_task, monitor_task);
    ingest.context("ingestion task panicked")?;
    monitor.context("monitor task panicked")?;
    Ok(())
}

/// Execute the `query` command - list stored events.
async fn cmd_query(args: cli::QueryArgs) -> Result<()> {
    let store = open_store(&args.store.db).await?;
    let stdout = io::stdout();

    if args.regions {
        let regions = store.regions().await.context("failed to list regions")?;
        let mut handle = stdout.lock();
        output::write_lines(&mut handle, &regions)?;
        return Ok(());
    }

    let query = EventQuery::from_params(args.region.as_deref(), &args.sort_by, &args.order)
        .with_limit(args.limit);
    let events = store.query(&query).await.context("failed to query events")?;

    let mut handle = stdout.lock();
    output::write_events(&mut handle, &events, args.format)?;
    Ok(())
}
