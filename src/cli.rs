//! Command-line interface definitions.
//!
//! Uses clap derive API for argument parsing.

use clap::{Args, Parser, Subcommand};

use crate::config::{DEFAULT_DB_PATH, DEFAULT_FEED_URL, DEFAULT_GEOCODER_URL};
use crate::output::Format;
use crate::store::PAGE_SIZE;

/// Earthquake feed ingestion, geocoding and regional alerting.
#[derive(Parser, Debug)]
#[command(name = "quaketrack")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Command to run
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(long, global = true)]
    pub quiet: bool,
}

/// Available commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Fetch the feed and store new events
    Ingest(IngestArgs),

    /// Watch the feed and alert on strong quakes in a region
    Monitor(MonitorArgs),

    /// Run ingestion and monitoring side by side
    Run(RunArgs),

    /// List stored events
    Query(QueryArgs),
}

/// Upstream endpoints shared by every network command.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Quake list feed URL
    #[arg(long, env = "QUAKETRACK_FEED_URL", default_value = DEFAULT_FEED_URL)]
    pub feed_url: String,

    /// Reverse geocoding base URL (Nominatim compatible)
    #[arg(long, env = "QUAKETRACK_GEOCODER_URL", default_value = DEFAULT_GEOCODER_URL)]
    pub geocoder_url: String,
}

/// Database location.
#[derive(Args, Debug, Clone)]
pub struct StoreArgs {
    /// SQLite database file
    #[arg(long, env = "QUAKETRACK_DB", default_value = DEFAULT_DB_PATH)]
    pub db: String,
}

/// Alerting thresholds.
#[derive(Args, Debug, Clone)]
pub struct AlertArgs {
    /// Region (prefecture) to watch, as named by the geocoder in English
    #[arg(long, default_value = "Hyogo")]
    pub region: String,

    /// Minimum magnitude that triggers an alert
    #[arg(long, default_value = "5.0")]
    pub min_magnitude: f64,

    /// Poll interval in seconds (minimum 30)
    #[arg(long, default_value = "300")]
    pub poll_interval: u64,

    /// Alert again on every cycle an event stays in the recency window
    #[arg(long)]
    pub repeat_alerts: bool,

    /// Alert output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Arguments for the `ingest` command.
#[derive(Parser, Debug)]
pub struct IngestArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    /// Repeat every N seconds instead of running once
    #[arg(long)]
    pub every: Option<u64>,
}

/// Arguments for the `monitor` command.
#[derive(Parser, Debug)]
pub struct MonitorArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub alert: AlertArgs,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub alert: AlertArgs,

    /// Ingestion interval in seconds
    #[arg(long, default_value = "3600")]
    pub ingest_interval: u64,
}

/// Arguments for the `query` command.
#[derive(Parser, Debug)]
pub struct QueryArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    /// Only events in this region (`all` for every region)
    #[arg(long)]
    pub region: Option<String>,

    /// Sort column: occurred_at, epicenter_name, magnitude, city, region
    #[arg(long, default_value = "occurred_at")]
    pub sort_by: String,

    /// Sort direction: asc or desc
    #[arg(long, default_value = "desc")]
    pub order: String,

    /// Maximum number of events to list (at most 50)
    #[arg(long, default_value_t = PAGE_SIZE)]
    pub limit: u32,

    /// List the known regions instead of events
    #[arg(long)]
    pub regions: bool,

    /// Output format
    #[arg(long, short = 'f', default_value = "human", value_parser = parse_format)]
    pub format: Format,
}

/// Parse an output format from string.
fn parse_format(s: &str) -> Result<Format, String> {
    s.parse()
}
