//! Runtime settings passed into job constructors.
//!
//! The CLI builds these from flags; tests build them directly.

use std::time::Duration;

/// Default quake list endpoint.
pub const DEFAULT_FEED_URL: &str = "https://www.jma.go.jp/bosai/quake/data/list.json";

/// Default reverse-geocoding base URL.
pub const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";

/// Default SQLite database path.
pub const DEFAULT_DB_PATH: &str = "earthquakes.db";

/// Cooldown required between geocoding calls by the provider's usage policy.
pub const GEOCODER_COOLDOWN: Duration = Duration::from_secs(1);

/// Default alert poll interval in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 300;

/// Only quakes newer than this are eligible for alerting.
pub const RECENCY_WINDOW: Duration = Duration::from_secs(10 * 60);

#[derive(Debug, Clone)]
pub struct FeedSettings {
    pub url: String,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            url: DEFAULT_FEED_URL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct GeocoderSettings {
    pub base_url: String,
    pub cooldown: Duration,
}

impl Default for GeocoderSettings {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_GEOCODER_URL.to_string(),
            cooldown: GEOCODER_COOLDOWN,
        }
    }
}

/// Alert monitor configuration.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Region name (as returned by the geocoder) to watch
    pub region: String,
    /// Minimum magnitude that triggers an alert
    pub magnitude_threshold: f64,
    /// Time between cycle starts
    pub poll_interval: Duration,
    /// Trailing span within which a quake may alert
    pub recency_window: Duration,
    /// Suppress repeat alerts for an event already alerted on
    pub dedupe: bool,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            region: "Hyogo".to_string(),
            magnitude_threshold: 5.0,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            recency_window: RECENCY_WINDOW,
            dedupe: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub db_path: String,
    /// Repeat ingestion on this interval; `None` means a single run
    pub every: Option<Duration>,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            every: None,
        }
    }
}
