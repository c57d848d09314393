//! Regional earthquake alerting.
//!
//! Each cycle walks `Idle -> Fetching -> Evaluating -> (Alerting)* -> Idle`:
//! fetch the feed, keep quakes newer than the recency window whose magnitude
//! meets the threshold, geocode only those, and hand an [`Alert`] to the sink
//! for every one located in the region of interest.

use std::io::{self, Write};
use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, error, info, instrument, warn};

use crate::config::MonitorConfig;
use crate::dedup::AlertDedup;
use crate::errors::QuakeError;
use crate::feed::FeedClient;
use crate::geocoder::Geocoder;
use crate::models::{Alert, Event};
use crate::normalize::normalize;
use crate::output::{self, Format};

/// Receives detected alerts. Delivery is best effort.
pub trait AlertSink: Send + Sync {
    fn deliver(&self, alert: &Alert);
}

/// Prints alerts to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleSink {
    pub format: Format,
}

impl ConsoleSink {
    /// Write and flush one alert to `writer`.
    fn emit<W: Write>(&self, writer: &mut W, alert: &Alert) -> io::Result<()> {
        output::write_alert(writer, alert, self.format)?;
        writer.flush()
    }
}

impl AlertSink for ConsoleSink {
    fn deliver(&self, alert: &Alert) {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        if let Err(e) = self.emit(&mut handle, alert) {
            warn!("failed to write alert: {}", e);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MonitorState {
    Idle,
    Fetching,
    Evaluating,
    Alerting,
}

/// Counts from one monitor cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleSummary {
    pub fetched: usize,
    /// Recent enough and strong enough to be geocoded
    pub candidates: usize,
    pub alerts: usize,
    /// Matches skipped because they already alerted in an earlier cycle
    pub suppressed: usize,
}

pub struct AlertMonitor {
    config: MonitorConfig,
    feed: FeedClient,
    geocoder: Geocoder,
    sink: Arc<dyn AlertSink>,
    dedup: Option<AlertDedup>,
    state: MonitorState,
}

impl AlertMonitor {
    #[must_use]
    pub fn new(
        config: MonitorConfig,
        feed: FeedClient,
        geocoder: Geocoder,
        sink: Arc<dyn AlertSink>,
    ) -> Self {
        let dedup = config.dedupe.then(AlertDedup::default);
        Self {
            config,
            feed,
            geocoder,
            sink,
            dedup,
            state: MonitorState::Idle,
        }
    }

    #[must_use]
    pub fn state(&self) -> MonitorState {
        self.state
    }

    /// Oldest origin time still eligible at `now` (exclusive).
    fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        TimeDelta::from_std(self.config.recency_window)
            .ok()
            .and_then(|window| now.checked_sub_signed(window))
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Run one cycle as of `now`.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed cannot be fetched or parsed. The monitor
    /// is back in [`MonitorState::Idle`] either way.
    #[instrument(skip(self), fields(region = %self.config.region))]
    pub async fn run_cycle(&mut self, now: DateTime<Utc>) -> Result<CycleSummary, QuakeError> {
        let result = self.cycle(now).await;
        self.state = MonitorState::Idle;
        result
    }

    async fn cycle(&mut self, now: DateTime<Utc>) -> Result<CycleSummary, QuakeError> {
        self.state = MonitorState::Fetching;
        let records = self.feed.fetch().await?;

        self.state = MonitorState::Evaluating;
        let cutoff = self.cutoff(now);
        let mut summary = CycleSummary {
            fetched: records.len(),
            ..CycleSummary::default()
        };

        for raw in &records {
            let Ok(quake) = normalize(raw) else {
                continue;
            };

            if quake.occurred_at.with_timezone(&Utc) <= cutoff
                || quake.magnitude < self.config.magnitude_threshold
            {
                continue;
            }

            if self
                .dedup
                .as_ref()
                .is_some_and(|d| d.contains(&quake.event_id))
            {
                summary.suppressed += 1;
                continue;
            }

            summary.candidates += 1;
            let place = self.geocoder.resolve(quake.latitude, quake.longitude).await;
            if place.region != self.config.region {
                debug!(event_id = %quake.event_id, region = %place.region, "outside region of interest");
                continue;
            }

            // The same id may also appear twice within one snapshot.
            let first = self
                .dedup
                .as_mut()
                .is_none_or(|d| d.check_and_mark(&quake.event_id).should_alert());
            if !first {
                summary.suppressed += 1;
                continue;
            }

            self.state = MonitorState::Alerting;
            let alert = Alert::from(Event::locate(quake, place));
            info!(
                event_id = %alert.event_id,
                magnitude = alert.magnitude,
                "alert raised"
            );
            self.sink.deliver(&alert);
            summary.alerts += 1;
            self.state = MonitorState::Evaluating;
        }

        Ok(summary)
    }

    /// Run cycles forever, one every `poll_interval`. A failed cycle is
    /// logged and the next tick proceeds as usual.
    pub async fn run(&mut self) {
        info!(
            "monitoring {} for magnitude >= {} (poll every {}s)",
            self.config.region,
            self.config.magnitude_threshold,
            self.config.poll_interval.as_secs()
        );

        let mut cycle_count = 0u64;
        loop {
            cycle_count += 1;
            match self.run_cycle(Utc::now()).await {
                Ok(summary) => debug!(
                    "cycle #{}: {} fetched, {} candidates, {} alerts, {} suppressed ({} remembered)",
                    cycle_count,
                    summary.fetched,
                    summary.candidates,
                    summary.alerts,
                    summary.suppressed,
                    self.dedup.as_ref().map_or(0, AlertDedup::len)
                ),
                Err(e) => error!("monitor cycle #{cycle_count} failed: {e}"),
            }
            debug_assert_eq!(self.state(), MonitorState::Idle);
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}
