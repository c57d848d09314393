//! Feed ingestion into the event store.
//!
//! One run fetches the feed, normalizes each record, geocodes the records the
//! store does not hold yet and inserts them. Record-level faults are counted
//! and skipped; feed and store faults end the run with an error so the
//! scheduler can try again on its next tick.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, error, info, instrument};

use crate::errors::{QuakeError, RejectReason};
use crate::feed::FeedClient;
use crate::geocoder::Geocoder;
use crate::models::Event;
use crate::normalize::normalize;
use crate::store::{Store, UpsertOutcome};

/// Counts from a single ingestion run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub fetched: u64,
    pub rejected: u64,
    pub inserted: u64,
    pub already_present: u64,
    /// Rejections broken down by reason
    pub rejected_by: BTreeMap<RejectReason, u64>,
}

impl IngestReport {
    fn reject(&mut self, reason: RejectReason) {
        self.rejected += 1;
        *self.rejected_by.entry(reason).or_default() += 1;
    }
}

impl fmt::Display for IngestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "fetched {}, inserted {}, already present {}, rejected {}",
            self.fetched, self.inserted, self.already_present, self.rejected
        )?;
        if !self.rejected_by.is_empty() {
            let reasons: Vec<String> = self
                .rejected_by
                .iter()
                .map(|(reason, n)| format!("{}={n}", reason.as_str()))
                .collect();
            write!(f, " ({})", reasons.join(", "))?;
        }
        Ok(())
    }
}

/// Fetch, normalize, geocode and persist.
pub struct IngestionJob {
    feed: FeedClient,
    geocoder: Geocoder,
    store: Store,
}

impl IngestionJob {
    #[must_use]
    pub fn new(feed: FeedClient, geocoder: Geocoder, store: Store) -> Self {
        Self {
            feed,
            geocoder,
            store,
        }
    }

    #[must_use]
    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Run one ingestion pass.
    ///
    /// # Errors
    ///
    /// Returns an error if the feed cannot be fetched or parsed, or if a
    /// store write fails.
    #[instrument(skip(self))]
    pub async fn run_once(&self) -> Result<IngestReport, QuakeError> {
        let records = self.feed.fetch().await?;
        let mut report = IngestReport {
            fetched: records.len() as u64,
            ..IngestReport::default()
        };

        for raw in &records {
            let quake = match normalize(raw) {
                Ok(q) => q,
                Err(reason) => {
                    debug!(eid = ?raw.eid, %reason, "record rejected");
                    report.reject(reason);
                    continue;
                }
            };

            // First write wins, so a known id needs no geocoding call.
            if self.store.contains(&quake.event_id).await? {
                report.already_present += 1;
                continue;
            }

            debug!(event_id = %quake.event_id, "processing event");
            let place = self.geocoder.resolve(quake.latitude, quake.longitude).await;
            let event = Event::locate(quake, place);

            match self.store.upsert(&event).await? {
                UpsertOutcome::Inserted => report.inserted += 1,
                UpsertOutcome::AlreadyPresent => report.already_present += 1,
            }
        }

        info!("ingestion complete: {report}");
        Ok(report)
    }

    /// Run forever, starting a new pass `interval` after the previous one
    /// finished. Failed passes are logged and retried on the next tick.
    pub async fn run_every(&self, interval: Duration) {
        let mut run_count = 0u64;
        loop {
            run_count += 1;
            if let Err(e) = self.run_once().await {
                error!("ingestion run #{run_count} failed, will retry: {e}");
            }
            tokio::time::sleep(interval).await;
        }
    }
}
