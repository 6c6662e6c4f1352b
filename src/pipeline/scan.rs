// src/pipeline/scan.rs

//! One fetch-extract-compare cycle.
//!
//! Scans never fail outright: a fetch error becomes a [`ScanRecord`] with
//! `error` set and leaves the previous snapshot untouched. Change alerts are
//! delivered on a detached task so a slow SMS gateway never delays the scan.

use std::sync::Arc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use chrono::Utc;
use tokio::sync::Mutex;

use crate::error::Result;
use crate::models::{
    Change, Config, DestinationRecord, NotificationDispatch, NotificationRecord, ScanRecord,
};
use crate::pipeline::diff::DiffCalculator;
use crate::pipeline::extract::{DestinationExtractor, PatternExtractor};
use crate::services::{Notifier, NotifyOutcome};
use crate::storage::HistoryStore;
use crate::utils::http::{HttpFetcher, PageFetcher};

pub struct ScanPipeline {
    fetcher: Arc<dyn PageFetcher>,
    extractor: Arc<dyn DestinationExtractor>,
    diff: DiffCalculator,
    history: Arc<HistoryStore>,
    notifier: Arc<Notifier>,
    /// Destinations from the latest successful scan of any URL
    previous: Mutex<Vec<DestinationRecord>>,
    last_id: AtomicI64,
}

impl ScanPipeline {
    pub fn new(
        fetcher: Arc<dyn PageFetcher>,
        extractor: Arc<dyn DestinationExtractor>,
        history: Arc<HistoryStore>,
        notifier: Arc<Notifier>,
    ) -> Self {
        Self {
            fetcher,
            extractor,
            diff: DiffCalculator::new(),
            history,
            notifier,
            previous: Mutex::new(Vec::new()),
            last_id: AtomicI64::new(0),
        }
    }

    /// Wire the production collaborators from configuration.
    pub fn from_config(config: &Config) -> Result<Self> {
        config.validate()?;

        let fetcher = Arc::new(HttpFetcher::new(&config.fetch)?);
        let extractor = Arc::new(PatternExtractor::new(&config.extraction)?);
        let history = Arc::new(HistoryStore::from_config(&config.monitor));
        let sms_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.fetch.timeout_secs))
            .build()?;
        let notifier = Arc::new(Notifier::from_config(&config.sms, sms_client));

        Ok(Self::new(fetcher, extractor, history, notifier))
    }

    pub fn history(&self) -> &Arc<HistoryStore> {
        &self.history
    }

    pub fn notifier(&self) -> &Arc<Notifier> {
        &self.notifier
    }

    /// Copy of the snapshot the next scan will be compared against.
    pub async fn previous_snapshot(&self) -> Vec<DestinationRecord> {
        self.previous.lock().await.clone()
    }

    /// Fetch `url`, extract destinations, diff against the previous snapshot
    /// and record the result.
    pub async fn run(&self, url: &str) -> ScanRecord {
        log::info!("Scanning {} for flight destinations", url);

        let markup = match self.fetcher.fetch(url).await {
            Ok(markup) => markup,
            Err(e) => {
                log::error!("Scan failed: {}", e);
                let record = ScanRecord::failed(self.next_id(), url, e.to_string());
                self.history.record_scan(record.clone()).await;
                return record;
            }
        };

        let destinations = self.extractor.extract(&markup);

        // Diff and swap together so concurrent scans each see a committed snapshot.
        let changes = {
            let mut previous = self.previous.lock().await;
            let changes = self.diff.calculate(&destinations, &previous);
            *previous = destinations.clone();
            changes
        };

        let dispatch = if changes.is_empty() {
            None
        } else if self.notifier.can_deliver() {
            Some(NotificationDispatch::Dispatched)
        } else {
            Some(NotificationDispatch::Disabled)
        };

        let record = ScanRecord::completed(self.next_id(), url, destinations, changes, dispatch);
        log_summary(&record);
        self.history.record_scan(record.clone()).await;

        if dispatch == Some(NotificationDispatch::Dispatched) {
            self.dispatch_notification(record.changes.clone(), record.destinations.clone());
        }

        record
    }

    fn dispatch_notification(&self, changes: Vec<Change>, destinations: Vec<DestinationRecord>) {
        let notifier = Arc::clone(&self.notifier);
        let history = Arc::clone(&self.history);

        tokio::spawn(async move {
            let record = match notifier.notify(&changes, &destinations).await {
                NotifyOutcome::Sent { delivery_id, phone } => {
                    NotificationRecord::delivered(changes, phone, delivery_id)
                }
                NotifyOutcome::Failed { error, phone } => {
                    NotificationRecord::failed(changes, phone, error)
                }
                NotifyOutcome::Disabled { .. } => return,
            };
            history.record_notification(record).await;
        });
    }

    /// Millisecond timestamp, bumped when two scans land in the same millisecond.
    fn next_id(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let prev = self
            .last_id
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |last| {
                Some(now.max(last + 1))
            })
            .unwrap_or_else(|last| last);
        now.max(prev + 1)
    }
}

fn log_summary(record: &ScanRecord) {
    log::info!(
        "Found {} destinations, {} changes",
        record.total_destinations,
        record.total_changes
    );
    for destination in &record.destinations {
        log::debug!(
            "  {} | price {} | departs {} | returns {} | seen {}x",
            destination.display_name,
            destination.price,
            destination.departure_date,
            destination.return_date,
            destination.occurrences
        );
    }
    for change in &record.changes {
        log::info!("  {}", change);
    }
}
