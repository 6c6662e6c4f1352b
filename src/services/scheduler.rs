// src/services/scheduler.rs

//! Recurring monitoring jobs, at most one per URL.
//!
//! Each job owns a trigger task that wakes every interval and launches a scan
//! on its own task. A tick that arrives while the job's previous scan is still
//! running is skipped. Stopping a job cancels its trigger; a scan that is
//! already running finishes and is recorded normally.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::{self, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, Result};
use crate::models::{JobStarted, JobSummary, job_id};
use crate::pipeline::ScanPipeline;
use crate::utils::validate_target_url;

/// Longest accepted interval, one week.
pub const MAX_INTERVAL_MINUTES: u64 = 7 * 24 * 60;

struct ActiveJob {
    summary: JobSummary,
    cancel: CancellationToken,
}

pub struct Scheduler {
    pipeline: Arc<ScanPipeline>,
    jobs: Mutex<HashMap<String, ActiveJob>>,
}

impl Scheduler {
    pub fn new(pipeline: Arc<ScanPipeline>) -> Self {
        Self {
            pipeline,
            jobs: Mutex::new(HashMap::new()),
        }
    }

    pub fn pipeline(&self) -> &Arc<ScanPipeline> {
        &self.pipeline
    }

    /// Start (or restart) monitoring `url`.
    ///
    /// Runs one scan immediately and returns it with the job summary. Any
    /// existing job for the same URL is cancelled first. The job is listed
    /// while that scan runs, so a `stop` in the meantime cancels it before
    /// its trigger is installed.
    pub async fn start(&self, url: &str, interval_minutes: u64) -> Result<JobStarted> {
        validate_target_url(url)?;
        if interval_minutes == 0 || interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(AppError::validation(format!(
                "Interval must be between 1 and {} minutes, got {}",
                MAX_INTERVAL_MINUTES, interval_minutes
            )));
        }

        let summary = JobSummary::new(url, interval_minutes);
        let cancel = CancellationToken::new();

        let replaced = {
            let mut jobs = self.jobs.lock().await;
            let job = ActiveJob {
                summary: summary.clone(),
                cancel: cancel.clone(),
            };
            match jobs.insert(job_id(url), job) {
                Some(previous) => {
                    previous.cancel.cancel();
                    true
                }
                None => false,
            }
        };

        log::info!(
            "Starting monitoring for {} every {} minute(s)",
            url,
            interval_minutes
        );
        let initial_result = self.pipeline.run(url).await;

        // Every path that removes or replaces a job cancels its token first.
        let jobs = self.jobs.lock().await;
        if cancel.is_cancelled() {
            log::info!("Monitoring for {} was stopped during its initial scan", url);
        } else {
            spawn_trigger(
                Arc::clone(&self.pipeline),
                url.to_string(),
                Duration::from_secs(interval_minutes * 60),
                cancel,
            );
        }
        drop(jobs);

        Ok(JobStarted {
            job: summary,
            replaced,
            initial_result,
        })
    }

    /// Stop monitoring `url`. Returns false when no job existed.
    pub async fn stop(&self, url: &str) -> bool {
        let stopped = self.cancel_job(&job_id(url)).await;
        if stopped {
            log::info!("Stopped monitoring {}", url);
        }
        stopped
    }

    /// Active jobs ordered by URL.
    pub async fn status(&self) -> Vec<JobSummary> {
        let jobs = self.jobs.lock().await;
        let mut summaries: Vec<JobSummary> = jobs.values().map(|job| job.summary.clone()).collect();
        summaries.sort_by(|a, b| a.url.cmp(&b.url));
        summaries
    }

    /// Cancel every trigger.
    pub async fn shutdown(&self) {
        let mut jobs = self.jobs.lock().await;
        for (_, job) in jobs.drain() {
            job.cancel.cancel();
        }
        log::info!("All monitoring jobs stopped");
    }

    async fn cancel_job(&self, id: &str) -> bool {
        match self.jobs.lock().await.remove(id) {
            Some(job) => {
                job.cancel.cancel();
                true
            }
            None => false,
        }
    }
}

fn spawn_trigger(
    pipeline: Arc<ScanPipeline>,
    url: String,
    period: Duration,
    cancel: CancellationToken,
) {
    tokio::spawn(async move {
        let mut ticker = time::interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let in_flight = Arc::new(Mutex::new(()));

        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let Ok(guard) = Arc::clone(&in_flight).try_lock_owned() else {
                        log::warn!("Previous scan of {} still running, skipping tick", url);
                        continue;
                    };
                    let pipeline = Arc::clone(&pipeline);
                    let url = url.clone();
                    tokio::spawn(async move {
                        let _guard = guard;
                        pipeline.run(&url).await;
                    });
                }
            }
        }

        log::debug!("Trigger for {} cancelled", url);
    });
}
