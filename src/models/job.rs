//! Monitoring job descriptions.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::ScanRecord;

/// Job id for a target URL. One job exists per distinct URL.
pub fn job_id(url: &str) -> String {
    format!("monitor-{}", url)
}

/// Public view of an active monitoring job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSummary {
    pub job_id: String,
    pub url: String,
    pub interval_minutes: u64,
    pub started_at: DateTime<Utc>,
}

impl JobSummary {
    pub fn new(url: impl Into<String>, interval_minutes: u64) -> Self {
        let url = url.into();
        Self {
            job_id: job_id(&url),
            url,
            interval_minutes,
            started_at: Utc::now(),
        }
    }
}

/// A started job together with its synchronous first scan.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStarted {
    #[serde(flatten)]
    pub job: JobSummary,
    /// Whether an existing job for the same URL was cancelled
    pub replaced: bool,
    pub initial_result: ScanRecord,
}
