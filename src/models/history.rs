//! Records retained by the history store.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{Change, DestinationRecord};

/// What happened to the notification for a scan with changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationDispatch {
    /// Delivery was handed to a background task
    Dispatched,
    /// The notifier is not configured
    Disabled,
}

/// Result of one fetch-and-compare cycle.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanRecord {
    /// Millisecond timestamp, strictly increasing within the process
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub url: String,
    pub destinations: Vec<DestinationRecord>,
    pub changes: Vec<Change>,
    pub total_destinations: usize,
    pub total_changes: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationDispatch>,
}

impl ScanRecord {
    /// A successful scan.
    pub fn completed(
        id: i64,
        url: impl Into<String>,
        destinations: Vec<DestinationRecord>,
        changes: Vec<Change>,
        notification: Option<NotificationDispatch>,
    ) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            url: url.into(),
            total_destinations: destinations.len(),
            total_changes: changes.len(),
            destinations,
            changes,
            error: None,
            notification,
        }
    }

    /// A scan whose fetch failed.
    pub fn failed(id: i64, url: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            id,
            timestamp: Utc::now(),
            url: url.into(),
            destinations: Vec::new(),
            changes: Vec::new(),
            total_destinations: 0,
            total_changes: 0,
            error: Some(error.into()),
            notification: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn has_changes(&self) -> bool {
        !self.changes.is_empty()
    }
}

/// One delivery attempt of a change alert.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationRecord {
    pub timestamp: DateTime<Utc>,
    pub changes: Vec<Change>,
    pub destination_phone: String,
    /// Transport-assigned id when delivered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub delivery_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl NotificationRecord {
    pub fn delivered(
        changes: Vec<Change>,
        destination_phone: impl Into<String>,
        delivery_id: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            changes,
            destination_phone: destination_phone.into(),
            delivery_id: Some(delivery_id.into()),
            error: None,
        }
    }

    pub fn failed(
        changes: Vec<Change>,
        destination_phone: impl Into<String>,
        error: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            changes,
            destination_phone: destination_phone.into(),
            delivery_id: None,
            error: Some(error.into()),
        }
    }

    pub fn is_delivered(&self) -> bool {
        self.delivery_id.is_some()
    }
}
