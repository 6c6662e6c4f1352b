//! Bounded in-memory history of scans and notifications.
//!
//! Records are inserted at the head and evicted from the tail once the
//! capacity is reached, so reads are always most-recent-first. Nothing is
//! persisted: history lives for the lifetime of the process.

use std::collections::VecDeque;

use tokio::sync::RwLock;

use crate::models::{MonitorConfig, NotificationRecord, ScanRecord};

/// Default number of retained scans.
pub const SCAN_CAPACITY: usize = 200;

/// Default number of retained notifications.
pub const NOTIFICATION_CAPACITY: usize = 50;

/// Aggregate counters over the retained history.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HistoryCounts {
    pub scans: usize,
    pub notifications: usize,
    pub delivered: usize,
}

/// Ledger of recent scans and notification attempts.
#[derive(Debug)]
pub struct HistoryStore {
    scans: RwLock<VecDeque<ScanRecord>>,
    notifications: RwLock<VecDeque<NotificationRecord>>,
    scan_capacity: usize,
    notification_capacity: usize,
}

impl HistoryStore {
    /// Create a store with explicit capacities (each at least 1).
    pub fn new(scan_capacity: usize, notification_capacity: usize) -> Self {
        let scan_capacity = scan_capacity.max(1);
        let notification_capacity = notification_capacity.max(1);
        Self {
            scans: RwLock::new(VecDeque::with_capacity(scan_capacity)),
            notifications: RwLock::new(VecDeque::with_capacity(notification_capacity)),
            scan_capacity,
            notification_capacity,
        }
    }

    pub fn from_config(config: &MonitorConfig) -> Self {
        Self::new(
            config.scan_history_capacity,
            config.notification_history_capacity,
        )
    }

    pub async fn record_scan(&self, record: ScanRecord) {
        push_bounded(&mut *self.scans.write().await, record, self.scan_capacity);
    }

    pub async fn record_notification(&self, record: NotificationRecord) {
        push_bounded(
            &mut *self.notifications.write().await,
            record,
            self.notification_capacity,
        );
    }

    /// Most recent scans, newest first.
    pub async fn recent_scans(&self, limit: usize) -> Vec<ScanRecord> {
        self.scans.read().await.iter().take(limit).cloned().collect()
    }

    /// Most recent scans that detected at least one change.
    pub async fn recent_changes(&self, limit: usize) -> Vec<ScanRecord> {
        self.scans
            .read()
            .await
            .iter()
            .filter(|scan| scan.has_changes())
            .take(limit)
            .cloned()
            .collect()
    }

    /// Most recent notification attempts, newest first.
    pub async fn recent_notifications(&self, limit: usize) -> Vec<NotificationRecord> {
        self.notifications
            .read()
            .await
            .iter()
            .take(limit)
            .cloned()
            .collect()
    }

    /// The newest scan, failed or not.
    pub async fn latest_scan(&self) -> Option<ScanRecord> {
        self.scans.read().await.front().cloned()
    }

    pub async fn counts(&self) -> HistoryCounts {
        let scans = self.scans.read().await.len();
        let notifications = self.notifications.read().await;
        HistoryCounts {
            scans,
            notifications: notifications.len(),
            delivered: notifications.iter().filter(|n| n.is_delivered()).count(),
        }
    }
}

impl Default for HistoryStore {
    fn default() -> Self {
        Self::new(SCAN_CAPACITY, NOTIFICATION_CAPACITY)
    }
}

fn push_bounded<T>(items: &mut VecDeque<T>, item: T, capacity: usize) {
    items.push_front(item);
    items.truncate(capacity);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Change;

    fn scan(id: i64, changes: Vec<Change>) -> ScanRecord {
        ScanRecord::completed(id, "https://example.com", vec![], changes, None)
    }

    #[tokio::test]
    async fn test_empty_reads() {
        let store = HistoryStore::default();
        assert!(store.recent_scans(10).await.is_empty());
        assert!(store.recent_changes(10).await.is_empty());
        assert!(store.recent_notifications(10).await.is_empty());
        assert!(store.latest_scan().await.is_none());
        assert_eq!(store.counts().await, HistoryCounts::default());
    }

    #[tokio::test]
    async fn test_newest_first() {
        let store = HistoryStore::default();
        for id in 1..=3 {
            store.record_scan(scan(id, vec![])).await;
        }

        let ids: Vec<i64> = store.recent_scans(10).await.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(store.recent_scans(2).await.len(), 2);
        assert_eq!(store.latest_scan().await.map(|s| s.id), Some(3));
    }

    #[tokio::test]
    async fn test_scan_capacity_evicts_oldest() {
        let store = HistoryStore::default();
        for id in 0..250 {
            store.record_scan(scan(id, vec![])).await;
        }

        let scans = store.recent_scans(usize::MAX).await;
        assert_eq!(scans.len(), SCAN_CAPACITY);
        assert_eq!(scans.first().map(|s| s.id), Some(249));
        assert_eq!(scans.last().map(|s| s.id), Some(50));
    }

    #[tokio::test]
    async fn test_notification_capacity_evicts_oldest() {
        let store = HistoryStore::default();
        for i in 0..60 {
            store
                .record_notification(NotificationRecord::delivered(
                    vec![],
                    "+1555",
                    format!("SM{}", i),
                ))
                .await;
        }

        let notifications = store.recent_notifications(usize::MAX).await;
        assert_eq!(notifications.len(), NOTIFICATION_CAPACITY);
        assert_eq!(notifications[0].delivery_id.as_deref(), Some("SM59"));
        assert_eq!(notifications[49].delivery_id.as_deref(), Some("SM10"));
    }

    #[tokio::test]
    async fn test_recent_changes_filters_quiet_scans() {
        let store = HistoryStore::default();
        store.record_scan(scan(1, vec![Change::Added("Eilat".into())])).await;
        store.record_scan(scan(2, vec![])).await;
        store.record_scan(scan(3, vec![Change::Removed("Eilat".into())])).await;

        let ids: Vec<i64> = store.recent_changes(10).await.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![3, 1]);
        assert_eq!(store.recent_changes(1).await.len(), 1);
    }

    #[tokio::test]
    async fn test_counts_only_delivered() {
        let store = HistoryStore::new(5, 5);
        store
            .record_notification(NotificationRecord::delivered(vec![], "+1", "SM1"))
            .await;
        store
            .record_notification(NotificationRecord::failed(vec![], "+1", "rejected"))
            .await;

        let counts = store.counts().await;
        assert_eq!(counts.notifications, 2);
        assert_eq!(counts.delivered, 1);
    }
}
