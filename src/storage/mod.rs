//! Storage for scan and notification history.
//!
//! History is deliberately kept in memory only and is lost on restart.

pub mod history;

// Re-export for convenience
pub use history::{HistoryCounts, HistoryStore, NOTIFICATION_CAPACITY, SCAN_CAPACITY};
