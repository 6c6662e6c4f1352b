// src/models/mod.rs

//! Domain models for the flight monitor.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod destination;
mod history;
mod job;

// Re-export all public types
pub use config::{
    Config, DestinationName, ExtractionConfig, FetchConfig, MonitorConfig, ServerConfig,
    SmsConfig,
};
pub use destination::{Change, DestinationRecord, NOT_AVAILABLE, SourceHint};
pub use history::{NotificationDispatch, NotificationRecord, ScanRecord};
pub use job::{JobStarted, JobSummary, job_id};
