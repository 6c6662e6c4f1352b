//! Service layer for the monitor.
//!
//! This module contains:
//! - SMS change alerts (`Notifier`)
//! - Recurring monitoring jobs (`Scheduler`)

mod notifier;
mod scheduler;

pub use notifier::{
    ALERT_TAG, Notifier, NotifierStatus, NotifyOutcome, SmsTransport, TwilioTransport,
    format_alert,
};
pub use scheduler::{MAX_INTERVAL_MINUTES, Scheduler};
