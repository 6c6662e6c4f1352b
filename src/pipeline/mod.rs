//! Scan pipeline: fetch a page, extract destinations, diff against the
//! previous snapshot.
//!
//! - `extract`: Trigger-phrase and hyperlink destination extraction
//! - `diff`: Added, removed and repriced destinations between snapshots
//! - `scan`: One full scan cycle with history and alerts

pub mod diff;
pub mod extract;
pub mod scan;

#[cfg(test)]
pub(crate) mod fixtures;

pub use diff::{DiffCalculator, calculate_diff};
pub use extract::{DestinationExtractor, PatternExtractor};
pub use scan::ScanPipeline;
