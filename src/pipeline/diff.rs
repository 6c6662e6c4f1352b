//! Diff calculation between destination snapshots.
//!
//! Compares the freshly extracted destinations against the previous
//! snapshot and renders additions, removals and price changes, in that
//! order. Identity is the display name.

use std::collections::{HashMap, HashSet};

use crate::models::{Change, DestinationRecord};

/// Calculator for computing diffs between snapshots.
#[derive(Debug, Clone, Default)]
pub struct DiffCalculator;

impl DiffCalculator {
    /// Create a new diff calculator.
    pub fn new() -> Self {
        Self
    }

    /// Calculate the changes from `previous` to `current`.
    ///
    /// Within each category entries follow the order of the input slices.
    pub fn calculate(
        &self,
        current: &[DestinationRecord],
        previous: &[DestinationRecord],
    ) -> Vec<Change> {
        let prev_map: HashMap<&str, &DestinationRecord> = previous
            .iter()
            .map(|d| (d.display_name.as_str(), d))
            .collect();
        let curr_names: HashSet<&str> = current.iter().map(|d| d.display_name.as_str()).collect();

        let mut changes = Vec::new();

        // Added: in current but not in previous
        changes.extend(
            current
                .iter()
                .filter(|d| !prev_map.contains_key(d.display_name.as_str()))
                .map(|d| Change::Added(d.display_name.clone())),
        );

        // Removed: in previous but not in current
        changes.extend(
            previous
                .iter()
                .filter(|d| !curr_names.contains(d.display_name.as_str()))
                .map(|d| Change::Removed(d.display_name.clone())),
        );

        for curr in current {
            let Some(prev) = prev_map.get(curr.display_name.as_str()) else {
                continue;
            };

            // A move to or from the sentinel is not a price change.
            if prev.has_price() && curr.has_price() && prev.price != curr.price {
                changes.push(Change::PriceChanged {
                    name: curr.display_name.clone(),
                    old: prev.price.clone(),
                    new: curr.price.clone(),
                });
            }
        }

        changes
    }
}

/// Convenience function to calculate diff.
pub fn calculate_diff(
    current: &[DestinationRecord],
    previous: &[DestinationRecord],
) -> Vec<Change> {
    DiffCalculator::new().calculate(current, previous)
}
