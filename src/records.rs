//! Best completion time per level
//!
//! Kept in memory for the lifetime of a session.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::format_time;

/// Fastest recorded time for each level index
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BestTimes {
    entries: BTreeMap<usize, u32>,
}

impl BestTimes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check if a time would beat the current record for `level`
    pub fn qualifies(&self, level: usize, seconds: u32) -> bool {
        self.entries.get(&level).is_none_or(|&best| seconds < best)
    }

    /// Record a completion time. Returns true if it is a new best.
    pub fn record(&mut self, level: usize, seconds: u32) -> bool {
        if !self.qualifies(level, seconds) {
            return false;
        }
        self.entries.insert(level, seconds);
        log::info!("New record for level {}: {}", level + 1, format_time(seconds));
        true
    }

    pub fn get(&self, level: usize) -> Option<u32> {
        self.entries.get(&level).copied()
    }

    /// `(level, seconds)` pairs in level order
    pub fn iter(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.entries.iter().map(|(&level, &secs)| (level, secs))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }
}
