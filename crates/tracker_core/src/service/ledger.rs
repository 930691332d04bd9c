//! In-memory completion ledger.
//!
//! # Invariants
//! - At most one entry per `(tracker_id, day)`.
//! - Trackers with no completions have no map entry.

use crate::model::record::CompletionRecord;
use crate::model::tracker::TrackerId;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap};

/// Completion records keyed by tracker, then by day.
#[derive(Debug, Clone, Default)]
pub struct CompletionLedger {
    days: HashMap<TrackerId, BTreeSet<NaiveDate>>,
}

impl CompletionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = CompletionRecord>,
    {
        let mut ledger = Self::new();
        for record in records {
            ledger.record(record.tracker_id, record.day);
        }
        ledger
    }

    /// Adds a record. Returns `false` when it already existed.
    pub fn record(&mut self, tracker_id: TrackerId, day: NaiveDate) -> bool {
        self.days.entry(tracker_id).or_default().insert(day)
    }

    /// Removes a record. Returns `false` when it was absent.
    pub fn unrecord(&mut self, tracker_id: TrackerId, day: NaiveDate) -> bool {
        let Some(days) = self.days.get_mut(&tracker_id) else {
            return false;
        };
        let removed = days.remove(&day);
        if days.is_empty() {
            self.days.remove(&tracker_id);
        }
        removed
    }

    pub fn is_completed(&self, tracker_id: TrackerId, day: NaiveDate) -> bool {
        self.days
            .get(&tracker_id)
            .is_some_and(|days| days.contains(&day))
    }

    pub fn completed_count(&self, tracker_id: TrackerId) -> usize {
        self.days.get(&tracker_id).map_or(0, BTreeSet::len)
    }

    pub fn has_any_completion(&self, tracker_id: TrackerId) -> bool {
        self.completed_count(tracker_id) > 0
    }

    /// Completed days of one tracker, oldest first.
    pub fn completed_days(&self, tracker_id: TrackerId) -> Vec<NaiveDate> {
        self.days
            .get(&tracker_id)
            .map(|days| days.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Total completed tracker-days across all trackers.
    pub fn total_completions(&self) -> usize {
        self.days.values().map(BTreeSet::len).sum()
    }

    /// Drops every record of a tracker. Returns how many were removed.
    pub fn forget_tracker(&mut self, tracker_id: TrackerId) -> usize {
        self.days.remove(&tracker_id).map_or(0, |days| days.len())
    }
}
