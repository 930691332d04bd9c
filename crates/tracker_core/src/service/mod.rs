//! Core use-case services.
//!
//! # Responsibility
//! - Evaluate schedules, completions and category rules in memory.
//! - Orchestrate repository writes into use-case level commands.
//! - Keep FFI/CLI layers decoupled from storage details.

pub mod clock;
pub mod filter_engine;
pub mod ledger;
pub mod organizer;
pub mod schedule;
pub mod tracker_service;

use crate::model::tracker::TrackerId;
use chrono::NaiveDate;

/// Non-fatal result of a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandOutcome {
    /// State changed as requested.
    Applied,
    /// Target tracker does not exist.
    NotFound,
    /// Create request for something that already exists.
    DuplicateIgnored,
    /// Request matched current state; nothing was written.
    Unchanged,
    /// Applied after recreating a missing origin category.
    Repaired,
    /// Completion toggle for a day after today; ignored.
    FutureDate,
}

impl CommandOutcome {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::NotFound => "not_found",
            Self::DuplicateIgnored => "duplicate_ignored",
            Self::Unchanged => "unchanged",
            Self::Repaired => "repaired",
            Self::FutureDate => "future_date",
        }
    }
}

/// Change event delivered to service subscribers after applied commands.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerChange {
    TrackerAdded(TrackerId),
    TrackerUpdated(TrackerId),
    TrackerDeleted(TrackerId),
    TrackerPinned(TrackerId),
    TrackerUnpinned(TrackerId),
    CompletionToggled {
        tracker_id: TrackerId,
        day: NaiveDate,
        completed: bool,
    },
    CategoryAdded(String),
    CategoryDeleted(String),
    Reloaded,
}
