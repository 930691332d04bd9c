//! Core engine for habit and one-off trackers.
//! This crate is the single source of truth for scheduling, completion and
//! category invariants.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status};
pub use model::category::{TrackerCategory, PINNED_CATEGORY_TITLE};
pub use model::filter::TrackerFilter;
pub use model::record::{
    calendar_day, calendar_day_from_epoch_ms, format_day, local_today, parse_day,
    CompletionRecord,
};
pub use model::tracker::{Tracker, TrackerId, TrackerKind, TrackerValidationError, TITLE_MAX_CHARS};
pub use model::weekday::{weekday_of, Schedule, Weekday};
pub use repo::tracker_repo::{RepoError, RepoResult, SqliteTrackerRepository, TrackerRepository};
pub use service::clock::{Clock, FixedClock, SystemClock};
pub use service::filter_engine::{TrackerSection, TrackerViewItem, ViewQuery};
pub use service::schedule::is_due;
pub use service::tracker_service::{
    NewTracker, TrackerDetails, TrackerService, TrackerServiceError, TrackerServiceResult,
    TrackerStatistics, TrackerUpdate,
};
pub use service::{CommandOutcome, TrackerChange};

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
