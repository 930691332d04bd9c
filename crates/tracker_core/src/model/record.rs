//! Completion record model and calendar-day helpers.
//!
//! # Invariants
//! - A record's `day` is a calendar day, never a timestamp.
//! - Days are persisted and exchanged as `YYYY-MM-DD`.

use crate::model::tracker::TrackerId;
use chrono::{DateTime, Local, NaiveDate, TimeZone};
use serde::{Deserialize, Serialize};

/// Text format for calendar days at persistence/FFI boundaries.
pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// One "done" mark for a tracker on one calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CompletionRecord {
    pub tracker_id: TrackerId,
    pub day: NaiveDate,
}

impl CompletionRecord {
    pub fn new(tracker_id: TrackerId, day: NaiveDate) -> Self {
        Self { tracker_id, day }
    }
}

/// Normalizes a timestamp to its calendar day in the timestamp's own zone.
pub fn calendar_day<Tz: TimeZone>(at: &DateTime<Tz>) -> NaiveDate {
    at.date_naive()
}

/// Normalizes epoch milliseconds to the local calendar day.
///
/// Returns `None` for out-of-range or ambiguous instants.
pub fn calendar_day_from_epoch_ms(epoch_ms: i64) -> Option<NaiveDate> {
    Local
        .timestamp_millis_opt(epoch_ms)
        .single()
        .map(|at| calendar_day(&at))
}

/// Current local calendar day.
pub fn local_today() -> NaiveDate {
    calendar_day(&Local::now())
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Parses a `YYYY-MM-DD` day. Surrounding whitespace is ignored.
pub fn parse_day(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), DAY_FORMAT).ok()
}
