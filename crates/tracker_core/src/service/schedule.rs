//! Schedule evaluation.
//!
//! # Invariants
//! - Habits ignore completion state entirely.
//! - One-off items stay visible on their completion day.

use crate::model::tracker::Tracker;
use crate::model::weekday::weekday_of;
use chrono::NaiveDate;

/// Decides whether `tracker` belongs in the view for `day`.
///
/// - Habit: due iff the weekday of `day` is in its schedule.
/// - One-off: due iff it was never completed, or it was completed on `day`.
pub fn is_due(
    tracker: &Tracker,
    day: NaiveDate,
    has_any_completion: bool,
    is_completed_on_day: bool,
) -> bool {
    if tracker.is_habit() {
        tracker.recurs_on(weekday_of(day))
    } else {
        !has_any_completion || is_completed_on_day
    }
}
