//! Source of "today" for date-dependent commands and views.

use crate::model::record::local_today;
use chrono::NaiveDate;

/// Supplies the current calendar day.
pub trait Clock {
    fn today(&self) -> NaiveDate;
}

/// Local calendar day from the system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        local_today()
    }
}

/// Clock pinned to one day, for tests and replay.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
