//! Weekday and recurrence schedule model.
//!
//! # Responsibility
//! - Own the one and only calendar-date -> weekday mapping used by core.
//! - Provide the Monday-first index convention shared with day pickers.
//!
//! # Invariants
//! - `Weekday::index()` is `0` for Monday through `6` for Sunday.
//! - A `Schedule` never holds duplicates and iterates Monday-first.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::btree_set;
use std::collections::BTreeSet;

/// Day of week used by habit schedules.
///
/// Variant order is the Monday-first week; derived `Ord` relies on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Weekday {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    /// All weekdays, Monday-first.
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Monday-first position in the week (`0..=6`).
    pub fn index(self) -> usize {
        match self {
            Self::Monday => 0,
            Self::Tuesday => 1,
            Self::Wednesday => 2,
            Self::Thursday => 3,
            Self::Friday => 4,
            Self::Saturday => 5,
            Self::Sunday => 6,
        }
    }

    /// Inverse of [`Weekday::index`]. Returns `None` outside `0..=6`.
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    /// Stable lowercase name, shared by persistence and FFI.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Monday => "monday",
            Self::Tuesday => "tuesday",
            Self::Wednesday => "wednesday",
            Self::Thursday => "thursday",
            Self::Friday => "friday",
            Self::Saturday => "saturday",
            Self::Sunday => "sunday",
        }
    }

    /// Parses a weekday name; accepts full names and three-letter forms.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "monday" | "mon" => Some(Self::Monday),
            "tuesday" | "tue" => Some(Self::Tuesday),
            "wednesday" | "wed" => Some(Self::Wednesday),
            "thursday" | "thu" => Some(Self::Thursday),
            "friday" | "fri" => Some(Self::Friday),
            "saturday" | "sat" => Some(Self::Saturday),
            "sunday" | "sun" => Some(Self::Sunday),
            _ => None,
        }
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(value: chrono::Weekday) -> Self {
        match value {
            chrono::Weekday::Mon => Self::Monday,
            chrono::Weekday::Tue => Self::Tuesday,
            chrono::Weekday::Wed => Self::Wednesday,
            chrono::Weekday::Thu => Self::Thursday,
            chrono::Weekday::Fri => Self::Friday,
            chrono::Weekday::Sat => Self::Saturday,
            chrono::Weekday::Sun => Self::Sunday,
        }
    }
}

/// Returns the weekday of a calendar day.
///
/// Every weekday lookup in core goes through this function.
pub fn weekday_of(day: NaiveDate) -> Weekday {
    Weekday::from(day.weekday())
}

/// Set of weekdays a habit recurs on.
///
/// Empty means the tracker is a one-off item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Schedule(BTreeSet<Weekday>);

impl Schedule {
    /// Empty schedule (one-off tracker).
    pub fn one_off() -> Self {
        Self::default()
    }

    /// Schedule recurring on all seven days.
    pub fn every_day() -> Self {
        Weekday::ALL.into_iter().collect()
    }

    pub fn contains(&self, day: Weekday) -> bool {
        self.0.contains(&day)
    }

    /// Adds one day. Returns `false` when it was already present.
    pub fn insert(&mut self, day: Weekday) -> bool {
        self.0.insert(day)
    }

    pub fn remove(&mut self, day: Weekday) -> bool {
        self.0.remove(&day)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_every_day(&self) -> bool {
        self.0.len() == Weekday::ALL.len()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterates scheduled days Monday-first.
    pub fn iter(&self) -> btree_set::Iter<'_, Weekday> {
        self.0.iter()
    }

    /// Monday-first indexes, matching day-picker rows.
    pub fn indexes(&self) -> Vec<usize> {
        self.0.iter().map(|day| day.index()).collect()
    }
}

impl FromIterator<Weekday> for Schedule {
    fn from_iter<I: IntoIterator<Item = Weekday>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Schedule {
    type Item = &'a Weekday;
    type IntoIter = btree_set::Iter<'a, Weekday>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
