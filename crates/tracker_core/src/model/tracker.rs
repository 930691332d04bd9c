//! Tracker domain model.
//!
//! # Responsibility
//! - Define the canonical trackable item (habit or one-off).
//! - Hold pin metadata as explicit fields instead of a reserved category.
//! - Validate user-provided fields before persistence.
//!
//! # Invariants
//! - `id` is stable and never reused for another tracker.
//! - `is_pinned == previous_category.is_some()`.
//! - Title is trimmed, non-empty and at most `TITLE_MAX_CHARS` characters.

use crate::model::weekday::{Schedule, Weekday};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Maximum title length accepted from user input, in characters.
pub const TITLE_MAX_CHARS: usize = 38;

static WHITESPACE_RUN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("valid whitespace regex"));

/// Stable identifier for a tracker.
pub type TrackerId = Uuid;

/// Recurrence flavour derived from the schedule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerKind {
    /// Non-empty schedule, recurs every scheduled weekday.
    Habit,
    /// Empty schedule, done once.
    OneOff,
}

/// Validation failures for tracker and category input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackerValidationError {
    BlankTitle,
    TitleTooLong { chars: usize, max: usize },
    BlankEmoji,
    BlankColor,
    BlankCategoryTitle,
    /// Pinned tracker without a remembered origin category.
    PinnedWithoutOrigin(TrackerId),
    /// Unpinned tracker still carrying origin-category memory.
    StalePinOrigin(TrackerId),
}

impl Display for TrackerValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankTitle => write!(f, "tracker title must not be blank"),
            Self::TitleTooLong { chars, max } => {
                write!(f, "tracker title has {chars} characters; limit is {max}")
            }
            Self::BlankEmoji => write!(f, "tracker emoji must not be blank"),
            Self::BlankColor => write!(f, "tracker color must not be blank"),
            Self::BlankCategoryTitle => write!(f, "category title must not be blank"),
            Self::PinnedWithoutOrigin(id) => {
                write!(f, "pinned tracker {id} has no previous category")
            }
            Self::StalePinOrigin(id) => {
                write!(f, "unpinned tracker {id} still has a previous category")
            }
        }
    }
}

impl Error for TrackerValidationError {}

/// Canonical trackable item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tracker {
    pub id: TrackerId,
    pub title: String,
    pub emoji: String,
    /// Opaque color token chosen by the presentation layer.
    pub color: String,
    pub schedule: Schedule,
    pub is_pinned: bool,
    /// Category to restore on unpin. Set only while pinned.
    pub previous_category: Option<String>,
}

impl Tracker {
    /// Creates an unpinned tracker with a generated stable ID.
    pub fn new(
        title: impl Into<String>,
        emoji: impl Into<String>,
        color: impl Into<String>,
        schedule: Schedule,
    ) -> Self {
        Self::with_id(Uuid::new_v4(), title, emoji, color, schedule)
    }

    /// Creates an unpinned tracker with a caller-provided ID.
    ///
    /// Used by load paths where identity already exists.
    pub fn with_id(
        id: TrackerId,
        title: impl Into<String>,
        emoji: impl Into<String>,
        color: impl Into<String>,
        schedule: Schedule,
    ) -> Self {
        Self {
            id,
            title: title.into(),
            emoji: emoji.into(),
            color: color.into(),
            schedule,
            is_pinned: false,
            previous_category: None,
        }
    }

    pub fn kind(&self) -> TrackerKind {
        if self.schedule.is_empty() {
            TrackerKind::OneOff
        } else {
            TrackerKind::Habit
        }
    }

    pub fn is_habit(&self) -> bool {
        self.kind() == TrackerKind::Habit
    }

    pub fn recurs_on(&self, day: Weekday) -> bool {
        self.schedule.contains(day)
    }

    /// Checks field and pin-state invariants.
    pub fn validate(&self) -> Result<(), TrackerValidationError> {
        validate_title(&self.title)?;
        if self.emoji.trim().is_empty() {
            return Err(TrackerValidationError::BlankEmoji);
        }
        if self.color.trim().is_empty() {
            return Err(TrackerValidationError::BlankColor);
        }
        match (self.is_pinned, self.previous_category.as_deref()) {
            (true, None) => Err(TrackerValidationError::PinnedWithoutOrigin(self.id)),
            (false, Some(_)) => Err(TrackerValidationError::StalePinOrigin(self.id)),
            (true, Some(title)) if title.trim().is_empty() => {
                Err(TrackerValidationError::BlankCategoryTitle)
            }
            _ => Ok(()),
        }
    }
}

/// Trims a title and collapses inner whitespace runs into single spaces.
pub fn normalize_title(value: &str) -> String {
    WHITESPACE_RUN_RE
        .replace_all(value.trim(), " ")
        .into_owned()
}

fn validate_title(title: &str) -> Result<(), TrackerValidationError> {
    if title.trim().is_empty() {
        return Err(TrackerValidationError::BlankTitle);
    }
    let chars = title.chars().count();
    if chars > TITLE_MAX_CHARS {
        return Err(TrackerValidationError::TitleTooLong {
            chars,
            max: TITLE_MAX_CHARS,
        });
    }
    Ok(())
}
