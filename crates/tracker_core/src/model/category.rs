//! Tracker category model.
//!
//! # Invariants
//! - Named category titles are unique and compared case-sensitively.
//! - The pinned bucket is identified by `is_pinned`, never by its title.

use crate::model::tracker::{Tracker, TrackerValidationError};
use serde::{Deserialize, Serialize};

/// Display label of the pinned bucket.
///
/// Presentation layers may localize it; core never matches on it.
pub const PINNED_CATEGORY_TITLE: &str = "Pinned";

/// Named group of trackers, or the pinned bucket.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackerCategory {
    pub title: String,
    /// Trackers in stored order.
    pub trackers: Vec<Tracker>,
    pub is_pinned: bool,
}

impl TrackerCategory {
    pub fn named(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            trackers: Vec::new(),
            is_pinned: false,
        }
    }

    pub fn pinned() -> Self {
        Self {
            title: PINNED_CATEGORY_TITLE.to_string(),
            trackers: Vec::new(),
            is_pinned: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.trackers.is_empty()
    }
}

/// Trims a user-provided category title.
///
/// Case is preserved: `Health` and `health` are distinct categories.
pub fn normalize_category_title(value: &str) -> Result<String, TrackerValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(TrackerValidationError::BlankCategoryTitle);
    }
    Ok(trimmed.to_string())
}
