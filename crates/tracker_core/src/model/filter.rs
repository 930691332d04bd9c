//! View filter selection.

use serde::{Deserialize, Serialize};

/// Four-way filter applied to the tracker view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackerFilter {
    /// Every tracker due on the selected date.
    #[default]
    All,
    /// Every tracker due today, whatever date is selected.
    DueToday,
    /// Due and completed on the selected date.
    Completed,
    /// Due and not completed on the selected date.
    Uncompleted,
}

impl TrackerFilter {
    pub const ALL: [TrackerFilter; 4] = [
        TrackerFilter::All,
        TrackerFilter::DueToday,
        TrackerFilter::Completed,
        TrackerFilter::Uncompleted,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::All => "all",
            Self::DueToday => "due_today",
            Self::Completed => "completed",
            Self::Uncompleted => "uncompleted",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Some(Self::All),
            "due_today" | "today" => Some(Self::DueToday),
            "completed" => Some(Self::Completed),
            "uncompleted" => Some(Self::Uncompleted),
            _ => None,
        }
    }
}
