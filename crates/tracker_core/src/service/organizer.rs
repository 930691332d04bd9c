//! In-memory category organization with the pinned bucket.
//!
//! # Responsibility
//! - Group trackers into named categories and the pinned bucket.
//! - Move trackers between groups while keeping stored order stable.
//!
//! # Invariants
//! - Every tracker lives in exactly one group.
//! - Pinned trackers carry `previous_category`; unpinned ones never do.
//! - Named categories iterate byte-wise by title.
//! - The pinned bucket, once created, is never removed.

use crate::model::category::TrackerCategory;
use crate::model::tracker::{Tracker, TrackerId};
use crate::service::CommandOutcome;
use std::collections::BTreeMap;

/// Category state backing tracker views.
#[derive(Debug, Clone, Default)]
pub struct CategoryOrganizer {
    named: BTreeMap<String, Vec<Tracker>>,
    pinned: Option<Vec<Tracker>>,
}

impl CategoryOrganizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds state from loaded categories.
    ///
    /// Trackers in the flagged bucket are stored as pinned; trackers in named
    /// categories keep their listed order.
    pub fn from_categories<I>(categories: I) -> Self
    where
        I: IntoIterator<Item = TrackerCategory>,
    {
        let mut organizer = Self::new();
        for category in categories {
            if category.is_pinned {
                organizer
                    .pinned
                    .get_or_insert_with(Vec::new)
                    .extend(category.trackers);
            } else {
                organizer
                    .named
                    .entry(category.title)
                    .or_default()
                    .extend(category.trackers);
            }
        }
        organizer
    }

    /// Pinned bucket first when it has trackers, then named categories by
    /// title. Empty named categories are included.
    pub fn all_categories(&self) -> Vec<TrackerCategory> {
        let mut categories = Vec::with_capacity(self.named.len() + 1);
        if let Some(pinned) = self.pinned.as_ref().filter(|items| !items.is_empty()) {
            let mut bucket = TrackerCategory::pinned();
            bucket.trackers = pinned.clone();
            categories.push(bucket);
        }
        categories.extend(self.named.iter().map(|(title, trackers)| TrackerCategory {
            title: title.clone(),
            trackers: trackers.clone(),
            is_pinned: false,
        }));
        categories
    }

    /// Named category titles in display order.
    pub fn category_titles(&self) -> Vec<String> {
        self.named.keys().cloned().collect()
    }

    pub fn has_category(&self, title: &str) -> bool {
        self.named.contains_key(title)
    }

    /// Creates an empty named category. Returns `false` when it exists.
    pub fn add_category(&mut self, title: &str) -> bool {
        if self.named.contains_key(title) {
            return false;
        }
        self.named.insert(title.to_string(), Vec::new());
        true
    }

    /// Drops a named category with its unpinned trackers.
    ///
    /// Trackers pinned from it stay pinned and keep their origin memory.
    pub fn remove_category(&mut self, title: &str) -> Option<Vec<Tracker>> {
        self.named.remove(title)
    }

    pub fn ensure_pinned_category_exists(&mut self) {
        self.pinned.get_or_insert_with(Vec::new);
    }

    pub fn pinned_trackers(&self) -> &[Tracker] {
        self.pinned.as_deref().unwrap_or(&[])
    }

    /// Appends a tracker to its group, creating the group when missing.
    ///
    /// Pinned trackers go to the pinned bucket; others to `category_title`.
    pub fn insert_tracker(&mut self, tracker: Tracker, category_title: &str) {
        if tracker.is_pinned {
            self.pinned.get_or_insert_with(Vec::new).push(tracker);
        } else {
            self.named
                .entry(category_title.to_string())
                .or_default()
                .push(tracker);
        }
    }

    pub fn tracker(&self, id: TrackerId) -> Option<&Tracker> {
        self.groups().flatten().find(|tracker| tracker.id == id)
    }

    /// Home category of a tracker: its named category, or the remembered
    /// origin while pinned.
    pub fn category_of(&self, id: TrackerId) -> Option<&str> {
        if let Some(tracker) = self.pinned_trackers().iter().find(|t| t.id == id) {
            return tracker.previous_category.as_deref();
        }
        self.named
            .iter()
            .find(|(_, trackers)| trackers.iter().any(|t| t.id == id))
            .map(|(title, _)| title.as_str())
    }

    /// Moves a tracker to `category_title`, creating the category.
    ///
    /// A pinned tracker stays pinned; only its origin memory is rewritten.
    pub fn assign_tracker(&mut self, id: TrackerId, category_title: &str) -> CommandOutcome {
        if let Some(tracker) = self.pinned_mut(id) {
            if tracker.previous_category.as_deref() == Some(category_title) {
                return CommandOutcome::Unchanged;
            }
            tracker.previous_category = Some(category_title.to_string());
            self.add_category(category_title);
            return CommandOutcome::Applied;
        }

        match self.category_of(id).map(str::to_string) {
            None => CommandOutcome::NotFound,
            Some(current) if current == category_title => CommandOutcome::Unchanged,
            Some(_) => {
                let Some(tracker) = self.take_named(id) else {
                    return CommandOutcome::NotFound;
                };
                self.insert_tracker(tracker, category_title);
                CommandOutcome::Applied
            }
        }
    }

    /// Moves a tracker to the end of the pinned bucket, remembering its
    /// category.
    pub fn pin(&mut self, id: TrackerId) -> CommandOutcome {
        if self.pinned_trackers().iter().any(|t| t.id == id) {
            return CommandOutcome::Unchanged;
        }
        let Some(origin) = self.category_of(id).map(str::to_string) else {
            return CommandOutcome::NotFound;
        };
        let Some(mut tracker) = self.take_named(id) else {
            return CommandOutcome::NotFound;
        };
        tracker.is_pinned = true;
        tracker.previous_category = Some(origin);
        self.pinned.get_or_insert_with(Vec::new).push(tracker);
        CommandOutcome::Applied
    }

    /// Moves a pinned tracker to the end of its remembered category.
    ///
    /// Returns `Repaired` when that category had to be recreated.
    pub fn unpin(&mut self, id: TrackerId) -> CommandOutcome {
        let Some(position) = self.pinned_trackers().iter().position(|t| t.id == id) else {
            return self.unpin_miss(id);
        };
        let Some(pinned) = self.pinned.as_mut() else {
            return CommandOutcome::NotFound;
        };
        let Some(origin) = pinned[position].previous_category.clone() else {
            return CommandOutcome::Unchanged;
        };

        let mut tracker = pinned.remove(position);
        tracker.is_pinned = false;
        tracker.previous_category = None;
        let repaired = self.add_category(&origin);
        self.insert_tracker(tracker, &origin);
        if repaired {
            CommandOutcome::Repaired
        } else {
            CommandOutcome::Applied
        }
    }

    /// Removes a tracker from whichever group holds it.
    pub fn remove_tracker(&mut self, id: TrackerId) -> Option<Tracker> {
        if let Some(pinned) = self.pinned.as_mut() {
            if let Some(position) = pinned.iter().position(|t| t.id == id) {
                return Some(pinned.remove(position));
            }
        }
        self.take_named(id)
    }

    /// Replaces a tracker's fields in place, keeping its position.
    ///
    /// Returns `false` when no tracker has `updated.id`.
    pub fn replace_tracker(&mut self, updated: Tracker) -> bool {
        let slot = self
            .pinned
            .iter_mut()
            .chain(self.named.values_mut())
            .flat_map(|trackers| trackers.iter_mut())
            .find(|tracker| tracker.id == updated.id);
        match slot {
            Some(slot) => {
                *slot = updated;
                true
            }
            None => false,
        }
    }

    pub fn tracker_count(&self) -> usize {
        self.groups().map(|trackers| trackers.len()).sum()
    }

    fn groups(&self) -> impl Iterator<Item = &Vec<Tracker>> {
        self.pinned.iter().chain(self.named.values())
    }

    fn pinned_mut(&mut self, id: TrackerId) -> Option<&mut Tracker> {
        self.pinned
            .as_mut()
            .and_then(|trackers| trackers.iter_mut().find(|t| t.id == id))
    }

    fn take_named(&mut self, id: TrackerId) -> Option<Tracker> {
        self.named.values_mut().find_map(|trackers| {
            let position = trackers.iter().position(|t| t.id == id)?;
            Some(trackers.remove(position))
        })
    }

    fn unpin_miss(&self, id: TrackerId) -> CommandOutcome {
        if self.tracker(id).is_some() {
            CommandOutcome::Unchanged
        } else {
            CommandOutcome::NotFound
        }
    }
}

#[cfg(test)]
mod tests {
    use super::CategoryOrganizer;
    use crate::model::category::TrackerCategory;
    use crate::model::tracker::Tracker;
    use crate::model::weekday::Schedule;
    use crate::service::CommandOutcome;

    fn tracker(title: &str) -> Tracker {
        Tracker::new(title, "🙂", "green", Schedule::every_day())
    }

    fn titles(category: &TrackerCategory) -> Vec<&str> {
        category.trackers.iter().map(|t| t.title.as_str()).collect()
    }

    #[test]
    fn categories_sorted_and_empty_ones_kept() {
        let mut organizer = CategoryOrganizer::new();
        organizer.add_category("Work");
        organizer.insert_tracker(tracker("Run"), "Health");
        assert!(!organizer.add_category("Health"));
        assert!(organizer.add_category("health"));

        let categories = organizer.all_categories();
        let names: Vec<&str> = categories.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(names, vec!["Health", "Work", "health"]);
        assert!(categories.iter().all(|c| !c.is_pinned));
    }

    #[test]
    fn pin_then_unpin_restores_origin_at_end() {
        let mut organizer = CategoryOrganizer::new();
        let read = tracker("Read");
        let read_id = read.id;
        organizer.insert_tracker(read, "Health");
        organizer.insert_tracker(tracker("Run"), "Health");

        assert_eq!(organizer.pin(read_id), CommandOutcome::Applied);
        assert_eq!(organizer.pin(read_id), CommandOutcome::Unchanged);
        let categories = organizer.all_categories();
        assert!(categories[0].is_pinned);
        assert_eq!(titles(&categories[0]), vec!["Read"]);
        assert_eq!(titles(&categories[1]), vec!["Run"]);
        assert_eq!(organizer.category_of(read_id), Some("Health"));

        assert_eq!(organizer.unpin(read_id), CommandOutcome::Applied);
        assert_eq!(organizer.unpin(read_id), CommandOutcome::Unchanged);
        let categories = organizer.all_categories();
        assert_eq!(categories.len(), 1);
        assert_eq!(titles(&categories[0]), vec!["Run", "Read"]);
        let restored = organizer.tracker(read_id).unwrap();
        assert!(!restored.is_pinned);
        assert_eq!(restored.previous_category, None);
    }

    #[test]
    fn unpin_recreates_deleted_origin() {
        let mut organizer = CategoryOrganizer::new();
        let read = tracker("Read");
        let read_id = read.id;
        organizer.insert_tracker(read, "Health");
        organizer.insert_tracker(tracker("Run"), "Health");
        organizer.pin(read_id);

        let removed = organizer.remove_category("Health").unwrap();
        assert_eq!(removed.len(), 1);
        assert!(organizer.tracker(read_id).is_some());

        assert_eq!(organizer.unpin(read_id), CommandOutcome::Repaired);
        assert_eq!(organizer.category_titles(), vec!["Health".to_string()]);
        assert_eq!(organizer.tracker_count(), 1);
    }

    #[test]
    fn assign_moves_unpinned_and_rewrites_pinned_origin() {
        let mut organizer = CategoryOrganizer::new();
        let read = tracker("Read");
        let read_id = read.id;
        organizer.insert_tracker(read, "Health");

        assert_eq!(organizer.assign_tracker(read_id, "Health"), CommandOutcome::Unchanged);
        assert_eq!(organizer.assign_tracker(read_id, "Study"), CommandOutcome::Applied);
        assert_eq!(organizer.category_of(read_id), Some("Study"));
        assert!(organizer.has_category("Health"));

        organizer.pin(read_id);
        assert_eq!(organizer.assign_tracker(read_id, "Books"), CommandOutcome::Applied);
        assert!(organizer.tracker(read_id).unwrap().is_pinned);
        assert!(organizer.has_category("Books"));
        organizer.unpin(read_id);
        assert_eq!(organizer.category_of(read_id), Some("Books"));

        let missing = tracker("Ghost").id;
        assert_eq!(organizer.assign_tracker(missing, "Health"), CommandOutcome::NotFound);
        assert_eq!(organizer.pin(missing), CommandOutcome::NotFound);
        assert_eq!(organizer.unpin(missing), CommandOutcome::NotFound);
    }

    #[test]
    fn pinned_bucket_lazily_created_and_hidden_when_empty() {
        let mut organizer = CategoryOrganizer::new();
        organizer.ensure_pinned_category_exists();
        organizer.ensure_pinned_category_exists();
        assert!(organizer.all_categories().is_empty());
        assert!(organizer.pinned_trackers().is_empty());
    }

    #[test]
    fn replace_keeps_position() {
        let mut organizer = CategoryOrganizer::new();
        let first = tracker("First");
        let mut edited = first.clone();
        organizer.insert_tracker(first, "Health");
        organizer.insert_tracker(tracker("Second"), "Health");

        edited.title = "Renamed".to_string();
        assert!(organizer.replace_tracker(edited));
        let categories = organizer.all_categories();
        assert_eq!(titles(&categories[0]), vec!["Renamed", "Second"]);
        assert!(!organizer.replace_tracker(tracker("Stranger")));
    }
}
