//! Categorized, filtered tracker views.
//!
//! # Responsibility
//! - Combine organizer, ledger and schedule evaluation into ordered sections.
//!
//! # Invariants
//! - Only due trackers are ever listed.
//! - For one date, `Completed` and `Uncompleted` partition `All`.
//! - Empty sections are omitted; the pinned section always leads.

use crate::model::filter::TrackerFilter;
use crate::model::tracker::Tracker;
use crate::service::ledger::CompletionLedger;
use crate::service::organizer::CategoryOrganizer;
use crate::service::schedule::is_due;
use chrono::NaiveDate;

/// View request: selected date, filter and optional title search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewQuery {
    pub date: NaiveDate,
    pub filter: TrackerFilter,
    /// Case-insensitive title substring. Blank means no search.
    pub search: Option<String>,
}

impl ViewQuery {
    pub fn new(date: NaiveDate, filter: TrackerFilter) -> Self {
        Self {
            date,
            filter,
            search: None,
        }
    }

    pub fn with_search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    fn search_term(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }
}

/// One listed tracker with its state on the effective date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerViewItem {
    pub tracker: Tracker,
    pub is_completed: bool,
    pub completed_count: usize,
}

/// One non-empty category in a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSection {
    pub title: String,
    pub is_pinned: bool,
    pub items: Vec<TrackerViewItem>,
}

/// Read-only view builder over organizer and ledger state.
pub struct FilterEngine<'a> {
    organizer: &'a CategoryOrganizer,
    ledger: &'a CompletionLedger,
}

impl<'a> FilterEngine<'a> {
    pub fn new(organizer: &'a CategoryOrganizer, ledger: &'a CompletionLedger) -> Self {
        Self { organizer, ledger }
    }

    /// Builds the view for `query`.
    ///
    /// `today` is the effective date of `TrackerFilter::DueToday`; other
    /// filters evaluate `query.date`.
    pub fn query(&self, query: &ViewQuery, today: NaiveDate) -> Vec<TrackerSection> {
        let effective_date = match query.filter {
            TrackerFilter::DueToday => today,
            _ => query.date,
        };
        let search = query.search_term();

        self.organizer
            .all_categories()
            .into_iter()
            .filter_map(|category| {
                let items: Vec<TrackerViewItem> = category
                    .trackers
                    .into_iter()
                    .filter_map(|tracker| self.view_item(tracker, effective_date, query.filter))
                    .filter(|item| matches_search(&item.tracker, search.as_deref()))
                    .collect();
                if items.is_empty() {
                    return None;
                }
                Some(TrackerSection {
                    title: category.title,
                    is_pinned: category.is_pinned,
                    items,
                })
            })
            .collect()
    }

    fn view_item(
        &self,
        tracker: Tracker,
        day: NaiveDate,
        filter: TrackerFilter,
    ) -> Option<TrackerViewItem> {
        let is_completed = self.ledger.is_completed(tracker.id, day);
        let due = is_due(
            &tracker,
            day,
            self.ledger.has_any_completion(tracker.id),
            is_completed,
        );
        let keep = due
            && match filter {
                TrackerFilter::All | TrackerFilter::DueToday => true,
                TrackerFilter::Completed => is_completed,
                TrackerFilter::Uncompleted => !is_completed,
            };
        if !keep {
            return None;
        }
        Some(TrackerViewItem {
            completed_count: self.ledger.completed_count(tracker.id),
            tracker,
            is_completed,
        })
    }
}

fn matches_search(tracker: &Tracker, term: Option<&str>) -> bool {
    match term {
        None => true,
        Some(term) => tracker.title.to_lowercase().contains(term),
    }
}

#[cfg(test)]
mod tests {
    use super::{FilterEngine, ViewQuery};
    use crate::model::filter::TrackerFilter;
    use crate::model::tracker::Tracker;
    use crate::model::weekday::{Schedule, Weekday};
    use crate::service::ledger::CompletionLedger;
    use crate::service::organizer::CategoryOrganizer;
    use chrono::NaiveDate;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, d).unwrap()
    }

    #[test]
    fn due_today_ignores_selected_date() {
        let mut organizer = CategoryOrganizer::new();
        // 2024-05-07 is a Tuesday, 2024-05-08 a Wednesday.
        organizer.insert_tracker(
            Tracker::new("Read", "📚", "blue", [Weekday::Tuesday].into_iter().collect()),
            "Study",
        );
        let ledger = CompletionLedger::new();
        let engine = FilterEngine::new(&organizer, &ledger);

        assert!(engine
            .query(&ViewQuery::new(day(8), TrackerFilter::All), day(7))
            .is_empty());
        let sections = engine.query(&ViewQuery::new(day(8), TrackerFilter::DueToday), day(7));
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].title, "Study");
    }

    #[test]
    fn search_is_case_insensitive_and_blank_means_none() {
        let mut organizer = CategoryOrganizer::new();
        organizer.insert_tracker(Tracker::new("Read", "📚", "blue", Schedule::every_day()), "A");
        organizer.insert_tracker(Tracker::new("Run", "🏃", "red", Schedule::every_day()), "B");
        let ledger = CompletionLedger::new();
        let engine = FilterEngine::new(&organizer, &ledger);

        let query = ViewQuery::new(day(8), TrackerFilter::All).with_search(" rEa ");
        let sections = engine.query(&query, day(8));
        assert_eq!(sections.len(), 1);
        assert_eq!(sections[0].items[0].tracker.title, "Read");

        let blank = ViewQuery::new(day(8), TrackerFilter::All).with_search("   ");
        assert_eq!(engine.query(&blank, day(8)).len(), 2);
    }

    #[test]
    fn items_carry_completion_state() {
        let mut organizer = CategoryOrganizer::new();
        let run = Tracker::new("Run", "🏃", "red", Schedule::every_day());
        let run_id = run.id;
        organizer.insert_tracker(run, "Health");
        let mut ledger = CompletionLedger::new();
        ledger.record(run_id, day(1));
        ledger.record(run_id, day(2));
        let engine = FilterEngine::new(&organizer, &ledger);

        let sections = engine.query(&ViewQuery::new(day(2), TrackerFilter::Completed), day(9));
        let item = &sections[0].items[0];
        assert!(item.is_completed);
        assert_eq!(item.completed_count, 2);
        assert!(engine
            .query(&ViewQuery::new(day(2), TrackerFilter::Uncompleted), day(9))
            .is_empty());
    }
}
