//! Tracker use-case service.
//!
//! # Responsibility
//! - Own in-memory ledger and organizer state loaded from a repository.
//! - Apply commands write-through: repository first, then memory.
//! - Notify subscribers after every applied command.
//!
//! # Invariants
//! - A failed repository write leaves in-memory state untouched.
//! - Queries never touch the repository.
//! - Completion toggles for days after today are ignored.

use crate::model::category::{normalize_category_title, TrackerCategory};
use crate::model::filter::TrackerFilter;
use crate::model::tracker::{normalize_title, Tracker, TrackerId, TrackerValidationError};
use crate::model::weekday::Schedule;
use crate::repo::tracker_repo::{RepoError, TrackerRepository};
use crate::service::clock::{Clock, SystemClock};
use crate::service::filter_engine::{FilterEngine, TrackerSection, ViewQuery};
use crate::service::ledger::CompletionLedger;
use crate::service::organizer::CategoryOrganizer;
use crate::service::{CommandOutcome, TrackerChange};
use chrono::NaiveDate;
use log::{info, warn};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type TrackerServiceResult<T> = Result<T, TrackerServiceError>;

/// Errors from tracker service commands.
#[derive(Debug)]
pub enum TrackerServiceError {
    /// User input failed validation; nothing was written.
    Validation(TrackerValidationError),
    /// Repository failure; in-memory state is unchanged.
    Repo(RepoError),
}

impl Display for TrackerServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
        }
    }
}

impl Error for TrackerServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Repo(err) => Some(err),
        }
    }
}

impl From<TrackerValidationError> for TrackerServiceError {
    fn from(value: TrackerValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<RepoError> for TrackerServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Create request for a tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTracker {
    pub title: String,
    pub emoji: String,
    pub color: String,
    /// Empty for a one-off tracker.
    pub schedule: Schedule,
    pub category_title: String,
}

/// Edit request. `None` fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackerUpdate {
    pub title: Option<String>,
    pub emoji: Option<String>,
    pub color: Option<String>,
    pub schedule: Option<Schedule>,
    /// New home category. Pinned trackers stay pinned and remember it.
    pub category_title: Option<String>,
}

/// Edit-screen data for one tracker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerDetails {
    pub tracker: Tracker,
    /// Named category, or the remembered origin while pinned.
    pub category_title: String,
    /// Completed days, oldest first.
    pub completed_days: Vec<NaiveDate>,
}

/// Aggregate numbers for the statistics screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackerStatistics {
    /// Completed tracker-days across all trackers.
    pub total_completions: usize,
    pub tracker_count: usize,
}

type ChangeListener = Box<dyn Fn(&TrackerChange) + Send>;

/// Habit/one-off tracker engine over a repository.
pub struct TrackerService<R: TrackerRepository, C: Clock = SystemClock> {
    repo: R,
    clock: C,
    organizer: CategoryOrganizer,
    ledger: CompletionLedger,
    listeners: Vec<ChangeListener>,
}

impl<R: TrackerRepository> TrackerService<R, SystemClock> {
    /// Loads state from `repo` using the local system clock.
    pub fn load(repo: R) -> TrackerServiceResult<Self> {
        Self::load_with_clock(repo, SystemClock)
    }
}

impl<R: TrackerRepository, C: Clock> TrackerService<R, C> {
    /// Loads state from `repo` with an explicit clock.
    pub fn load_with_clock(repo: R, clock: C) -> TrackerServiceResult<Self> {
        let (organizer, ledger) = load_state(&repo)?;
        info!(
            "event=tracker_load module=service status=ok trackers={} completions={}",
            organizer.tracker_count(),
            ledger.total_completions()
        );
        Ok(Self {
            repo,
            clock,
            organizer,
            ledger,
            listeners: Vec::new(),
        })
    }

    /// Re-reads repository state after external changes.
    pub fn reload(&mut self) -> TrackerServiceResult<()> {
        let (organizer, ledger) = load_state(&self.repo)?;
        self.organizer = organizer;
        self.ledger = ledger;
        info!(
            "event=tracker_reload module=service status=ok trackers={} completions={}",
            self.organizer.tracker_count(),
            self.ledger.total_completions()
        );
        self.notify(TrackerChange::Reloaded);
        Ok(())
    }

    /// Registers a listener called after every applied command.
    pub fn subscribe<F>(&mut self, listener: F)
    where
        F: Fn(&TrackerChange) + Send + 'static,
    {
        self.listeners.push(Box::new(listener));
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn get_view(&self, date: NaiveDate, filter: TrackerFilter) -> Vec<TrackerSection> {
        self.get_view_with(&ViewQuery::new(date, filter))
    }

    pub fn get_view_with(&self, query: &ViewQuery) -> Vec<TrackerSection> {
        FilterEngine::new(&self.organizer, &self.ledger).query(query, self.today())
    }

    /// Flips the completion state of `tracker_id` on `day`.
    pub fn toggle_completion(
        &mut self,
        tracker_id: TrackerId,
        day: NaiveDate,
    ) -> TrackerServiceResult<CommandOutcome> {
        if self.organizer.tracker(tracker_id).is_none() {
            return Ok(CommandOutcome::NotFound);
        }
        if day > self.today() {
            info!(
                "event=completion_toggle module=service status=skipped reason=future_date tracker_id={tracker_id}"
            );
            return Ok(CommandOutcome::FutureDate);
        }

        let completed = !self.ledger.is_completed(tracker_id, day);
        let result = if completed {
            self.repo.add_completion_record(tracker_id, day)
        } else {
            self.repo.remove_completion_record(tracker_id, day)
        };
        if let Err(err) = result {
            warn!(
                "event=completion_toggle module=service status=error tracker_id={tracker_id} error={err}"
            );
            return Err(err.into());
        }

        if completed {
            self.ledger.record(tracker_id, day);
        } else {
            self.ledger.unrecord(tracker_id, day);
        }
        info!(
            "event=completion_toggle module=service status=ok tracker_id={tracker_id} completed={completed}"
        );
        self.notify(TrackerChange::CompletionToggled {
            tracker_id,
            day,
            completed,
        });
        Ok(CommandOutcome::Applied)
    }

    pub fn pin_tracker(&mut self, id: TrackerId) -> TrackerServiceResult<CommandOutcome> {
        let Some(tracker) = self.organizer.tracker(id) else {
            return Ok(CommandOutcome::NotFound);
        };
        if tracker.is_pinned {
            return Ok(CommandOutcome::Unchanged);
        }
        let Some(origin) = self.organizer.category_of(id).map(str::to_string) else {
            return Ok(CommandOutcome::NotFound);
        };

        self.repo.pin_tracker(id, &origin)?;
        let outcome = self.organizer.pin(id);
        info!("event=tracker_pin module=service status=ok tracker_id={id}");
        self.notify(TrackerChange::TrackerPinned(id));
        Ok(outcome)
    }

    pub fn unpin_tracker(&mut self, id: TrackerId) -> TrackerServiceResult<CommandOutcome> {
        let Some(tracker) = self.organizer.tracker(id) else {
            return Ok(CommandOutcome::NotFound);
        };
        let Some(origin) = tracker.previous_category.clone() else {
            return Ok(CommandOutcome::Unchanged);
        };

        self.repo.unpin_tracker(id, &origin)?;
        let outcome = self.organizer.unpin(id);
        if outcome == CommandOutcome::Repaired {
            info!("event=category_repair module=service status=ok tracker_id={id}");
        }
        info!("event=tracker_unpin module=service status=ok tracker_id={id}");
        self.notify(TrackerChange::TrackerUnpinned(id));
        Ok(outcome)
    }

    /// Creates a tracker at the end of its category.
    pub fn add_tracker(&mut self, request: NewTracker) -> TrackerServiceResult<TrackerId> {
        let category_title = normalize_category_title(&request.category_title)?;
        let tracker = Tracker::new(
            normalize_title(&request.title),
            request.emoji.trim(),
            request.color.trim(),
            request.schedule,
        );
        tracker.validate()?;

        self.repo.save_tracker(&tracker, &category_title)?;
        let id = tracker.id;
        let kind = tracker.kind();
        self.organizer.insert_tracker(tracker, &category_title);
        info!("event=tracker_add module=service status=ok tracker_id={id} kind={kind:?}");
        self.notify(TrackerChange::TrackerAdded(id));
        Ok(id)
    }

    /// Applies field and category edits.
    pub fn update_tracker(
        &mut self,
        id: TrackerId,
        update: TrackerUpdate,
    ) -> TrackerServiceResult<CommandOutcome> {
        let Some(current) = self.organizer.tracker(id).cloned() else {
            return Ok(CommandOutcome::NotFound);
        };
        let Some(current_category) = self.organizer.category_of(id).map(str::to_string) else {
            return Ok(CommandOutcome::NotFound);
        };

        let mut updated = current.clone();
        if let Some(title) = update.title {
            updated.title = normalize_title(&title);
        }
        if let Some(emoji) = update.emoji {
            updated.emoji = emoji.trim().to_string();
        }
        if let Some(color) = update.color {
            updated.color = color.trim().to_string();
        }
        if let Some(schedule) = update.schedule {
            updated.schedule = schedule;
        }
        let new_category = match update.category_title {
            Some(title) => Some(normalize_category_title(&title)?)
                .filter(|title| *title != current_category),
            None => None,
        };
        updated.validate()?;

        if updated == current && new_category.is_none() {
            return Ok(CommandOutcome::Unchanged);
        }

        let mut stored = updated.clone();
        if let Some(category) = new_category.as_deref() {
            if stored.is_pinned {
                stored.previous_category = Some(category.to_string());
            }
        }
        self.repo.update_tracker(&stored, new_category.as_deref())?;

        self.organizer.replace_tracker(updated);
        if let Some(category) = new_category.as_deref() {
            self.organizer.assign_tracker(id, category);
        }
        info!(
            "event=tracker_update module=service status=ok tracker_id={id} category_changed={}",
            new_category.is_some()
        );
        self.notify(TrackerChange::TrackerUpdated(id));
        Ok(CommandOutcome::Applied)
    }

    /// Deletes a tracker and its completion records.
    pub fn delete_tracker(&mut self, id: TrackerId) -> TrackerServiceResult<CommandOutcome> {
        if self.organizer.tracker(id).is_none() {
            return Ok(CommandOutcome::NotFound);
        }

        self.repo.delete_tracker(id)?;
        self.organizer.remove_tracker(id);
        let records = self.ledger.forget_tracker(id);
        info!("event=tracker_delete module=service status=ok tracker_id={id} records={records}");
        self.notify(TrackerChange::TrackerDeleted(id));
        Ok(CommandOutcome::Applied)
    }

    pub fn add_category(&mut self, title: &str) -> TrackerServiceResult<CommandOutcome> {
        let title = normalize_category_title(title)?;
        if self.organizer.has_category(&title) {
            return Ok(CommandOutcome::DuplicateIgnored);
        }

        self.repo.save_category(&title)?;
        self.organizer.add_category(&title);
        info!("event=category_add module=service status=ok");
        self.notify(TrackerChange::CategoryAdded(title));
        Ok(CommandOutcome::Applied)
    }

    /// Deletes a named category and its unpinned trackers.
    ///
    /// Trackers pinned from it stay pinned; unpinning one later recreates
    /// the category.
    pub fn delete_category(&mut self, title: &str) -> TrackerServiceResult<CommandOutcome> {
        let title = normalize_category_title(title)?;
        if !self.organizer.has_category(&title) {
            return Ok(CommandOutcome::NotFound);
        }

        self.repo.delete_category(&title)?;
        let removed = self.organizer.remove_category(&title).unwrap_or_default();
        for tracker in &removed {
            self.ledger.forget_tracker(tracker.id);
        }
        info!(
            "event=category_delete module=service status=ok trackers_removed={}",
            removed.len()
        );
        self.notify(TrackerChange::CategoryDeleted(title));
        Ok(CommandOutcome::Applied)
    }

    pub fn category_titles(&self) -> Vec<String> {
        self.organizer.category_titles()
    }

    pub fn all_categories(&self) -> Vec<TrackerCategory> {
        self.organizer.all_categories()
    }

    pub fn tracker(&self, id: TrackerId) -> Option<&Tracker> {
        self.organizer.tracker(id)
    }

    pub fn completion_count(&self, tracker_id: TrackerId) -> usize {
        self.ledger.completed_count(tracker_id)
    }

    pub fn tracker_details(&self, id: TrackerId) -> Option<TrackerDetails> {
        let tracker = self.organizer.tracker(id)?.clone();
        let category_title = self.organizer.category_of(id)?.to_string();
        Some(TrackerDetails {
            tracker,
            category_title,
            completed_days: self.ledger.completed_days(id),
        })
    }

    pub fn statistics(&self) -> TrackerStatistics {
        TrackerStatistics {
            total_completions: self.ledger.total_completions(),
            tracker_count: self.organizer.tracker_count(),
        }
    }

    fn notify(&self, change: TrackerChange) {
        for listener in &self.listeners {
            listener(&change);
        }
    }
}

fn load_state<R: TrackerRepository>(
    repo: &R,
) -> TrackerServiceResult<(CategoryOrganizer, CompletionLedger)> {
    let mut organizer = CategoryOrganizer::from_categories(repo.load_categories()?);
    organizer.ensure_pinned_category_exists();
    let ledger = CompletionLedger::from_records(repo.load_completion_records()?);
    Ok((organizer, ledger))
}
