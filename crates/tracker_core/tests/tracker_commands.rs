use chrono::NaiveDate;
use rusqlite::Connection;
use std::cell::Cell;
use std::rc::Rc;
use std::sync::{Arc, Mutex};
use tracker_core::{
    open_db, open_db_in_memory, CommandOutcome, CompletionRecord, FixedClock, NewTracker,
    RepoError, RepoResult, Schedule, SqliteTrackerRepository, Tracker, TrackerCategory,
    TrackerChange, TrackerFilter, TrackerId, TrackerRepository, TrackerService,
    TrackerServiceError, TrackerUpdate, TrackerValidationError, Weekday,
};

const TODAY: (i32, u32, u32) = (2024, 5, 15);

fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn today() -> NaiveDate {
    day(TODAY.0, TODAY.1, TODAY.2)
}

fn new_tracker(title: &str, schedule: Schedule, category: &str) -> NewTracker {
    NewTracker {
        title: title.to_string(),
        emoji: "🙂".to_string(),
        color: "green".to_string(),
        schedule,
        category_title: category.to_string(),
    }
}

fn open_service(conn: &Connection) -> TrackerService<SqliteTrackerRepository<'_>, FixedClock> {
    let repo = SqliteTrackerRepository::try_new(conn).unwrap();
    TrackerService::load_with_clock(repo, FixedClock(today())).unwrap()
}

/// Delegating repository whose writes can be switched to fail.
struct FlakyRepository<'conn> {
    inner: SqliteTrackerRepository<'conn>,
    fail_writes: Rc<Cell<bool>>,
}

impl FlakyRepository<'_> {
    fn guard(&self) -> RepoResult<()> {
        if self.fail_writes.get() {
            return Err(RepoError::InvalidData("write rejected".to_string()));
        }
        Ok(())
    }
}

impl TrackerRepository for FlakyRepository<'_> {
    fn load_categories(&self) -> RepoResult<Vec<TrackerCategory>> {
        self.inner.load_categories()
    }
    fn load_completion_records(&self) -> RepoResult<Vec<CompletionRecord>> {
        self.inner.load_completion_records()
    }
    fn save_category(&self, title: &str) -> RepoResult<()> {
        self.guard()?;
        self.inner.save_category(title)
    }
    fn delete_category(&self, title: &str) -> RepoResult<()> {
        self.guard()?;
        self.inner.delete_category(title)
    }
    fn save_tracker(&self, tracker: &Tracker, category_title: &str) -> RepoResult<()> {
        self.guard()?;
        self.inner.save_tracker(tracker, category_title)
    }
    fn update_tracker(&self, tracker: &Tracker, new_category: Option<&str>) -> RepoResult<()> {
        self.guard()?;
        self.inner.update_tracker(tracker, new_category)
    }
    fn delete_tracker(&self, id: TrackerId) -> RepoResult<()> {
        self.guard()?;
        self.inner.delete_tracker(id)
    }
    fn move_tracker(&self, id: TrackerId, category_title: &str) -> RepoResult<()> {
        self.guard()?;
        self.inner.move_tracker(id, category_title)
    }
    fn pin_tracker(&self, id: TrackerId, previous_category: &str) -> RepoResult<()> {
        self.guard()?;
        self.inner.pin_tracker(id, previous_category)
    }
    fn unpin_tracker(&self, id: TrackerId, category_title: &str) -> RepoResult<()> {
        self.guard()?;
        self.inner.unpin_tracker(id, category_title)
    }
    fn add_completion_record(&self, tracker_id: TrackerId, day: NaiveDate) -> RepoResult<()> {
        self.guard()?;
        self.inner.add_completion_record(tracker_id, day)
    }
    fn remove_completion_record(&self, tracker_id: TrackerId, day: NaiveDate) -> RepoResult<()> {
        self.guard()?;
        self.inner.remove_completion_record(tracker_id, day)
    }
}

#[test]
fn failed_writes_leave_memory_untouched() {
    let conn = open_db_in_memory().unwrap();
    let fail_writes = Rc::new(Cell::new(false));
    let repo = FlakyRepository {
        inner: SqliteTrackerRepository::try_new(&conn).unwrap(),
        fail_writes: Rc::clone(&fail_writes),
    };
    let mut service = TrackerService::load_with_clock(repo, FixedClock(today())).unwrap();
    let read = service
        .add_tracker(new_tracker("Read", Schedule::every_day(), "Study"))
        .unwrap();
    let before = service.get_view(today(), TrackerFilter::All);

    fail_writes.set(true);
    assert!(matches!(
        service.toggle_completion(read, today()),
        Err(TrackerServiceError::Repo(RepoError::InvalidData(_)))
    ));
    assert!(service.pin_tracker(read).is_err());
    assert!(service.delete_tracker(read).is_err());
    assert!(service.add_category("Work").is_err());
    assert!(service
        .add_tracker(new_tracker("Run", Schedule::every_day(), "Health"))
        .is_err());

    assert_eq!(service.get_view(today(), TrackerFilter::All), before);
    assert_eq!(service.completion_count(read), 0);
    assert_eq!(service.category_titles(), vec!["Study".to_string()]);

    // Field update fails after the category move inside the same write.
    fail_writes.set(false);
    conn.execute_batch(
        "CREATE TRIGGER reject_title BEFORE UPDATE OF title ON trackers
         WHEN NEW.title = 'Read books'
         BEGIN SELECT RAISE(ABORT, 'title rejected'); END;",
    )
    .unwrap();
    let result = service.update_tracker(
        read,
        TrackerUpdate {
            title: Some("Read books".to_string()),
            category_title: Some("Leisure".to_string()),
            ..TrackerUpdate::default()
        },
    );
    assert!(matches!(
        result,
        Err(TrackerServiceError::Repo(RepoError::Db(_)))
    ));
    assert_eq!(service.tracker_details(read).unwrap().category_title, "Study");

    service.reload().unwrap();
    let stored = service.tracker_details(read).unwrap();
    assert_eq!(stored.category_title, "Study");
    assert_eq!(stored.tracker.title, "Read");
    assert_eq!(service.category_titles(), vec!["Study".to_string()]);
    assert_eq!(service.get_view(today(), TrackerFilter::All), before);

    fail_writes.set(false);
    assert_eq!(
        service.toggle_completion(read, today()).unwrap(),
        CommandOutcome::Applied
    );
    assert_eq!(service.completion_count(read), 1);
}

#[test]
fn future_days_cannot_be_toggled() {
    let conn = open_db_in_memory().unwrap();
    let mut service = open_service(&conn);
    let read = service
        .add_tracker(new_tracker("Read", Schedule::every_day(), "Study"))
        .unwrap();

    assert_eq!(
        service.toggle_completion(read, day(2024, 5, 16)).unwrap(),
        CommandOutcome::FutureDate
    );
    assert_eq!(service.completion_count(read), 0);
    assert_eq!(
        service.toggle_completion(read, today()).unwrap(),
        CommandOutcome::Applied
    );
    assert_eq!(
        service
            .toggle_completion(uuid::Uuid::new_v4(), today())
            .unwrap(),
        CommandOutcome::NotFound
    );
}

#[test]
fn add_tracker_normalizes_and_validates_input() {
    let conn = open_db_in_memory().unwrap();
    let mut service = open_service(&conn);

    let id = service
        .add_tracker(new_tracker("  Drink   water ", Schedule::every_day(), " Health "))
        .unwrap();
    let details = service.tracker_details(id).unwrap();
    assert_eq!(details.tracker.title, "Drink water");
    assert_eq!(details.category_title, "Health");

    let too_long = "x".repeat(39);
    assert!(matches!(
        service.add_tracker(new_tracker(&too_long, Schedule::one_off(), "Health")),
        Err(TrackerServiceError::Validation(
            TrackerValidationError::TitleTooLong { chars: 39, max: 38 }
        ))
    ));
    assert!(matches!(
        service.add_tracker(new_tracker("Ok", Schedule::one_off(), "   ")),
        Err(TrackerServiceError::Validation(
            TrackerValidationError::BlankCategoryTitle
        ))
    ));
    assert_eq!(service.statistics().tracker_count, 1);
}

#[test]
fn update_tracker_edits_fields_and_category() {
    let conn = open_db_in_memory().unwrap();
    let mut service = open_service(&conn);
    let read = service
        .add_tracker(new_tracker("Read", Schedule::every_day(), "Study"))
        .unwrap();

    assert_eq!(
        service.update_tracker(read, TrackerUpdate::default()).unwrap(),
        CommandOutcome::Unchanged
    );
    let outcome = service
        .update_tracker(
            read,
            TrackerUpdate {
                title: Some("Read books".to_string()),
                schedule: Some([Weekday::Monday].into_iter().collect()),
                category_title: Some("Leisure".to_string()),
                ..TrackerUpdate::default()
            },
        )
        .unwrap();
    assert_eq!(outcome, CommandOutcome::Applied);

    let details = service.tracker_details(read).unwrap();
    assert_eq!(details.tracker.title, "Read books");
    assert_eq!(details.category_title, "Leisure");
    assert_eq!(
        service.category_titles(),
        vec!["Leisure".to_string(), "Study".to_string()]
    );

    let reloaded = open_service(&conn);
    let stored = reloaded.tracker_details(read).unwrap();
    assert_eq!(stored, details);
}

#[test]
fn category_change_while_pinned_rewrites_origin() {
    let conn = open_db_in_memory().unwrap();
    let mut service = open_service(&conn);
    let read = service
        .add_tracker(new_tracker("Read", Schedule::every_day(), "Study"))
        .unwrap();
    service.pin_tracker(read).unwrap();

    service
        .update_tracker(
            read,
            TrackerUpdate {
                category_title: Some("Books".to_string()),
                ..TrackerUpdate::default()
            },
        )
        .unwrap();
    assert!(service.tracker(read).unwrap().is_pinned);

    let mut reloaded = open_service(&conn);
    assert_eq!(
        reloaded.tracker(read).unwrap().previous_category.as_deref(),
        Some("Books")
    );
    reloaded.unpin_tracker(read).unwrap();
    assert_eq!(reloaded.tracker_details(read).unwrap().category_title, "Books");
}

#[test]
fn delete_tracker_drops_its_records() {
    let conn = open_db_in_memory().unwrap();
    let mut service = open_service(&conn);
    let read = service
        .add_tracker(new_tracker("Read", Schedule::every_day(), "Study"))
        .unwrap();
    let run = service
        .add_tracker(new_tracker("Run", Schedule::every_day(), "Health"))
        .unwrap();
    service.toggle_completion(read, day(2024, 5, 1)).unwrap();
    service.toggle_completion(read, day(2024, 5, 2)).unwrap();
    service.toggle_completion(run, day(2024, 5, 2)).unwrap();
    assert_eq!(service.statistics().total_completions, 3);

    assert_eq!(service.delete_tracker(read).unwrap(), CommandOutcome::Applied);
    assert_eq!(service.delete_tracker(read).unwrap(), CommandOutcome::NotFound);
    assert_eq!(service.completion_count(read), 0);
    assert_eq!(service.statistics().total_completions, 1);

    let reloaded = open_service(&conn);
    assert_eq!(reloaded.statistics().total_completions, 1);
    assert!(reloaded.tracker(read).is_none());
}

#[test]
fn deleting_origin_category_then_unpinning_repairs_it() {
    let conn = open_db_in_memory().unwrap();
    let mut service = open_service(&conn);
    let read = service
        .add_tracker(new_tracker("Read", Schedule::every_day(), "Health"))
        .unwrap();
    let run = service
        .add_tracker(new_tracker("Run", Schedule::every_day(), "Health"))
        .unwrap();
    service.pin_tracker(read).unwrap();

    assert_eq!(service.delete_category("Health").unwrap(), CommandOutcome::Applied);
    assert_eq!(service.delete_category("Health").unwrap(), CommandOutcome::NotFound);
    assert!(service.tracker(run).is_none());
    assert!(service.category_titles().is_empty());

    assert_eq!(service.unpin_tracker(read).unwrap(), CommandOutcome::Repaired);
    assert_eq!(service.category_titles(), vec!["Health".to_string()]);

    let reloaded = open_service(&conn);
    assert_eq!(reloaded.tracker_details(read).unwrap().category_title, "Health");
}

#[test]
fn add_category_ignores_duplicates_and_keeps_empty_ones() {
    let conn = open_db_in_memory().unwrap();
    let mut service = open_service(&conn);

    assert_eq!(service.add_category(" Work ").unwrap(), CommandOutcome::Applied);
    assert_eq!(service.add_category("Work").unwrap(), CommandOutcome::DuplicateIgnored);
    assert_eq!(service.add_category("work").unwrap(), CommandOutcome::Applied);

    let categories = service.all_categories();
    assert_eq!(categories.len(), 2);
    assert!(categories.iter().all(|c| c.trackers.is_empty()));
    assert!(service.get_view(today(), TrackerFilter::All).is_empty());
}

#[test]
fn subscribers_see_applied_commands_only() {
    let conn = open_db_in_memory().unwrap();
    let mut service = open_service(&conn);
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    service.subscribe(move |change| sink.lock().unwrap().push(change.clone()));

    let read = service
        .add_tracker(new_tracker("Read", Schedule::every_day(), "Study"))
        .unwrap();
    service.pin_tracker(read).unwrap();
    service.pin_tracker(read).unwrap();
    service.toggle_completion(read, day(2024, 6, 1)).unwrap();
    service.toggle_completion(read, today()).unwrap();
    service.reload().unwrap();

    let seen = seen.lock().unwrap();
    assert_eq!(
        *seen,
        vec![
            TrackerChange::TrackerAdded(read),
            TrackerChange::TrackerPinned(read),
            TrackerChange::CompletionToggled {
                tracker_id: read,
                day: today(),
                completed: true,
            },
            TrackerChange::Reloaded,
        ]
    );
}

#[test]
fn state_survives_reopening_file_database() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("tracker.db");
    let read;
    {
        let conn = open_db(&path).unwrap();
        let mut service = open_service(&conn);
        read = service
            .add_tracker(new_tracker(
                "Read",
                [Weekday::Tuesday, Weekday::Thursday].into_iter().collect(),
                "Study",
            ))
            .unwrap();
        service.toggle_completion(read, day(2024, 5, 14)).unwrap();
        service.pin_tracker(read).unwrap();
    }

    let conn = open_db(&path).unwrap();
    let service = open_service(&conn);
    let details = service.tracker_details(read).unwrap();
    assert_eq!(details.tracker.schedule.indexes(), vec![1, 3]);
    assert!(details.tracker.is_pinned);
    assert_eq!(details.category_title, "Study");
    assert_eq!(details.completed_days, vec![day(2024, 5, 14)]);
}
