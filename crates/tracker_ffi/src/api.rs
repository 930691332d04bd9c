//! FFI use-case API for Flutter-facing calls.
//!
//! # Responsibility
//! - Expose tracker views and commands to Dart via FRB.
//! - Translate strings at the boundary into core types.
//!
//! # Invariants
//! - Exported functions must not panic across FFI boundary.
//! - Dates cross as `YYYY-MM-DD`; ids cross as hyphenated UUID strings.
//! - Every call opens the configured DB, so state is never cached here.

use chrono::NaiveDate;
use log::warn;
use std::path::PathBuf;
use std::sync::OnceLock;
use tracker_core::{
    core_version as core_version_inner, init_logging as init_logging_inner, open_db, parse_day,
    ping as ping_inner, CommandOutcome, NewTracker, Schedule, SqliteTrackerRepository,
    TrackerFilter, TrackerId, TrackerSection, TrackerService, TrackerServiceResult, ViewQuery,
    Weekday,
};
use uuid::Uuid;

const DB_FILE_NAME: &str = "tracker.sqlite3";
const DB_PATH_ENV: &str = "TRACKER_DB_PATH";
static DB_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Minimal health-check API for FRB smoke integration.
///
/// # FFI contract
/// - Sync call, non-blocking.
/// - Never throws; always returns a UTF-8 string.
#[flutter_rust_bridge::frb(sync)]
pub fn ping() -> String {
    ping_inner().to_owned()
}

/// Expose core crate version through FFI.
#[flutter_rust_bridge::frb(sync)]
pub fn core_version() -> String {
    core_version_inner().to_owned()
}

/// Initializes Rust core logging once per process.
///
/// Input semantics:
/// - `level`: one of `trace|debug|info|warn|error` (case-insensitive).
/// - `log_dir`: absolute directory path where rolling logs are written.
///
/// # FFI contract
/// - Idempotent for the same `level + log_dir`; switches return an error.
/// - Never panics; returns empty string on success and error message on failure.
#[flutter_rust_bridge::frb(sync)]
pub fn init_logging(level: String, log_dir: String) -> String {
    match init_logging_inner(level.as_str(), log_dir.as_str()) {
        Ok(()) => String::new(),
        Err(err) => err,
    }
}

/// Sets the tracker database file used by every later call.
///
/// Must run before the first DB-backed call; otherwise `TRACKER_DB_PATH` or
/// a temp-dir default is already in effect.
///
/// # FFI contract
/// - Returns empty string on success, including a repeat of the active path.
/// - Returns an error message for blank input or a conflicting path.
#[flutter_rust_bridge::frb(sync)]
pub fn configure_db_path(path: String) -> String {
    let trimmed = path.trim();
    if trimmed.is_empty() {
        return "db path cannot be empty".to_string();
    }
    let requested = PathBuf::from(trimmed);
    let active = DB_PATH.get_or_init(|| requested.clone());
    if *active == requested {
        String::new()
    } else {
        format!(
            "db path already set to `{}`; refusing to switch to `{}`",
            active.display(),
            requested.display()
        )
    }
}

/// One tracker row in a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerItem {
    pub tracker_id: String,
    pub title: String,
    pub emoji: String,
    pub color: String,
    /// Lowercase weekday names, Monday first. Empty for one-off trackers.
    pub schedule: Vec<String>,
    pub is_pinned: bool,
    /// Completion state on the effective view date.
    pub is_completed: bool,
    pub completed_count: u32,
}

/// One non-empty category in a view.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerSectionItem {
    pub title: String,
    pub is_pinned: bool,
    pub items: Vec<TrackerItem>,
}

/// View response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerViewResponse {
    pub ok: bool,
    /// Pinned section first when present.
    pub sections: Vec<TrackerSectionItem>,
    pub message: String,
}

/// Command response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerActionResponse {
    /// Whether the call completed without error.
    pub ok: bool,
    /// Command outcome label (`applied|not_found|duplicate_ignored|unchanged|repaired|future_date`).
    pub outcome: String,
    /// Created tracker ID for `tracker_add`.
    pub tracker_id: Option<String>,
    pub message: String,
}

impl TrackerActionResponse {
    fn from_outcome(outcome: CommandOutcome) -> Self {
        Self {
            ok: true,
            outcome: outcome.as_str().to_string(),
            tracker_id: None,
            message: outcome_message(outcome).to_string(),
        }
    }

    fn created(tracker_id: TrackerId) -> Self {
        Self {
            ok: true,
            outcome: CommandOutcome::Applied.as_str().to_string(),
            tracker_id: Some(tracker_id.to_string()),
            message: "Tracker created.".to_string(),
        }
    }

    fn failure(message: impl Into<String>) -> Self {
        Self {
            ok: false,
            outcome: String::new(),
            tracker_id: None,
            message: message.into(),
        }
    }
}

/// Completion count response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackerCountResponse {
    pub ok: bool,
    pub count: u32,
    pub message: String,
}

/// Category title list response envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CategoryListResponse {
    pub ok: bool,
    /// Named categories in display order; the pinned bucket is not listed.
    pub titles: Vec<String>,
    pub message: String,
}

/// Builds the categorized view for a date and filter.
///
/// Input semantics:
/// - `date`: `YYYY-MM-DD`.
/// - `filter`: `all|due_today|completed|uncompleted`.
/// - `search`: optional case-insensitive title substring.
///
/// # FFI contract
/// - Sync call, DB-backed execution.
/// - Never panics.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_view(date: String, filter: String, search: Option<String>) -> TrackerViewResponse {
    let result = parse_date(&date).and_then(|day| {
        let filter = parse_filter(&filter)?;
        let mut query = ViewQuery::new(day, filter);
        if let Some(term) = search {
            query = query.with_search(term);
        }
        with_tracker_service(|service| Ok(service.get_view_with(&query)))
    });

    match result {
        Ok(sections) => {
            let sections: Vec<TrackerSectionItem> =
                sections.into_iter().map(to_section_item).collect();
            let count: usize = sections.iter().map(|section| section.items.len()).sum();
            TrackerViewResponse {
                ok: true,
                message: format!("{count} tracker(s)."),
                sections,
            }
        }
        Err(err) => TrackerViewResponse {
            ok: false,
            sections: Vec::new(),
            message: format!("tracker_view failed: {err}"),
        },
    }
}

/// Creates a tracker at the end of `category_title`.
///
/// `schedule` holds weekday names (`monday` or `mon`); empty means one-off.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_add(
    title: String,
    emoji: String,
    color: String,
    schedule: Vec<String>,
    category_title: String,
) -> TrackerActionResponse {
    let result = parse_schedule(&schedule).and_then(|schedule| {
        let request = NewTracker {
            title,
            emoji,
            color,
            schedule,
            category_title,
        };
        with_tracker_service(|service| service.add_tracker(request))
    });
    match result {
        Ok(id) => TrackerActionResponse::created(id),
        Err(err) => TrackerActionResponse::failure(format!("tracker_add failed: {err}")),
    }
}

/// Flips completion of a tracker on `date`. Future dates are ignored.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_toggle_completion(tracker_id: String, date: String) -> TrackerActionResponse {
    let result = parse_tracker_id(&tracker_id).and_then(|id| {
        let day = parse_date(&date)?;
        with_tracker_service(|service| service.toggle_completion(id, day))
    });
    action_response("tracker_toggle_completion", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn tracker_pin(tracker_id: String) -> TrackerActionResponse {
    let result = parse_tracker_id(&tracker_id)
        .and_then(|id| with_tracker_service(|service| service.pin_tracker(id)));
    action_response("tracker_pin", result)
}

#[flutter_rust_bridge::frb(sync)]
pub fn tracker_unpin(tracker_id: String) -> TrackerActionResponse {
    let result = parse_tracker_id(&tracker_id)
        .and_then(|id| with_tracker_service(|service| service.unpin_tracker(id)));
    action_response("tracker_unpin", result)
}

/// Deletes a tracker and its completion records.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_delete(tracker_id: String) -> TrackerActionResponse {
    let result = parse_tracker_id(&tracker_id)
        .and_then(|id| with_tracker_service(|service| service.delete_tracker(id)));
    action_response("tracker_delete", result)
}

/// Number of days a tracker was marked done. Unknown ids count zero.
#[flutter_rust_bridge::frb(sync)]
pub fn tracker_completion_count(tracker_id: String) -> TrackerCountResponse {
    let result = parse_tracker_id(&tracker_id)
        .and_then(|id| with_tracker_service(|service| Ok(service.completion_count(id))));
    match result {
        Ok(count) => TrackerCountResponse {
            ok: true,
            count: u32::try_from(count).unwrap_or(u32::MAX),
            message: String::new(),
        },
        Err(err) => TrackerCountResponse {
            ok: false,
            count: 0,
            message: format!("tracker_completion_count failed: {err}"),
        },
    }
}

#[flutter_rust_bridge::frb(sync)]
pub fn category_list() -> CategoryListResponse {
    match with_tracker_service(|service| Ok(service.category_titles())) {
        Ok(titles) => CategoryListResponse {
            ok: true,
            message: format!("{} categories.", titles.len()),
            titles,
        },
        Err(err) => CategoryListResponse {
            ok: false,
            titles: Vec::new(),
            message: format!("category_list failed: {err}"),
        },
    }
}

/// Creates an empty category. Existing titles report `duplicate_ignored`.
#[flutter_rust_bridge::frb(sync)]
pub fn category_add(title: String) -> TrackerActionResponse {
    let result = with_tracker_service(|service| service.add_category(&title));
    action_response("category_add", result)
}

fn action_response(
    call: &'static str,
    result: Result<CommandOutcome, String>,
) -> TrackerActionResponse {
    match result {
        Ok(outcome) => TrackerActionResponse::from_outcome(outcome),
        Err(err) => TrackerActionResponse::failure(format!("{call} failed: {err}")),
    }
}

fn outcome_message(outcome: CommandOutcome) -> &'static str {
    match outcome {
        CommandOutcome::Applied => "Done.",
        CommandOutcome::NotFound => "Tracker not found.",
        CommandOutcome::DuplicateIgnored => "Already exists.",
        CommandOutcome::Unchanged => "Nothing to change.",
        CommandOutcome::Repaired => "Done; category restored.",
        CommandOutcome::FutureDate => "Future dates cannot be marked.",
    }
}

fn resolve_db_path() -> PathBuf {
    DB_PATH
        .get_or_init(|| {
            if let Ok(raw) = std::env::var(DB_PATH_ENV) {
                let trimmed = raw.trim();
                if !trimmed.is_empty() {
                    return PathBuf::from(trimmed);
                }
            }
            std::env::temp_dir().join(DB_FILE_NAME)
        })
        .clone()
}

fn with_tracker_service<T>(
    f: impl FnOnce(&mut TrackerService<SqliteTrackerRepository<'_>>) -> TrackerServiceResult<T>,
) -> Result<T, String> {
    let db_path = resolve_db_path();
    let conn = open_db(&db_path).map_err(|err| format!("tracker DB open failed: {err}"))?;
    let repo = SqliteTrackerRepository::try_new(&conn)
        .map_err(|err| format!("tracker repo init failed: {err}"))?;
    let mut service =
        TrackerService::load(repo).map_err(|err| format!("tracker load failed: {err}"))?;
    f(&mut service).map_err(|err| {
        warn!("event=ffi_call module=ffi status=error error={err}");
        err.to_string()
    })
}

fn parse_tracker_id(value: &str) -> Result<TrackerId, String> {
    Uuid::parse_str(value.trim()).map_err(|_| format!("invalid tracker id `{}`", value.trim()))
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    parse_day(value).ok_or_else(|| format!("invalid date `{}`; expected YYYY-MM-DD", value.trim()))
}

fn parse_filter(value: &str) -> Result<TrackerFilter, String> {
    TrackerFilter::parse(value).ok_or_else(|| {
        format!(
            "unsupported filter `{}`; expected all|due_today|completed|uncompleted",
            value.trim()
        )
    })
}

fn parse_schedule(values: &[String]) -> Result<Schedule, String> {
    values
        .iter()
        .map(|value| {
            Weekday::parse(value).ok_or_else(|| format!("invalid weekday `{}`", value.trim()))
        })
        .collect()
}

fn to_section_item(section: TrackerSection) -> TrackerSectionItem {
    TrackerSectionItem {
        title: section.title,
        is_pinned: section.is_pinned,
        items: section
            .items
            .into_iter()
            .map(|item| TrackerItem {
                tracker_id: item.tracker.id.to_string(),
                schedule: item
                    .tracker
                    .schedule
                    .iter()
                    .map(|day| day.as_str().to_string())
                    .collect(),
                title: item.tracker.title,
                emoji: item.tracker.emoji,
                color: item.tracker.color,
                is_pinned: item.tracker.is_pinned,
                is_completed: item.is_completed,
                completed_count: u32::try_from(item.completed_count).unwrap_or(u32::MAX),
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::{
        category_add, category_list, configure_db_path, core_version, init_logging, ping,
        tracker_add, tracker_completion_count, tracker_delete, tracker_pin,
        tracker_toggle_completion, tracker_unpin, tracker_view,
    };
    use std::time::{SystemTime, UNIX_EPOCH};
    use tracker_core::open_db;

    fn unique_token(prefix: &str) -> String {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        format!("{prefix}-{nanos}")
    }

    fn add_every_day(title: &str, category: &str) -> String {
        let response = tracker_add(
            title.to_string(),
            "🙂".to_string(),
            "green".to_string(),
            ["mon", "tue", "wed", "thu", "fri", "sat", "sun"]
                .iter()
                .map(|day| day.to_string())
                .collect(),
            category.to_string(),
        );
        assert!(response.ok, "{}", response.message);
        response.tracker_id.unwrap()
    }

    #[test]
    fn ping_returns_pong() {
        assert_eq!(ping(), "pong");
    }

    #[test]
    fn version_is_not_empty() {
        assert!(!core_version().is_empty());
    }

    #[test]
    fn init_logging_rejects_bad_input() {
        assert!(!init_logging("info".to_string(), String::new()).is_empty());
        assert!(!init_logging("verbose".to_string(), "tmp/logs".to_string()).is_empty());
    }

    #[test]
    fn configure_db_path_rejects_blank_and_conflicting_paths() {
        assert!(!configure_db_path("  ".to_string()).is_empty());

        let active = super::resolve_db_path();
        let active_str = active.to_str().unwrap().to_string();
        assert_eq!(configure_db_path(active_str), "");

        let other = active.with_extension("other");
        let error = configure_db_path(other.to_str().unwrap().to_string());
        assert!(error.contains("refusing to switch"));
    }

    #[test]
    fn added_tracker_appears_in_its_category_view() {
        let category = unique_token("ffi-view");
        let id = add_every_day("Stretch", &category);

        let response = tracker_view("2024-05-07".to_string(), "all".to_string(), None);
        assert!(response.ok, "{}", response.message);
        let section = response
            .sections
            .iter()
            .find(|section| section.title == category)
            .unwrap();
        assert_eq!(section.items.len(), 1);
        assert_eq!(section.items[0].tracker_id, id);
        assert_eq!(section.items[0].schedule.len(), 7);
        assert_eq!(section.items[0].schedule[0], "monday");
    }

    #[test]
    fn toggle_pin_and_delete_round_trip() {
        let category = unique_token("ffi-commands");
        let id = add_every_day("Meditate", &category);

        let toggled = tracker_toggle_completion(id.clone(), "2024-05-01".to_string());
        assert!(toggled.ok, "{}", toggled.message);
        assert_eq!(toggled.outcome, "applied");
        assert_eq!(tracker_completion_count(id.clone()).count, 1);

        let completed = tracker_view("2024-05-01".to_string(), "completed".to_string(), None);
        assert!(completed
            .sections
            .iter()
            .flat_map(|section| section.items.iter())
            .any(|item| item.tracker_id == id && item.is_completed));

        assert_eq!(tracker_pin(id.clone()).outcome, "applied");
        assert_eq!(tracker_pin(id.clone()).outcome, "unchanged");
        assert_eq!(tracker_unpin(id.clone()).outcome, "applied");

        assert_eq!(tracker_delete(id.clone()).outcome, "applied");
        assert_eq!(tracker_delete(id.clone()).outcome, "not_found");
        assert_eq!(tracker_completion_count(id).count, 0);
    }

    #[test]
    fn schedule_is_persisted_as_weekday_names() {
        let category = unique_token("ffi-schedule");
        let response = tracker_add(
            "Read".to_string(),
            "📚".to_string(),
            "blue".to_string(),
            vec!["Thu".to_string(), "tuesday".to_string()],
            category,
        );
        assert!(response.ok, "{}", response.message);
        let id = response.tracker_id.unwrap();

        let conn = open_db(super::resolve_db_path()).unwrap();
        let stored: String = conn
            .query_row(
                "SELECT schedule FROM trackers WHERE uuid = ?1",
                [id.as_str()],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, r#"["tuesday","thursday"]"#);
    }

    #[test]
    fn categories_are_listed_and_deduplicated() {
        let title = unique_token("ffi-category");
        assert_eq!(category_add(title.clone()).outcome, "applied");
        assert_eq!(category_add(title.clone()).outcome, "duplicate_ignored");
        assert!(category_list().titles.contains(&title));
    }

    #[test]
    fn malformed_input_returns_failure_envelopes() {
        assert!(!tracker_view("05/07/2024".to_string(), "all".to_string(), None).ok);
        assert!(!tracker_view("2024-05-07".to_string(), "pinned".to_string(), None).ok);
        assert!(!tracker_pin("not-a-uuid".to_string()).ok);

        let bad_day = tracker_add(
            "Read".to_string(),
            "📚".to_string(),
            "blue".to_string(),
            vec!["someday".to_string()],
            "Study".to_string(),
        );
        assert!(!bad_day.ok);
        assert!(bad_day.message.contains("weekday"));

        let blank_title = tracker_add(
            "  ".to_string(),
            "📚".to_string(),
            "blue".to_string(),
            Vec::new(),
            "Study".to_string(),
        );
        assert!(!blank_title.ok);
    }
}
