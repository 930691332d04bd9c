//! Tracker persistence contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide the persistence adapter consumed by the tracker service.
//! - Keep SQL and schedule encoding inside the core persistence boundary.
//!
//! # Invariants
//! - Write paths call `Tracker::validate()` before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Trackers load in `sort_order ASC, uuid ASC` order within each bucket.
//! - Pinned rows have `category_title = NULL` and a `previous_category`.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::model::category::TrackerCategory;
use crate::model::record::{format_day, parse_day, CompletionRecord};
use crate::model::tracker::{Tracker, TrackerId, TrackerValidationError};
use crate::model::weekday::Schedule;
use chrono::NaiveDate;
use rusqlite::{params, Connection, Row, Transaction, TransactionBehavior};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

const TRACKER_SELECT_SQL: &str = "SELECT
    uuid,
    title,
    emoji,
    color,
    schedule,
    category_title,
    is_pinned,
    previous_category
FROM trackers";

pub type RepoResult<T> = Result<T, RepoError>;

/// Persistence error for tracker storage.
#[derive(Debug)]
pub enum RepoError {
    Validation(TrackerValidationError),
    Db(DbError),
    TrackerNotFound(TrackerId),
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::TrackerNotFound(id) => write!(f, "tracker not found: {id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "tracker repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::MissingRequiredTable(table) => {
                write!(f, "tracker repository requires table `{table}`")
            }
            Self::MissingRequiredColumn { table, column } => write!(
                f,
                "tracker repository requires column `{column}` in table `{table}`"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted tracker data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TrackerValidationError> for RepoError {
    fn from(value: TrackerValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Persistence adapter used by the tracker service.
///
/// Implementations must leave stored state unchanged when they return an
/// error.
pub trait TrackerRepository {
    /// Loads named categories (title order) plus the pinned bucket when any
    /// tracker is pinned.
    fn load_categories(&self) -> RepoResult<Vec<TrackerCategory>>;
    fn load_completion_records(&self) -> RepoResult<Vec<CompletionRecord>>;
    /// Creates a category. Existing titles are left untouched.
    fn save_category(&self, title: &str) -> RepoResult<()>;
    /// Deletes a category together with its unpinned trackers.
    fn delete_category(&self, title: &str) -> RepoResult<()>;
    /// Inserts a tracker at the end of `category_title`, creating the category.
    fn save_tracker(&self, tracker: &Tracker, category_title: &str) -> RepoResult<()>;
    /// Rewrites title, emoji, color, schedule and pin-origin memory.
    ///
    /// With `new_category`, the category is created first; an unpinned
    /// tracker moves to its end. Everything commits as one transaction.
    fn update_tracker(&self, tracker: &Tracker, new_category: Option<&str>) -> RepoResult<()>;
    fn delete_tracker(&self, id: TrackerId) -> RepoResult<()>;
    /// Moves an unpinned tracker to the end of `category_title`.
    fn move_tracker(&self, id: TrackerId, category_title: &str) -> RepoResult<()>;
    /// Moves a tracker to the end of the pinned bucket.
    fn pin_tracker(&self, id: TrackerId, previous_category: &str) -> RepoResult<()>;
    /// Moves a pinned tracker to the end of `category_title`, creating it.
    fn unpin_tracker(&self, id: TrackerId, category_title: &str) -> RepoResult<()>;
    /// Inserts one record. Duplicates are ignored.
    fn add_completion_record(&self, tracker_id: TrackerId, day: NaiveDate) -> RepoResult<()>;
    fn remove_completion_record(&self, tracker_id: TrackerId, day: NaiveDate) -> RepoResult<()>;
}

/// SQLite-backed tracker repository.
pub struct SqliteTrackerRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteTrackerRepository<'conn> {
    /// Creates a repository from a migrated connection.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_tracker_connection_ready(conn)?;
        Ok(Self { conn })
    }
}

impl TrackerRepository for SqliteTrackerRepository<'_> {
    fn load_categories(&self) -> RepoResult<Vec<TrackerCategory>> {
        let mut named = BTreeMap::new();
        {
            let mut stmt = self
                .conn
                .prepare("SELECT title FROM categories ORDER BY title ASC;")?;
            let mut rows = stmt.query([])?;
            while let Some(row) = rows.next()? {
                let title: String = row.get(0)?;
                named.insert(title.clone(), TrackerCategory::named(title));
            }
        }

        let mut pinned = TrackerCategory::pinned();
        let mut stmt = self.conn.prepare(&format!(
            "{TRACKER_SELECT_SQL} ORDER BY sort_order ASC, uuid ASC;"
        ))?;
        let mut rows = stmt.query([])?;
        while let Some(row) = rows.next()? {
            let (tracker, category_title) = parse_tracker_row(row)?;
            match category_title {
                None => pinned.trackers.push(tracker),
                Some(title) => named
                    .get_mut(&title)
                    .ok_or_else(|| {
                        RepoError::InvalidData(format!(
                            "tracker {} references missing category in trackers.category_title",
                            tracker.id
                        ))
                    })?
                    .trackers
                    .push(tracker),
            }
        }

        let mut categories = Vec::with_capacity(named.len() + 1);
        if !pinned.is_empty() {
            categories.push(pinned);
        }
        categories.extend(named.into_values());
        Ok(categories)
    }

    fn load_completion_records(&self) -> RepoResult<Vec<CompletionRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT tracker_uuid, day
             FROM completion_records
             ORDER BY day ASC, tracker_uuid ASC;",
        )?;
        let mut rows = stmt.query([])?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            let tracker_text: String = row.get(0)?;
            let day_text: String = row.get(1)?;
            let tracker_id = parse_uuid(&tracker_text, "completion_records.tracker_uuid")?;
            let day = parse_day(&day_text).ok_or_else(|| {
                RepoError::InvalidData(format!(
                    "invalid day `{day_text}` in completion_records.day"
                ))
            })?;
            records.push(CompletionRecord::new(tracker_id, day));
        }
        Ok(records)
    }

    fn save_category(&self, title: &str) -> RepoResult<()> {
        insert_category_if_missing(self.conn, title)
    }

    fn delete_category(&self, title: &str) -> RepoResult<()> {
        self.conn
            .execute("DELETE FROM categories WHERE title = ?1;", [title])?;
        Ok(())
    }

    fn save_tracker(&self, tracker: &Tracker, category_title: &str) -> RepoResult<()> {
        tracker.validate()?;
        let schedule = encode_schedule(&tracker.schedule)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let (category_column, sort_order) = if tracker.is_pinned {
            (None, next_pinned_sort_order(&tx)?)
        } else {
            insert_category_if_missing(&tx, category_title)?;
            (
                Some(category_title),
                next_category_sort_order(&tx, category_title)?,
            )
        };

        tx.execute(
            "INSERT INTO trackers (
                uuid,
                title,
                emoji,
                color,
                schedule,
                category_title,
                is_pinned,
                previous_category,
                sort_order
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                tracker.id.to_string(),
                tracker.title.as_str(),
                tracker.emoji.as_str(),
                tracker.color.as_str(),
                schedule,
                category_column,
                i64::from(tracker.is_pinned),
                tracker.previous_category.as_deref(),
                sort_order,
            ],
        )?;
        tx.commit()?;
        Ok(())
    }

    fn update_tracker(&self, tracker: &Tracker, new_category: Option<&str>) -> RepoResult<()> {
        tracker.validate()?;
        let schedule = encode_schedule(&tracker.schedule)?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        if let Some(category_title) = new_category {
            insert_category_if_missing(&tx, category_title)?;
            if !tracker.is_pinned {
                let sort_order = next_category_sort_order(&tx, category_title)?;
                tx.execute(
                    "UPDATE trackers
                     SET category_title = ?2,
                         sort_order = ?3
                     WHERE uuid = ?1
                       AND is_pinned = 0;",
                    params![tracker.id.to_string(), category_title, sort_order],
                )?;
            }
        }

        let changed = tx.execute(
            "UPDATE trackers
             SET
                title = ?2,
                emoji = ?3,
                color = ?4,
                schedule = ?5,
                previous_category = CASE WHEN is_pinned = 1 THEN ?6 ELSE NULL END,
                updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1;",
            params![
                tracker.id.to_string(),
                tracker.title.as_str(),
                tracker.emoji.as_str(),
                tracker.color.as_str(),
                schedule,
                tracker.previous_category.as_deref(),
            ],
        )?;
        if changed == 0 {
            // Dropping `tx` rolls back the category insert.
            return Err(RepoError::TrackerNotFound(tracker.id));
        }
        tx.commit()?;
        Ok(())
    }

    fn delete_tracker(&self, id: TrackerId) -> RepoResult<()> {
        let changed = self
            .conn
            .execute("DELETE FROM trackers WHERE uuid = ?1;", [id.to_string()])?;
        if changed == 0 {
            return Err(RepoError::TrackerNotFound(id));
        }
        Ok(())
    }

    fn move_tracker(&self, id: TrackerId, category_title: &str) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_category_if_missing(&tx, category_title)?;
        let sort_order = next_category_sort_order(&tx, category_title)?;
        let changed = tx.execute(
            "UPDATE trackers
             SET category_title = ?2,
                 sort_order = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_pinned = 0;",
            params![id.to_string(), category_title, sort_order],
        )?;
        if changed == 0 {
            return Err(RepoError::TrackerNotFound(id));
        }
        tx.commit()?;
        Ok(())
    }

    fn pin_tracker(&self, id: TrackerId, previous_category: &str) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let sort_order = next_pinned_sort_order(&tx)?;
        let changed = tx.execute(
            "UPDATE trackers
             SET is_pinned = 1,
                 category_title = NULL,
                 previous_category = ?2,
                 sort_order = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_pinned = 0;",
            params![id.to_string(), previous_category, sort_order],
        )?;
        if changed == 0 {
            return Err(RepoError::TrackerNotFound(id));
        }
        tx.commit()?;
        Ok(())
    }

    fn unpin_tracker(&self, id: TrackerId, category_title: &str) -> RepoResult<()> {
        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        insert_category_if_missing(&tx, category_title)?;
        let sort_order = next_category_sort_order(&tx, category_title)?;
        let changed = tx.execute(
            "UPDATE trackers
             SET is_pinned = 0,
                 category_title = ?2,
                 previous_category = NULL,
                 sort_order = ?3,
                 updated_at = (strftime('%s', 'now') * 1000)
             WHERE uuid = ?1
               AND is_pinned = 1;",
            params![id.to_string(), category_title, sort_order],
        )?;
        if changed == 0 {
            return Err(RepoError::TrackerNotFound(id));
        }
        tx.commit()?;
        Ok(())
    }

    fn add_completion_record(&self, tracker_id: TrackerId, day: NaiveDate) -> RepoResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO completion_records (tracker_uuid, day)
             VALUES (?1, ?2);",
            params![tracker_id.to_string(), format_day(day)],
        )?;
        Ok(())
    }

    fn remove_completion_record(&self, tracker_id: TrackerId, day: NaiveDate) -> RepoResult<()> {
        self.conn.execute(
            "DELETE FROM completion_records
             WHERE tracker_uuid = ?1
               AND day = ?2;",
            params![tracker_id.to_string(), format_day(day)],
        )?;
        Ok(())
    }
}

fn insert_category_if_missing(conn: &Connection, title: &str) -> RepoResult<()> {
    conn.execute(
        "INSERT OR IGNORE INTO categories (title) VALUES (?1);",
        [title],
    )?;
    Ok(())
}

fn next_category_sort_order(conn: &Connection, category_title: &str) -> RepoResult<i64> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1
         FROM trackers
         WHERE category_title = ?1
           AND is_pinned = 0;",
        [category_title],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn next_pinned_sort_order(conn: &Connection) -> RepoResult<i64> {
    let next = conn.query_row(
        "SELECT COALESCE(MAX(sort_order), -1) + 1
         FROM trackers
         WHERE is_pinned = 1;",
        [],
        |row| row.get(0),
    )?;
    Ok(next)
}

fn parse_tracker_row(row: &Row<'_>) -> RepoResult<(Tracker, Option<String>)> {
    let uuid_text: String = row.get("uuid")?;
    let id = parse_uuid(&uuid_text, "trackers.uuid")?;

    let schedule_text: String = row.get("schedule")?;
    let schedule = decode_schedule(&schedule_text).map_err(|err| {
        RepoError::InvalidData(format!(
            "invalid schedule `{schedule_text}` in trackers.schedule: {err}"
        ))
    })?;

    let is_pinned = match row.get::<_, i64>("is_pinned")? {
        0 => false,
        1 => true,
        other => {
            return Err(RepoError::InvalidData(format!(
                "invalid is_pinned value `{other}` in trackers.is_pinned"
            )));
        }
    };

    let tracker = Tracker {
        id,
        title: row.get("title")?,
        emoji: row.get("emoji")?,
        color: row.get("color")?,
        schedule,
        is_pinned,
        previous_category: row.get("previous_category")?,
    };
    tracker.validate()?;

    let category_title: Option<String> = row.get("category_title")?;
    if is_pinned == category_title.is_some() {
        return Err(RepoError::InvalidData(format!(
            "tracker {id} has inconsistent category_title for is_pinned={is_pinned}"
        )));
    }
    Ok((tracker, category_title))
}

fn encode_schedule(schedule: &Schedule) -> RepoResult<String> {
    serde_json::to_string(schedule)
        .map_err(|err| RepoError::InvalidData(format!("schedule encoding failed: {err}")))
}

fn decode_schedule(value: &str) -> Result<Schedule, serde_json::Error> {
    serde_json::from_str(value)
}

fn parse_uuid(value: &str, column: &'static str) -> RepoResult<Uuid> {
    Uuid::parse_str(value)
        .map_err(|_| RepoError::InvalidData(format!("invalid uuid `{value}` in {column}")))
}

fn ensure_tracker_connection_ready(conn: &Connection) -> RepoResult<()> {
    let expected_version = latest_version();
    let actual_version = current_user_version(conn)?;
    if actual_version != expected_version {
        return Err(RepoError::UninitializedConnection {
            expected_version,
            actual_version,
        });
    }

    let required: [(&'static str, &[&'static str]); 3] = [
        ("categories", &["title", "created_at"]),
        (
            "trackers",
            &[
                "uuid",
                "title",
                "emoji",
                "color",
                "schedule",
                "category_title",
                "is_pinned",
                "previous_category",
                "sort_order",
            ],
        ),
        ("completion_records", &["tracker_uuid", "day"]),
    ];

    for (table, columns) in required {
        if !table_exists(conn, table)? {
            return Err(RepoError::MissingRequiredTable(table));
        }
        for &column in columns {
            if !table_has_column(conn, table, column)? {
                return Err(RepoError::MissingRequiredColumn { table, column });
            }
        }
    }

    Ok(())
}

fn table_exists(conn: &Connection, table: &str) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(
            SELECT 1
            FROM sqlite_master
            WHERE type = 'table' AND name = ?1
        );",
        [table],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn table_has_column(conn: &Connection, table: &str, column: &str) -> RepoResult<bool> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({table});"))?;
    let mut rows = stmt.query([])?;
    while let Some(row) = rows.next()? {
        let current: String = row.get(1)?;
        if current == column {
            return Ok(true);
        }
    }
    Ok(false)
}
