//! Tracker database: connection setup plus the versioned schema.
//!
//! The schema holds three tables:
//! - `categories`: named groups, keyed by title.
//! - `trackers`: one row per tracker, with pin state and sort position.
//! - `completion_records`: one `(tracker, day)` row per completed day.
//!
//! # Invariants
//! - `PRAGMA user_version` equals the last applied migration.
//! - A file stamped by a newer build is refused, never downgraded.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub mod migrations;
mod open;

pub use open::{open_db, open_db_in_memory};

pub type DbResult<T> = Result<T, DbError>;

/// Failure to produce a ready tracker database connection.
#[derive(Debug)]
pub enum DbError {
    /// SQLite rejected the open, a pragma, or a migration script.
    Sqlite(rusqlite::Error),
    /// The directory meant to hold the tracker file could not be created.
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    /// `user_version` is past the newest migration this build ships.
    SchemaFromNewerBuild { found: u32, supported: u32 },
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "tracker database error: {err}"),
            Self::CreateDir { path, source } => write!(
                f,
                "cannot create tracker database directory `{}`: {source}",
                path.display()
            ),
            Self::SchemaFromNewerBuild { found, supported } => write!(
                f,
                "tracker database is at schema v{found}; this build reads up to v{supported}"
            ),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::CreateDir { source, .. } => Some(source),
            Self::SchemaFromNewerBuild { .. } => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
