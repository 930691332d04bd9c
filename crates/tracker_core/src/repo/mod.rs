//! Repository layer abstractions and persistence implementations.
//!
//! # Responsibility
//! - Define the data access contract the tracker service depends on.
//! - Isolate SQLite query details from service orchestration.
//!
//! # Invariants
//! - Repository writes must enforce `Tracker::validate()` before persistence.
//! - Repository APIs return semantic errors (`TrackerNotFound`) in addition to
//!   DB transport errors.

pub mod tracker_repo;
