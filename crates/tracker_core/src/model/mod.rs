//! Domain model for trackers, categories and completion records.
//!
//! # Responsibility
//! - Define canonical value types used by core business logic.
//! - Centralize weekday and calendar-day conventions.
//!
//! # Invariants
//! - Every tracker is identified by a stable `TrackerId`.
//! - Pin state is explicit tracker data, not a reserved category title.

pub mod category;
pub mod filter;
pub mod record;
pub mod tracker;
pub mod weekday;
