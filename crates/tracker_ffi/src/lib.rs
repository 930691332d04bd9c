//! Flutter-facing FFI surface for tracker core.

pub mod api;
