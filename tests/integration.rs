//! Integration tests for Civic Agenda.
//!
//! These tests drive the scheduling service end to end: series expansion,
//! occurrence overrides, lifecycle moves and persistence across restarts.

#[path = "integration/test_scheduling.rs"]
mod test_scheduling;

#[path = "integration/test_persistence.rs"]
mod test_persistence;
