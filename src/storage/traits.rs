//! Storage abstraction for activity records.

use async_trait::async_trait;
use chrono::NaiveDate;

use crate::activity::{Activity, ActivityStatus};
use crate::error::Result;

/// Trait for activity storage backends.
///
/// Implementations own two invariants that must hold under concurrent
/// callers:
///
/// - at most one physical child per `(recurrence_parent_id, date)`; a second
///   insert for the same pair fails with `ConflictError::DuplicateChild`
/// - status changes go through [`compare_and_set_status`], which only
///   succeeds while the stored status still equals the expected one
///
/// [`compare_and_set_status`]: ActivityStore::compare_and_set_status
#[async_trait]
pub trait ActivityStore: Send + Sync {
    /// Insert a new record.
    async fn insert(&self, activity: Activity) -> Result<Activity>;

    /// Get a record by ID.
    async fn get(&self, id: &str) -> Result<Option<Activity>>;

    /// Overwrite the editable fields of an existing record.
    ///
    /// `status` and `report_complete` keep their stored values; they only
    /// change through [`ActivityStore::compare_and_set_status`].
    async fn replace(&self, activity: Activity) -> Result<Activity>;

    /// Move a record from `expected` to `next`.
    ///
    /// Moving to `REPORT_COMPLETE` also sets `report_complete`.
    async fn compare_and_set_status(
        &self,
        id: &str,
        expected: ActivityStatus,
        next: ActivityStatus,
    ) -> Result<Activity>;

    /// Delete a record by ID. Returns false if it did not exist.
    async fn delete(&self, id: &str) -> Result<bool>;

    /// List records matching a filter, ordered by date, start time and id.
    async fn list(&self, filter: &ActivityFilter) -> Result<Vec<Activity>>;

    /// The physical child of `parent_id` on `date`.
    async fn find_child(&self, parent_id: &str, date: NaiveDate) -> Result<Option<Activity>>;

    /// All physical children of `parent_id`.
    async fn children_of(&self, parent_id: &str) -> Result<Vec<Activity>>;
}

/// Filter for listing activity records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActivityFilter {
    /// Only records of this establishment.
    pub establishment_id: Option<String>,
    /// Only records that can appear somewhere in `[start, end]`.
    pub window: Option<(NaiveDate, NaiveDate)>,
    /// Only records in one of these statuses (empty = any).
    pub statuses: Vec<ActivityStatus>,
}

impl ActivityFilter {
    /// Match every record.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_establishment(mut self, establishment_id: impl Into<String>) -> Self {
        self.establishment_id = Some(establishment_id.into());
        self
    }

    /// Records touching `[start, end]`: non-recurring records dated inside
    /// the window, and series whose anchor is on or before `end` and whose
    /// end date, if any, is on or after `start`.
    pub fn touching(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.window = Some((start, end));
        self
    }

    pub fn with_statuses(mut self, statuses: impl IntoIterator<Item = ActivityStatus>) -> Self {
        self.statuses = statuses.into_iter().collect();
        self
    }

    /// Check whether a record matches this filter.
    pub fn matches(&self, activity: &Activity) -> bool {
        if let Some(ref establishment_id) = self.establishment_id {
            if &activity.establishment_id != establishment_id {
                return false;
            }
        }

        if let Some((start, end)) = self.window {
            if activity.date > end {
                return false;
            }
            if activity
                .last_possible_date()
                .is_some_and(|last| last < start)
            {
                return false;
            }
        }

        if !self.statuses.is_empty() && !self.statuses.contains(&activity.status) {
            return false;
        }

        true
    }
}
