//! Activity records and the request types that create and edit them.
//!
//! An [`Activity`] is one persisted scheduling record. Depending on its
//! recurrence fields it is a standalone activity, a recurring series parent,
//! or a physical child overriding one date of a parent series.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::calendar::RecurrenceRule;
use crate::error::ValidationError;

// ============================================================================
// Activity
// ============================================================================

/// A scheduled activity at an establishment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Activity {
    /// Unique identifier.
    pub id: String,
    /// Activity title.
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Person in charge on the day.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub responsible_name: Option<String>,
    /// Owning establishment.
    pub establishment_id: String,
    /// Anchor date. For a series parent this is the first possible occurrence.
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub status: ActivityStatus,
    /// Recurrence rule; present only on series parents.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence: Option<RecurrenceRule>,
    /// Set on physical children: the series this record overrides one date of.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recurrence_parent_id: Option<String>,
    /// True once a post-activity report has been filed.
    #[serde(default)]
    pub report_complete: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Activity {
    /// Create a new draft activity.
    pub fn new(
        title: impl Into<String>,
        establishment_id: impl Into<String>,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self::with_id(
            uuid::Uuid::new_v4().to_string(),
            title,
            establishment_id,
            date,
            start_time,
            end_time,
        )
    }

    /// Create a draft activity with a specific ID.
    pub fn with_id(
        id: impl Into<String>,
        title: impl Into<String>,
        establishment_id: impl Into<String>,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            title: title.into(),
            description: None,
            location: None,
            responsible_name: None,
            establishment_id: establishment_id.into(),
            date,
            start_time,
            end_time,
            status: ActivityStatus::Draft,
            recurrence: None,
            recurrence_parent_id: None,
            report_complete: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_responsible(mut self, name: impl Into<String>) -> Self {
        self.responsible_name = Some(name.into());
        self
    }

    pub fn with_status(mut self, status: ActivityStatus) -> Self {
        self.status = status;
        self
    }

    /// Make this activity a series parent.
    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    /// Mark this record as the physical override of `parent_id` on its date.
    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.recurrence_parent_id = Some(parent_id.into());
        self
    }

    pub fn is_recurrent(&self) -> bool {
        self.recurrence.is_some()
    }

    /// Recurring and not itself a child.
    pub fn is_series_parent(&self) -> bool {
        self.recurrence.is_some() && self.recurrence_parent_id.is_none()
    }

    pub fn is_child(&self) -> bool {
        self.recurrence_parent_id.is_some()
    }

    /// Last day this record can appear on.
    ///
    /// `None` means unbounded (a series without an end date).
    pub fn last_possible_date(&self) -> Option<NaiveDate> {
        match &self.recurrence {
            Some(rule) => rule.end_date,
            None => Some(self.date),
        }
    }

    /// Materialize a physical child of this series for `date`, copying the
    /// parent's display fields and current status.
    pub fn materialize_child(&self, date: NaiveDate) -> Activity {
        let now = Utc::now();
        Activity {
            id: uuid::Uuid::new_v4().to_string(),
            title: self.title.clone(),
            description: self.description.clone(),
            location: self.location.clone(),
            responsible_name: self.responsible_name.clone(),
            establishment_id: self.establishment_id.clone(),
            date,
            start_time: self.start_time,
            end_time: self.end_time,
            status: self.status,
            recurrence: None,
            recurrence_parent_id: Some(self.id.clone()),
            report_complete: self.report_complete,
            created_at: now,
            updated_at: now,
        }
    }

    /// Check the record's own invariants.
    pub fn validate(&self, max_title_length: usize) -> Result<(), ValidationError> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(ValidationError::MissingField("title".to_string()));
        }
        let len = title.chars().count();
        if len > max_title_length {
            return Err(ValidationError::TitleTooLong {
                len,
                max: max_title_length,
            });
        }
        if self.establishment_id.trim().is_empty() {
            return Err(ValidationError::MissingField("establishment_id".to_string()));
        }
        if self.start_time >= self.end_time {
            return Err(ValidationError::TimeOrder {
                start: self.start_time,
                end: self.end_time,
            });
        }
        if let Some(ref rule) = self.recurrence {
            if self.recurrence_parent_id.is_some() {
                return Err(ValidationError::RecurringChild);
            }
            rule.validate(self.date)?;
        }
        Ok(())
    }
}

// ============================================================================
// Status
// ============================================================================

/// Operational status of an activity.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ActivityStatus {
    /// Authored by a coordinator, not yet submitted.
    #[default]
    Draft,
    /// Submitted and awaiting validation.
    PendingValidation,
    /// Validated and scheduled.
    Planned,
    /// Taking place.
    InProgress,
    /// Took place; report not yet filed.
    Completed,
    /// Report filed. Terminal.
    ReportComplete,
    /// Will not take place. Terminal.
    Cancelled,
}

impl ActivityStatus {
    pub const ALL: [ActivityStatus; 7] = [
        ActivityStatus::Draft,
        ActivityStatus::PendingValidation,
        ActivityStatus::Planned,
        ActivityStatus::InProgress,
        ActivityStatus::Completed,
        ActivityStatus::ReportComplete,
        ActivityStatus::Cancelled,
    ];

    /// Wire name of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            ActivityStatus::Draft => "DRAFT",
            ActivityStatus::PendingValidation => "PENDING_VALIDATION",
            ActivityStatus::Planned => "PLANNED",
            ActivityStatus::InProgress => "IN_PROGRESS",
            ActivityStatus::Completed => "COMPLETED",
            ActivityStatus::ReportComplete => "REPORT_COMPLETE",
            ActivityStatus::Cancelled => "CANCELLED",
        }
    }

    /// `CANCELLED` and `REPORT_COMPLETE` accept no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ActivityStatus::ReportComplete | ActivityStatus::Cancelled)
    }

    /// Statuses an activity may be created with.
    pub fn is_initial(&self) -> bool {
        matches!(self, ActivityStatus::Draft | ActivityStatus::Planned)
    }
}

impl fmt::Display for ActivityStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActivityStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        ActivityStatus::ALL
            .into_iter()
            .find(|status| status.as_str() == normalized)
            .ok_or_else(|| format!("unknown activity status: {}", s))
    }
}

// ============================================================================
// Scope
// ============================================================================

/// Whether an edit or delete targets one date or the whole series.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Only the addressed occurrence.
    #[default]
    Occurrence,
    /// The series parent and everything it produces.
    Series,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Scope::Occurrence => f.write_str("occurrence"),
            Scope::Series => f.write_str("series"),
        }
    }
}

impl FromStr for Scope {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "occurrence" => Ok(Scope::Occurrence),
            "series" => Ok(Scope::Series),
            other => Err(ValidationError::InvalidScope(other.to_string())),
        }
    }
}

// ============================================================================
// Create / Update Requests
// ============================================================================

/// Request to create a standalone activity or a series parent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct NewActivity {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub responsible_name: Option<String>,
    pub establishment_id: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    /// Present for a recurring series.
    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,
    /// `DRAFT` (default) or `PLANNED`.
    #[serde(default)]
    pub status: Option<ActivityStatus>,
}

impl NewActivity {
    pub fn new(
        title: impl Into<String>,
        establishment_id: impl Into<String>,
        date: NaiveDate,
        start_time: NaiveTime,
        end_time: NaiveTime,
    ) -> Self {
        Self {
            title: title.into(),
            description: None,
            location: None,
            responsible_name: None,
            establishment_id: establishment_id.into(),
            date,
            start_time,
            end_time,
            recurrence: None,
            status: None,
        }
    }

    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    pub fn with_status(mut self, status: ActivityStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_responsible(mut self, name: impl Into<String>) -> Self {
        self.responsible_name = Some(name.into());
        self
    }

    /// Build the record this request describes, validating it first.
    pub fn into_activity(self, max_title_length: usize) -> Result<Activity, ValidationError> {
        let status = self.status.unwrap_or_default();
        if !status.is_initial() {
            return Err(ValidationError::InvalidInitialStatus(status));
        }

        let mut activity = Activity::new(
            self.title.trim(),
            self.establishment_id,
            self.date,
            self.start_time,
            self.end_time,
        )
        .with_status(status);
        activity.description = self.description;
        activity.location = self.location;
        activity.responsible_name = self.responsible_name;
        activity.recurrence = self.recurrence;

        activity.validate(max_title_length)?;
        Ok(activity)
    }
}

/// Partial update of an activity's fields.
///
/// Status is not editable here; it moves only through lifecycle transitions.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ActivityUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub responsible_name: Option<String>,
    /// Series-level only: move the anchor date.
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub start_time: Option<NaiveTime>,
    #[serde(default)]
    pub end_time: Option<NaiveTime>,
    /// Series-level only: replace the recurrence rule.
    #[serde(default)]
    pub recurrence: Option<RecurrenceRule>,
    /// Series-level only: stop recurring and become a standalone activity.
    #[serde(default)]
    pub clear_recurrence: bool,
}

impl ActivityUpdate {
    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Default::default()
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_times(mut self, start: NaiveTime, end: NaiveTime) -> Self {
        self.start_time = Some(start);
        self.end_time = Some(end);
        self
    }

    pub fn with_recurrence(mut self, rule: RecurrenceRule) -> Self {
        self.recurrence = Some(rule);
        self
    }

    /// Whether the update touches fields only a series edit may change.
    pub fn touches_series_fields(&self) -> bool {
        self.date.is_some() || self.recurrence.is_some() || self.clear_recurrence
    }

    /// Apply this update to an activity.
    pub fn apply_to(&self, activity: &mut Activity) {
        if let Some(ref title) = self.title {
            activity.title = title.trim().to_string();
        }
        if let Some(ref description) = self.description {
            activity.description = Some(description.clone());
        }
        if let Some(ref location) = self.location {
            activity.location = Some(location.clone());
        }
        if let Some(ref name) = self.responsible_name {
            activity.responsible_name = Some(name.clone());
        }
        if let Some(date) = self.date {
            activity.date = date;
        }
        if let Some(start) = self.start_time {
            activity.start_time = start;
        }
        if let Some(end) = self.end_time {
            activity.end_time = end;
        }
        if self.clear_recurrence {
            activity.recurrence = None;
        } else if let Some(ref rule) = self.recurrence {
            activity.recurrence = Some(rule.clone());
        }
        activity.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn time(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    #[test]
    fn test_status_wire_values() {
        for status in ActivityStatus::ALL {
            let json = serde_json::to_value(status).unwrap();
            assert_eq!(json, serde_json::json!(status.as_str()));
            assert_eq!(status.as_str().parse::<ActivityStatus>().unwrap(), status);
        }
        assert_eq!(
            "pending-validation".parse::<ActivityStatus>().unwrap(),
            ActivityStatus::PendingValidation
        );
        assert!("ARCHIVED".parse::<ActivityStatus>().is_err());
    }

    #[test]
    fn test_scope_parsing() {
        assert_eq!("occurrence".parse::<Scope>().unwrap(), Scope::Occurrence);
        assert_eq!("SERIES".parse::<Scope>().unwrap(), Scope::Series);
        assert_eq!(
            "all".parse::<Scope>(),
            Err(ValidationError::InvalidScope("all".to_string()))
        );
        assert_eq!(serde_json::to_value(Scope::Series).unwrap(), serde_json::json!("series"));
    }

    #[test]
    fn test_new_activity_defaults_to_draft() {
        let activity = NewActivity::new("Yoga", "est-1", date(2024, 1, 1), time(9, 0), time(10, 0))
            .into_activity(255)
            .unwrap();
        assert_eq!(activity.status, ActivityStatus::Draft);
        assert!(!activity.is_recurrent());
        assert!(!activity.is_child());
    }

    #[test]
    fn test_new_activity_validation() {
        let base = NewActivity::new("Yoga", "est-1", date(2024, 1, 1), time(9, 0), time(10, 0));

        let err = NewActivity {
            title: "   ".to_string(),
            ..base.clone()
        }
        .into_activity(255)
        .unwrap_err();
        assert_eq!(err, ValidationError::MissingField("title".to_string()));

        let err = base.clone().into_activity(3).unwrap_err();
        assert_eq!(err, ValidationError::TitleTooLong { len: 4, max: 3 });

        let err = NewActivity {
            end_time: time(9, 0),
            ..base.clone()
        }
        .into_activity(255)
        .unwrap_err();
        assert!(matches!(err, ValidationError::TimeOrder { .. }));

        let err = base
            .clone()
            .with_status(ActivityStatus::Completed)
            .into_activity(255)
            .unwrap_err();
        assert_eq!(err, ValidationError::InvalidInitialStatus(ActivityStatus::Completed));

        let err = base
            .with_recurrence(RecurrenceRule::daily().until(date(2023, 12, 31)))
            .into_activity(255)
            .unwrap_err();
        assert!(matches!(err, ValidationError::RecurrenceEndBeforeAnchor { .. }));
    }

    #[test]
    fn test_child_cannot_recur() {
        let child = Activity::new("Yoga", "est-1", date(2024, 1, 2), time(9, 0), time(10, 0))
            .with_parent("parent")
            .with_recurrence(RecurrenceRule::daily());
        assert_eq!(child.validate(255), Err(ValidationError::RecurringChild));
    }

    #[test]
    fn test_materialize_child_copies_parent() {
        let parent = Activity::new("Yoga", "est-1", date(2024, 1, 1), time(9, 0), time(10, 0))
            .with_location("Gym")
            .with_status(ActivityStatus::Planned)
            .with_recurrence(RecurrenceRule::daily());

        let child = parent.materialize_child(date(2024, 1, 5));
        assert_ne!(child.id, parent.id);
        assert_eq!(child.recurrence_parent_id.as_deref(), Some(parent.id.as_str()));
        assert_eq!(child.date, date(2024, 1, 5));
        assert_eq!(child.location.as_deref(), Some("Gym"));
        assert_eq!(child.status, ActivityStatus::Planned);
        assert!(child.recurrence.is_none());
        assert!(child.validate(255).is_ok());
    }

    #[test]
    fn test_update_apply() {
        let mut activity =
            Activity::new("Yoga", "est-1", date(2024, 1, 1), time(9, 0), time(10, 0))
                .with_recurrence(RecurrenceRule::daily());

        let update = ActivityUpdate::title("  Pilates ")
            .with_location("Room B")
            .with_times(time(14, 0), time(15, 0));
        assert!(!update.touches_series_fields());
        update.apply_to(&mut activity);

        assert_eq!(activity.title, "Pilates");
        assert_eq!(activity.location.as_deref(), Some("Room B"));
        assert_eq!(activity.start_time, time(14, 0));
        assert!(activity.is_recurrent());

        let clear = ActivityUpdate {
            clear_recurrence: true,
            ..Default::default()
        };
        assert!(clear.touches_series_fields());
        clear.apply_to(&mut activity);
        assert!(!activity.is_recurrent());
    }
}
