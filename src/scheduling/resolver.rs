//! Occurrence materialization.
//!
//! Expands recurring series into per-day occurrences over a date range and
//! merges them with physical records. A physical child on `(parent, date)`
//! replaces the parent's virtual occurrence for that date, so each day shows
//! one item per series.
//!
//! The resolver works on an immutable [`ActivitySnapshot`] built once per
//! call, with a `(parent_id, date)` index over physical children. Days are
//! independent of each other, so the result does not depend on the order in
//! which activities were loaded.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveTime};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::activity::{Activity, ActivityStatus};
use crate::calendar::{enumerate_days, matches};
use crate::error::ValidationError;

/// Separator between the series id and the date in a virtual occurrence id.
const VIRTUAL_ID_SEPARATOR: char = '@';

// ============================================================================
// Occurrence
// ============================================================================

/// One activity as it appears on one calendar day.
///
/// Occurrences are read-only projections. A virtual occurrence has no
/// persisted record of its own; editing it goes through the scheduling
/// service, which materializes a physical child.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Occurrence {
    /// Occurrence id: the record id for physical occurrences,
    /// `"{series_id}@{date}"` for virtual ones.
    pub id: String,
    /// Record the occurrence was produced from.
    pub source_activity_id: String,
    /// Series this occurrence belongs to, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub series_id: Option<String>,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub responsible_name: Option<String>,
    pub establishment_id: String,
    pub status: ActivityStatus,
    pub report_complete: bool,
    /// True when computed from a series rule rather than read from a record.
    pub is_virtual: bool,
}

impl Occurrence {
    /// The occurrence of a physical record on its own date.
    pub fn physical(activity: &Activity) -> Self {
        let series_id = activity
            .recurrence_parent_id
            .clone()
            .or_else(|| activity.is_recurrent().then(|| activity.id.clone()));
        Self::project(activity, activity.id.clone(), series_id, activity.date, false)
    }

    /// A computed occurrence of `parent` on `date`, carrying the parent's
    /// current status.
    pub fn virtual_of(parent: &Activity, date: NaiveDate) -> Self {
        let id = OccurrenceRef::virtual_id(&parent.id, date);
        Self::project(parent, id, Some(parent.id.clone()), date, true)
    }

    fn project(
        activity: &Activity,
        id: String,
        series_id: Option<String>,
        date: NaiveDate,
        is_virtual: bool,
    ) -> Self {
        Self {
            id,
            source_activity_id: activity.id.clone(),
            series_id,
            date,
            start_time: activity.start_time,
            end_time: activity.end_time,
            title: activity.title.clone(),
            description: activity.description.clone(),
            location: activity.location.clone(),
            responsible_name: activity.responsible_name.clone(),
            establishment_id: activity.establishment_id.clone(),
            status: activity.status,
            report_complete: activity.report_complete,
            is_virtual,
        }
    }

    fn sort_key(&self) -> (NaiveDate, NaiveTime, &str, &str) {
        (self.date, self.start_time, &self.source_activity_id, &self.id)
    }
}

// ============================================================================
// Occurrence Ids
// ============================================================================

/// A parsed occurrence id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum OccurrenceRef {
    /// A persisted record, addressed by its own id.
    Physical(String),
    /// A computed occurrence of a series on one date.
    Virtual { parent_id: String, date: NaiveDate },
}

impl OccurrenceRef {
    /// Build the id of the virtual occurrence of `parent_id` on `date`.
    pub fn virtual_id(parent_id: &str, date: NaiveDate) -> String {
        format!("{}{}{}", parent_id, VIRTUAL_ID_SEPARATOR, date.format("%Y-%m-%d"))
    }

    /// The record id this reference resolves through first.
    pub fn record_id(&self) -> &str {
        match self {
            OccurrenceRef::Physical(id) => id,
            OccurrenceRef::Virtual { parent_id, .. } => parent_id,
        }
    }
}

impl FromStr for OccurrenceRef {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ValidationError::InvalidOccurrenceId(s.to_string());
        if s.trim().is_empty() {
            return Err(invalid());
        }
        match s.rsplit_once(VIRTUAL_ID_SEPARATOR) {
            None => Ok(OccurrenceRef::Physical(s.to_string())),
            Some((parent_id, date)) if !parent_id.is_empty() => {
                let date = NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|_| invalid())?;
                Ok(OccurrenceRef::Virtual {
                    parent_id: parent_id.to_string(),
                    date,
                })
            }
            Some(_) => Err(invalid()),
        }
    }
}

impl fmt::Display for OccurrenceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OccurrenceRef::Physical(id) => f.write_str(id),
            OccurrenceRef::Virtual { parent_id, date } => {
                f.write_str(&Self::virtual_id(parent_id, *date))
            }
        }
    }
}

// ============================================================================
// Snapshot
// ============================================================================

/// Immutable view of an activity set with a child index.
pub struct ActivitySnapshot<'a> {
    activities: &'a [Activity],
    children: HashMap<(String, NaiveDate), &'a Activity>,
}

impl<'a> ActivitySnapshot<'a> {
    /// Index the physical children of `activities`.
    pub fn new(activities: &'a [Activity]) -> Self {
        let mut children = HashMap::new();
        for activity in activities {
            if let Some(ref parent_id) = activity.recurrence_parent_id {
                children
                    .entry((parent_id.clone(), activity.date))
                    .or_insert(activity);
            }
        }
        Self {
            activities,
            children,
        }
    }

    /// The physical child of `parent_id` on `date`, if one exists.
    pub fn child_on(&self, parent_id: &str, date: NaiveDate) -> Option<&'a Activity> {
        self.children.get(&(parent_id.to_string(), date)).copied()
    }

    /// What `activity` contributes to `day`, if anything.
    pub fn occurrence_of(&self, activity: &Activity, day: NaiveDate) -> Option<Occurrence> {
        if activity.date == day {
            return Some(Occurrence::physical(activity));
        }

        let rule = activity.recurrence.as_ref()?;
        if day <= activity.date || !matches(rule, activity.date, day) {
            return None;
        }
        if self.child_on(&activity.id, day).is_some() {
            // The child is emitted on its own date.
            return None;
        }
        Some(Occurrence::virtual_of(activity, day))
    }

    /// All occurrences on one day, unsorted.
    pub fn occurrences_on(&self, day: NaiveDate) -> Vec<Occurrence> {
        self.activities
            .iter()
            .filter_map(|activity| self.occurrence_of(activity, day))
            .collect()
    }

    /// All occurrences in `[start, end]`, sorted by date then start time.
    pub fn resolve(&self, start: NaiveDate, end: NaiveDate) -> Vec<Occurrence> {
        let mut occurrences: Vec<Occurrence> = enumerate_days(start, end)
            .flat_map(|day| self.occurrences_on(day))
            .collect();
        occurrences.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
        occurrences
    }
}

/// Resolve the occurrences of `activities` visible in `[start, end]`.
///
/// An inverted range yields no occurrences.
pub fn resolve(activities: &[Activity], start: NaiveDate, end: NaiveDate) -> Vec<Occurrence> {
    ActivitySnapshot::new(activities).resolve(start, end)
}
