//! Recurrence rules and the rule evaluator.
//!
//! A [`RecurrenceRule`] describes which days a recurring activity repeats on,
//! relative to the activity's anchor date. Pattern-specific data lives inside
//! the [`RecurrencePattern`] variant that uses it, so `WEEKLY` is the only
//! pattern that carries weekday indices.

use std::collections::BTreeSet;

use chrono::NaiveDate;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::dates::{is_weekend, same_day_of_month, weekday_index};
use crate::error::ValidationError;

/// How a recurring activity repeats.
///
/// Wire values are `DAILY`, `DAILY_NO_WEEKEND`, `WEEKLY` and `MONTHLY`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "pattern", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RecurrencePattern {
    /// Every day.
    Daily,
    /// Monday through Friday.
    DailyNoWeekend,
    /// On the listed weekdays (0 = Sunday .. 6 = Saturday). An empty set
    /// means the anchor date's own weekday.
    Weekly {
        #[serde(default)]
        days: BTreeSet<u8>,
    },
    /// On the anchor's day-of-month.
    Monthly,
    /// A pattern value this build does not know. Never matches and is
    /// rejected on write.
    #[serde(other)]
    Unrecognized,
}

impl RecurrencePattern {
    /// Weekly on the given weekday indices.
    pub fn weekly_on(days: impl IntoIterator<Item = u8>) -> Self {
        RecurrencePattern::Weekly {
            days: days.into_iter().collect(),
        }
    }

    /// Wire name of the pattern.
    pub fn as_str(&self) -> &'static str {
        match self {
            RecurrencePattern::Daily => "DAILY",
            RecurrencePattern::DailyNoWeekend => "DAILY_NO_WEEKEND",
            RecurrencePattern::Weekly { .. } => "WEEKLY",
            RecurrencePattern::Monthly => "MONTHLY",
            RecurrencePattern::Unrecognized => "UNRECOGNIZED",
        }
    }
}

/// A recurrence rule: a pattern plus an optional inclusive end date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct RecurrenceRule {
    #[serde(flatten)]
    pub pattern: RecurrencePattern,
    /// Last day (inclusive) on which the rule can produce an occurrence.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl RecurrenceRule {
    /// Create an unbounded rule.
    pub fn new(pattern: RecurrencePattern) -> Self {
        Self {
            pattern,
            end_date: None,
        }
    }

    pub fn daily() -> Self {
        Self::new(RecurrencePattern::Daily)
    }

    pub fn weekdays() -> Self {
        Self::new(RecurrencePattern::DailyNoWeekend)
    }

    pub fn weekly_on(days: impl IntoIterator<Item = u8>) -> Self {
        Self::new(RecurrencePattern::weekly_on(days))
    }

    pub fn monthly() -> Self {
        Self::new(RecurrencePattern::Monthly)
    }

    /// Stop producing occurrences after `date` (inclusive).
    pub fn until(mut self, date: NaiveDate) -> Self {
        self.end_date = Some(date);
        self
    }

    /// Whether the rule produces an occurrence on `candidate` for a series
    /// anchored at `anchor`.
    pub fn matches(&self, anchor: NaiveDate, candidate: NaiveDate) -> bool {
        matches(self, anchor, candidate)
    }

    /// Check the rule against its anchor date before it is stored.
    pub fn validate(&self, anchor: NaiveDate) -> Result<(), ValidationError> {
        match &self.pattern {
            RecurrencePattern::Unrecognized => return Err(ValidationError::UnknownPattern),
            RecurrencePattern::Weekly { days } => {
                if let Some(&bad) = days.iter().find(|&&d| d > 6) {
                    return Err(ValidationError::InvalidWeekday(bad));
                }
            }
            _ => {}
        }

        if let Some(end_date) = self.end_date {
            if end_date < anchor {
                return Err(ValidationError::RecurrenceEndBeforeAnchor {
                    date: anchor,
                    end_date,
                });
            }
        }

        Ok(())
    }
}

/// Decide whether `rule` produces an occurrence on `candidate`.
///
/// Dates before the anchor and dates after the rule's end date never match.
pub fn matches(rule: &RecurrenceRule, anchor: NaiveDate, candidate: NaiveDate) -> bool {
    if candidate < anchor {
        return false;
    }
    if rule.end_date.is_some_and(|end| candidate > end) {
        return false;
    }

    match &rule.pattern {
        RecurrencePattern::Daily => true,
        RecurrencePattern::DailyNoWeekend => !is_weekend(candidate),
        RecurrencePattern::Weekly { days } if days.is_empty() => {
            weekday_index(candidate) == weekday_index(anchor)
        }
        RecurrencePattern::Weekly { days } => days.contains(&weekday_index(candidate)),
        RecurrencePattern::Monthly => same_day_of_month(anchor, candidate),
        RecurrencePattern::Unrecognized => false,
    }
}
