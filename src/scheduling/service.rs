//! Scheduling service.
//!
//! Orchestrates the resolver, the lifecycle state machine and an
//! [`ActivityStore`]. Every write addresses either a record id or a virtual
//! occurrence id (`"{series_id}@{date}"`), combined with a [`Scope`]:
//!
//! - `Series` acts on the series parent, whichever of its occurrences was
//!   addressed
//! - `Occurrence` acts on one date only; the first edit of a virtual
//!   occurrence materializes a physical child, later edits update that child

use std::sync::Arc;

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use super::resolver::{resolve, Occurrence, OccurrenceRef};
use crate::activity::{
    apply_action, Activity, ActivityStatus, ActivityUpdate, LifecycleAction, NewActivity, Scope,
    Transition,
};
use crate::calendar::days_in_range;
use crate::config::SchedulingConfig;
use crate::error::{AgendaError, ConflictError, NotFoundError, Result, ValidationError};
use crate::storage::{ActivityFilter, ActivityStore};

// ============================================================================
// Request / Response Types
// ============================================================================

/// Which occurrences to list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OccurrenceQuery {
    /// Only occurrences of this establishment.
    pub establishment_id: Option<String>,
    pub start: NaiveDate,
    pub end: NaiveDate,
    /// Keep cancelled occurrences in the result.
    pub include_cancelled: bool,
}

impl OccurrenceQuery {
    /// Every occurrence in `[start, end]`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            establishment_id: None,
            start,
            end,
            include_cancelled: true,
        }
    }

    pub fn for_establishment(mut self, establishment_id: impl Into<String>) -> Self {
        self.establishment_id = Some(establishment_id.into());
        self
    }

    pub fn without_cancelled(mut self) -> Self {
        self.include_cancelled = false;
        self
    }
}

/// Result of a delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum DeleteOutcome {
    /// Records removed from storage, children before their parent.
    Deleted { ids: Vec<String> },
    /// One occurrence of a series was suppressed by a cancelled child.
    Cancelled { activity: Activity },
}

/// Result of a single lifecycle transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    /// The record after the transition.
    pub activity: Activity,
    pub transition: Transition,
}

/// Per-record result of a bulk submit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum SubmitOutcome {
    /// Moved from DRAFT to PENDING_VALIDATION.
    Submitted,
    /// Already PENDING_VALIDATION; nothing written.
    AlreadySubmitted,
    /// Persisting this record failed; the batch stopped here.
    Failed { error: String },
    /// Submitted earlier in the batch, then restored to DRAFT after a failure.
    RolledBack,
    /// Submitted earlier in the batch; restoring it to DRAFT also failed.
    RollbackFailed { error: String },
    /// Not processed because the batch stopped first.
    NotAttempted,
}

/// One line of a [`SubmitReport`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitItem {
    pub activity_id: String,
    #[serde(flatten)]
    pub outcome: SubmitOutcome,
}

/// Result of [`SchedulingService::submit_all_drafts`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitReport {
    pub items: Vec<SubmitItem>,
    /// Records left in PENDING_VALIDATION by this call.
    pub submitted: usize,
    pub already_submitted: usize,
    pub failed: usize,
    /// False when the batch stopped on a failure; in that case nothing this
    /// call submitted should be treated as committed.
    pub committed: bool,
}

impl SubmitReport {
    fn count(&self, pred: impl Fn(&SubmitOutcome) -> bool) -> usize {
        self.items.iter().filter(|i| pred(&i.outcome)).count()
    }

    fn finish(mut self, committed: bool) -> Self {
        self.submitted = self.count(|o| {
            matches!(o, SubmitOutcome::Submitted | SubmitOutcome::RollbackFailed { .. })
        });
        self.already_submitted = self.count(|o| matches!(o, SubmitOutcome::AlreadySubmitted));
        self.failed = self.count(|o| matches!(o, SubmitOutcome::Failed { .. }));
        self.committed = committed;
        self
    }
}

/// What an id resolved to.
enum Target {
    /// A persisted record.
    Record(Activity),
    /// A date of a series, with its physical child if one exists.
    Occurrence {
        parent: Activity,
        date: NaiveDate,
        child: Option<Activity>,
    },
}

// ============================================================================
// Scheduling Service
// ============================================================================

/// Facade over the scheduling engine.
pub struct SchedulingService {
    store: Arc<dyn ActivityStore>,
    settings: SchedulingConfig,
}

impl SchedulingService {
    /// Create a service with default limits.
    pub fn new(store: Arc<dyn ActivityStore>) -> Self {
        Self {
            store,
            settings: SchedulingConfig::default(),
        }
    }

    /// Use the given limits.
    pub fn with_settings(mut self, settings: SchedulingConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn settings(&self) -> &SchedulingConfig {
        &self.settings
    }

    pub fn store(&self) -> &Arc<dyn ActivityStore> {
        &self.store
    }

    /// Last day of the default query window starting at `start`.
    pub fn default_end(&self, start: NaiveDate) -> Result<NaiveDate> {
        let days = self.settings.default_range_days;
        start
            .checked_add_signed(Duration::days(days - 1))
            .ok_or_else(|| {
                ValidationError::RangeTooWide {
                    days,
                    max: self.settings.max_range_days,
                }
                .into()
            })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Occurrences in the query window, sorted by date and start time.
    pub async fn occurrences(&self, query: &OccurrenceQuery) -> Result<Vec<Occurrence>> {
        let days = days_in_range(query.start, query.end);
        if days == 0 {
            return Ok(Vec::new());
        }
        if days > self.settings.max_range_days {
            return Err(ValidationError::RangeTooWide {
                days,
                max: self.settings.max_range_days,
            }
            .into());
        }

        let mut filter = ActivityFilter::all().touching(query.start, query.end);
        filter.establishment_id = query.establishment_id.clone();
        let activities = self.store.list(&filter).await?;

        let mut occurrences = resolve(&activities, query.start, query.end);
        if !query.include_cancelled {
            occurrences.retain(|o| o.status != ActivityStatus::Cancelled);
        }

        debug!(
            start = %query.start,
            end = %query.end,
            records = activities.len(),
            occurrences = occurrences.len(),
            "Resolved occurrences"
        );
        Ok(occurrences)
    }

    /// Get a record by id.
    pub async fn get_activity(&self, id: &str) -> Result<Activity> {
        self.store
            .get(id)
            .await?
            .ok_or_else(|| NotFoundError::Activity(id.to_string()).into())
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Create a standalone activity or a series parent.
    pub async fn create_activity(&self, request: NewActivity) -> Result<Activity> {
        let activity = request.into_activity(self.settings.max_title_length)?;
        let activity = self.store.insert(activity).await?;
        info!(
            activity_id = %activity.id,
            recurrent = activity.is_recurrent(),
            status = %activity.status,
            "Created activity: {}",
            activity.title
        );
        Ok(activity)
    }

    /// Edit one occurrence or a whole series.
    pub async fn update_activity(
        &self,
        id: &str,
        update: ActivityUpdate,
        scope: Scope,
    ) -> Result<Activity> {
        let target = self.locate(id).await?;

        if scope == Scope::Series {
            let mut root = self.series_root(target).await?;
            update.apply_to(&mut root);
            root.validate(self.settings.max_title_length)?;
            // The anchor is itself an occurrence and cannot share its date with an override
            if root.is_series_parent()
                && self.store.find_child(&root.id, root.date).await?.is_some()
            {
                return Err(ConflictError::DuplicateChild {
                    parent_id: root.id,
                    date: root.date,
                }
                .into());
            }
            let root = self.store.replace(root).await?;
            info!(activity_id = %root.id, "Updated series");
            return Ok(root);
        }

        match target {
            Target::Record(activity) if activity.is_series_parent() => {
                Err(ValidationError::SeriesParentAddressed(activity.id).into())
            }
            Target::Record(mut activity) => {
                if activity.is_child() {
                    reject_series_fields(&update)?;
                }
                update.apply_to(&mut activity);
                activity.validate(self.settings.max_title_length)?;
                let activity = self.store.replace(activity).await?;
                debug!(activity_id = %activity.id, "Updated activity");
                Ok(activity)
            }
            Target::Occurrence {
                child: Some(mut child),
                ..
            } => {
                reject_series_fields(&update)?;
                update.apply_to(&mut child);
                child.validate(self.settings.max_title_length)?;
                let child = self.store.replace(child).await?;
                debug!(activity_id = %child.id, "Updated existing occurrence override");
                Ok(child)
            }
            Target::Occurrence {
                parent,
                date,
                child: None,
            } => {
                reject_series_fields(&update)?;
                let mut child = parent.materialize_child(date);
                update.apply_to(&mut child);
                child.validate(self.settings.max_title_length)?;
                let child = self.insert_child(child).await?;
                info!(
                    activity_id = %child.id,
                    parent_id = %parent.id,
                    date = %date,
                    "Materialized occurrence override"
                );
                Ok(child)
            }
        }
    }

    /// Delete one occurrence or a whole series.
    ///
    /// Deleting one occurrence of a series stores a `CANCELLED` child for
    /// that date, so the rest of the series is untouched.
    pub async fn delete_activity(&self, id: &str, scope: Scope) -> Result<DeleteOutcome> {
        let target = self.locate(id).await?;

        if scope == Scope::Series {
            let root = self.series_root(target).await?;
            let mut ids = Vec::new();
            for child in self.store.children_of(&root.id).await? {
                if self.store.delete(&child.id).await? {
                    ids.push(child.id);
                }
            }
            if self.store.delete(&root.id).await? {
                ids.push(root.id.clone());
            }
            info!(activity_id = %root.id, removed = ids.len(), "Deleted series");
            return Ok(DeleteOutcome::Deleted { ids });
        }

        match target {
            Target::Record(activity) if activity.is_series_parent() => {
                Err(ValidationError::SeriesParentAddressed(activity.id).into())
            }
            Target::Record(activity) if activity.is_child() => {
                let activity = self.cancel_record(activity).await?;
                Ok(DeleteOutcome::Cancelled { activity })
            }
            Target::Record(activity) => {
                self.store.delete(&activity.id).await?;
                info!(activity_id = %activity.id, "Deleted activity");
                Ok(DeleteOutcome::Deleted {
                    ids: vec![activity.id],
                })
            }
            Target::Occurrence {
                child: Some(child), ..
            } => {
                let activity = self.cancel_record(child).await?;
                Ok(DeleteOutcome::Cancelled { activity })
            }
            Target::Occurrence {
                parent,
                date,
                child: None,
            } => {
                apply_action(parent.status, LifecycleAction::Cancel)?;
                let mut child = parent.materialize_child(date);
                child.status = ActivityStatus::Cancelled;
                let activity = self.insert_child(child).await?;
                info!(
                    activity_id = %activity.id,
                    parent_id = %parent.id,
                    date = %date,
                    "Cancelled single occurrence"
                );
                Ok(DeleteOutcome::Cancelled { activity })
            }
        }
    }

    /// Apply one lifecycle action.
    ///
    /// A virtual occurrence has no status of its own; acting on one first
    /// materializes a child carrying the series status.
    pub async fn transition(&self, id: &str, action: LifecycleAction) -> Result<TransitionOutcome> {
        match self.locate(id).await? {
            Target::Record(activity)
            | Target::Occurrence {
                child: Some(activity),
                ..
            } => self.transition_record(activity, action).await,
            Target::Occurrence {
                parent,
                date,
                child: None,
            } => {
                let transition = apply_action(parent.status, action)?;
                if !transition.is_applied() {
                    return Ok(TransitionOutcome {
                        activity: parent,
                        transition,
                    });
                }

                let mut child = parent.materialize_child(date);
                child.status = transition.status();
                if child.status == ActivityStatus::ReportComplete {
                    child.report_complete = true;
                }
                let activity = self.insert_child(child).await?;
                info!(
                    activity_id = %activity.id,
                    parent_id = %parent.id,
                    action = %action,
                    to = %activity.status,
                    "Materialized occurrence for transition"
                );
                Ok(TransitionOutcome {
                    activity,
                    transition,
                })
            }
        }
    }

    /// Submit every draft, optionally limited to one establishment.
    ///
    /// Records already pending validation are reported as such. The batch
    /// stops at the first record that cannot be persisted; records submitted
    /// earlier in the same call are restored to `DRAFT` and the report is
    /// returned with `committed = false`.
    pub async fn submit_all_drafts(&self, establishment_id: Option<&str>) -> Result<SubmitReport> {
        let mut filter = ActivityFilter::all()
            .with_statuses([ActivityStatus::Draft, ActivityStatus::PendingValidation]);
        if let Some(establishment_id) = establishment_id {
            filter = filter.for_establishment(establishment_id);
        }
        let candidates = self.store.list(&filter).await?;

        let mut report = SubmitReport::default();
        let mut failure = None;

        for (index, activity) in candidates.iter().enumerate() {
            let outcome = match self.submit_one(activity).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    warn!(activity_id = %activity.id, error = %e, "Bulk submit failed");
                    failure = Some(index);
                    SubmitOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.items.push(SubmitItem {
                activity_id: activity.id.clone(),
                outcome,
            });
            if failure.is_some() {
                break;
            }
        }

        let Some(failed_at) = failure else {
            info!(
                submitted = report.count(|o| matches!(o, SubmitOutcome::Submitted)),
                "Submitted all drafts"
            );
            return Ok(report.finish(true));
        };

        for activity in &candidates[failed_at + 1..] {
            report.items.push(SubmitItem {
                activity_id: activity.id.clone(),
                outcome: SubmitOutcome::NotAttempted,
            });
        }

        for item in report.items.iter_mut() {
            if item.outcome != SubmitOutcome::Submitted {
                continue;
            }
            item.outcome = match self
                .store
                .compare_and_set_status(
                    &item.activity_id,
                    ActivityStatus::PendingValidation,
                    ActivityStatus::Draft,
                )
                .await
            {
                Ok(_) => SubmitOutcome::RolledBack,
                Err(e) => {
                    warn!(activity_id = %item.activity_id, error = %e, "Rollback failed");
                    SubmitOutcome::RollbackFailed {
                        error: e.to_string(),
                    }
                }
            };
        }

        Ok(report.finish(false))
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    /// Resolve an id to a record or to one date of a series.
    async fn locate(&self, id: &str) -> Result<Target> {
        if let Some(activity) = self.store.get(id).await? {
            return Ok(Target::Record(activity));
        }

        match id.parse::<OccurrenceRef>()? {
            OccurrenceRef::Physical(id) => Err(NotFoundError::Activity(id).into()),
            OccurrenceRef::Virtual { parent_id, date } => {
                let parent = self.get_activity(&parent_id).await?;
                let produces = parent.is_series_parent()
                    && date > parent.date
                    && parent
                        .recurrence
                        .as_ref()
                        .is_some_and(|rule| rule.matches(parent.date, date));
                if !produces {
                    return Err(NotFoundError::Occurrence { parent_id, date }.into());
                }
                let child = self.store.find_child(&parent.id, date).await?;
                Ok(Target::Occurrence {
                    parent,
                    date,
                    child,
                })
            }
        }
    }

    /// The record a series-scoped operation acts on.
    async fn series_root(&self, target: Target) -> Result<Activity> {
        match target {
            Target::Record(activity) => match activity.recurrence_parent_id {
                Some(ref parent_id) => self.get_activity(parent_id).await,
                None => Ok(activity),
            },
            Target::Occurrence { parent, .. } => Ok(parent),
        }
    }

    async fn insert_child(&self, child: Activity) -> Result<Activity> {
        self.store.insert(child).await.inspect_err(|e| {
            if matches!(e, AgendaError::Conflict(_)) {
                warn!(error = %e, "Concurrent occurrence materialization rejected");
            }
        })
    }

    async fn transition_record(
        &self,
        activity: Activity,
        action: LifecycleAction,
    ) -> Result<TransitionOutcome> {
        let transition = apply_action(activity.status, action)?;
        let Transition::Applied { from, to } = transition else {
            return Ok(TransitionOutcome {
                activity,
                transition,
            });
        };

        let activity = self
            .store
            .compare_and_set_status(&activity.id, from, to)
            .await?;
        info!(activity_id = %activity.id, from = %from, to = %to, "Status changed");
        Ok(TransitionOutcome {
            activity,
            transition,
        })
    }

    /// Cancel a physical record; cancelling a cancelled record changes nothing.
    async fn cancel_record(&self, activity: Activity) -> Result<Activity> {
        if activity.status == ActivityStatus::Cancelled {
            return Ok(activity);
        }
        let outcome = self
            .transition_record(activity, LifecycleAction::Cancel)
            .await?;
        Ok(outcome.activity)
    }

    async fn submit_one(&self, activity: &Activity) -> Result<SubmitOutcome> {
        match apply_action(activity.status, LifecycleAction::Submit)? {
            Transition::NoOp { .. } => Ok(SubmitOutcome::AlreadySubmitted),
            Transition::Applied { from, to } => {
                match self
                    .store
                    .compare_and_set_status(&activity.id, from, to)
                    .await
                {
                    Ok(_) => Ok(SubmitOutcome::Submitted),
                    // Someone else submitted it between listing and writing.
                    Err(AgendaError::Conflict(ConflictError::StaleStatus {
                        actual: ActivityStatus::PendingValidation,
                        ..
                    })) => Ok(SubmitOutcome::AlreadySubmitted),
                    Err(e) => Err(e),
                }
            }
        }
    }
}

fn reject_series_fields(update: &ActivityUpdate) -> Result<()> {
    if update.date.is_some() {
        return Err(ValidationError::SeriesOnlyField("date".to_string()).into());
    }
    if update.recurrence.is_some() || update.clear_recurrence {
        return Err(ValidationError::SeriesOnlyField("recurrence".to_string()).into());
    }
    Ok(())
}
