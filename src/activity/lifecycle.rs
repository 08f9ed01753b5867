//! Activity lifecycle state machine.
//!
//! ```text
//! DRAFT ──submit──▶ PENDING_VALIDATION ──approve──▶ PLANNED ──start──▶ IN_PROGRESS
//!                                                                         │
//!                      REPORT_COMPLETE ◀──file_report── COMPLETED ◀──complete
//!
//! any non-terminal ──cancel──▶ CANCELLED
//! ```
//!
//! Re-submitting a `PENDING_VALIDATION` activity is a no-op. Every other
//! move not drawn above is rejected with a [`StateTransitionError`].

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::types::ActivityStatus;
use crate::error::{StateTransitionError, ValidationError};

/// A requested lifecycle move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleAction {
    /// DRAFT → PENDING_VALIDATION.
    Submit,
    /// PENDING_VALIDATION → PLANNED.
    Approve,
    /// PLANNED → IN_PROGRESS.
    Start,
    /// IN_PROGRESS → COMPLETED.
    Complete,
    /// COMPLETED → REPORT_COMPLETE, marking the report as filed.
    FileReport,
    /// Any non-terminal state → CANCELLED.
    Cancel,
}

impl LifecycleAction {
    pub const ALL: [LifecycleAction; 6] = [
        LifecycleAction::Submit,
        LifecycleAction::Approve,
        LifecycleAction::Start,
        LifecycleAction::Complete,
        LifecycleAction::FileReport,
        LifecycleAction::Cancel,
    ];

    /// Status the action leads to.
    pub fn target(&self) -> ActivityStatus {
        match self {
            LifecycleAction::Submit => ActivityStatus::PendingValidation,
            LifecycleAction::Approve => ActivityStatus::Planned,
            LifecycleAction::Start => ActivityStatus::InProgress,
            LifecycleAction::Complete => ActivityStatus::Completed,
            LifecycleAction::FileReport => ActivityStatus::ReportComplete,
            LifecycleAction::Cancel => ActivityStatus::Cancelled,
        }
    }

    /// The only status the action may start from, or `None` for cancel.
    fn source(&self) -> Option<ActivityStatus> {
        match self {
            LifecycleAction::Submit => Some(ActivityStatus::Draft),
            LifecycleAction::Approve => Some(ActivityStatus::PendingValidation),
            LifecycleAction::Start => Some(ActivityStatus::Planned),
            LifecycleAction::Complete => Some(ActivityStatus::InProgress),
            LifecycleAction::FileReport => Some(ActivityStatus::Completed),
            LifecycleAction::Cancel => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleAction::Submit => "submit",
            LifecycleAction::Approve => "approve",
            LifecycleAction::Start => "start",
            LifecycleAction::Complete => "complete",
            LifecycleAction::FileReport => "file_report",
            LifecycleAction::Cancel => "cancel",
        }
    }
}

impl fmt::Display for LifecycleAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace('-', "_");
        LifecycleAction::ALL
            .into_iter()
            .find(|action| action.as_str() == normalized)
            .ok_or_else(|| ValidationError::InvalidAction(s.to_string()))
    }
}

/// Outcome of applying an action to a status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Transition {
    /// The status changes.
    Applied {
        from: ActivityStatus,
        to: ActivityStatus,
    },
    /// The activity is already where the action leads; nothing to persist.
    NoOp { status: ActivityStatus },
}

impl Transition {
    /// Status after the transition.
    pub fn status(&self) -> ActivityStatus {
        match self {
            Transition::Applied { to, .. } => *to,
            Transition::NoOp { status } => *status,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, Transition::Applied { .. })
    }
}

/// Apply `action` to an activity currently in `status`.
pub fn apply(
    status: ActivityStatus,
    action: LifecycleAction,
) -> Result<Transition, StateTransitionError> {
    let to = action.target();
    let rejected = StateTransitionError { from: status, to };

    if status.is_terminal() {
        return Err(rejected);
    }

    match (action, action.source()) {
        (LifecycleAction::Submit, _) if status == ActivityStatus::PendingValidation => {
            Ok(Transition::NoOp { status })
        }
        (LifecycleAction::Cancel, _) => Ok(Transition::Applied { from: status, to }),
        (_, Some(source)) if source == status => Ok(Transition::Applied { from: status, to }),
        _ => Err(rejected),
    }
}

impl ActivityStatus {
    /// Apply a lifecycle action to this status.
    pub fn apply(self, action: LifecycleAction) -> Result<Transition, StateTransitionError> {
        apply(self, action)
    }

    /// Whether a single step from `self` to `to` is allowed.
    pub fn can_transition_to(self, to: ActivityStatus) -> bool {
        LifecycleAction::ALL
            .into_iter()
            .filter(|action| action.target() == to)
            .any(|action| matches!(apply(self, action), Ok(Transition::Applied { .. })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_happy_path() {
        let mut status = ActivityStatus::Draft;
        for action in [
            LifecycleAction::Submit,
            LifecycleAction::Approve,
            LifecycleAction::Start,
            LifecycleAction::Complete,
            LifecycleAction::FileReport,
        ] {
            let transition = status.apply(action).unwrap();
            assert!(transition.is_applied());
            status = transition.status();
        }
        assert_eq!(status, ActivityStatus::ReportComplete);
    }

    #[test]
    fn test_submit_is_idempotent() {
        assert_eq!(
            apply(ActivityStatus::Draft, LifecycleAction::Submit).unwrap(),
            Transition::Applied {
                from: ActivityStatus::Draft,
                to: ActivityStatus::PendingValidation,
            }
        );
        assert_eq!(
            apply(ActivityStatus::PendingValidation, LifecycleAction::Submit).unwrap(),
            Transition::NoOp {
                status: ActivityStatus::PendingValidation
            }
        );
    }

    #[test]
    fn test_skipping_ahead_is_rejected() {
        let err = apply(ActivityStatus::Draft, LifecycleAction::Complete).unwrap_err();
        assert_eq!(
            err,
            StateTransitionError {
                from: ActivityStatus::Draft,
                to: ActivityStatus::Completed,
            }
        );

        assert!(apply(ActivityStatus::Planned, LifecycleAction::Submit).is_err());
        assert!(apply(ActivityStatus::InProgress, LifecycleAction::Start).is_err());
    }

    #[test]
    fn test_cancel_from_any_non_terminal() {
        for status in ActivityStatus::ALL.into_iter().filter(|s| !s.is_terminal()) {
            assert_eq!(
                apply(status, LifecycleAction::Cancel).unwrap().status(),
                ActivityStatus::Cancelled,
                "cancel from {status}"
            );
        }
    }

    #[test]
    fn test_terminal_states_reject_everything() {
        for status in [ActivityStatus::Cancelled, ActivityStatus::ReportComplete] {
            for action in LifecycleAction::ALL {
                assert!(apply(status, action).is_err(), "{action} from {status}");
            }
        }
    }

    #[test]
    fn test_can_transition_to() {
        assert!(ActivityStatus::Draft.can_transition_to(ActivityStatus::PendingValidation));
        assert!(ActivityStatus::Completed.can_transition_to(ActivityStatus::ReportComplete));
        assert!(ActivityStatus::Planned.can_transition_to(ActivityStatus::Cancelled));
        assert!(!ActivityStatus::Draft.can_transition_to(ActivityStatus::Completed));
        assert!(!ActivityStatus::PendingValidation.can_transition_to(ActivityStatus::PendingValidation));
        assert!(!ActivityStatus::Cancelled.can_transition_to(ActivityStatus::Draft));
    }

    #[test]
    fn test_action_parsing() {
        assert_eq!("file-report".parse::<LifecycleAction>().unwrap(), LifecycleAction::FileReport);
        assert_eq!("Start".parse::<LifecycleAction>().unwrap(), LifecycleAction::Start);
        assert!("archive".parse::<LifecycleAction>().is_err());
    }
}
