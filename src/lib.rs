//! Civic Agenda: recurring-activity scheduling engine.
//!
//! Establishments plan activities that happen once or repeat on a rule
//! (daily, weekdays only, chosen weekdays, or monthly). Series are stored
//! once and expanded into occurrences on demand; editing a single date
//! materializes a physical child that overrides the computed occurrence.
//! Every record moves through an operational lifecycle from draft to
//! reported.

pub mod activity;
pub mod api;
pub mod calendar;
pub mod config;
pub mod directory;
pub mod error;
pub mod scheduling;
pub mod storage;

pub use activity::{
    Activity, ActivityStatus, ActivityUpdate, LifecycleAction, NewActivity, Scope, Transition,
};
pub use api::{create_combined_router, create_rest_router, ApiState, RestApiConfig};
pub use calendar::{RecurrencePattern, RecurrenceRule};
pub use config::Config;
pub use directory::{Establishment, EstablishmentDirectory, StaticDirectory};
pub use error::{
    AgendaError, ConflictError, NotFoundError, Result, StateTransitionError, StorageError,
    ValidationError,
};
pub use scheduling::{
    DeleteOutcome, Occurrence, OccurrenceQuery, OccurrenceRef, SchedulingService, SubmitItem,
    SubmitOutcome, SubmitReport, TransitionOutcome,
};
pub use storage::{open_store, ActivityFilter, ActivityStore, MemoryActivityStore};
