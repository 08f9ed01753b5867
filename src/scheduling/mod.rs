//! Scheduling engine.
//!
//! - **Resolver**: expands series into occurrences over a date range and
//!   merges them with physical overrides
//! - **Service**: the facade callers use to query occurrences, create and
//!   edit activities with occurrence or series scope, drive the lifecycle
//!   and bulk-submit drafts

pub mod resolver;
pub mod service;

pub use resolver::{resolve, ActivitySnapshot, Occurrence, OccurrenceRef};
pub use service::{
    DeleteOutcome, OccurrenceQuery, SchedulingService, SubmitItem, SubmitOutcome, SubmitReport,
    TransitionOutcome,
};
