//! Activity records and their operational lifecycle.
//!
//! - **Types**: the persisted [`Activity`] record, its [`ActivityStatus`],
//!   and the create/update request shapes
//! - **Lifecycle**: the status state machine (draft → submitted → planned →
//!   in progress → completed → reported, or cancelled)

pub mod lifecycle;
pub mod types;

pub use lifecycle::{apply as apply_action, LifecycleAction, Transition};
pub use types::{Activity, ActivityStatus, ActivityUpdate, NewActivity, Scope};
