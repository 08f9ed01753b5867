//! REST API for the scheduling engine.
//!
//! Exposes occurrence listings, activity writes with occurrence or series
//! scope, lifecycle transitions and bulk submit over HTTP.

mod handlers;
mod rest;

pub use handlers::*;
pub use rest::*;
