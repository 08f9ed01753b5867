//! Configuration for the civic agenda service.

mod settings;

pub use settings::*;
