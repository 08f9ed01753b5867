//! CLI module for the civic-agenda command-line interface.
//!
//! Commands run in-process against the configured storage backend and print
//! either human-readable text or JSON.

mod commands;
mod local;
mod output;

pub use commands::*;
pub use local::shared_service;
