//! Local execution against the configured store.

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use civic_agenda::{open_store, Config, SchedulingService};
use serde::de::DeserializeOwned;

/// Build a scheduling service from configuration.
pub async fn service(config: &Config) -> Result<SchedulingService> {
    let store = open_store(&config.storage).await?;
    Ok(SchedulingService::new(store).with_settings(config.scheduling.clone()))
}

/// Same as [`service`], shared for the HTTP server.
pub async fn shared_service(config: &Config) -> Result<Arc<SchedulingService>> {
    Ok(Arc::new(service(config).await?))
}

/// Read a JSON request body from a file, or stdin when the path is `-`.
pub fn read_json<T: DeserializeOwned>(path: &str) -> Result<T> {
    let content = if path == "-" {
        std::io::read_to_string(std::io::stdin()).context("Failed to read stdin")?
    } else {
        std::fs::read_to_string(Path::new(path))
            .with_context(|| format!("Failed to read {}", path))?
    };
    serde_json::from_str(&content).with_context(|| format!("Invalid JSON in {}", path))
}
