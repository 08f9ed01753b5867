//! Storage backends for activity records.
//!
//! The scheduling service talks to storage only through [`ActivityStore`].
//! [`MemoryActivityStore`] keeps records in memory and can persist them to a
//! JSON file under the configured data directory.

mod memory;
mod traits;

pub use memory::{MemoryActivityStore, DATA_FILE};
pub use traits::{ActivityFilter, ActivityStore};

use std::sync::Arc;

use crate::config::{StorageBackendType, StorageConfig};
use crate::error::Result;

/// Open the store described by the storage configuration.
pub async fn open_store(config: &StorageConfig) -> Result<Arc<dyn ActivityStore>> {
    match config.backend {
        StorageBackendType::Memory => Ok(Arc::new(MemoryActivityStore::new())),
        StorageBackendType::File => {
            let data_dir = config.data_dir()?;
            tracing::info!("Opening activity store in {}", data_dir.display());
            Ok(Arc::new(MemoryActivityStore::with_persistence(&data_dir).await?))
        }
    }
}
