//! In-memory activity store with optional JSON file persistence.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use super::traits::{ActivityFilter, ActivityStore};
use crate::activity::{Activity, ActivityStatus};
use crate::error::{AgendaError, ConflictError, NotFoundError, Result, StorageError};

/// File name used under the data directory.
pub const DATA_FILE: &str = "activities.json";

/// Internal data storage structure.
#[derive(Debug, Default)]
struct StoreData {
    /// Records indexed by ID.
    activities: HashMap<String, Activity>,
    /// Index: (parent_id, date) -> child ID.
    children: HashMap<(String, NaiveDate), String>,
}

impl StoreData {
    fn index(&mut self, activity: &Activity) {
        if let Some(ref parent_id) = activity.recurrence_parent_id {
            self.children
                .insert((parent_id.clone(), activity.date), activity.id.clone());
        }
    }

    fn unindex(&mut self, activity: &Activity) {
        if let Some(ref parent_id) = activity.recurrence_parent_id {
            let key = (parent_id.clone(), activity.date);
            if self.children.get(&key) == Some(&activity.id) {
                self.children.remove(&key);
            }
        }
    }

    /// Fail if another record already holds the child slot `activity` needs.
    fn check_child_slot(&self, activity: &Activity) -> Result<()> {
        let Some(ref parent_id) = activity.recurrence_parent_id else {
            return Ok(());
        };
        match self.children.get(&(parent_id.clone(), activity.date)) {
            Some(existing) if existing != &activity.id => Err(ConflictError::DuplicateChild {
                parent_id: parent_id.clone(),
                date: activity.date,
            }
            .into()),
            _ => Ok(()),
        }
    }
}

/// Serialized file layout.
#[derive(Debug, Serialize, Deserialize)]
struct PersistenceData {
    version: u32,
    activities: Vec<Activity>,
}

/// In-memory activity store.
///
/// All checks and writes for one call happen under a single write lock, so
/// the child-uniqueness check and the insert are atomic with respect to
/// other callers. With persistence enabled the file is written before the
/// lock is released; if that write fails the in-memory change is undone.
pub struct MemoryActivityStore {
    data: RwLock<StoreData>,
    /// Optional persistence file path.
    persistence_path: Option<PathBuf>,
}

impl MemoryActivityStore {
    /// Create a store without persistence.
    pub fn new() -> Self {
        Self {
            data: RwLock::new(StoreData::default()),
            persistence_path: None,
        }
    }

    /// Create a store persisted to `activities.json` under `data_dir`.
    pub async fn with_persistence(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir).map_err(StorageError::Io)?;

        let persistence_path = data_dir.join(DATA_FILE);
        let store = Self {
            data: RwLock::new(StoreData::default()),
            persistence_path: Some(persistence_path.clone()),
        };

        if persistence_path.exists() {
            store.load_from_file(&persistence_path).await?;
        }

        Ok(store)
    }

    async fn load_from_file(&self, path: &Path) -> Result<()> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(StorageError::Io)?;

        let persisted: PersistenceData = serde_json::from_str(&content)
            .map_err(|e| StorageError::Corrupt(format!("{}: {}", path.display(), e)))?;

        let mut data = self.data.write().await;
        for activity in persisted.activities {
            data.check_child_slot(&activity)?;
            data.index(&activity);
            data.activities.insert(activity.id.clone(), activity);
        }

        tracing::info!(
            "Loaded {} activities from {}",
            data.activities.len(),
            path.display()
        );

        Ok(())
    }

    /// Write `data` to the data file. Callers hold the write lock.
    async fn persist(&self, data: &StoreData) -> Result<()> {
        let Some(ref path) = self.persistence_path else {
            return Ok(());
        };

        let mut activities: Vec<Activity> = data.activities.values().cloned().collect();
        activities.sort_by(|a, b| a.id.cmp(&b.id));

        let persisted = PersistenceData {
            version: 1,
            activities,
        };
        let content = serde_json::to_string_pretty(&persisted)?;

        // Write to temp file first, then rename for atomicity
        let temp_path = path.with_extension("json.tmp");
        tokio::fs::write(&temp_path, content)
            .await
            .map_err(StorageError::Io)?;
        tokio::fs::rename(&temp_path, path)
            .await
            .map_err(StorageError::Io)?;

        Ok(())
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.data.read().await.activities.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

impl Default for MemoryActivityStore {
    fn default() -> Self {
        Self::new()
    }
}

fn not_found(id: &str) -> AgendaError {
    NotFoundError::Activity(id.to_string()).into()
}

#[async_trait]
impl ActivityStore for MemoryActivityStore {
    async fn insert(&self, activity: Activity) -> Result<Activity> {
        let mut data = self.data.write().await;

        if data.activities.contains_key(&activity.id) {
            return Err(ConflictError::DuplicateId(activity.id.clone()).into());
        }
        data.check_child_slot(&activity)?;

        data.index(&activity);
        data.activities.insert(activity.id.clone(), activity.clone());

        if let Err(e) = self.persist(&data).await {
            data.unindex(&activity);
            data.activities.remove(&activity.id);
            return Err(e);
        }
        Ok(activity)
    }

    async fn get(&self, id: &str) -> Result<Option<Activity>> {
        let data = self.data.read().await;
        Ok(data.activities.get(id).cloned())
    }

    async fn replace(&self, mut activity: Activity) -> Result<Activity> {
        let mut data = self.data.write().await;

        let existing = data
            .activities
            .get(&activity.id)
            .cloned()
            .ok_or_else(|| not_found(&activity.id))?;
        data.check_child_slot(&activity)?;

        activity.status = existing.status;
        activity.report_complete = existing.report_complete;
        activity.created_at = existing.created_at;

        data.unindex(&existing);
        data.index(&activity);
        data.activities.insert(activity.id.clone(), activity.clone());

        if let Err(e) = self.persist(&data).await {
            data.unindex(&activity);
            data.index(&existing);
            data.activities.insert(existing.id.clone(), existing);
            return Err(e);
        }
        Ok(activity)
    }

    async fn compare_and_set_status(
        &self,
        id: &str,
        expected: ActivityStatus,
        next: ActivityStatus,
    ) -> Result<Activity> {
        let mut data = self.data.write().await;

        let activity = data.activities.get_mut(id).ok_or_else(|| not_found(id))?;
        if activity.status != expected {
            return Err(ConflictError::StaleStatus {
                id: id.to_string(),
                expected,
                actual: activity.status,
            }
            .into());
        }

        let previous = activity.clone();
        activity.status = next;
        if next == ActivityStatus::ReportComplete {
            activity.report_complete = true;
        }
        activity.updated_at = Utc::now();
        let updated = activity.clone();

        if let Err(e) = self.persist(&data).await {
            data.activities.insert(previous.id.clone(), previous);
            return Err(e);
        }
        Ok(updated)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let mut data = self.data.write().await;

        let Some(activity) = data.activities.remove(id) else {
            return Ok(false);
        };
        data.unindex(&activity);

        if let Err(e) = self.persist(&data).await {
            data.index(&activity);
            data.activities.insert(activity.id.clone(), activity);
            return Err(e);
        }
        Ok(true)
    }

    async fn list(&self, filter: &ActivityFilter) -> Result<Vec<Activity>> {
        let data = self.data.read().await;

        let mut results: Vec<Activity> = data
            .activities
            .values()
            .filter(|a| filter.matches(a))
            .cloned()
            .collect();

        results.sort_by(|a, b| {
            (a.date, a.start_time, &a.id).cmp(&(b.date, b.start_time, &b.id))
        });
        Ok(results)
    }

    async fn find_child(&self, parent_id: &str, date: NaiveDate) -> Result<Option<Activity>> {
        let data = self.data.read().await;
        Ok(data
            .children
            .get(&(parent_id.to_string(), date))
            .and_then(|id| data.activities.get(id))
            .cloned())
    }

    async fn children_of(&self, parent_id: &str) -> Result<Vec<Activity>> {
        let data = self.data.read().await;
        let mut children: Vec<Activity> = data
            .activities
            .values()
            .filter(|a| a.recurrence_parent_id.as_deref() == Some(parent_id))
            .cloned()
            .collect();
        children.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));
        Ok(children)
    }
}
