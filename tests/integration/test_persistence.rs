//! File-backed storage across restarts.

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime};
use tempfile::TempDir;

use civic_agenda::config::{StorageBackendType, StorageConfig};
use civic_agenda::{
    open_store, ActivityStatus, ActivityStore, ActivityUpdate, Config, LifecycleAction, NewActivity,
    OccurrenceQuery, RecurrenceRule, SchedulingService, Scope,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

/// Create a storage configuration rooted in a temp directory.
fn create_test_config(data_dir: &std::path::Path) -> StorageConfig {
    StorageConfig {
        backend: StorageBackendType::File,
        data_dir: data_dir.to_string_lossy().to_string(),
    }
}

async fn open_service(config: &StorageConfig) -> SchedulingService {
    SchedulingService::new(open_store(config).await.unwrap())
}

#[tokio::test]
async fn test_series_and_overrides_survive_restart() {
    let data_dir = TempDir::new().unwrap();
    let config = create_test_config(data_dir.path());

    let series_id = {
        let service = open_service(&config).await;
        let series = service
            .create_activity(
                NewActivity::new("Café seniors", "est-1", date(2024, 4, 2), time(15, 0), time(17, 0))
                    .with_status(ActivityStatus::Planned)
                    .with_recurrence(RecurrenceRule::weekly_on([2])),
            )
            .await
            .unwrap();
        service
            .update_activity(
                &format!("{}@2024-04-09", series.id),
                ActivityUpdate::title("Café seniors (salle B)"),
                Scope::Occurrence,
            )
            .await
            .unwrap();
        service
            .transition(&format!("{}@2024-04-16", series.id), LifecycleAction::Start)
            .await
            .unwrap();
        series.id
    };

    let service = open_service(&config).await;
    let occurrences = service
        .occurrences(&OccurrenceQuery::new(date(2024, 4, 1), date(2024, 4, 30)))
        .await
        .unwrap();

    assert_eq!(occurrences.len(), 5);
    assert_eq!(occurrences[1].title, "Café seniors (salle B)");
    assert_eq!(occurrences[2].status, ActivityStatus::InProgress);
    assert_eq!(
        service.store().children_of(&series_id).await.unwrap().len(),
        2
    );
}

#[tokio::test]
async fn test_memory_backend_from_config() {
    let config: Config = Config::from_str("[storage]\nbackend = \"memory\"\n").unwrap();
    let store = open_store(&config.storage).await.unwrap();
    let service = SchedulingService::new(Arc::clone(&store)).with_settings(config.scheduling);

    let created = service
        .create_activity(NewActivity::new("Atelier", "est-1", date(2024, 4, 2), time(9, 0), time(10, 0)))
        .await
        .unwrap();
    assert!(store.get(&created.id).await.unwrap().is_some());
}

#[tokio::test]
async fn test_submit_all_with_unwritable_data_file() {
    let data_dir = TempDir::new().unwrap();
    let config = create_test_config(data_dir.path());
    let service = open_service(&config).await;
    let draft = service
        .create_activity(NewActivity::new("Atelier", "est-1", date(2024, 4, 2), time(9, 0), time(10, 0)))
        .await
        .unwrap();

    // A directory where the temp file goes makes every write fail
    let blocker = data_dir.path().join("activities.json.tmp");
    std::fs::create_dir(&blocker).unwrap();

    let report = service.submit_all_drafts(None).await.unwrap();
    assert!(!report.committed);
    assert_eq!(report.failed, 1);
    assert_eq!(report.submitted, 0);
    assert_eq!(
        service.get_activity(&draft.id).await.unwrap().status,
        ActivityStatus::Draft
    );

    std::fs::remove_dir(&blocker).unwrap();
    let report = service.submit_all_drafts(None).await.unwrap();
    assert!(report.committed);
    assert_eq!(report.submitted, 1);

    let reopened = open_service(&config).await;
    assert_eq!(
        reopened.get_activity(&draft.id).await.unwrap().status,
        ActivityStatus::PendingValidation
    );
}
