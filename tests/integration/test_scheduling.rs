//! End-to-end scheduling behavior through the service facade.

use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{Datelike, NaiveDate, NaiveTime, Weekday};

use civic_agenda::activity::apply_action;
use civic_agenda::calendar::enumerate_days;
use civic_agenda::{
    ActivityStatus, ActivityStore, ActivityUpdate, AgendaError, DeleteOutcome, LifecycleAction,
    MemoryActivityStore, NewActivity, OccurrenceQuery, RecurrenceRule, SchedulingService, Scope,
};

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn time(h: u32, m: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(h, m, 0).unwrap()
}

fn create_test_service() -> SchedulingService {
    SchedulingService::new(Arc::new(MemoryActivityStore::new()))
}

fn january() -> OccurrenceQuery {
    OccurrenceQuery::new(date(2024, 1, 1), date(2024, 1, 31))
}

fn weekly_series() -> NewActivity {
    NewActivity::new(
        "Permanence emploi",
        "est-nord",
        date(2024, 1, 1),
        time(14, 0),
        time(16, 0),
    )
    .with_status(ActivityStatus::Planned)
    .with_recurrence(RecurrenceRule::weekly_on([1, 3]).until(date(2024, 1, 31)))
}

#[tokio::test]
async fn test_weekly_series_over_january() {
    let service = create_test_service();
    let series = service.create_activity(weekly_series()).await.unwrap();

    let occurrences = service.occurrences(&january()).await.unwrap();
    let dates: Vec<NaiveDate> = occurrences.iter().map(|o| o.date).collect();
    let expected: Vec<NaiveDate> = enumerate_days(date(2024, 1, 1), date(2024, 1, 31))
        .filter(|d| matches!(d.weekday(), Weekday::Mon | Weekday::Wed))
        .collect();

    assert_eq!(dates, expected);
    assert_eq!(dates.iter().collect::<BTreeSet<_>>().len(), dates.len());
    assert!(occurrences
        .iter()
        .all(|o| o.series_id.as_deref() == Some(series.id.as_str())));
    // Only the anchor is a stored record
    assert_eq!(occurrences.iter().filter(|o| !o.is_virtual).count(), 1);
}

#[tokio::test]
async fn test_standalone_appears_once_with_own_status() {
    let service = create_test_service();
    let activity = service
        .create_activity(NewActivity::new(
            "Forum associatif",
            "est-sud",
            date(2024, 1, 20),
            time(9, 0),
            time(17, 0),
        ))
        .await
        .unwrap();
    service
        .transition(&activity.id, LifecycleAction::Submit)
        .await
        .unwrap();

    for (start, end) in [
        (date(2024, 1, 20), date(2024, 1, 20)),
        (date(2024, 1, 1), date(2024, 1, 31)),
        (date(2023, 12, 1), date(2024, 2, 28)),
    ] {
        let occurrences = service
            .occurrences(&OccurrenceQuery::new(start, end))
            .await
            .unwrap();
        assert_eq!(occurrences.len(), 1);
        assert_eq!(occurrences[0].status, ActivityStatus::PendingValidation);
        assert_eq!(occurrences[0].date, date(2024, 1, 20));
    }
}

#[tokio::test]
async fn test_occurrence_edit_round_trip() {
    let service = create_test_service();
    let series = service.create_activity(weekly_series()).await.unwrap();
    let before = service.occurrences(&january()).await.unwrap().len();

    let occurrence_id = format!("{}@2024-01-03", series.id);
    let update = ActivityUpdate::title("Permanence exceptionnelle").with_times(time(9, 0), time(11, 0));

    let first = service
        .update_activity(&occurrence_id, update.clone(), Scope::Occurrence)
        .await
        .unwrap();
    let second = service
        .update_activity(&occurrence_id, update, Scope::Occurrence)
        .await
        .unwrap();
    assert_eq!(first.id, second.id);

    let occurrences = service.occurrences(&january()).await.unwrap();
    assert_eq!(occurrences.len(), before);

    let on_third: Vec<_> = occurrences
        .iter()
        .filter(|o| o.date == date(2024, 1, 3))
        .collect();
    assert_eq!(on_third.len(), 1);
    assert_eq!(on_third[0].id, first.id);
    assert_eq!(on_third[0].title, "Permanence exceptionnelle");
    assert_eq!(on_third[0].start_time, time(9, 0));
    assert!(!on_third[0].is_virtual);

    // Editing through the child's own id updates the same record
    let third = service
        .update_activity(&first.id, ActivityUpdate::title("Renommée"), Scope::Occurrence)
        .await
        .unwrap();
    assert_eq!(third.id, first.id);
    assert_eq!(service.store().children_of(&series.id).await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_child_keeps_its_place_after_series_edit() {
    let service = create_test_service();
    let series = service.create_activity(weekly_series()).await.unwrap();
    service
        .update_activity(
            &format!("{}@2024-01-10", series.id),
            ActivityUpdate::title("Séance délocalisée").with_location("Médiathèque"),
            Scope::Occurrence,
        )
        .await
        .unwrap();

    service
        .update_activity(&series.id, ActivityUpdate::title("Permanence numérique"), Scope::Series)
        .await
        .unwrap();

    let occurrences = service.occurrences(&january()).await.unwrap();
    for o in &occurrences {
        if o.date == date(2024, 1, 10) {
            assert_eq!(o.title, "Séance délocalisée");
        } else {
            assert_eq!(o.title, "Permanence numérique");
        }
    }
}

#[tokio::test]
async fn test_end_date_is_inclusive() {
    let service = create_test_service();
    let request = NewActivity::new("Atelier", "est-nord", date(2024, 1, 1), time(10, 0), time(11, 0))
        .with_recurrence(RecurrenceRule::weekly_on([1, 3]).until(date(2024, 1, 31)));
    service.create_activity(request).await.unwrap();

    let query = OccurrenceQuery::new(date(2024, 1, 29), date(2024, 2, 5));
    let dates: Vec<_> = service
        .occurrences(&query)
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.date)
        .collect();
    // Wednesday 31st is the end date and still occurs; nothing in February
    assert_eq!(dates, vec![date(2024, 1, 29), date(2024, 1, 31)]);
}

#[tokio::test]
async fn test_weekdays_only_series_skips_weekends() {
    let service = create_test_service();
    let request = NewActivity::new("Accueil", "est-nord", date(2024, 3, 1), time(8, 30), time(12, 0))
        .with_recurrence(RecurrenceRule::weekdays());
    service.create_activity(request).await.unwrap();

    let occurrences = service
        .occurrences(&OccurrenceQuery::new(date(2024, 3, 1), date(2024, 3, 31)))
        .await
        .unwrap();
    assert_eq!(occurrences.len(), 21);
    assert!(occurrences
        .iter()
        .all(|o| !matches!(o.date.weekday(), Weekday::Sat | Weekday::Sun)));
}

#[tokio::test]
async fn test_monthly_series_skips_short_months() {
    let service = create_test_service();
    let request = NewActivity::new("Conseil", "est-nord", date(2024, 1, 31), time(18, 0), time(20, 0))
        .with_recurrence(RecurrenceRule::monthly());
    service.create_activity(request).await.unwrap();

    let dates: Vec<_> = service
        .occurrences(&OccurrenceQuery::new(date(2024, 1, 1), date(2024, 6, 30)))
        .await
        .unwrap()
        .into_iter()
        .map(|o| o.date)
        .collect();
    assert_eq!(
        dates,
        vec![date(2024, 1, 31), date(2024, 3, 31), date(2024, 5, 31)]
    );
}

#[tokio::test]
async fn test_resolve_is_idempotent() {
    let service = create_test_service();
    service.create_activity(weekly_series()).await.unwrap();
    service
        .create_activity(NewActivity::new(
            "Forum",
            "est-sud",
            date(2024, 1, 3),
            time(14, 0),
            time(15, 0),
        ))
        .await
        .unwrap();

    let first = serde_json::to_vec(&service.occurrences(&january()).await.unwrap()).unwrap();
    let second = serde_json::to_vec(&service.occurrences(&january()).await.unwrap()).unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_lifecycle_through_facade() {
    let service = create_test_service();
    let activity = service
        .create_activity(NewActivity::new(
            "Atelier CV",
            "est-nord",
            date(2024, 2, 6),
            time(10, 0),
            time(12, 0),
        ))
        .await
        .unwrap();

    for (action, expected) in [
        (LifecycleAction::Submit, ActivityStatus::PendingValidation),
        (LifecycleAction::Submit, ActivityStatus::PendingValidation),
        (LifecycleAction::Approve, ActivityStatus::Planned),
        (LifecycleAction::Start, ActivityStatus::InProgress),
        (LifecycleAction::Complete, ActivityStatus::Completed),
        (LifecycleAction::FileReport, ActivityStatus::ReportComplete),
    ] {
        let outcome = service.transition(&activity.id, action).await.unwrap();
        assert_eq!(outcome.activity.status, expected, "after {action}");
    }

    let err = service
        .transition(&activity.id, LifecycleAction::Cancel)
        .await
        .unwrap_err();
    assert!(matches!(err, AgendaError::StateTransition(_)));
}

#[test]
fn test_cancel_from_every_open_status() {
    for status in ActivityStatus::ALL {
        let result = apply_action(status, LifecycleAction::Cancel);
        if status.is_terminal() {
            assert!(result.is_err(), "{status}");
        } else {
            assert_eq!(result.unwrap().status(), ActivityStatus::Cancelled);
        }
    }
}

#[tokio::test]
async fn test_delete_occurrence_then_series() {
    let service = create_test_service();
    let series = service.create_activity(weekly_series()).await.unwrap();

    let outcome = service
        .delete_activity(&format!("{}@2024-01-17", series.id), Scope::Occurrence)
        .await
        .unwrap();
    assert!(matches!(outcome, DeleteOutcome::Cancelled { .. }));

    let visible = service
        .occurrences(&january().without_cancelled())
        .await
        .unwrap();
    assert_eq!(visible.len(), 9);
    let all = service.occurrences(&january()).await.unwrap();
    assert_eq!(all.len(), 10);

    let outcome = service
        .delete_activity(&format!("{}@2024-01-24", series.id), Scope::Series)
        .await
        .unwrap();
    let DeleteOutcome::Deleted { ids } = outcome else {
        panic!("series delete should remove records");
    };
    assert_eq!(ids.len(), 2);
    assert!(service.occurrences(&january()).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_submit_all_scoped_to_establishment() {
    let service = create_test_service();
    let north = service
        .create_activity(NewActivity::new("A", "est-nord", date(2024, 1, 8), time(9, 0), time(10, 0)))
        .await
        .unwrap();
    let south = service
        .create_activity(NewActivity::new("B", "est-sud", date(2024, 1, 8), time(9, 0), time(10, 0)))
        .await
        .unwrap();

    let report = service.submit_all_drafts(Some("est-nord")).await.unwrap();
    assert!(report.committed);
    assert_eq!(report.submitted, 1);
    assert_eq!(report.items[0].activity_id, north.id);

    assert_eq!(
        service.get_activity(&south.id).await.unwrap().status,
        ActivityStatus::Draft
    );
}
