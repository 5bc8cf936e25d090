use chrono::{NaiveDate, TimeZone, Utc};
use engine::{
    Engine, EngineError, Frequency, NewReminder, RecurrenceRule, ReminderKind,
};
use migration::MigratorTrait;
use sea_orm::Database;

async fn engine_with_db() -> Engine {
    let db = Database::connect("sqlite::memory:").await.unwrap();
    migration::Migrator::up(&db, None).await.unwrap();
    Engine::builder().database(db).build().await.unwrap()
}

async fn register(engine: &Engine, email: &str, name: &str) -> String {
    engine
        .register_user(email, "password", name, None)
        .await
        .unwrap()
}

fn reminder(user_id: &str, title: &str, due_at: chrono::DateTime<Utc>) -> NewReminder {
    NewReminder {
        user_id: user_id.to_string(),
        group_id: None,
        title: title.to_string(),
        description: None,
        kind: ReminderKind::Bill,
        due_at,
        amount_minor: Some(4_500),
        recurrence: None,
    }
}

#[tokio::test]
async fn completing_a_biweekly_reminder_spawns_the_next_occurrence() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;

    let due = Utc.with_ymd_and_hms(2025, 1, 6, 9, 0, 0).unwrap();
    let mut cmd = reminder(&alice, "Rent", due);
    cmd.recurrence = Some(RecurrenceRule {
        frequency: Frequency::Weekly,
        interval: 2,
        day_of_month: None,
        end_date: None,
    });
    let id = engine.create_reminder(cmd).await.unwrap();

    let next_id = engine
        .complete_reminder(&id, &alice, Utc::now())
        .await
        .unwrap()
        .unwrap();
    assert_ne!(next_id, id);

    let reminders = engine.list_reminders(&alice, true, None).await.unwrap();
    assert_eq!(reminders.len(), 2);

    let completed = reminders.iter().find(|r| r.id == id).unwrap();
    assert!(completed.is_completed);
    assert_eq!(completed.due_at, due);

    let spawned = reminders.iter().find(|r| r.id == next_id).unwrap();
    assert!(!spawned.is_completed);
    assert_eq!(
        spawned.due_at,
        Utc.with_ymd_and_hms(2025, 1, 20, 9, 0, 0).unwrap()
    );
    // The rule travels with the new row.
    assert_eq!(spawned.frequency.as_deref(), Some("weekly"));
}

#[tokio::test]
async fn monthly_day_31_clamps_to_february_and_honors_the_end_date() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;

    let due = Utc.with_ymd_and_hms(2025, 1, 31, 10, 0, 0).unwrap();
    let mut cmd = reminder(&alice, "Mortgage", due);
    cmd.recurrence = Some(RecurrenceRule {
        frequency: Frequency::Monthly,
        interval: 1,
        day_of_month: Some(31),
        end_date: NaiveDate::from_ymd_opt(2025, 2, 28),
    });
    let id = engine.create_reminder(cmd).await.unwrap();

    let next_id = engine
        .complete_reminder(&id, &alice, Utc::now())
        .await
        .unwrap()
        .unwrap();
    let reminders = engine.list_reminders(&alice, false, None).await.unwrap();
    let spawned = reminders.iter().find(|r| r.id == next_id).unwrap();
    assert_eq!(
        spawned.due_at,
        Utc.with_ymd_and_hms(2025, 2, 28, 10, 0, 0).unwrap()
    );

    // March 31 falls after the end date: the series stops here.
    let none = engine
        .complete_reminder(&next_id, &alice, Utc::now())
        .await
        .unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn completing_twice_is_a_conflict() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;

    let due = Utc.with_ymd_and_hms(2025, 5, 1, 12, 0, 0).unwrap();
    let id = engine.create_reminder(reminder(&alice, "Insurance", due)).await.unwrap();

    let spawned = engine
        .complete_reminder(&id, &alice, Utc::now())
        .await
        .unwrap();
    // Not recurring: nothing spawned.
    assert!(spawned.is_none());

    let err = engine
        .complete_reminder(&id, &alice, Utc::now())
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::StateConflict("reminder is already completed".to_string())
    );
}

#[tokio::test]
async fn due_reminders_are_collected_once() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;

    let now = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
    let soon = Utc.with_ymd_and_hms(2025, 5, 1, 9, 30, 0).unwrap();
    let far = Utc.with_ymd_and_hms(2025, 5, 3, 9, 0, 0).unwrap();

    let due_id = engine
        .create_reminder(reminder(&alice, "Electricity", soon))
        .await
        .unwrap();
    engine
        .create_reminder(reminder(&alice, "Water", far))
        .await
        .unwrap();

    let due = engine.due_reminders(now, 60).await.unwrap();
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].reminder_id, due_id);
    assert_eq!(due[0].email, "alice@example.com");
    assert_eq!(due[0].amount_display.as_deref(), Some("45.00 EUR"));

    engine.mark_notification_sent(&due_id, now).await.unwrap();
    let due = engine.due_reminders(now, 60).await.unwrap();
    assert!(due.is_empty());
}

#[tokio::test]
async fn invalid_recurrence_is_rejected() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;

    let due = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
    let mut cmd = reminder(&alice, "Broken", due);
    cmd.recurrence = Some(RecurrenceRule {
        frequency: Frequency::Weekly,
        interval: 0,
        day_of_month: None,
        end_date: None,
    });

    let err = engine.create_reminder(cmd).await.unwrap_err();
    assert!(matches!(err, EngineError::InvalidRecurrence(_)));
}

#[tokio::test]
async fn reminders_are_private_to_their_owner() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let bob = register(&engine, "bob@example.com", "Bob").await;

    let due = Utc.with_ymd_and_hms(2025, 5, 1, 9, 0, 0).unwrap();
    let id = engine
        .create_reminder(reminder(&alice, "Secret", due))
        .await
        .unwrap();

    let err = engine
        .complete_reminder(&id, &bob, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));

    let err = engine.delete_reminder(&id, &bob).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}
