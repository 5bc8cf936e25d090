use chrono::{NaiveDate, TimeZone, Utc};
use engine::{CategoryKind, Engine, NewCategory, NewTransaction, TransactionKind};
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

async fn budgeted_category(
    engine: &Engine,
    user_id: &str,
    budget_minor: i64,
    alert_threshold: i32,
) -> String {
    engine
        .create_category(
            user_id,
            NewCategory {
                name: "Food".to_string(),
                kind: CategoryKind::Expense,
                icon: None,
                color: None,
                budget_minor: Some(budget_minor),
                alert_threshold: Some(alert_threshold),
            },
        )
        .await
        .unwrap()
}

async fn expense_on(
    engine: &Engine,
    user_id: &str,
    category_id: &str,
    amount_minor: i64,
    date: NaiveDate,
) -> String {
    engine
        .create_transaction(NewTransaction {
            user_id: user_id.to_string(),
            group_id: None,
            category_id: category_id.to_string(),
            kind: TransactionKind::Expense,
            amount_minor,
            description: None,
            occurred_on: date,
            recurrence: None,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn budget_status_reports_spend_and_alert() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    // Budget $200.00, alert at 80%.
    let category_id = budgeted_category(&engine, &alice, 20_000, 80).await;

    expense_on(
        &engine,
        &alice,
        &category_id,
        12_000,
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
    )
    .await;
    expense_on(
        &engine,
        &alice,
        &category_id,
        5_000,
        NaiveDate::from_ymd_opt(2025, 3, 20).unwrap(),
    )
    .await;
    // A different month must not count.
    expense_on(
        &engine,
        &alice,
        &category_id,
        9_000,
        NaiveDate::from_ymd_opt(2025, 4, 1).unwrap(),
    )
    .await;

    let status = engine
        .budget_status(&category_id, &alice, Some(2025), Some(3))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status.budget_minor, 20_000);
    assert_eq!(status.spent_minor, 17_000);
    assert_eq!(status.remaining_minor, 3_000);
    assert!((status.percentage - 85.0).abs() < 1e-9);
    assert!(status.is_alert);
    assert!(!status.is_over_budget);
}

#[tokio::test]
async fn deleted_expenses_do_not_count() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let category_id = budgeted_category(&engine, &alice, 20_000, 80).await;

    let date = NaiveDate::from_ymd_opt(2025, 3, 5).unwrap();
    expense_on(&engine, &alice, &category_id, 4_000, date).await;
    let doomed = expense_on(&engine, &alice, &category_id, 10_000, date).await;
    engine
        .soft_delete_transaction(&doomed, &alice, Utc::now())
        .await
        .unwrap();

    let spent = engine
        .monthly_spent(&category_id, &alice, 2025, 3)
        .await
        .unwrap();
    assert_eq!(spent, 4_000);
}

#[tokio::test]
async fn no_budget_means_no_status() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let category_id = engine
        .create_category(
            &alice,
            NewCategory {
                name: "Misc".to_string(),
                kind: CategoryKind::Expense,
                icon: None,
                color: None,
                budget_minor: None,
                alert_threshold: None,
            },
        )
        .await
        .unwrap();

    let status = engine
        .budget_status(&category_id, &alice, Some(2025), Some(3))
        .await
        .unwrap();
    assert!(status.is_none());
}

#[tokio::test]
async fn zero_budget_never_divides_by_zero() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let category_id = budgeted_category(&engine, &alice, 0, 80).await;

    expense_on(
        &engine,
        &alice,
        &category_id,
        1_000,
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
    )
    .await;

    let status = engine
        .budget_status(&category_id, &alice, Some(2025), Some(3))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(status.percentage, 0.0);
    assert!(status.is_over_budget);
    assert!(!status.is_alert);
}

#[tokio::test]
async fn check_all_budgets_raises_once_per_day() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let category_id = budgeted_category(&engine, &alice, 20_000, 80).await;

    expense_on(
        &engine,
        &alice,
        &category_id,
        17_000,
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
    )
    .await;

    let now = Utc.with_ymd_and_hms(2025, 3, 20, 8, 0, 0).unwrap();
    let alerts = engine.check_all_budgets(now).await.unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].category_id, category_id);
    assert_eq!(alerts[0].email, "alice@example.com");
    assert!(alerts[0].status.is_alert);
    assert_eq!(alerts[0].spent_display, "170.00 EUR");

    // Re-invoking within 24h stays quiet.
    let later = Utc.with_ymd_and_hms(2025, 3, 20, 20, 0, 0).unwrap();
    let alerts = engine.check_all_budgets(later).await.unwrap();
    assert!(alerts.is_empty());

    // The next day it fires again.
    let next_day = Utc.with_ymd_and_hms(2025, 3, 21, 9, 0, 0).unwrap();
    let alerts = engine.check_all_budgets(next_day).await.unwrap();
    assert_eq!(alerts.len(), 1);
}

#[tokio::test]
async fn categories_below_threshold_stay_quiet() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let category_id = budgeted_category(&engine, &alice, 20_000, 80).await;

    expense_on(
        &engine,
        &alice,
        &category_id,
        10_000,
        NaiveDate::from_ymd_opt(2025, 3, 5).unwrap(),
    )
    .await;

    let now = Utc.with_ymd_and_hms(2025, 3, 20, 8, 0, 0).unwrap();
    let alerts = engine.check_all_budgets(now).await.unwrap();
    assert!(alerts.is_empty());
}
