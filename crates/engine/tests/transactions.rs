use chrono::{NaiveDate, TimeZone, Utc};
use engine::{
    CategoryKind, Engine, EngineError, Frequency, NewCategory, NewTransaction, RecurrenceRule,
    TransactionFilter, TransactionKind,
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

async fn category(engine: &Engine, user_id: &str, name: &str, kind: CategoryKind) -> String {
    engine
        .create_category(
            user_id,
            NewCategory {
                name: name.to_string(),
                kind,
                icon: None,
                color: None,
                budget_minor: None,
                alert_threshold: None,
            },
        )
        .await
        .unwrap()
}

fn personal_expense(user_id: &str, category_id: &str, amount_minor: i64, date: NaiveDate) -> NewTransaction {
    NewTransaction {
        user_id: user_id.to_string(),
        group_id: None,
        category_id: category_id.to_string(),
        kind: TransactionKind::Expense,
        amount_minor,
        description: None,
        occurred_on: date,
        recurrence: None,
    }
}

#[tokio::test]
async fn amount_must_be_positive() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let food = category(&engine, &alice, "Food", CategoryKind::Expense).await;

    let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let err = engine
        .create_transaction(personal_expense(&alice, &food, 0, date))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));

    let err = engine
        .create_transaction(personal_expense(&alice, &food, -100, date))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidAmount(_)));
}

#[tokio::test]
async fn category_kind_must_match() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let salary = category(&engine, &alice, "Salary", CategoryKind::Income).await;
    let anything = category(&engine, &alice, "Anything", CategoryKind::Both).await;

    let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let err = engine
        .create_transaction(personal_expense(&alice, &salary, 1_000, date))
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::CategoryMismatch(_)));

    // A "both" category accepts either kind.
    engine
        .create_transaction(personal_expense(&alice, &anything, 1_000, date))
        .await
        .unwrap();
}

#[tokio::test]
async fn group_transactions_require_active_membership() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let eve = register(&engine, "eve@example.com", "Eve").await;
    let group_id = engine
        .create_group("Flat", None, None, &alice)
        .await
        .unwrap();
    let food = category(&engine, &eve, "Food", CategoryKind::Expense).await;

    let err = engine
        .create_transaction(NewTransaction {
            user_id: eve.clone(),
            group_id: Some(group_id),
            category_id: food,
            kind: TransactionKind::Expense,
            amount_minor: 1_000,
            description: None,
            occurred_on: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            recurrence: None,
        })
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotAGroupMember(eve));
}

#[tokio::test]
async fn soft_delete_hides_but_keeps_the_row() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let food = category(&engine, &alice, "Food", CategoryKind::Expense).await;

    let date = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
    let id = engine
        .create_transaction(personal_expense(&alice, &food, 2_500, date))
        .await
        .unwrap();

    engine
        .soft_delete_transaction(&id, &alice, Utc::now())
        .await
        .unwrap();

    let visible = engine
        .list_transactions(&alice, TransactionFilter::default())
        .await
        .unwrap();
    assert!(visible.is_empty());

    let all = engine
        .list_transactions(
            &alice,
            TransactionFilter {
                include_deleted: true,
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(all.len(), 1);
    assert!(all[0].deleted_at.is_some());

    let err = engine
        .soft_delete_transaction(&id, &alice, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    let err = engine
        .update_transaction(&id, &alice, Some(1_000), None, None, None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
}

#[tokio::test]
async fn list_filters_by_kind_and_date() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let food = category(&engine, &alice, "Food", CategoryKind::Expense).await;
    let salary = category(&engine, &alice, "Salary", CategoryKind::Income).await;

    engine
        .create_transaction(personal_expense(
            &alice,
            &food,
            1_000,
            NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
        ))
        .await
        .unwrap();
    engine
        .create_transaction(NewTransaction {
            user_id: alice.clone(),
            group_id: None,
            category_id: salary,
            kind: TransactionKind::Income,
            amount_minor: 100_000,
            description: Some("March pay".to_string()),
            occurred_on: NaiveDate::from_ymd_opt(2025, 3, 28).unwrap(),
            recurrence: None,
        })
        .await
        .unwrap();

    let incomes = engine
        .list_transactions(
            &alice,
            TransactionFilter {
                kind: Some(TransactionKind::Income),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(incomes.len(), 1);
    assert_eq!(incomes[0].amount_minor, 100_000);

    let early_march = engine
        .list_transactions(
            &alice,
            TransactionFilter {
                from: NaiveDate::from_ymd_opt(2025, 3, 1),
                to: NaiveDate::from_ymd_opt(2025, 3, 15),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(early_march.len(), 1);
    assert_eq!(early_march[0].amount_minor, 1_000);

    let summary = engine.monthly_summary(&alice, 2025, 3).await.unwrap();
    assert_eq!(summary.income_minor, 100_000);
    assert_eq!(summary.expense_minor, 1_000);
    assert_eq!(summary.balance_minor, 99_000);
    assert_eq!(summary.transaction_count, 2);
}

#[tokio::test]
async fn rolling_materializes_one_forward_occurrence() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let rent = category(&engine, &alice, "Housing", CategoryKind::Expense).await;

    engine
        .create_transaction(NewTransaction {
            user_id: alice.clone(),
            group_id: None,
            category_id: rent.clone(),
            kind: TransactionKind::Expense,
            amount_minor: 80_000,
            description: Some("Rent".to_string()),
            occurred_on: NaiveDate::from_ymd_opt(2025, 1, 31).unwrap(),
            recurrence: Some(RecurrenceRule {
                frequency: Frequency::Monthly,
                interval: 1,
                day_of_month: Some(31),
                end_date: None,
            }),
        })
        .await
        .unwrap();

    let now = Utc.with_ymd_and_hms(2025, 3, 1, 6, 0, 0).unwrap();
    let created = engine.roll_recurring_transactions(now).await.unwrap();
    assert_eq!(created.len(), 1);

    let all = engine
        .list_transactions(&alice, TransactionFilter::default())
        .await
        .unwrap();
    assert_eq!(all.len(), 2);
    // Day-31 anchor clamps to the end of February.
    assert_eq!(
        all[0].occurred_on,
        NaiveDate::from_ymd_opt(2025, 2, 28).unwrap()
    );
    // The rule moved onto the new instance only.
    assert!(all[0].frequency.is_some());
    assert!(all[1].frequency.is_none());

    // The next occurrence (Mar 31) is still in the future: nothing to roll.
    let created = engine.roll_recurring_transactions(now).await.unwrap();
    assert!(created.is_empty());
}
