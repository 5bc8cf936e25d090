use chrono::{NaiveDate, Utc};
use engine::{
    CategoryKind, Engine, EngineError, NewCategory, NewTransaction, ShareInput, SplitMode,
    TransactionKind,
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

async fn add_member(engine: &Engine, group_id: &str, admin_id: &str, email: &str) -> String {
    let user_id = register(engine, email, email).await;
    let invitation = engine.invite_member(group_id, email, admin_id).await.unwrap();
    engine
        .accept_invitation(&invitation.token, &user_id)
        .await
        .unwrap();
    user_id
}

async fn expense_category(engine: &Engine, user_id: &str) -> String {
    engine
        .create_category(
            user_id,
            NewCategory {
                name: "Groceries".to_string(),
                kind: CategoryKind::Expense,
                icon: None,
                color: None,
                budget_minor: None,
                alert_threshold: None,
            },
        )
        .await
        .unwrap()
}

async fn group_expense(
    engine: &Engine,
    user_id: &str,
    group_id: &str,
    category_id: &str,
    amount_minor: i64,
) -> String {
    engine
        .create_transaction(NewTransaction {
            user_id: user_id.to_string(),
            group_id: Some(group_id.to_string()),
            category_id: category_id.to_string(),
            kind: TransactionKind::Expense,
            amount_minor,
            description: None,
            occurred_on: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            recurrence: None,
        })
        .await
        .unwrap()
}

#[tokio::test]
async fn equal_split_three_ways_and_member_balances() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let group_id = engine
        .create_group("Trip", None, None, &alice)
        .await
        .unwrap();
    let bob = add_member(&engine, &group_id, &alice, "bob@example.com").await;
    let carol = add_member(&engine, &group_id, &alice, "carol@example.com").await;

    let category_id = expense_category(&engine, &alice).await;
    // $300.00 paid by Alice.
    let tx_id = group_expense(&engine, &alice, &group_id, &category_id, 30_000).await;

    let splits = engine
        .create_splits(&tx_id, &alice, SplitMode::Equal)
        .await
        .unwrap();
    assert_eq!(splits.len(), 3);
    assert!(splits.iter().all(|s| s.amount_minor == 10_000));
    assert_eq!(splits.iter().map(|s| s.amount_minor).sum::<i64>(), 30_000);

    let balance = engine.group_balance(&group_id, &alice).await.unwrap();
    assert_eq!(balance.expense_minor, 30_000);
    assert_eq!(balance.income_minor, 0);
    assert_eq!(balance.balance_minor, -30_000);

    let balances = engine.member_balances(&group_id, &bob).await.unwrap();
    assert_eq!(balances.len(), 3);

    let alice_balance = balances.iter().find(|b| b.user_id == alice).unwrap();
    assert_eq!(alice_balance.total_paid_minor, 30_000);
    assert_eq!(alice_balance.total_owed_minor, 10_000);
    assert_eq!(alice_balance.balance_minor, 20_000);

    for debtor in [&bob, &carol] {
        let member_balance = balances.iter().find(|b| &b.user_id == debtor).unwrap();
        assert_eq!(member_balance.total_paid_minor, 0);
        assert_eq!(member_balance.total_owed_minor, 10_000);
        assert_eq!(member_balance.balance_minor, -10_000);
    }
}

#[tokio::test]
async fn equal_split_assigns_remainder_to_first_members() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let group_id = engine
        .create_group("Flat", None, None, &alice)
        .await
        .unwrap();
    add_member(&engine, &group_id, &alice, "bob@example.com").await;
    add_member(&engine, &group_id, &alice, "carol@example.com").await;

    let category_id = expense_category(&engine, &alice).await;
    // $1.00 across three members cannot divide evenly.
    let tx_id = group_expense(&engine, &alice, &group_id, &category_id, 100).await;

    let splits = engine
        .create_splits(&tx_id, &alice, SplitMode::Equal)
        .await
        .unwrap();
    let amounts: Vec<i64> = splits.iter().map(|s| s.amount_minor).collect();
    assert_eq!(amounts, vec![34, 33, 33]);
    // Owner joined first, so the extra minor unit lands on them.
    assert_eq!(splits[0].user_id, alice);

    // Replaying the same request replaces the set with identical amounts.
    let replayed = engine
        .create_splits(&tx_id, &alice, SplitMode::Equal)
        .await
        .unwrap();
    let replayed_amounts: Vec<i64> = replayed.iter().map(|s| s.amount_minor).collect();
    assert_eq!(replayed_amounts, amounts);

    let listed = engine.list_splits(&tx_id, &alice).await.unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(listed.iter().map(|s| s.amount_minor).sum::<i64>(), 100);
}

#[tokio::test]
async fn explicit_split_must_sum_to_the_amount() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let group_id = engine
        .create_group("Flat", None, None, &alice)
        .await
        .unwrap();
    let bob = add_member(&engine, &group_id, &alice, "bob@example.com").await;

    let category_id = expense_category(&engine, &alice).await;
    let tx_id = group_expense(&engine, &alice, &group_id, &category_id, 30_000).await;

    let err = engine
        .create_splits(
            &tx_id,
            &alice,
            SplitMode::Explicit(vec![
                ShareInput {
                    user_id: alice.clone(),
                    amount_minor: 20_000,
                },
                ShareInput {
                    user_id: bob.clone(),
                    amount_minor: 9_999,
                },
            ]),
        )
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::SplitSumMismatch {
            expected: 30_000,
            got: 29_999
        }
    );

    let splits = engine
        .create_splits(
            &tx_id,
            &alice,
            SplitMode::Explicit(vec![
                ShareInput {
                    user_id: alice.clone(),
                    amount_minor: 20_000,
                },
                ShareInput {
                    user_id: bob.clone(),
                    amount_minor: 10_000,
                },
            ]),
        )
        .await
        .unwrap();
    assert_eq!(splits.len(), 2);
}

#[tokio::test]
async fn failed_replacement_leaves_prior_splits_intact() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let group_id = engine
        .create_group("Flat", None, None, &alice)
        .await
        .unwrap();
    let bob = add_member(&engine, &group_id, &alice, "bob@example.com").await;

    let category_id = expense_category(&engine, &alice).await;
    let tx_id = group_expense(&engine, &alice, &group_id, &category_id, 30_000).await;
    engine
        .create_splits(&tx_id, &alice, SplitMode::Equal)
        .await
        .unwrap();

    // A mismatching explicit request fails and must not half-replace.
    let err = engine
        .create_splits(
            &tx_id,
            &alice,
            SplitMode::Explicit(vec![ShareInput {
                user_id: bob.clone(),
                amount_minor: 1,
            }]),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::SplitSumMismatch { .. }));

    let splits = engine.list_splits(&tx_id, &alice).await.unwrap();
    assert_eq!(splits.len(), 2);
    assert_eq!(splits.iter().map(|s| s.amount_minor).sum::<i64>(), 30_000);
}

#[tokio::test]
async fn split_targets_are_validated() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let group_id = engine
        .create_group("Flat", None, None, &alice)
        .await
        .unwrap();
    let outsider = register(&engine, "eve@example.com", "Eve").await;

    let category_id = expense_category(&engine, &alice).await;

    // Personal expenses cannot be split.
    let personal_tx = engine
        .create_transaction(NewTransaction {
            user_id: alice.clone(),
            group_id: None,
            category_id: category_id.clone(),
            kind: TransactionKind::Expense,
            amount_minor: 5_000,
            description: None,
            occurred_on: NaiveDate::from_ymd_opt(2025, 3, 10).unwrap(),
            recurrence: None,
        })
        .await
        .unwrap();
    let err = engine
        .create_splits(&personal_tx, &alice, SplitMode::Equal)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::InvalidSplitTarget(_)));

    // Non-members cannot receive shares.
    let group_tx = group_expense(&engine, &alice, &group_id, &category_id, 5_000).await;
    let err = engine
        .create_splits(
            &group_tx,
            &alice,
            SplitMode::Explicit(vec![ShareInput {
                user_id: outsider.clone(),
                amount_minor: 5_000,
            }]),
        )
        .await
        .unwrap_err();
    assert_eq!(err, EngineError::NotAGroupMember(outsider));
}

#[tokio::test]
async fn marking_splits_paid() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let group_id = engine
        .create_group("Flat", None, None, &alice)
        .await
        .unwrap();
    let bob = add_member(&engine, &group_id, &alice, "bob@example.com").await;

    let category_id = expense_category(&engine, &alice).await;
    let tx_id = group_expense(&engine, &alice, &group_id, &category_id, 10_000).await;
    let splits = engine
        .create_splits(&tx_id, &alice, SplitMode::Equal)
        .await
        .unwrap();
    let bob_split = splits.iter().find(|s| s.user_id == bob).unwrap();

    // Another plain member cannot settle someone else's share...
    let carol = add_member(&engine, &group_id, &alice, "carol@example.com").await;
    let err = engine
        .mark_split_paid(&bob_split.id, &carol, Utc::now())
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    // ...but the debtor can.
    let paid = engine
        .mark_split_paid(&bob_split.id, &bob, Utc::now())
        .await
        .unwrap();
    assert!(paid.is_paid);
    assert!(paid.paid_at.is_some());

    let unpaid = engine.mark_split_unpaid(&bob_split.id, &alice).await.unwrap();
    assert!(!unpaid.is_paid);
    assert!(unpaid.paid_at.is_none());
}
