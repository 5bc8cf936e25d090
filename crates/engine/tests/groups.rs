use engine::{Engine, EngineError, MemberRole};
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

/// Invites `email` to the group and accepts as that user.
async fn add_member(engine: &Engine, group_id: &str, admin_id: &str, email: &str) -> String {
    let user_id = register(engine, email, email).await;
    let invitation = engine.invite_member(group_id, email, admin_id).await.unwrap();
    engine
        .accept_invitation(&invitation.token, &user_id)
        .await
        .unwrap();
    user_id
}

#[tokio::test]
async fn create_group_makes_owner_an_active_admin() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;

    let group_id = engine
        .create_group("Trip", Some("Summer trip"), None, &alice)
        .await
        .unwrap();

    assert!(engine.is_group_member(&group_id, &alice).await.unwrap());
    assert!(engine.is_group_admin(&group_id, &alice).await.unwrap());

    let members = engine.list_members(&group_id, &alice).await.unwrap();
    assert_eq!(members.len(), 1);
    assert!(members[0].0.is_admin());
    assert!(members[0].0.is_active());
}

#[tokio::test]
async fn invitation_flow_joins_member() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let group_id = engine
        .create_group("Flat", None, None, &alice)
        .await
        .unwrap();

    let bob = register(&engine, "bob@example.com", "Bob").await;
    let invitation = engine
        .invite_member(&group_id, "bob@example.com", &alice)
        .await
        .unwrap();

    // Re-inviting while pending returns the same token.
    let again = engine
        .invite_member(&group_id, "bob@example.com", &alice)
        .await
        .unwrap();
    assert_eq!(invitation.token, again.token);

    let joined_group = engine
        .accept_invitation(&invitation.token, &bob)
        .await
        .unwrap();
    assert_eq!(joined_group, group_id);
    assert!(engine.is_group_member(&group_id, &bob).await.unwrap());
    assert!(!engine.is_group_admin(&group_id, &bob).await.unwrap());

    // The invitation is spent.
    let err = engine
        .accept_invitation(&invitation.token, &bob)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    // Inviting an active member is a conflict.
    let err = engine
        .invite_member(&group_id, "bob@example.com", &alice)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));
}

#[tokio::test]
async fn non_admin_cannot_invite() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let group_id = engine
        .create_group("Flat", None, None, &alice)
        .await
        .unwrap();
    let bob = add_member(&engine, &group_id, &alice, "bob@example.com").await;

    let err = engine
        .invite_member(&group_id, "carol@example.com", &bob)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));
}

#[tokio::test]
async fn sole_admin_cannot_be_demoted_or_removed() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let group_id = engine
        .create_group("Flat", None, None, &alice)
        .await
        .unwrap();
    let bob = add_member(&engine, &group_id, &alice, "bob@example.com").await;

    let err = engine
        .change_member_role(&group_id, &alice, MemberRole::Member, &alice)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::StateConflict("cannot demote the last admin".to_string())
    );

    let err = engine
        .remove_member(&group_id, &alice, &alice)
        .await
        .unwrap_err();
    assert_eq!(
        err,
        EngineError::StateConflict("cannot remove the last admin".to_string())
    );

    // Promote a second admin first, then demoting the first succeeds.
    engine
        .change_member_role(&group_id, &bob, MemberRole::Admin, &alice)
        .await
        .unwrap();
    engine
        .change_member_role(&group_id, &alice, MemberRole::Member, &bob)
        .await
        .unwrap();
    assert!(!engine.is_group_admin(&group_id, &alice).await.unwrap());
    assert!(engine.is_group_admin(&group_id, &bob).await.unwrap());
}

#[tokio::test]
async fn leaving_keeps_history_and_last_member_deactivates_group() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let group_id = engine
        .create_group("Flat", None, None, &alice)
        .await
        .unwrap();
    let bob = add_member(&engine, &group_id, &alice, "bob@example.com").await;

    engine.leave_group(&group_id, &bob).await.unwrap();
    assert!(!engine.is_group_member(&group_id, &bob).await.unwrap());

    // The membership row survives as `left`.
    let members = engine.list_members(&group_id, &alice).await.unwrap();
    assert_eq!(members.len(), 2);
    assert!(members.iter().any(|(m, _)| m.user_id == bob && !m.is_active()));

    // The last member leaving deactivates the group.
    engine.leave_group(&group_id, &alice).await.unwrap();
    let err = engine.group_for_member(&group_id, &alice).await.unwrap_err();
    assert!(matches!(err, EngineError::KeyNotFound(_)));
}

#[tokio::test]
async fn deactivate_group_requires_owner_and_no_other_members() {
    let engine = engine_with_db().await;
    let alice = register(&engine, "alice@example.com", "Alice").await;
    let group_id = engine
        .create_group("Flat", None, None, &alice)
        .await
        .unwrap();
    let bob = add_member(&engine, &group_id, &alice, "bob@example.com").await;

    let err = engine.deactivate_group(&group_id, &bob).await.unwrap_err();
    assert!(matches!(err, EngineError::Forbidden(_)));

    let err = engine.deactivate_group(&group_id, &alice).await.unwrap_err();
    assert!(matches!(err, EngineError::StateConflict(_)));

    engine.leave_group(&group_id, &bob).await.unwrap();
    engine.deactivate_group(&group_id, &alice).await.unwrap();

    let groups = engine.list_groups(&alice).await.unwrap();
    assert!(groups.is_empty());
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let engine = engine_with_db().await;
    register(&engine, "alice@example.com", "Alice").await;

    let err = engine
        .register_user("alice@example.com", "other", "Alice Again", None)
        .await
        .unwrap_err();
    assert!(matches!(err, EngineError::ExistingKey(_)));
}
