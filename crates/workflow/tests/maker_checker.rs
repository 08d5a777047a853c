//! End-to-end maker-checker scenarios against an in-memory database.

use custos_core::{
    AccessLevel, AuthorizationStatus, EntityKind, Permission, ProposedFields, UserSnapshot,
};
use custos_persistence::{run_migrations, ActivityRepo, UserRepo};
use custos_workflow::{
    access, credentials, ServiceContext, WorkflowError, WorkflowService,
};
use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

/// Single-connection in-memory pool so every query sees the same database.
async fn test_context() -> ServiceContext {
    let pool: SqlitePool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    run_migrations(&pool).await.unwrap();
    ServiceContext::from_pool(pool)
}

/// Seed a live user directly, bypassing the workflow. Returns the new id.
async fn seed_user(ctx: &ServiceContext, username: &str, password: &str) -> i64 {
    let snapshot = UserSnapshot {
        username: username.to_string(),
        first_name: "Seed".to_string(),
        last_name: "User".to_string(),
        password_hash: credentials::hash_password(password).unwrap(),
        access_level: AccessLevel::Admin,
        active: true,
    };
    let mut conn = ctx.pool().acquire().await.unwrap();
    UserRepo::insert_from_snapshot(&mut conn, &snapshot, None)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_create_proposal_approved_by_second_actor() {
    let ctx = test_context().await;
    let maker = seed_user(&ctx, "maker", "maker-pass").await;
    let checker = seed_user(&ctx, "checker", "checker-pass").await;
    let svc = WorkflowService::new(&ctx);

    let fields = ProposedFields {
        username: Some("jdoe".to_string()),
        first_name: Some("Jane".to_string()),
        last_name: Some("Doe".to_string()),
        password: Some("initial-secret".to_string()),
        access_level: Some(AccessLevel::Staff),
        permissions: Some(vec![Permission::ViewUsers, Permission::PullReports]),
        ..Default::default()
    };
    let staged = svc.propose_create(fields, maker).await.unwrap();
    assert!(staged.is_create());
    assert!(staged.is_pending());
    assert!(staged.security_modification);

    // Nothing is live until the checker approves.
    assert!(UserRepo::get_by_username(ctx.pool(), "jdoe")
        .await
        .unwrap()
        .is_none());

    access::require_distinct_verifier(staged.initiator_id, checker).unwrap();
    let approved = svc.approve(staged.id, checker).await.unwrap();
    assert_eq!(approved.authorization_status, AuthorizationStatus::Approved);
    assert_eq!(approved.verifier_id, Some(checker));

    let user = svc.verify_credentials("jdoe", "initial-secret").await.unwrap();
    assert_eq!(user.first_name, "Jane");
    assert_eq!(user.modification_id, Some(staged.id));

    let perms = UserRepo::permissions_of(ctx.pool(), user.id).await.unwrap();
    assert_eq!(perms, vec![Permission::ViewUsers, Permission::PullReports]);
}

#[tokio::test]
async fn test_same_actor_cannot_check_own_proposal() {
    let ctx = test_context().await;
    let maker = seed_user(&ctx, "maker", "maker-pass").await;
    let svc = WorkflowService::new(&ctx);

    let staged = svc
        .propose_create(
            ProposedFields {
                username: Some("jdoe".to_string()),
                password: Some("secret-pass".to_string()),
                ..Default::default()
            },
            maker,
        )
        .await
        .unwrap();

    assert!(matches!(
        access::require_distinct_verifier(staged.initiator_id, maker),
        Err(WorkflowError::PermissionDenied { actor_id }) if actor_id == maker
    ));
}

#[tokio::test]
async fn test_update_overlay_keeps_unsupplied_fields() {
    let ctx = test_context().await;
    let maker = seed_user(&ctx, "maker", "maker-pass").await;
    let checker = seed_user(&ctx, "checker", "checker-pass").await;
    let target = seed_user(&ctx, "jdoe", "original-pass").await;
    let svc = WorkflowService::new(&ctx);

    // Deactivate only; every other field rides along from the current state.
    let staged = svc
        .propose_update(
            target,
            ProposedFields {
                active: Some(false),
                ..Default::default()
            },
            maker,
        )
        .await
        .unwrap();
    assert_eq!(staged.user_id, Some(target));
    assert_eq!(staged.username, "jdoe");
    assert!(!staged.active);
    assert!(!staged.security_modification);

    // Still live and authenticating until approval.
    svc.verify_credentials("jdoe", "original-pass").await.unwrap();

    svc.approve(staged.id, checker).await.unwrap();

    let user = svc.user_by_id(target).await.unwrap();
    assert!(!user.active);
    assert_eq!(user.username, "jdoe");
    assert!(matches!(
        svc.verify_credentials("jdoe", "original-pass").await,
        Err(WorkflowError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_password_carried_forward_unless_supplied() {
    let ctx = test_context().await;
    let maker = seed_user(&ctx, "maker", "maker-pass").await;
    let checker = seed_user(&ctx, "checker", "checker-pass").await;
    let target = seed_user(&ctx, "jdoe", "original-pass").await;
    let svc = WorkflowService::new(&ctx);

    let staged = svc
        .propose_update(
            target,
            ProposedFields {
                password: Some("rotated-pass".to_string()),
                ..Default::default()
            },
            maker,
        )
        .await
        .unwrap();
    assert!(staged.security_modification);

    svc.approve(staged.id, checker).await.unwrap();
    svc.verify_credentials("jdoe", "rotated-pass").await.unwrap();
    assert!(matches!(
        svc.verify_credentials("jdoe", "original-pass").await,
        Err(WorkflowError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_reject_leaves_user_untouched() {
    let ctx = test_context().await;
    let maker = seed_user(&ctx, "maker", "maker-pass").await;
    let checker = seed_user(&ctx, "checker", "checker-pass").await;
    let target = seed_user(&ctx, "jdoe", "original-pass").await;
    let svc = WorkflowService::new(&ctx);

    let staged = svc
        .propose_update(
            target,
            ProposedFields {
                first_name: Some("Renamed".to_string()),
                active: Some(false),
                ..Default::default()
            },
            maker,
        )
        .await
        .unwrap();

    let rejected = svc
        .reject(staged.id, checker, Some("not cleared by compliance"))
        .await
        .unwrap();
    assert_eq!(rejected.authorization_status, AuthorizationStatus::Rejected);
    assert_eq!(
        rejected.verifier_comment.as_deref(),
        Some("not cleared by compliance")
    );

    let user = svc.user_by_id(target).await.unwrap();
    assert_eq!(user.first_name, "Seed");
    assert!(user.active);
    assert_eq!(user.modification_id, None);

    // Target is free for a fresh proposal after rejection.
    svc.propose_update(
        target,
        ProposedFields {
            first_name: Some("Renamed".to_string()),
            ..Default::default()
        },
        maker,
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_resolution_is_exactly_once() {
    let ctx = test_context().await;
    let maker = seed_user(&ctx, "maker", "maker-pass").await;
    let checker = seed_user(&ctx, "checker", "checker-pass").await;
    let target = seed_user(&ctx, "jdoe", "original-pass").await;
    let svc = WorkflowService::new(&ctx);

    let staged = svc
        .propose_update(
            target,
            ProposedFields {
                active: Some(false),
                ..Default::default()
            },
            maker,
        )
        .await
        .unwrap();

    svc.approve(staged.id, checker).await.unwrap();

    assert!(matches!(
        svc.approve(staged.id, checker).await,
        Err(WorkflowError::AlreadyResolved { id, .. }) if id == staged.id
    ));
    assert!(matches!(
        svc.reject(staged.id, checker, None).await,
        Err(WorkflowError::AlreadyResolved { id, .. }) if id == staged.id
    ));
    // The approved state survived the failed second resolutions.
    let user = svc.user_by_id(target).await.unwrap();
    assert!(!user.active);
}

#[tokio::test]
async fn test_one_pending_modification_per_user() {
    let ctx = test_context().await;
    let maker = seed_user(&ctx, "maker", "maker-pass").await;
    let other_maker = seed_user(&ctx, "maker2", "maker-pass").await;
    let target = seed_user(&ctx, "jdoe", "original-pass").await;
    let svc = WorkflowService::new(&ctx);

    svc.propose_update(
        target,
        ProposedFields {
            active: Some(false),
            ..Default::default()
        },
        maker,
    )
    .await
    .unwrap();

    assert!(matches!(
        svc.propose_update(
            target,
            ProposedFields {
                first_name: Some("Other".to_string()),
                ..Default::default()
            },
            other_maker,
        )
        .await,
        Err(WorkflowError::PendingModificationExists(id)) if id == target
    ));
}

#[tokio::test]
async fn test_duplicate_username_caught_at_approval() {
    let ctx = test_context().await;
    let maker = seed_user(&ctx, "maker", "maker-pass").await;
    let checker = seed_user(&ctx, "checker", "checker-pass").await;
    let svc = WorkflowService::new(&ctx);

    // Two create proposals for the same username are both accepted; the
    // proposal-time check only scans live users.
    let first = svc
        .propose_create(
            ProposedFields {
                username: Some("jdoe".to_string()),
                password: Some("first-pass".to_string()),
                ..Default::default()
            },
            maker,
        )
        .await
        .unwrap();
    let second = svc
        .propose_create(
            ProposedFields {
                username: Some("jdoe".to_string()),
                password: Some("second-pass".to_string()),
                ..Default::default()
            },
            maker,
        )
        .await
        .unwrap();

    svc.approve(first.id, checker).await.unwrap();

    assert!(matches!(
        svc.approve(second.id, checker).await,
        Err(WorkflowError::DuplicateUsername(name)) if name == "jdoe"
    ));
    // The losing modification stays resolvable; reject clears it out.
    svc.reject(second.id, checker, Some("duplicate username"))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_duplicate_username_rejected_at_proposal_for_live_user() {
    let ctx = test_context().await;
    let maker = seed_user(&ctx, "maker", "maker-pass").await;
    seed_user(&ctx, "jdoe", "original-pass").await;
    let svc = WorkflowService::new(&ctx);

    assert!(matches!(
        svc.propose_create(
            ProposedFields {
                username: Some("jdoe".to_string()),
                password: Some("secret-pass".to_string()),
                ..Default::default()
            },
            maker,
        )
        .await,
        Err(WorkflowError::DuplicateUsername(name)) if name == "jdoe"
    ));
}

#[tokio::test]
async fn test_create_requires_username_and_password() {
    let ctx = test_context().await;
    let maker = seed_user(&ctx, "maker", "maker-pass").await;
    let svc = WorkflowService::new(&ctx);

    assert!(matches!(
        svc.propose_create(
            ProposedFields {
                password: Some("secret-pass".to_string()),
                ..Default::default()
            },
            maker,
        )
        .await,
        Err(WorkflowError::InvalidProposal(_))
    ));
    assert!(matches!(
        svc.propose_create(
            ProposedFields {
                username: Some("jdoe".to_string()),
                ..Default::default()
            },
            maker,
        )
        .await,
        Err(WorkflowError::InvalidProposal(_))
    ));
}

#[tokio::test]
async fn test_inactive_user_cannot_authenticate() {
    let ctx = test_context().await;
    let maker = seed_user(&ctx, "maker", "maker-pass").await;
    let checker = seed_user(&ctx, "checker", "checker-pass").await;
    let target = seed_user(&ctx, "jdoe", "original-pass").await;
    let svc = WorkflowService::new(&ctx);

    let staged = svc
        .propose_update(
            target,
            ProposedFields {
                active: Some(false),
                ..Default::default()
            },
            maker,
        )
        .await
        .unwrap();
    svc.approve(staged.id, checker).await.unwrap();

    assert!(matches!(
        svc.verify_credentials("jdoe", "original-pass").await,
        Err(WorkflowError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn test_activity_trail_records_lifecycle() {
    let ctx = test_context().await;
    let maker = seed_user(&ctx, "maker", "maker-pass").await;
    let checker = seed_user(&ctx, "checker", "checker-pass").await;
    let svc = WorkflowService::new(&ctx);

    let staged = svc
        .propose_create(
            ProposedFields {
                username: Some("jdoe".to_string()),
                password: Some("secret-pass".to_string()),
                ..Default::default()
            },
            maker,
        )
        .await
        .unwrap();
    svc.approve(staged.id, checker).await.unwrap();

    let recent = ActivityRepo::most_recent(ctx.pool(), 10).await.unwrap();
    assert_eq!(recent.len(), 2);
    // Newest first: approval by the checker, then the proposal.
    assert_eq!(recent[0].actor_id, checker);
    assert_eq!(recent[1].actor_id, maker);
    assert!(recent
        .iter()
        .all(|a| a.entity_kind == EntityKind::UserModification.as_i64()));
}
