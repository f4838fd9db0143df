//! Integration tests for the Request repository using in-memory SurrealDB.

use surrealdb::Surreal;
use surrealdb::engine::local::{Db, Mem};
use uuid::Uuid;
use verdant_core::error::VerdantError;
use verdant_core::models::request::{CreateRequest, RequestScope, RequestStatus, StatusChange};
use verdant_core::repository::RequestRepository;
use verdant_db::repository::SurrealRequestRepository;

async fn setup() -> SurrealRequestRepository<Db> {
    let db = Surreal::new::<Mem>(()).await.unwrap();
    db.use_ns("test").use_db("test").await.unwrap();
    verdant_db::run_migrations(&db).await.unwrap();
    SurrealRequestRepository::new(db)
}

fn new_request(user_id: &str) -> CreateRequest {
    CreateRequest {
        user_id: user_id.into(),
        project_type: "residential".into(),
        project_area: Some("1200 m2".into()),
        location: Some("Leeds".into()),
        description: None,
    }
}

#[tokio::test]
async fn create_starts_in_submitted() {
    let repo = setup().await;

    let request = repo.create(new_request("owner-1")).await.unwrap();
    assert_eq!(request.status, RequestStatus::Submitted);
    assert_eq!(request.price_quote, None);
    assert_eq!(request.auditor_id, None);

    let fetched = repo.get_by_id(request.id).await.unwrap();
    assert_eq!(fetched.user_id, "owner-1");
    assert_eq!(fetched.location.as_deref(), Some("Leeds"));
}

#[tokio::test]
async fn get_missing_request_is_not_found() {
    let repo = setup().await;

    let err = repo.get_by_id(Uuid::new_v4()).await.unwrap_err();
    assert!(matches!(err, VerdantError::NotFound { .. }));
}

#[tokio::test]
async fn guarded_transition_sets_side_fields() {
    let repo = setup().await;
    let request = repo.create(new_request("owner-1")).await.unwrap();

    let mut change = StatusChange::new(RequestStatus::Submitted, RequestStatus::Quoted);
    change.price_quote = Some(4_500);
    change.admin_comment = Some("standard tariff".into());

    let quoted = repo.apply_transition(request.id, change).await.unwrap();
    assert_eq!(quoted.status, RequestStatus::Quoted);
    assert_eq!(quoted.price_quote, Some(4_500));
    assert_eq!(quoted.admin_comment.as_deref(), Some("standard tariff"));
    assert!(quoted.updated_at >= request.updated_at);
}

#[tokio::test]
async fn stale_source_status_is_a_conflict() {
    let repo = setup().await;
    let request = repo.create(new_request("owner-1")).await.unwrap();

    let mut change = StatusChange::new(RequestStatus::Submitted, RequestStatus::Quoted);
    change.price_quote = Some(100);
    repo.apply_transition(request.id, change.clone()).await.unwrap();

    let err = repo.apply_transition(request.id, change).await.unwrap_err();
    assert!(matches!(err, VerdantError::Conflict { .. }), "{err:?}");

    let stored = repo.get_by_id(request.id).await.unwrap();
    assert_eq!(stored.status, RequestStatus::Quoted);
}

#[tokio::test]
async fn transition_of_missing_request_is_not_found() {
    let repo = setup().await;

    let change = StatusChange::new(RequestStatus::Submitted, RequestStatus::Quoted);
    let err = repo
        .apply_transition(Uuid::new_v4(), change)
        .await
        .unwrap_err();
    assert!(matches!(err, VerdantError::NotFound { .. }));
}

#[tokio::test]
async fn concurrent_transitions_from_same_status_apply_once() {
    let repo = setup().await;
    let request = repo.create(new_request("owner-1")).await.unwrap();

    let mut first = StatusChange::new(RequestStatus::Submitted, RequestStatus::Quoted);
    first.price_quote = Some(1_000);
    let mut second = first.clone();
    second.price_quote = Some(2_000);

    let (a, b) = tokio::join!(
        repo.apply_transition(request.id, first),
        repo.apply_transition(request.id, second),
    );

    let oks = [&a, &b].iter().filter(|r| r.is_ok()).count();
    assert_eq!(oks, 1, "exactly one transition should win: {a:?} / {b:?}");
    let loser = if a.is_err() { a } else { b };
    assert!(matches!(loser, Err(VerdantError::Conflict { .. })));

    let stored = repo.get_by_id(request.id).await.unwrap();
    assert_eq!(stored.status, RequestStatus::Quoted);
}

#[tokio::test]
async fn list_respects_scope() {
    let repo = setup().await;
    let mine = repo.create(new_request("owner-1")).await.unwrap();
    repo.create(new_request("owner-2")).await.unwrap();

    let all = repo.list(RequestScope::All).await.unwrap();
    assert_eq!(all.len(), 2);

    let owned = repo
        .list(RequestScope::OwnedBy("owner-1".into()))
        .await
        .unwrap();
    assert_eq!(owned.len(), 1);
    assert_eq!(owned[0].id, mine.id);

    let assigned = repo
        .list(RequestScope::AssignedTo("auditor-1".into()))
        .await
        .unwrap();
    assert!(assigned.is_empty());
}

#[tokio::test]
async fn list_is_newest_first() {
    let repo = setup().await;
    let older = repo.create(new_request("owner-1")).await.unwrap();
    let newer = repo.create(new_request("owner-1")).await.unwrap();

    let listed = repo
        .list(RequestScope::OwnedBy("owner-1".into()))
        .await
        .unwrap();
    let ids: Vec<_> = listed.iter().map(|r| r.id).collect();
    if newer.created_at > older.created_at {
        assert_eq!(ids, [newer.id, older.id]);
    } else {
        assert_eq!(ids.len(), 2);
    }
}
