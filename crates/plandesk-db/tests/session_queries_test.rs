//! Integration tests for session and message query functions.
//!
//! Each test gets its own in-memory database from `plandesk-test-utils`.

use plandesk_db::models::{MessageRole, SessionStatus};
use plandesk_db::queries::messages::{self, NewMessage};
use plandesk_db::queries::sessions::{self, NewSession};
use plandesk_test_utils::{create_test_db, insert_test_message, insert_test_session};

#[tokio::test]
async fn insert_and_get_session() {
    let mut db = create_test_db().await;
    let pool = db.get().unwrap().clone();

    let new = NewSession {
        id: "sess-1",
        working_dir: "/home/dev/project",
        title: Some("Refactor parser"),
        status: SessionStatus::Idle,
    };
    let session = sessions::insert_session(&pool, &new)
        .await
        .expect("insert_session should succeed");
    assert_eq!(session.id, "sess-1");
    assert_eq!(session.title.as_deref(), Some("Refactor parser"));

    let fetched = sessions::get_session(&pool, "sess-1")
        .await
        .unwrap()
        .expect("session should exist");
    assert_eq!(fetched.working_dir, "/home/dev/project");
    assert_eq!(fetched.status, SessionStatus::Idle);

    assert!(sessions::get_session(&pool, "missing").await.unwrap().is_none());

    db.close().await;
}

#[tokio::test]
async fn duplicate_session_id_fails() {
    let mut db = create_test_db().await;
    let pool = db.get().unwrap().clone();

    insert_test_session(&pool, "dup", "/tmp", None).await;
    let again = NewSession {
        id: "dup",
        working_dir: "/tmp",
        title: None,
        status: SessionStatus::Idle,
    };
    assert!(sessions::insert_session(&pool, &again).await.is_err());

    db.close().await;
}

#[tokio::test]
async fn update_status_and_current_plan() {
    let mut db = create_test_db().await;
    let pool = db.get().unwrap().clone();

    insert_test_session(&pool, "s1", "/tmp", None).await;

    sessions::update_session_status(&pool, "s1", SessionStatus::Running)
        .await
        .unwrap();
    sessions::set_current_plan(&pool, "s1", Some("add-auth-1a2b3c4d.md"))
        .await
        .unwrap();

    let session = sessions::get_session(&pool, "s1").await.unwrap().unwrap();
    assert_eq!(session.status, SessionStatus::Running);
    assert_eq!(session.current_plan.as_deref(), Some("add-auth-1a2b3c4d.md"));
    assert!(session.updated_at >= session.created_at);

    sessions::set_current_plan(&pool, "s1", None).await.unwrap();
    let session = sessions::get_session(&pool, "s1").await.unwrap().unwrap();
    assert!(session.current_plan.is_none());

    db.close().await;
}

#[tokio::test]
async fn updates_on_missing_session_fail() {
    let mut db = create_test_db().await;
    let pool = db.get().unwrap().clone();

    let err = sessions::update_session_status(&pool, "ghost", SessionStatus::Active)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not found"), "got: {err}");
    assert!(sessions::add_tokens(&pool, "ghost", 10).await.is_err());
    assert!(!sessions::delete_session(&pool, "ghost").await.unwrap());

    db.close().await;
}

#[tokio::test]
async fn add_tokens_accumulates() {
    let mut db = create_test_db().await;
    let pool = db.get().unwrap().clone();

    insert_test_session(&pool, "s1", "/tmp", None).await;
    assert_eq!(sessions::add_tokens(&pool, "s1", 120).await.unwrap(), 120);
    assert_eq!(sessions::add_tokens(&pool, "s1", 30).await.unwrap(), 150);

    let session = sessions::get_session(&pool, "s1").await.unwrap().unwrap();
    assert_eq!(session.total_tokens, 150);

    db.close().await;
}

#[tokio::test]
async fn list_sessions_returns_all() {
    let mut db = create_test_db().await;
    let pool = db.get().unwrap().clone();

    insert_test_session(&pool, "a", "/tmp", None).await;
    insert_test_session(&pool, "b", "/tmp", Some(SessionStatus::Completed)).await;

    let all = sessions::list_sessions(&pool).await.unwrap();
    let mut ids: Vec<&str> = all.iter().map(|s| s.id.as_str()).collect();
    ids.sort_unstable();
    assert_eq!(ids, vec!["a", "b"]);

    db.close().await;
}

#[tokio::test]
async fn message_counts_are_per_session() {
    let mut db = create_test_db().await;
    let pool = db.get().unwrap().clone();

    insert_test_session(&pool, "s1", "/tmp", None).await;
    insert_test_session(&pool, "s2", "/tmp", None).await;
    insert_test_message(&pool, "s1", MessageRole::User, "q").await;
    insert_test_message(&pool, "s1", MessageRole::Assistant, "a").await;
    insert_test_message(&pool, "s2", MessageRole::User, "other").await;

    assert_eq!(messages::count_messages_for_session(&pool, "s1").await.unwrap(), 2);
    assert_eq!(messages::count_messages_for_session(&pool, "s2").await.unwrap(), 1);

    let tool_reply = NewMessage {
        session_id: "s2",
        role: MessageRole::Tool,
        content: Some("ok"),
        tool_call_id: Some("call_7"),
        tool_calls: None,
    };
    let inserted = messages::insert_message(&pool, &tool_reply).await.unwrap();
    assert_eq!(inserted.tool_call_id.as_deref(), Some("call_7"));
    assert!(inserted.tool_calls.is_none());

    db.close().await;
}
