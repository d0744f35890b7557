use serde_json::json;
use shared::domain::object;

use super::*;

async fn memory_store() -> RecordStore {
    RecordStore::open("sqlite::memory:").await.expect("db")
}

#[tokio::test]
async fn create_then_load_all_round_trips() {
    let store = memory_store().await;
    let id = RecordId::generate();
    let attributes = object(json!({"content": "Buy milk", "order": 1, "done": false}));

    store.create("countdowns", id, &attributes).await.expect("create");

    let loaded = store.load_all("countdowns").await.expect("load");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, id);
    assert_eq!(loaded[0].attributes, attributes);
}

#[tokio::test]
async fn load_all_on_missing_namespace_is_empty() {
    let store = memory_store().await;
    let loaded = store.load_all("never-written").await.expect("load");
    assert!(loaded.is_empty());
}

#[tokio::test]
async fn load_all_preserves_creation_order() {
    let store = memory_store().await;
    let first = RecordId::generate();
    let second = RecordId::generate();
    store
        .create("countdowns", first, &object(json!({"order": 1})))
        .await
        .expect("first");
    store
        .create("countdowns", second, &object(json!({"order": 2})))
        .await
        .expect("second");

    let loaded = store.load_all("countdowns").await.expect("load");
    assert_eq!(loaded[0].id, first);
    assert_eq!(loaded[1].id, second);
}

#[tokio::test]
async fn duplicate_create_is_rejected() {
    let store = memory_store().await;
    let id = RecordId::generate();
    let attributes = object(json!({"content": "x"}));
    store.create("countdowns", id, &attributes).await.expect("create");

    let error = store
        .create("countdowns", id, &attributes)
        .await
        .expect_err("duplicate should fail");
    assert!(matches!(error, StoreError::DuplicateRecord { id: dup, .. } if dup == id));
}

#[tokio::test]
async fn update_overwrites_attributes() {
    let store = memory_store().await;
    let id = RecordId::generate();
    store
        .create("countdowns", id, &object(json!({"content": "before", "done": false})))
        .await
        .expect("create");

    let next = object(json!({"content": "after", "done": true}));
    store.update("countdowns", id, &next).await.expect("update");

    let loaded = store.load_all("countdowns").await.expect("load");
    assert_eq!(loaded[0].attributes, next);
}

#[tokio::test]
async fn update_of_unknown_record_is_surfaced() {
    let store = memory_store().await;
    let id = RecordId::generate();
    let error = store
        .update("countdowns", id, &object(json!({"content": "ghost"})))
        .await
        .expect_err("unknown id should fail");
    assert!(matches!(error, StoreError::UnknownRecord { id: missing, .. } if missing == id));
}

#[tokio::test]
async fn destroy_is_idempotent() {
    let store = memory_store().await;
    let id = RecordId::generate();
    store
        .create("countdowns", id, &object(json!({"content": "x"})))
        .await
        .expect("create");

    assert!(store.destroy("countdowns", id).await.expect("first destroy"));
    assert!(!store.destroy("countdowns", id).await.expect("second destroy"));
    assert!(store.load_all("countdowns").await.expect("load").is_empty());
}

#[tokio::test]
async fn namespaces_do_not_collide() {
    let store = memory_store().await;
    let countdown = RecordId::generate();
    let session = RecordId::generate();
    store
        .create("countdowns", countdown, &object(json!({"content": "x"})))
        .await
        .expect("countdown");
    store
        .create("sessions", session, &object(json!({"topic": "Rust"})))
        .await
        .expect("session");

    assert_eq!(store.load_all("countdowns").await.expect("load").len(), 1);
    assert_eq!(store.load_all("sessions").await.expect("load").len(), 1);

    store.clear_namespace("sessions").await.expect("clear");
    assert!(store.load_all("sessions").await.expect("load").is_empty());
    assert_eq!(store.load_all("countdowns").await.expect("load").len(), 1);
}

#[tokio::test]
async fn corrupt_rows_are_skipped_not_fatal() {
    let store = memory_store().await;
    let good = RecordId::generate();
    store
        .create("countdowns", good, &object(json!({"content": "ok"})))
        .await
        .expect("create");

    sqlx::query("INSERT INTO records (namespace, id, attributes) VALUES (?, ?, ?)")
        .bind("countdowns")
        .bind(RecordId::generate().to_string())
        .bind("{not json")
        .execute(store.pool())
        .await
        .expect("raw insert");

    let loaded = store.load_all("countdowns").await.expect("load");
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].id, good);
}

#[tokio::test]
async fn creates_database_file_when_missing() {
    let temp_root = tempfile::tempdir().expect("tempdir");
    let db_path = temp_root.path().join("board.db");
    let database_url = format!("sqlite://{}", db_path.to_string_lossy().replace('\\', "/"));

    let store = RecordStore::open(&database_url).await.expect("db");
    drop(store);

    assert!(db_path.exists(), "database file should exist: {}", db_path.display());
}
