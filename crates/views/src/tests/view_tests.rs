use std::sync::Arc;

use serde_json::json;

use records::{Collection, OrderKey};
use shared::{countdown, domain::object, domain::Attributes};
use storage::RecordStore;

use crate::{BoundView, Template, ViewRegistry};

struct LineTemplate;

impl Template for LineTemplate {
    fn render(&self, attributes: &Attributes) -> String {
        let done = attributes
            .get(countdown::DONE)
            .and_then(|value| value.as_bool())
            .unwrap_or(false);
        let content = attributes
            .get(countdown::CONTENT)
            .and_then(|value| value.as_str())
            .unwrap_or("");
        format!("[{}] {}", if done { "x" } else { " " }, content)
    }
}

async fn collection() -> Collection {
    let store = RecordStore::open("sqlite::memory:").await.expect("db");
    Collection::new(countdown::record_type(), store, |record| {
        OrderKey::Int(record.get_i64(countdown::ORDER).unwrap_or(0))
    })
}

fn template() -> Arc<dyn Template> {
    Arc::new(LineTemplate)
}

#[tokio::test]
async fn bind_renders_the_initial_markup() {
    let collection = collection().await;
    let record = collection
        .create(object(json!({"content": "Buy milk"})))
        .await
        .expect("create");

    let view = BoundView::bind(record, template());
    assert_eq!(view.markup(), "[ ] Buy milk");
    assert!(!view.is_editing());
}

#[tokio::test]
async fn change_notifications_rerender_exactly_the_latest_state() {
    let collection = collection().await;
    let record = collection
        .create(object(json!({"content": "before"})))
        .await
        .expect("create");
    let view = BoundView::bind(Arc::clone(&record), template());

    record
        .save(object(json!({"content": "after", "done": true})))
        .await
        .expect("save");

    // Round trip: save(X) then render shows X.
    assert_eq!(view.markup(), "[x] after");
}

#[tokio::test]
async fn edit_flow_prefills_commits_and_rerenders() {
    let collection = collection().await;
    let record = collection
        .create(object(json!({"content": "tpyo"})))
        .await
        .expect("create");
    let view = BoundView::bind(Arc::clone(&record), template());

    view.begin_edit(countdown::CONTENT);
    assert!(view.is_editing());
    assert_eq!(view.edit_buffer().as_deref(), Some("tpyo"));

    view.set_edit_buffer("typo fixed");
    view.commit_edit().await.expect("commit");

    assert!(!view.is_editing());
    assert_eq!(record.get_str(countdown::CONTENT).as_deref(), Some("typo fixed"));
    assert_eq!(view.markup(), "[ ] typo fixed");
}

#[tokio::test]
async fn commit_without_editing_is_a_noop() {
    let collection = collection().await;
    let record = collection
        .create(object(json!({"content": "stable"})))
        .await
        .expect("create");
    let view = BoundView::bind(Arc::clone(&record), template());

    view.commit_edit().await.expect("commit");
    assert_eq!(record.get_str(countdown::CONTENT).as_deref(), Some("stable"));
}

#[tokio::test]
async fn rerender_while_editing_preserves_the_edit_buffer() {
    let collection = collection().await;
    let record = collection
        .create(object(json!({"content": "original"})))
        .await
        .expect("create");
    let view = BoundView::bind(Arc::clone(&record), template());

    view.begin_edit(countdown::CONTENT);
    view.set_edit_buffer("half-typed");

    // A concurrent change re-renders the markup but not the buffer.
    record.toggle(countdown::DONE).await.expect("toggle");

    assert!(view.is_editing());
    assert_eq!(view.edit_buffer().as_deref(), Some("half-typed"));
    assert_eq!(view.markup(), "[x] original");
}

#[tokio::test]
async fn toggle_writes_through_the_record() {
    let collection = collection().await;
    let record = collection
        .create(object(json!({"content": "task"})))
        .await
        .expect("create");
    let view = BoundView::bind(Arc::clone(&record), template());

    view.toggle(countdown::DONE).await.expect("toggle");
    assert_eq!(record.get_bool(countdown::DONE), Some(true));
    assert_eq!(view.markup(), "[x] task");
}

#[tokio::test]
async fn destroy_detaches_the_view_and_stops_renders() {
    let collection = collection().await;
    let record = collection
        .create(object(json!({"content": "doomed"})))
        .await
        .expect("create");
    let view = BoundView::bind(Arc::clone(&record), template());

    record.destroy().await.expect("destroy");

    assert!(view.is_detached());
    assert_eq!(view.markup(), "");
    assert!(!view.is_editing());
}

#[tokio::test]
async fn clear_destroys_the_record_through_the_view() {
    let collection = collection().await;
    let record = collection
        .create(object(json!({"content": "doomed"})))
        .await
        .expect("create");
    let view = BoundView::bind(Arc::clone(&record), template());

    view.clear().await.expect("clear");

    assert!(record.is_destroyed());
    assert!(view.is_detached());
    assert!(collection.is_empty());
}

#[tokio::test]
async fn explicit_detach_is_idempotent_and_final() {
    let collection = collection().await;
    let record = collection
        .create(object(json!({"content": "quiet"})))
        .await
        .expect("create");
    let view = BoundView::bind(Arc::clone(&record), template());

    view.detach();
    view.detach();
    assert!(view.is_detached());

    // A later save must not render into the detached view.
    record
        .save(object(json!({"content": "loud"})))
        .await
        .expect("save");
    assert_eq!(view.markup(), "");
}

#[tokio::test]
async fn registry_enforces_one_view_per_record() {
    let collection = collection().await;
    let record = collection
        .create(object(json!({"content": "solo"})))
        .await
        .expect("create");
    let registry = ViewRegistry::new();

    let first = registry.attach(Arc::clone(&record), template());
    let second = registry.attach(Arc::clone(&record), template());

    assert_eq!(registry.len(), 1);
    assert!(first.is_detached());
    assert!(!second.is_detached());
}

#[tokio::test]
async fn registry_detach_removes_and_detaches() {
    let collection = collection().await;
    let record = collection
        .create(object(json!({"content": "x"})))
        .await
        .expect("create");
    let registry = ViewRegistry::new();
    let view = registry.attach(Arc::clone(&record), template());

    assert!(registry.detach(record.id()));
    assert!(view.is_detached());
    assert!(registry.is_empty());
    assert!(!registry.detach(record.id()));
}

#[tokio::test]
async fn markup_for_follows_the_given_order() {
    let collection = collection().await;
    let registry = ViewRegistry::new();
    for (content, order) in [("b", 2), ("a", 1)] {
        let record = collection
            .create(object(json!({"content": content, "order": order})))
            .await
            .expect("create");
        registry.attach(record, template());
    }

    let lines = registry.markup_for(&collection.records());
    assert_eq!(lines, vec!["[ ] a", "[ ] b"]);
}
