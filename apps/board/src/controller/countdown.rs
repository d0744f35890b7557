use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::{json, Value};
use tracing::info;

use records::{Collection, CollectionEvent, OrderKey, RecordError, Subscription};
use shared::{countdown, domain::Attributes};
use storage::{RecordStore, StoreError};
use views::{Template, ViewRegistry};

use crate::templates::CountdownTemplate;

/// Derived counters over the countdown collection, recomputed on every
/// aggregate change notification.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub done: usize,
    pub remaining: usize,
}

/// The countdown pane: an ordered collection of user-entered items, a view
/// per item, and the done/remaining counters.
pub struct CountdownBoard {
    collection: Collection,
    views: ViewRegistry,
    stats: Arc<Mutex<Stats>>,
    _events: Subscription,
}

impl CountdownBoard {
    /// Builds the pane over `store` and loads whatever survived the last
    /// run. Views attach as records arrive, through the collection events.
    pub async fn start(store: RecordStore) -> Result<Self, StoreError> {
        let collection = Collection::new(countdown::record_type(), store, |record| {
            OrderKey::Int(record.get_i64(countdown::ORDER).unwrap_or(0))
        });
        let views = ViewRegistry::new();
        let template: Arc<dyn Template> = Arc::new(CountdownTemplate);
        let stats = Arc::new(Mutex::new(Stats::default()));

        let events = {
            let collection = collection.clone();
            let views = views.clone();
            let template = Arc::clone(&template);
            let stats = Arc::clone(&stats);
            collection.clone().on(move |event| match event {
                CollectionEvent::Added { id } => {
                    if let Some(record) = collection.get(*id) {
                        views.attach(record, Arc::clone(&template));
                    }
                }
                CollectionEvent::Removed { id } => {
                    views.detach(*id);
                }
                CollectionEvent::Refreshed => {
                    for record in collection.records() {
                        views.attach(record, Arc::clone(&template));
                    }
                }
                CollectionEvent::Changed => {
                    *lock(&stats) = compute_stats(&collection);
                }
            })
        };

        collection.fetch().await?;
        info!(count = collection.len(), "loaded persisted countdowns");

        Ok(Self {
            collection,
            views,
            stats,
            _events: events,
        })
    }

    /// Creates a countdown from one line of user input. Sequence number and
    /// defaults are filled in by the collection; blank input falls back to
    /// the placeholder content.
    pub async fn create_from_input(
        &self,
        content: &str,
        author: Option<&str>,
    ) -> Result<(), RecordError> {
        let mut attributes = Attributes::new();
        attributes.insert(
            countdown::CONTENT.to_string(),
            Value::String(content.trim().to_string()),
        );
        if let Some(author) = author {
            attributes.insert(countdown::AUTHOR.to_string(), json!(author));
        }
        self.collection.create(attributes).await?;
        Ok(())
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    pub fn stats(&self) -> Stats {
        *lock(&self.stats)
    }

    /// Markup lines in comparator order, one per live countdown.
    pub fn render_lines(&self) -> Vec<String> {
        self.views.markup_for(&self.collection.records())
    }
}

fn compute_stats(collection: &Collection) -> Stats {
    let records = collection.records();
    let done = records
        .iter()
        .filter(|record| record.get_bool(countdown::DONE) == Some(true))
        .count();
    Stats {
        total: records.len(),
        done,
        remaining: records.len() - done,
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
