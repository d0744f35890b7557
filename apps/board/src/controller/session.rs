use std::sync::Arc;

use chrono::Local;
use tracing::info;

use agenda::{ingest_today, AgendaSource, IngestSummary};
use records::{Collection, CollectionEvent, OrderKey, RecordError, Subscription};
use serde_json::Value;
use shared::session;
use storage::RecordStore;
use views::{Template, ViewRegistry};

use crate::templates::SessionTemplate;

/// The agenda pane: today's sessions ordered by room number, refreshed from
/// scratch on every start.
pub struct SessionBoard {
    collection: Collection,
    views: ViewRegistry,
    this_room: Option<u32>,
    _events: Subscription,
}

impl SessionBoard {
    /// Builds the pane over `store`. Sessions persisted by a previous run
    /// are stale by definition, so they are loaded and then purged before
    /// ingestion repopulates the pane.
    pub async fn start(store: RecordStore, this_room: Option<u32>) -> Result<Self, RecordError> {
        let collection = Collection::new(session::record_type(), store, |record| {
            OrderKey::from_value(record.get(session::IN_ROOM).as_ref().unwrap_or(&Value::Null))
        });
        let views = ViewRegistry::new();
        let template: Arc<dyn Template> = Arc::new(SessionTemplate);

        let events = {
            let collection = collection.clone();
            let views = views.clone();
            let template = Arc::clone(&template);
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
                CollectionEvent::Changed => {}
            })
        };

        collection.fetch().await?;
        let purged = collection.purge().await?;
        if purged > 0 {
            info!(count = purged, "purged stale sessions from the last run");
        }

        Ok(Self {
            collection,
            views,
            this_room,
            _events: events,
        })
    }

    /// One-shot ingestion of today's agenda into the pane.
    pub async fn ingest(&self, source: &dyn AgendaSource) -> anyhow::Result<IngestSummary> {
        let today = Local::now().date_naive();
        let summary = ingest_today(source, &self.collection, today, self.this_room).await?;
        info!(
            accepted = summary.accepted,
            skipped = summary.skipped,
            "agenda ingested"
        );
        Ok(summary)
    }

    pub fn collection(&self) -> &Collection {
        &self.collection
    }

    pub fn views(&self) -> &ViewRegistry {
        &self.views
    }

    /// Markup lines in room order, one per session.
    pub fn render_lines(&self) -> Vec<String> {
        self.views.markup_for(&self.collection.records())
    }
}
