//! A single observable record: mutable attribute bag with default-filling,
//! write-through persistence, and change/destroy notification.

use std::sync::{Mutex, MutexGuard};

use serde_json::Value;
use thiserror::Error;

use shared::domain::{is_falsy, Attributes, RecordId, RecordType};
use storage::{RecordStore, StoreError};

use crate::events::{Emitter, Subscription};

#[derive(Debug, Error)]
pub enum RecordError {
    #[error("record {0} has been destroyed")]
    Destroyed(RecordId),
    #[error("field '{field}' of record {id} is not a boolean")]
    NotBoolean { id: RecordId, field: String },
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone)]
pub enum RecordEvent {
    /// Attributes changed. Carries full prior/next snapshots so subscribers
    /// never have to re-enter the record while handling the event.
    Changed {
        id: RecordId,
        prior: Attributes,
        next: Attributes,
    },
    /// Terminal: the record was removed from durable storage.
    Destroyed { id: RecordId },
}

struct State {
    attributes: Attributes,
    destroyed: bool,
}

pub struct Record {
    id: RecordId,
    kind: &'static RecordType,
    store: RecordStore,
    state: Mutex<State>,
    events: Emitter<RecordEvent>,
}

impl Record {
    /// Constructed only by its owning collection (create or fetch); merges
    /// the supplied attributes over the type defaults, then force-fills any
    /// falsy required-with-fallback field from the defaults.
    pub(crate) fn new(
        kind: &'static RecordType,
        store: RecordStore,
        id: RecordId,
        supplied: Attributes,
    ) -> Self {
        Self {
            id,
            kind,
            store,
            state: Mutex::new(State {
                attributes: apply_defaults(kind, supplied),
                destroyed: false,
            }),
            events: Emitter::new(),
        }
    }

    pub fn id(&self) -> RecordId {
        self.id
    }

    pub fn kind(&self) -> &'static RecordType {
        self.kind
    }

    pub fn on(&self, callback: impl Fn(&RecordEvent) + Send + Sync + 'static) -> Subscription {
        self.events.on(callback)
    }

    /// Full snapshot of the current attributes.
    pub fn attributes(&self) -> Attributes {
        lock(&self.state).attributes.clone()
    }

    pub fn get(&self, field: &str) -> Option<Value> {
        lock(&self.state).attributes.get(field).cloned()
    }

    pub fn get_str(&self, field: &str) -> Option<String> {
        match lock(&self.state).attributes.get(field) {
            Some(Value::String(text)) => Some(text.clone()),
            _ => None,
        }
    }

    pub fn get_i64(&self, field: &str) -> Option<i64> {
        lock(&self.state).attributes.get(field).and_then(Value::as_i64)
    }

    pub fn get_bool(&self, field: &str) -> Option<bool> {
        lock(&self.state).attributes.get(field).and_then(Value::as_bool)
    }

    pub fn is_destroyed(&self) -> bool {
        lock(&self.state).destroyed
    }

    /// Merges `partial` over the current attributes, persists the result,
    /// then emits `Changed`. Atomic from the caller's perspective: if
    /// persistence fails, the in-memory state is exactly as before the call.
    pub async fn save(&self, partial: Attributes) -> Result<(), RecordError> {
        let prior = {
            let state = lock(&self.state);
            if state.destroyed {
                return Err(RecordError::Destroyed(self.id));
            }
            state.attributes.clone()
        };

        let mut next = prior.clone();
        for (field, value) in partial {
            next.insert(field, value);
        }

        self.store
            .update(self.kind.namespace, self.id, &next)
            .await?;

        {
            let mut state = lock(&self.state);
            if state.destroyed {
                return Err(RecordError::Destroyed(self.id));
            }
            state.attributes = next.clone();
        }
        self.events.emit(&RecordEvent::Changed {
            id: self.id,
            prior,
            next,
        });
        Ok(())
    }

    /// Flips a boolean field via [`Record::save`].
    pub async fn toggle(&self, field: &str) -> Result<(), RecordError> {
        let Some(current) = self.get_bool(field) else {
            return Err(RecordError::NotBoolean {
                id: self.id,
                field: field.to_string(),
            });
        };
        let mut partial = Attributes::new();
        partial.insert(field.to_string(), Value::Bool(!current));
        self.save(partial).await
    }

    /// Removes the record from durable storage and emits the terminal
    /// `Destroyed` notification. A second destroy is a no-op, not an error;
    /// any later `save` is rejected.
    pub async fn destroy(&self) -> Result<(), RecordError> {
        if lock(&self.state).destroyed {
            return Ok(());
        }
        self.store.destroy(self.kind.namespace, self.id).await?;
        {
            let mut state = lock(&self.state);
            if state.destroyed {
                return Ok(());
            }
            state.destroyed = true;
        }
        self.events.emit(&RecordEvent::Destroyed { id: self.id });
        // Nothing may fire after the terminal notification.
        self.events.clear();
        Ok(())
    }

    /// Destroys the record; the bound view (if any) detaches itself through
    /// the destroy notification.
    pub async fn clear(&self) -> Result<(), RecordError> {
        self.destroy().await
    }
}

fn apply_defaults(kind: &RecordType, supplied: Attributes) -> Attributes {
    let defaults = (kind.defaults)();
    let mut attributes = defaults.clone();
    for (field, value) in supplied {
        attributes.insert(field, value);
    }
    // Falsy-check overwrite, not fill-if-absent: an empty or false value in a
    // fallback field is replaced by the default as well.
    for field in kind.fallback_fields {
        let needs_fill = attributes.get(*field).map_or(true, is_falsy);
        if needs_fill {
            if let Some(default) = defaults.get(*field) {
                attributes.insert((*field).to_string(), default.clone());
            }
        }
    }
    attributes
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl std::fmt::Debug for Record {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Record")
            .field("id", &self.id)
            .field("kind", &self.kind.name)
            .field("destroyed", &self.is_destroyed())
            .finish()
    }
}
