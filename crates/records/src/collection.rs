//! An ordered, observable set of records of one type.
//!
//! Iteration order is always a stable sort by the collection's comparator
//! key, ties broken by insertion order. The next sequence number is tracked
//! on insertion order, independently of the comparator, since the two orders
//! may differ.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use serde_json::Value;

use shared::domain::{Attributes, RecordId, RecordType};
use storage::{RecordStore, StoreError};

use crate::events::{Emitter, Subscription};
use crate::record::{Record, RecordError, RecordEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectionEvent {
    Added { id: RecordId },
    Removed { id: RecordId },
    /// Bulk replacement after a fetch; emitted once, not per record.
    Refreshed,
    /// Aggregate: any record changed or the membership changed. Used by
    /// controllers to refresh derived statistics.
    Changed,
}

/// Total order key produced by a comparator. Numeric keys sort before
/// textual ones; within a collection the keys are homogeneous in practice.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum OrderKey {
    Int(i64),
    Text(String),
}

impl OrderKey {
    /// Normalizes an attribute value into an order key. Numeric strings
    /// compare as numbers so `"3"` and `3` order identically.
    pub fn from_value(value: &Value) -> OrderKey {
        match value {
            Value::Number(n) => OrderKey::Int(n.as_i64().unwrap_or(0)),
            Value::String(s) => s
                .trim()
                .parse::<i64>()
                .map(OrderKey::Int)
                .unwrap_or_else(|_| OrderKey::Text(s.clone())),
            Value::Bool(b) => OrderKey::Int(i64::from(*b)),
            _ => OrderKey::Int(0),
        }
    }
}

struct Entry {
    record: Arc<Record>,
    insertion_seq: u64,
}

#[derive(Default)]
struct State {
    /// Comparator-ordered, re-sorted after every insertion.
    entries: Vec<Entry>,
    /// Sequence-insertion order, the basis for `next_sequence`.
    insertion: Vec<Arc<Record>>,
    next_insertion_seq: u64,
    /// Per-record event subscriptions, released on removal.
    record_subs: HashMap<RecordId, Subscription>,
}

struct Inner {
    kind: &'static RecordType,
    store: RecordStore,
    comparator: Box<dyn Fn(&Record) -> OrderKey + Send + Sync>,
    state: Mutex<State>,
    events: Emitter<CollectionEvent>,
}

#[derive(Clone)]
pub struct Collection {
    inner: Arc<Inner>,
}

impl Collection {
    pub fn new(
        kind: &'static RecordType,
        store: RecordStore,
        comparator: impl Fn(&Record) -> OrderKey + Send + Sync + 'static,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                kind,
                store,
                comparator: Box::new(comparator),
                state: Mutex::new(State::default()),
                events: Emitter::new(),
            }),
        }
    }

    pub fn kind(&self) -> &'static RecordType {
        self.inner.kind
    }

    pub fn on(
        &self,
        callback: impl Fn(&CollectionEvent) + Send + Sync + 'static,
    ) -> Subscription {
        self.inner.events.on(callback)
    }

    /// Inserts `record` unless its identifier is already present (duplicate
    /// insert is a no-op). Re-sorts, then emits `Added` followed by the
    /// aggregate `Changed`.
    pub fn add(&self, record: Arc<Record>) -> bool {
        let id = record.id();
        if !self.insert_silent(record) {
            return false;
        }
        self.inner.events.emit(&CollectionEvent::Added { id });
        self.inner.events.emit(&CollectionEvent::Changed);
        true
    }

    /// Constructs a new record: assigns a fresh identity, fills the sequence
    /// field with `next_sequence()` when the type is sequence-ordered and the
    /// caller did not supply one, persists, then `add`s.
    pub async fn create(&self, mut attributes: Attributes) -> Result<Arc<Record>, RecordError> {
        if let Some(field) = self.inner.kind.sequence_field {
            if !attributes.contains_key(field) {
                attributes.insert(field.to_string(), Value::from(self.next_sequence()));
            }
        }
        let id = RecordId::generate();
        let record = Arc::new(Record::new(
            self.inner.kind,
            self.inner.store.clone(),
            id,
            attributes,
        ));
        // Persist the defaults-applied attribute set, not the raw input.
        self.inner
            .store
            .create(self.inner.kind.namespace, id, &record.attributes())
            .await?;
        self.add(Arc::clone(&record));
        Ok(record)
    }

    /// Drops the record from both orderings and releases its subscription.
    /// Called directly or through a record's destroy notification.
    pub fn remove(&self, id: RecordId) -> Option<Arc<Record>> {
        let (removed, subscription) = {
            let mut state = lock(&self.inner.state);
            let position = state.entries.iter().position(|entry| entry.record.id() == id);
            let removed = position.map(|index| state.entries.remove(index).record);
            if removed.is_some() {
                state.insertion.retain(|record| record.id() != id);
            }
            (removed, state.record_subs.remove(&id))
        };
        drop(subscription);

        if removed.is_some() {
            self.inner.events.emit(&CollectionEvent::Removed { id });
            self.inner.events.emit(&CollectionEvent::Changed);
        }
        removed
    }

    /// Loads every persisted record for the namespace and replaces the
    /// in-memory set, emitting a single `Refreshed` and a trailing `Changed`.
    /// An empty or absent namespace yields an empty collection, not an error.
    pub async fn fetch(&self) -> Result<(), StoreError> {
        let persisted = self
            .inner
            .store
            .load_all(self.inner.kind.namespace)
            .await?;

        let old_subs: Vec<Subscription> = {
            let mut state = lock(&self.inner.state);
            state.entries.clear();
            state.insertion.clear();
            state.next_insertion_seq = 0;
            state.record_subs.drain().map(|(_, sub)| sub).collect()
        };
        drop(old_subs);

        for loaded in persisted {
            let record = Arc::new(Record::new(
                self.inner.kind,
                self.inner.store.clone(),
                loaded.id,
                loaded.attributes,
            ));
            self.insert_silent(record);
        }

        self.inner.events.emit(&CollectionEvent::Refreshed);
        self.inner.events.emit(&CollectionEvent::Changed);
        Ok(())
    }

    /// Comparator-ordered snapshot.
    pub fn records(&self) -> Vec<Arc<Record>> {
        lock(&self.inner.state)
            .entries
            .iter()
            .map(|entry| Arc::clone(&entry.record))
            .collect()
    }

    pub fn get(&self, id: RecordId) -> Option<Arc<Record>> {
        lock(&self.inner.state)
            .entries
            .iter()
            .find(|entry| entry.record.id() == id)
            .map(|entry| Arc::clone(&entry.record))
    }

    pub fn len(&self) -> usize {
        lock(&self.inner.state).entries.len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner.state).entries.is_empty()
    }

    /// Read-only subset in comparator order; never mutates the collection.
    pub fn filter(&self, predicate: impl Fn(&Record) -> bool) -> Vec<Arc<Record>> {
        self.records()
            .into_iter()
            .filter(|record| predicate(record))
            .collect()
    }

    /// `1` when empty, else one past the sequence number of the most
    /// recently sequence-inserted record. Never derived from the
    /// comparator-ordered view, which may differ.
    pub fn next_sequence(&self) -> i64 {
        let field = self.inner.kind.sequence_field.unwrap_or("order");
        let state = lock(&self.inner.state);
        match state.insertion.last() {
            None => 1,
            Some(record) => record.get_i64(field).unwrap_or(0) + 1,
        }
    }

    /// Destroys every record, in durable storage and in memory. Used by the
    /// session board, which never carries sessions across runs.
    pub async fn purge(&self) -> Result<usize, RecordError> {
        let records = self.records();
        let count = records.len();
        for record in records {
            // Each destroy notification removes the record from this
            // collection through its subscription.
            record.destroy().await?;
        }
        Ok(count)
    }

    fn insert_silent(&self, record: Arc<Record>) -> bool {
        let id = record.id();
        let subscription = {
            let state = lock(&self.inner.state);
            if state.entries.iter().any(|entry| entry.record.id() == id) {
                return false;
            }
            drop(state);

            let weak = Arc::downgrade(&self.inner);
            record.on(move |event| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let collection = Collection { inner };
                match event {
                    RecordEvent::Changed { .. } => {
                        collection.inner.events.emit(&CollectionEvent::Changed);
                    }
                    RecordEvent::Destroyed { id } => {
                        collection.remove(*id);
                    }
                }
            })
        };

        let mut state = lock(&self.inner.state);
        if state.entries.iter().any(|entry| entry.record.id() == id) {
            // Lost a duplicate-insert race; the unused subscription drops
            // here and unsubscribes itself.
            return false;
        }
        let insertion_seq = state.next_insertion_seq;
        state.next_insertion_seq += 1;
        state.insertion.push(Arc::clone(&record));
        state.record_subs.insert(id, subscription);
        state.entries.push(Entry {
            record,
            insertion_seq,
        });
        // Stable order: comparator key first, original insertion breaks ties.
        let comparator = &self.inner.comparator;
        state
            .entries
            .sort_by_cached_key(|entry| (comparator(&entry.record), entry.insertion_seq));
        true
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
