use std::{
    collections::HashMap,
    sync::{Arc, Mutex, MutexGuard},
};

use records::Record;
use shared::domain::RecordId;

use crate::{BoundView, Template};

/// Side registry enforcing at-most-one live view per record, replacing the
/// record-to-view back-pointer of the original design.
#[derive(Clone, Default)]
pub struct ViewRegistry {
    inner: Arc<Mutex<HashMap<RecordId, BoundView>>>,
}

impl ViewRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Binds a view to `record` and registers it. If a view was already
    /// bound to the record it is detached and replaced.
    pub fn attach(&self, record: Arc<Record>, template: Arc<dyn Template>) -> BoundView {
        let id = record.id();
        let view = BoundView::bind(record, template);
        let previous = lock(&self.inner).insert(id, view.clone());
        if let Some(previous) = previous {
            previous.detach();
        }
        view
    }

    /// Detaches and removes the view bound to `id`. Missing entries are not
    /// an error.
    pub fn detach(&self, id: RecordId) -> bool {
        match lock(&self.inner).remove(&id) {
            Some(view) => {
                view.detach();
                true
            }
            None => false,
        }
    }

    pub fn get(&self, id: RecordId) -> Option<BoundView> {
        lock(&self.inner).get(&id).cloned()
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).len()
    }

    pub fn is_empty(&self) -> bool {
        lock(&self.inner).is_empty()
    }

    /// Markup snapshots for `order`, skipping records without a live view.
    pub fn markup_for(&self, order: &[Arc<Record>]) -> Vec<String> {
        order
            .iter()
            .filter_map(|record| self.get(record.id()))
            .map(|view| view.markup())
            .collect()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
