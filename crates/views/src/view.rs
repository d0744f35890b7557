use std::sync::{Arc, Mutex, MutexGuard};

use serde_json::Value;

use records::{Record, RecordError, RecordEvent, Subscription};
use shared::domain::Attributes;

use crate::Template;

struct EditSession {
    field: String,
    buffer: String,
}

#[derive(Default)]
struct ViewState {
    markup: String,
    editing: Option<EditSession>,
    detached: bool,
    subscription: Option<Subscription>,
}

struct ViewInner {
    record: Arc<Record>,
    template: Arc<dyn Template>,
    state: Mutex<ViewState>,
}

/// A view bound 1:1 to a live record for the record's entire lifetime.
///
/// Two states: `rendered` and `editing`. Any change notification re-renders
/// regardless of state; re-rendering while editing refreshes the markup but
/// never clobbers the in-progress edit buffer. The destroy notification
/// detaches the view, after which no render ever fires again.
#[derive(Clone)]
pub struct BoundView {
    inner: Arc<ViewInner>,
}

impl BoundView {
    pub fn bind(record: Arc<Record>, template: Arc<dyn Template>) -> Self {
        let inner = Arc::new(ViewInner {
            record: Arc::clone(&record),
            template,
            state: Mutex::new(ViewState::default()),
        });

        {
            let markup = inner.template.render(&record.attributes());
            lock(&inner.state).markup = markup;
        }

        let weak = Arc::downgrade(&inner);
        let subscription = record.on(move |event| {
            let Some(inner) = weak.upgrade() else {
                return;
            };
            match event {
                RecordEvent::Changed { next, .. } => render_into(&inner, next),
                RecordEvent::Destroyed { .. } => detach_inner(&inner),
            }
        });
        lock(&inner.state).subscription = Some(subscription);

        Self { inner }
    }

    pub fn record(&self) -> &Arc<Record> {
        &self.inner.record
    }

    /// The most recently rendered markup; empty once detached.
    pub fn markup(&self) -> String {
        lock(&self.inner.state).markup.clone()
    }

    pub fn is_editing(&self) -> bool {
        lock(&self.inner.state).editing.is_some()
    }

    pub fn is_detached(&self) -> bool {
        lock(&self.inner.state).detached
    }

    /// Enters editing mode on `field`, pre-filling the edit buffer with the
    /// field's current content. No-op on a detached view.
    pub fn begin_edit(&self, field: &str) {
        let buffer = match self.inner.record.get(field) {
            Some(Value::String(text)) => text,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        let mut state = lock(&self.inner.state);
        if state.detached {
            return;
        }
        state.editing = Some(EditSession {
            field: field.to_string(),
            buffer,
        });
    }

    /// Current edit buffer, while editing.
    pub fn edit_buffer(&self) -> Option<String> {
        lock(&self.inner.state)
            .editing
            .as_ref()
            .map(|session| session.buffer.clone())
    }

    pub fn set_edit_buffer(&self, text: impl Into<String>) {
        if let Some(session) = lock(&self.inner.state).editing.as_mut() {
            session.buffer = text.into();
        }
    }

    /// Leaves editing mode (blur or terminator keypress), writing the buffer
    /// back through the record. The resulting change notification re-renders
    /// the view. No-op when not editing.
    pub async fn commit_edit(&self) -> Result<(), RecordError> {
        let Some(session) = lock(&self.inner.state).editing.take() else {
            return Ok(());
        };
        let mut partial = Attributes::new();
        partial.insert(session.field, Value::String(session.buffer));
        self.inner.record.save(partial).await
    }

    /// Flips a boolean field on the bound record (e.g. a done checkbox).
    pub async fn toggle(&self, field: &str) -> Result<(), RecordError> {
        self.inner.record.toggle(field).await
    }

    /// Destroys the bound record; this view detaches itself through the
    /// destroy notification.
    pub async fn clear(&self) -> Result<(), RecordError> {
        self.inner.record.clear().await
    }

    /// Removes the view from the document and releases its subscription.
    pub fn detach(&self) {
        detach_inner(&self.inner);
    }
}

fn render_into(inner: &Arc<ViewInner>, attributes: &Attributes) {
    let markup = inner.template.render(attributes);
    let mut state = lock(&inner.state);
    if state.detached {
        return;
    }
    state.markup = markup;
}

fn detach_inner(inner: &Arc<ViewInner>) {
    let subscription = {
        let mut state = lock(&inner.state);
        if state.detached {
            return;
        }
        state.detached = true;
        state.markup.clear();
        state.editing = None;
        state.subscription.take()
    };
    drop(subscription);
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
