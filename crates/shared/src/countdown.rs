//! Countdown record type: user-created items with content, an insertion
//! sequence number, and a done flag.

use serde_json::Value;

use crate::domain::{Attributes, RecordType};

pub const NAMESPACE: &str = "countdowns";

pub const AUTHOR: &str = "author";
pub const CONTENT: &str = "content";
pub const DONE: &str = "done";
pub const ORDER: &str = "order";

pub const EMPTY_CONTENT: &str = "empty countdown...";

static COUNTDOWN: RecordType = RecordType {
    name: "countdown",
    namespace: NAMESPACE,
    defaults: default_attributes,
    fallback_fields: &[CONTENT],
    sequence_field: Some(ORDER),
};

pub fn record_type() -> &'static RecordType {
    &COUNTDOWN
}

fn default_attributes() -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(AUTHOR.to_string(), Value::String(String::new()));
    attributes.insert(CONTENT.to_string(), Value::String(EMPTY_CONTENT.to_string()));
    attributes.insert(DONE.to_string(), Value::Bool(false));
    attributes
}
