//! Session record type: read-only agenda entries for one conference day.
//!
//! Attribute keys mirror the external agenda document's field names so a
//! persisted session round-trips byte-for-byte against the ingested JSON.

use serde_json::Value;

use crate::domain::{Attributes, RecordType};

pub const NAMESPACE: &str = "sessions";

pub const ON_DAY: &str = "onDay";
pub const STARTS_AT: &str = "startsAt";
pub const IN_ROOM: &str = "inRoom";
pub const IS_THIS_ROOM: &str = "isThisRoom";
pub const SPEAKER: &str = "speaker";
pub const TOPIC: &str = "topic";

static SESSION: RecordType = RecordType {
    name: "session",
    namespace: NAMESPACE,
    defaults: default_attributes,
    fallback_fields: &[IS_THIS_ROOM],
    sequence_field: None,
};

pub fn record_type() -> &'static RecordType {
    &SESSION
}

fn default_attributes() -> Attributes {
    let mut attributes = Attributes::new();
    attributes.insert(ON_DAY.to_string(), Value::String(String::new()));
    attributes.insert(STARTS_AT.to_string(), Value::String(String::new()));
    attributes.insert(IN_ROOM.to_string(), Value::String(String::new()));
    attributes.insert(IS_THIS_ROOM.to_string(), Value::Bool(false));
    attributes.insert(SPEAKER.to_string(), Value::String(String::new()));
    attributes.insert(TOPIC.to_string(), Value::String(String::new()));
    attributes
}
