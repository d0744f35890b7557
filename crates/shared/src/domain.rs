use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stable record identity, assigned once at creation and never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(pub Uuid);

impl RecordId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for RecordId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Open attribute bag of a record: field name to JSON scalar.
pub type Attributes = serde_json::Map<String, Value>;

/// Static description of one record type: its storage namespace, default
/// attribute set, and the fields that are force-filled when falsy.
pub struct RecordType {
    pub name: &'static str,
    pub namespace: &'static str,
    pub defaults: fn() -> Attributes,
    /// Fields re-filled from defaults when their value is falsy, not merely
    /// absent. This also replaces a legitimately empty user-entered value;
    /// callers relying on empty values must not list the field here.
    pub fallback_fields: &'static [&'static str],
    /// Field carrying the insertion sequence number, when the collection is
    /// sequence-ordered.
    pub sequence_field: Option<&'static str>,
}

/// Loose falsiness: null, false, zero, and the empty string.
pub fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f == 0.0),
        Value::String(s) => s.is_empty(),
        Value::Array(_) | Value::Object(_) => false,
    }
}

/// Converts a `serde_json::json!({..})` object literal into an attribute bag.
/// Non-object values yield an empty bag.
pub fn object(value: Value) -> Attributes {
    match value {
        Value::Object(map) => map,
        _ => Attributes::new(),
    }
}
