//! Observable records and ordered collections with write-through persistence.
//!
//! A [`Record`] is a mutable attribute bag that persists every mutation
//! before notifying subscribers. A [`Collection`] owns a set of records of
//! one type, keeps them sorted by a pluggable comparator key, and fans out
//! aggregate events. Subscriptions are owned tokens released on drop, so a
//! destroyed record never leaves a dangling subscription behind.

pub mod collection;
pub mod events;
pub mod record;

pub use collection::{Collection, CollectionEvent, OrderKey};
pub use events::{Emitter, Subscription};
pub use record::{Record, RecordError, RecordEvent};

#[cfg(test)]
#[path = "tests/record_tests.rs"]
mod record_tests;

#[cfg(test)]
#[path = "tests/collection_tests.rs"]
mod collection_tests;
