//! Bound views: one live view per record, re-rendered on every change.
//!
//! Rendering itself is opaque to this crate: a [`Template`] turns an
//! attribute snapshot into markup. Views never hold a back-pointer from the
//! record; the one-view-per-record invariant lives in [`ViewRegistry`].

mod registry;
mod view;

pub use registry::ViewRegistry;
pub use view::BoundView;

use shared::domain::Attributes;

/// Opaque record-to-markup rendering.
pub trait Template: Send + Sync {
    fn render(&self, attributes: &Attributes) -> String;
}

#[cfg(test)]
#[path = "tests/view_tests.rs"]
mod view_tests;
