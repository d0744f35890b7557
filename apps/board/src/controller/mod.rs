//! Wiring between collections, view registries, and the rendered board:
//! one controller per pane, each owning its collection subscription.

mod countdown;
mod session;

pub use countdown::{CountdownBoard, Stats};
pub use session::SessionBoard;
