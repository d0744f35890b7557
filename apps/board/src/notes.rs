use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use tokio::task::JoinHandle;
use tracing::debug;

const NOTES: &[&str] = &[
    "counting down, not counting on it",
    "the clock is a suggestion",
    "ship it before the coffee runs out",
    "one more slide, they said",
    "time flies when the demo works",
    "keep calm and check the agenda",
];

/// The rotating status note shown in the footer. Advances on a fixed
/// interval rather than by coin flip, so the full set cycles predictably.
#[derive(Clone, Default)]
pub struct StatusNote {
    index: Arc<Mutex<usize>>,
}

impl StatusNote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> &'static str {
        NOTES[*lock(&self.index) % NOTES.len()]
    }

    pub fn advance(&self) -> &'static str {
        let mut index = lock(&self.index);
        *index = (*index + 1) % NOTES.len();
        NOTES[*index]
    }
}

/// Background timer advancing the note every `interval`, in place of a
/// per-tick random draw.
pub fn spawn_rotation(note: StatusNote, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let next = note.advance();
            debug!(note = next, "rotated status note");
        }
    })
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advance_walks_the_note_list_and_wraps() {
        let note = StatusNote::new();
        let first = note.current();

        let mut seen = vec![first];
        for _ in 0..NOTES.len() - 1 {
            seen.push(note.advance());
        }
        assert_eq!(seen.len(), NOTES.len());
        assert_eq!(note.advance(), first);
    }

    #[tokio::test]
    async fn rotation_task_advances_on_the_interval() {
        tokio::time::pause();
        let note = StatusNote::new();
        let first = note.current();

        let handle = spawn_rotation(note.clone(), Duration::from_secs(10));
        // Let the task register its timer before the clock moves.
        tokio::task::yield_now().await;
        tokio::time::advance(Duration::from_secs(25)).await;
        tokio::task::yield_now().await;

        assert_ne!(note.current(), first);
        handle.abort();
    }
}
