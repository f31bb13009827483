use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;

use crate::protocol::Event;

const NOTIFY_CAPACITY: usize = 256;

/// Append-only transcript shared between pipeline runs and the observer
/// that renders them. Cloning yields another handle to the same log.
///
/// `append` and `snapshot` go through one mutex, so a snapshot is a stable
/// copy even when runs append from another task.
#[derive(Clone)]
pub struct EventSink {
    events: Arc<Mutex<Vec<Event>>>,
    notify: broadcast::Sender<Event>,
}

impl EventSink {
    pub fn new() -> Self {
        let (notify, _) = broadcast::channel(NOTIFY_CAPACITY);
        Self {
            events: Arc::new(Mutex::new(Vec::new())),
            notify,
        }
    }

    /// Synchronous; safe to call from inside a running task.
    pub fn append(&self, event: Event) {
        let mut events = self.lock();
        events.push(event.clone());
        // Send while holding the lock so subscribers see sink order.
        let _ = self.notify.send(event);
    }

    pub fn snapshot(&self) -> Vec<Event> {
        self.lock().clone()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Receive each event as it is appended. Lagging receivers can fall
    /// back to `snapshot`.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.notify.subscribe()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Event>> {
        // A panic mid-push cannot leave a half-written Vec, so keep going.
        self.events.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for EventSink {
    fn default() -> Self {
        Self::new()
    }
}
