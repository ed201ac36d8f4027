use tokio::sync::broadcast;

use banter_types::events::ForumEvent;

/// Fan-out of moderation events to every connected event-stream client.
#[derive(Clone)]
pub struct Dispatcher {
    broadcast_tx: broadcast::Sender<ForumEvent>,
}

impl Dispatcher {
    pub fn new() -> Self {
        let (broadcast_tx, _) = broadcast::channel(1024);
        Self { broadcast_tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ForumEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Send to all subscribers. A send with no listeners is not an error.
    pub fn broadcast(&self, event: ForumEvent) {
        let _ = self.broadcast_tx.send(event);
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}
