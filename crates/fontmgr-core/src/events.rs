use std::path::PathBuf;

use fontmgr_types::InstallStatus;
use tokio::sync::broadcast;
use tracing::trace;

const EVENT_CAPACITY: usize = 256;

/// Observable change in a font's state or in the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FontEvent {
    StatusChanged { family: String, status: InstallStatus },
    PreviewReady { family: String, path: PathBuf },
    FavoriteChanged { family: String, favorite: bool },
    CatalogRefreshed { count: usize },
}

impl FontEvent {
    pub fn family(&self) -> Option<&str> {
        match self {
            FontEvent::StatusChanged { family, .. }
            | FontEvent::PreviewReady { family, .. }
            | FontEvent::FavoriteChanged { family, .. } => Some(family),
            FontEvent::CatalogRefreshed { .. } => None,
        }
    }
}

/// Fan-out of [`FontEvent`]s to any number of subscribers.
///
/// Events are published right after the mutation they describe, from the
/// task that made it. A subscriber that falls more than the channel capacity
/// behind sees `RecvError::Lagged` and skips ahead.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<FontEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(EVENT_CAPACITY);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FontEvent> {
        self.tx.subscribe()
    }

    pub fn publish(&self, event: FontEvent) {
        trace!(?event, "publish");
        // No subscribers is fine.
        let _ = self.tx.send(event);
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
