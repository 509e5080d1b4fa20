use std::sync::Arc;

use async_trait::async_trait;
use shared::domain::{StatePatch, StateSnapshot};
use tokio::sync::{broadcast, RwLock};
use tracing::info;

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    Fetch,
    Realtime,
}

#[derive(Debug, Clone)]
pub enum ClientEvent {
    SnapshotApplied { revision: u64, origin: Origin },
    Error(String),
    Disconnected,
}

#[async_trait]
pub trait StateSource: Send + Sync {
    async fn fetch_state(&self) -> Result<StateSnapshot, ClientError>;
}

struct Versioned {
    snapshot: Arc<StateSnapshot>,
    revision: u64,
}

/// Holds the latest state the page knows about.
///
/// Whatever is applied last wins, whether it came from a fetch or a push. A
/// slow fetch that completes after a newer push will overwrite it; callers that
/// care must refetch.
pub struct SnapshotStore {
    inner: RwLock<Versioned>,
    events: broadcast::Sender<ClientEvent>,
}

impl Default for SnapshotStore {
    fn default() -> Self {
        Self::new(StateSnapshot::default())
    }
}

impl SnapshotStore {
    pub fn new(initial: StateSnapshot) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            inner: RwLock::new(Versioned {
                snapshot: Arc::new(initial),
                revision: 0,
            }),
            events,
        }
    }

    pub async fn current(&self) -> Arc<StateSnapshot> {
        Arc::clone(&self.inner.read().await.snapshot)
    }

    pub async fn revision(&self) -> u64 {
        self.inner.read().await.revision
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.events.subscribe()
    }

    pub async fn replace(&self, snapshot: StateSnapshot, origin: Origin) -> Arc<StateSnapshot> {
        let snapshot = Arc::new(snapshot);
        let revision = {
            let mut guard = self.inner.write().await;
            guard.snapshot = Arc::clone(&snapshot);
            guard.revision += 1;
            guard.revision
        };
        self.announce(revision, origin, &snapshot);
        snapshot
    }

    pub async fn apply_patch(&self, patch: StatePatch, origin: Origin) -> Arc<StateSnapshot> {
        let (snapshot, revision) = {
            let mut guard = self.inner.write().await;
            let next = Arc::new(guard.snapshot.merged(patch));
            guard.snapshot = Arc::clone(&next);
            guard.revision += 1;
            (next, guard.revision)
        };
        self.announce(revision, origin, &snapshot);
        snapshot
    }

    pub async fn refresh(&self, source: &dyn StateSource) -> Result<Arc<StateSnapshot>, ClientError> {
        match source.fetch_state().await {
            Ok(snapshot) => Ok(self.replace(snapshot, Origin::Fetch).await),
            Err(err) => {
                self.report_error(err.to_string());
                Err(err)
            }
        }
    }

    pub fn report_error(&self, message: impl Into<String>) {
        let _ = self.events.send(ClientEvent::Error(message.into()));
    }

    pub fn report_disconnected(&self) {
        let _ = self.events.send(ClientEvent::Disconnected);
    }

    fn announce(&self, revision: u64, origin: Origin, snapshot: &StateSnapshot) {
        info!(
            revision,
            ?origin,
            participants = snapshot.participants.len(),
            scores = snapshot.scores.len(),
            "snapshot applied"
        );
        let _ = self
            .events
            .send(ClientEvent::SnapshotApplied { revision, origin });
    }
}
