use super::backend::{MemoryBackend, StorageBackend};
use crate::error::StorageError;
use std::sync::Arc;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

const EVENT_CAPACITY: usize = 64;

pub type TabId = Uuid;

/// A write observed on the shared profile.
///
/// `key` is `None` when the whole profile was cleared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageEvent {
    pub key: Option<String>,
    pub new_value: Option<String>,
    pub origin: TabId,
}

/// Persisted storage shared by every tab of one profile.
#[derive(Clone)]
pub struct Profile {
    backend: Arc<dyn StorageBackend>,
    events: broadcast::Sender<StorageEvent>,
    write_lock: Arc<Mutex<()>>,
}

impl Profile {
    pub fn new(backend: Arc<dyn StorageBackend>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            backend,
            events,
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryBackend::new()))
    }

    pub fn open_tab(&self) -> StorageArea {
        let tab_id = Uuid::new_v4();
        debug!("Opened storage area for tab {}", tab_id);
        StorageArea {
            tab_id,
            profile: self.clone(),
        }
    }
}

/// One tab's handle on a [`Profile`].
#[derive(Clone)]
pub struct StorageArea {
    tab_id: TabId,
    profile: Profile,
}

impl StorageArea {
    pub fn tab_id(&self) -> TabId {
        self.tab_id
    }

    pub async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        self.profile.backend.get(key).await
    }

    pub async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.profile.backend.set(key, value).await?;
        self.announce(Some(key), Some(value));
        Ok(())
    }

    pub async fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.profile.backend.remove(key).await?;
        self.announce(Some(key), None);
        Ok(())
    }

    pub async fn clear(&self) -> Result<(), StorageError> {
        self.profile.backend.clear().await?;
        self.announce(None, None);
        Ok(())
    }

    /// Serializes read-modify-write sequences across every tab of the profile.
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.profile.write_lock.lock().await
    }

    /// Events caused by the other tabs of this profile.
    pub fn subscribe(&self) -> StorageEvents {
        StorageEvents {
            tab_id: self.tab_id,
            rx: self.profile.events.subscribe(),
        }
    }

    fn announce(&self, key: Option<&str>, new_value: Option<&str>) {
        let event = StorageEvent {
            key: key.map(str::to_string),
            new_value: new_value.map(str::to_string),
            origin: self.tab_id,
        };
        // No subscribers is fine
        let _ = self.profile.events.send(event);
    }
}

pub struct StorageEvents {
    tab_id: TabId,
    rx: broadcast::Receiver<StorageEvent>,
}

impl StorageEvents {
    /// Next event written by another tab. Own writes are skipped.
    pub async fn recv(&mut self) -> Result<StorageEvent, RecvError> {
        loop {
            let event = self.rx.recv().await?;
            if event.origin != self.tab_id {
                return Ok(event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_events_skip_own_writes() {
        let profile = Profile::in_memory();
        let first = profile.open_tab();
        let second = profile.open_tab();
        let mut first_events = first.subscribe();
        let mut second_events = second.subscribe();

        first.set("user", "{\"id\":\"a\"}").await.unwrap();

        let event = second_events.recv().await.unwrap();
        assert_eq!(event.key.as_deref(), Some("user"));
        assert_eq!(event.new_value.as_deref(), Some("{\"id\":\"a\"}"));
        assert_eq!(event.origin, first.tab_id());

        let own = tokio::time::timeout(Duration::from_millis(50), first_events.recv()).await;
        assert!(own.is_err(), "a tab must not observe its own writes");
    }

    #[tokio::test]
    async fn test_remove_and_clear_events() {
        let profile = Profile::in_memory();
        let writer = profile.open_tab();
        let mut events = profile.open_tab().subscribe();

        writer.set("user", "{}").await.unwrap();
        writer.remove("user").await.unwrap();
        writer.clear().await.unwrap();

        assert_eq!(events.recv().await.unwrap().new_value.as_deref(), Some("{}"));

        let removed = events.recv().await.unwrap();
        assert_eq!(removed.key.as_deref(), Some("user"));
        assert_eq!(removed.new_value, None);

        let cleared = events.recv().await.unwrap();
        assert_eq!(cleared.key, None);
    }

    #[tokio::test]
    async fn test_tabs_share_backend() {
        let profile = Profile::in_memory();
        let first = profile.open_tab();
        let second = profile.open_tab();

        first.set("users", "[]").await.unwrap();
        assert_eq!(second.get("users").await.unwrap().as_deref(), Some("[]"));
        assert_ne!(first.tab_id(), second.tab_id());
    }
}
