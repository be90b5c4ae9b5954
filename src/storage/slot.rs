use super::profile::StorageArea;
use crate::error::StorageError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::marker::PhantomData;
use tracing::warn;

/// A typed JSON value persisted under a fixed key.
pub struct PersistedSlot<T> {
    key: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> PersistedSlot<T>
where
    T: Serialize + DeserializeOwned,
{
    pub const fn new(key: &'static str) -> Self {
        Self {
            key,
            _marker: PhantomData,
        }
    }

    pub fn key(&self) -> &'static str {
        self.key
    }

    pub fn parse(&self, raw: &str) -> Result<T, StorageError> {
        serde_json::from_str(raw).map_err(|e| StorageError::MalformedPersistedState {
            key: self.key.to_string(),
            reason: e.to_string(),
        })
    }

    pub async fn load(&self, area: &StorageArea) -> Result<Option<T>, StorageError> {
        match area.get(self.key).await? {
            Some(raw) => self.parse(&raw).map(Some),
            None => Ok(None),
        }
    }

    /// Like [`load`](Self::load), but a malformed blob is discarded and
    /// reported as absent. Backend faults still propagate.
    pub async fn load_or_reset(&self, area: &StorageArea) -> Result<Option<T>, StorageError> {
        match self.load(area).await {
            Err(StorageError::MalformedPersistedState { key, reason }) => {
                warn!("Discarding malformed '{}': {}", key, reason);
                area.remove(self.key).await?;
                Ok(None)
            }
            other => other,
        }
    }

    pub async fn store(&self, area: &StorageArea, value: &T) -> Result<(), StorageError> {
        let raw = serde_json::to_string(value)?;
        area.set(self.key, &raw).await
    }

    pub async fn clear(&self, area: &StorageArea) -> Result<(), StorageError> {
        area.remove(self.key).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Profile;

    const NUMBERS: PersistedSlot<Vec<u32>> = PersistedSlot::new("numbers");

    #[tokio::test]
    async fn test_store_and_load() {
        let area = Profile::in_memory().open_tab();
        assert_eq!(NUMBERS.load(&area).await.unwrap(), None);

        NUMBERS.store(&area, &vec![1, 2, 3]).await.unwrap();
        assert_eq!(area.get("numbers").await.unwrap().as_deref(), Some("[1,2,3]"));
        assert_eq!(NUMBERS.load(&area).await.unwrap(), Some(vec![1, 2, 3]));

        NUMBERS.clear(&area).await.unwrap();
        assert_eq!(NUMBERS.load(&area).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_malformed_blob_is_reset() {
        let area = Profile::in_memory().open_tab();
        area.set("numbers", "[1, 2,").await.unwrap();

        let err = NUMBERS.load(&area).await.unwrap_err();
        assert!(matches!(err, StorageError::MalformedPersistedState { ref key, .. } if key == "numbers"));

        assert_eq!(NUMBERS.load_or_reset(&area).await.unwrap(), None);
        assert_eq!(area.get("numbers").await.unwrap(), None);
    }
}
