//! In-memory blob storage implementation

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::domain::DomainError;
use crate::domain::storage::BlobStorage;

/// A stored blob with the content type it was saved with
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub content: Bytes,
    pub content_type: Option<String>,
}

/// Thread-safe in-memory blob storage
///
/// Useful for testing and development. Data is lost when the process terminates.
#[derive(Debug, Default)]
pub struct InMemoryBlobStorage {
    blobs: RwLock<HashMap<String, StoredBlob>>,
}

impl InMemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Result<Option<StoredBlob>, DomainError> {
        let blobs = self.blobs.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(blobs.get(path).cloned())
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl BlobStorage for InMemoryBlobStorage {
    async fn save(
        &self,
        content: Bytes,
        filename: &str,
        owner_id: Uuid,
        content_type: Option<&str>,
    ) -> Result<String, DomainError> {
        let path = format!("memory://{}/{}_{}", owner_id, Uuid::new_v4(), filename);
        let mut blobs = self.blobs.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        blobs.insert(
            path.clone(),
            StoredBlob {
                content,
                content_type: content_type.map(str::to_string),
            },
        );
        Ok(path)
    }

    async fn delete(&self, path: &str) -> Result<bool, DomainError> {
        let mut blobs = self.blobs.write().map_err(|e| {
            DomainError::storage(format!("Failed to acquire write lock: {}", e))
        })?;

        Ok(blobs.remove(path).is_some())
    }

    async fn exists(&self, path: &str) -> Result<bool, DomainError> {
        let blobs = self.blobs.read().map_err(|e| {
            DomainError::storage(format!("Failed to acquire read lock: {}", e))
        })?;

        Ok(blobs.contains_key(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_save_and_get() {
        let storage = InMemoryBlobStorage::new();
        let owner = Uuid::new_v4();

        let path = storage
            .save(Bytes::from_static(b"hello"), "a.txt", owner, Some("text/plain"))
            .await
            .unwrap();

        assert!(path.contains(&owner.to_string()));
        assert!(path.ends_with("_a.txt"));

        let blob = storage.get(&path).unwrap().unwrap();
        assert_eq!(blob.content, Bytes::from_static(b"hello"));
        assert_eq!(blob.content_type.as_deref(), Some("text/plain"));
    }

    #[tokio::test]
    async fn test_same_filename_gets_distinct_paths() {
        let storage = InMemoryBlobStorage::new();
        let owner = Uuid::new_v4();

        let first = storage.save(Bytes::from_static(b"1"), "a.txt", owner, None).await.unwrap();
        let second = storage.save(Bytes::from_static(b"2"), "a.txt", owner, None).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(storage.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let storage = InMemoryBlobStorage::new();
        let path = storage
            .save(Bytes::from_static(b"x"), "a.txt", Uuid::new_v4(), None)
            .await
            .unwrap();

        assert!(storage.exists(&path).await.unwrap());
        assert!(storage.delete(&path).await.unwrap());
        assert!(!storage.delete(&path).await.unwrap());
        assert!(!storage.delete("memory://unknown").await.unwrap());
        assert!(storage.is_empty());
    }
}
