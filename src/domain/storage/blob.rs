//! Blob storage contract

use std::fmt::Debug;

use async_trait::async_trait;
use bytes::Bytes;
use uuid::Uuid;

use crate::domain::DomainError;

/// Stores raw file content and hands back an opaque path
#[async_trait]
pub trait BlobStorage: Send + Sync + Debug {
    /// Persists the content and returns its storage path
    async fn save(
        &self,
        content: Bytes,
        filename: &str,
        owner_id: Uuid,
        content_type: Option<&str>,
    ) -> Result<String, DomainError>;

    /// Removes a blob; an unknown path yields `Ok(false)`
    async fn delete(&self, path: &str) -> Result<bool, DomainError>;

    async fn exists(&self, path: &str) -> Result<bool, DomainError>;
}

#[cfg(test)]
pub mod mock {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Mock blob storage for testing
    #[derive(Debug, Default)]
    pub struct MockBlobStorage {
        blobs: Mutex<HashMap<String, Bytes>>,
        deleted: Mutex<Vec<String>>,
        save_error: Mutex<Option<String>>,
        delete_error: Mutex<Option<String>>,
    }

    impl MockBlobStorage {
        pub fn new() -> Self {
            Self::default()
        }

        /// Every `save` fails with the given message
        pub fn with_error(self, error: impl Into<String>) -> Self {
            *self.save_error.lock().unwrap() = Some(error.into());
            self
        }

        /// Every `delete` fails with the given message
        pub fn with_delete_error(self, error: impl Into<String>) -> Self {
            *self.delete_error.lock().unwrap() = Some(error.into());
            self
        }

        pub fn stored_paths(&self) -> Vec<String> {
            let mut paths: Vec<String> = self.blobs.lock().unwrap().keys().cloned().collect();
            paths.sort();
            paths
        }

        pub fn deleted_paths(&self) -> Vec<String> {
            self.deleted.lock().unwrap().clone()
        }

        pub fn content(&self, path: &str) -> Option<Bytes> {
            self.blobs.lock().unwrap().get(path).cloned()
        }
    }

    #[async_trait]
    impl BlobStorage for MockBlobStorage {
        async fn save(
            &self,
            content: Bytes,
            filename: &str,
            owner_id: Uuid,
            _content_type: Option<&str>,
        ) -> Result<String, DomainError> {
            if let Some(error) = self.save_error.lock().unwrap().clone() {
                return Err(DomainError::storage(error));
            }

            let path = format!("{}/{}_{}", owner_id, Uuid::new_v4(), filename);
            self.blobs.lock().unwrap().insert(path.clone(), content);
            Ok(path)
        }

        async fn delete(&self, path: &str) -> Result<bool, DomainError> {
            self.deleted.lock().unwrap().push(path.to_string());

            if let Some(error) = self.delete_error.lock().unwrap().clone() {
                return Err(DomainError::storage(error));
            }

            Ok(self.blobs.lock().unwrap().remove(path).is_some())
        }

        async fn exists(&self, path: &str) -> Result<bool, DomainError> {
            Ok(self.blobs.lock().unwrap().contains_key(path))
        }
    }
}
