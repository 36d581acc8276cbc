//! Local filesystem blob storage

use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use bytes::Bytes;
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use crate::domain::DomainError;
use crate::domain::ingestion::FilenameSanitizer;
use crate::domain::storage::BlobStorage;

/// Per-component limit of common filesystems, in bytes
const MAX_NAME_BYTES: usize = 255;
/// Extensions longer than this are truncated along with the stem
const MAX_KEPT_EXTENSION_BYTES: usize = 16;

/// Stores blobs under `<root>/<owner_id>/<uuid>_<filename>`
///
/// Returned paths are relative to the root.
#[derive(Debug, Clone)]
pub struct LocalBlobStorage {
    root: PathBuf,
}

impl LocalBlobStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a stored path; `None` when it would escape the root
    pub fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        let contained = relative
            .components()
            .all(|c| matches!(c, Component::Normal(_)));

        (contained && !path.is_empty()).then(|| self.root.join(relative))
    }
}

#[async_trait]
impl BlobStorage for LocalBlobStorage {
    async fn save(
        &self,
        content: Bytes,
        filename: &str,
        owner_id: Uuid,
        _content_type: Option<&str>,
    ) -> Result<String, DomainError> {
        let owner_dir = self.root.join(owner_id.to_string());
        fs::create_dir_all(&owner_dir).await.map_err(|e| {
            DomainError::storage(format!(
                "Failed to create directory '{}': {}",
                owner_dir.display(),
                e
            ))
        })?;

        let prefix = format!("{}_", Uuid::new_v4());
        let stored_name = format!(
            "{}{}",
            prefix,
            fit_name(
                &FilenameSanitizer::make_safe(filename),
                MAX_NAME_BYTES - prefix.len()
            )
        );
        let target = owner_dir.join(&stored_name);

        fs::write(&target, &content).await.map_err(|e| {
            DomainError::storage(format!("Failed to write '{}': {}", target.display(), e))
        })?;

        debug!(path = %target.display(), bytes = content.len(), "Blob written");
        Ok(format!("{}/{}", owner_id, stored_name))
    }

    async fn delete(&self, path: &str) -> Result<bool, DomainError> {
        let Some(target) = self.resolve(path) else {
            return Ok(false);
        };

        match fs::remove_file(&target).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(DomainError::storage(format!(
                "Failed to delete '{}': {}",
                target.display(),
                e
            ))),
        }
    }

    async fn exists(&self, path: &str) -> Result<bool, DomainError> {
        let Some(target) = self.resolve(path) else {
            return Ok(false);
        };

        fs::try_exists(&target).await.map_err(|e| {
            DomainError::storage(format!("Failed to stat '{}': {}", target.display(), e))
        })
    }
}

/// Shorten `name` to at most `max_bytes`, cutting the stem on a char boundary
/// and keeping a short extension
fn fit_name(name: &str, max_bytes: usize) -> String {
    if name.len() <= max_bytes {
        return name.to_string();
    }

    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 && name.len() - dot <= MAX_KEPT_EXTENSION_BYTES => name.split_at(dot),
        _ => (name, ""),
    };

    let budget = max_bytes.saturating_sub(extension.len());
    let cut = stem
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .take_while(|end| *end <= budget)
        .last()
        .unwrap_or(0);

    format!("{}{}", &stem[..cut], extension)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_save_writes_under_owner_directory() {
        let dir = TempDir::new().unwrap();
        let storage = LocalBlobStorage::new(dir.path());
        let owner = Uuid::new_v4();

        let path = storage
            .save(Bytes::from_static(b"hello"), "notes.txt", owner, None)
            .await
            .unwrap();

        assert!(path.starts_with(&owner.to_string()));
        assert!(path.ends_with("_notes.txt"));

        let written = std::fs::read(dir.path().join(&path)).unwrap();
        assert_eq!(written, b"hello");
    }

    #[tokio::test]
    async fn test_unsafe_filename_is_sanitized_on_disk() {
        let dir = TempDir::new().unwrap();
        let storage = LocalBlobStorage::new(dir.path());

        let path = storage
            .save(Bytes::from_static(b"x"), "../evil.txt", Uuid::new_v4(), None)
            .await
            .unwrap();

        assert!(!path.contains(".."));
        assert!(storage.exists(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_delete_existing_and_missing() {
        let dir = TempDir::new().unwrap();
        let storage = LocalBlobStorage::new(dir.path());

        let path = storage
            .save(Bytes::from_static(b"x"), "a.pdf", Uuid::new_v4(), None)
            .await
            .unwrap();

        assert!(storage.delete(&path).await.unwrap());
        assert!(!storage.exists(&path).await.unwrap());
        assert!(!storage.delete(&path).await.unwrap());
    }

    #[tokio::test]
    async fn test_long_filenames_fit_on_disk() {
        let dir = TempDir::new().unwrap();
        let storage = LocalBlobStorage::new(dir.path());
        let owner = Uuid::new_v4();

        let ascii = format!("{}.txt", "a".repeat(240));
        let korean = format!("{}.txt", "가".repeat(100));
        assert!(FilenameSanitizer::is_safe(&ascii));
        assert!(FilenameSanitizer::is_safe(&korean));

        for name in [ascii, korean] {
            let path = storage
                .save(Bytes::from_static(b"x"), &name, owner, None)
                .await
                .unwrap();

            let stored_name = path.rsplit('/').next().unwrap();
            assert!(stored_name.len() <= MAX_NAME_BYTES);
            assert!(stored_name.ends_with(".txt"));
            assert!(storage.exists(&path).await.unwrap());
        }
    }

    #[test]
    fn test_fit_name() {
        assert_eq!(fit_name("short.pdf", 20), "short.pdf");
        assert_eq!(fit_name("abcdefgh.pdf", 8), "abcd.pdf");
        // three-byte chars are never split
        assert_eq!(fit_name("가나다.txt", 9), "가.txt");
        assert_eq!(fit_name("noextension", 4), "noex");
    }

    #[tokio::test]
    async fn test_paths_outside_root_are_refused() {
        let dir = TempDir::new().unwrap();
        let storage = LocalBlobStorage::new(dir.path());

        assert!(!storage.delete("../outside.txt").await.unwrap());
        assert!(!storage.delete("/etc/passwd").await.unwrap());
        assert!(!storage.exists("").await.unwrap());
    }
}
