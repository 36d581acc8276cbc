//! Blob storage factory for runtime backend selection

use std::path::PathBuf;
use std::sync::Arc;

use crate::domain::storage::BlobStorage;

use super::in_memory::InMemoryBlobStorage;
use super::local::LocalBlobStorage;

/// Supported blob storage backends
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BlobStorageType {
    InMemory,
    Local,
}

impl BlobStorageType {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "memory" | "inmemory" | "in-memory" | "in_memory" => Some(Self::InMemory),
            "local" | "fs" | "filesystem" => Some(Self::Local),
            _ => None,
        }
    }
}

/// Blob storage configuration
#[derive(Debug, Clone)]
pub enum BlobStorageConfig {
    InMemory,
    Local { root: PathBuf },
}

impl BlobStorageConfig {
    pub fn in_memory() -> Self {
        Self::InMemory
    }

    pub fn local(root: impl Into<PathBuf>) -> Self {
        Self::Local { root: root.into() }
    }

    pub fn storage_type(&self) -> BlobStorageType {
        match self {
            Self::InMemory => BlobStorageType::InMemory,
            Self::Local { .. } => BlobStorageType::Local,
        }
    }
}

/// Factory for creating blob storage instances
#[derive(Debug)]
pub struct BlobStorageFactory;

impl BlobStorageFactory {
    pub fn create(config: &BlobStorageConfig) -> Arc<dyn BlobStorage> {
        match config {
            BlobStorageConfig::InMemory => Arc::new(InMemoryBlobStorage::new()),
            BlobStorageConfig::Local { root } => Arc::new(LocalBlobStorage::new(root.clone())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_type_from_str() {
        assert_eq!(BlobStorageType::from_str("memory"), Some(BlobStorageType::InMemory));
        assert_eq!(BlobStorageType::from_str("In-Memory"), Some(BlobStorageType::InMemory));
        assert_eq!(BlobStorageType::from_str("local"), Some(BlobStorageType::Local));
        assert_eq!(BlobStorageType::from_str("s3"), None);
    }

    #[test]
    fn test_config_reports_type() {
        assert_eq!(
            BlobStorageConfig::local("./uploads").storage_type(),
            BlobStorageType::Local
        );
        assert_eq!(
            BlobStorageConfig::in_memory().storage_type(),
            BlobStorageType::InMemory
        );
    }
}
