//! Storage infrastructure - blob storage implementations

mod factory;
mod in_memory;
mod local;

pub use factory::{BlobStorageConfig, BlobStorageFactory, BlobStorageType};
pub use in_memory::{InMemoryBlobStorage, StoredBlob};
pub use local::LocalBlobStorage;
