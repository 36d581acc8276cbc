//! Storage domain - blob storage abstraction

mod blob;

pub use blob::BlobStorage;

#[cfg(test)]
pub use blob::mock;
