//! Document domain - the ingested-content entity and its lifecycle

mod entity;
mod error;
mod metadata;
mod repository;
mod tags;

pub use entity::{Document, DocumentId, DocumentStatus, DocumentType, NewDocument};
pub use error::LifecycleError;
pub use metadata::DocumentMetadata;
pub use repository::{DocumentFilter, DocumentRepository};
pub use tags::TagSet;

#[cfg(test)]
pub use repository::MockDocumentRepository;
