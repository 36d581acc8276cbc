//! Domain layer - documents, ingestion rules, email model and collaborator contracts

pub mod document;
pub mod email;
pub mod error;
pub mod events;
pub mod ingestion;
pub mod storage;

pub use document::{
    Document, DocumentFilter, DocumentId, DocumentMetadata, DocumentRepository, DocumentStatus,
    DocumentType, LifecycleError, NewDocument, TagSet,
};
pub use email::{
    EmailAttachment, EmailMetadata, EmailParser, ParseFailure, ParsedEmail, SkippedAttachment,
};
pub use error::DomainError;
pub use events::{DocumentProcessingFailed, DocumentUploaded, EmailParsed, EventPublisher};
pub use ingestion::{
    FileValidator, FilenamePolicy, FilenameSanitizer, FormatSniffer, IngestError,
    IngestionConfig, ValidationFailure,
};
pub use storage::BlobStorage;
