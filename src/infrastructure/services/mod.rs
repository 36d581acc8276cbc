//! Application services

mod document_service;
mod ingestion_service;

pub use document_service::{
    DEFAULT_PAGE_LIMIT, DocumentPage, DocumentService, MAX_PAGE_LIMIT, ProcessingProgress,
    StatusQuery, StatusSummary,
};
pub use ingestion_service::{
    EmailIngestionResult, IngestionService, ParseEmailCommand, RejectedAttachment,
    UploadFileCommand,
};
