//! Document lifecycle events

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::document::{Document, DocumentId, DocumentType};
use crate::domain::email::EmailMetadata;
use crate::domain::ingestion::extension_of;

/// Upload details carried by `DocumentUploaded`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadDetails {
    pub original_filename: String,
    pub file_size: u64,
    pub content_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_extension: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub tags: Vec<String>,
}

/// A document was stored and persisted
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentUploaded {
    pub document_id: DocumentId,
    pub owner_id: Uuid,
    pub filename: String,
    pub document_type: DocumentType,
    pub storage_path: String,
    pub details: UploadDetails,
    pub occurred_at: DateTime<Utc>,
}

impl DocumentUploaded {
    pub fn from_document(document: &Document) -> Self {
        Self {
            document_id: document.id(),
            owner_id: document.owner_id(),
            filename: document.filename().to_string(),
            document_type: document.document_type(),
            storage_path: document.storage_path().to_string(),
            details: UploadDetails {
                original_filename: document.original_filename().to_string(),
                file_size: document.metadata().file_size,
                content_type: document.metadata().mime_type.clone(),
                file_extension: extension_of(document.original_filename()),
                source: document.source().map(str::to_string),
                tags: document.tags().iter().map(str::to_string).collect(),
            },
            occurred_at: Utc::now(),
        }
    }
}

/// An email was split into a body document and attachment documents
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailParsed {
    pub owner_id: Uuid,
    pub main_document_id: DocumentId,
    pub attachment_document_ids: Vec<DocumentId>,
    pub email_metadata: EmailMetadata,
    pub occurred_at: DateTime<Utc>,
}

impl EmailParsed {
    pub fn new(
        owner_id: Uuid,
        main_document_id: DocumentId,
        attachment_document_ids: Vec<DocumentId>,
        email_metadata: EmailMetadata,
    ) -> Self {
        Self {
            owner_id,
            main_document_id,
            attachment_document_ids,
            email_metadata,
            occurred_at: Utc::now(),
        }
    }
}

/// A document moved to `Failed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentProcessingFailed {
    pub document_id: DocumentId,
    pub owner_id: Uuid,
    pub error_message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl DocumentProcessingFailed {
    pub fn new(document_id: DocumentId, owner_id: Uuid, error_message: impl Into<String>) -> Self {
        Self {
            document_id,
            owner_id,
            error_message: error_message.into(),
            error_code: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
        self.error_code = Some(code.into());
        self
    }
}
