//! Document entity and its processing-status lifecycle

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::error::LifecycleError;
use super::metadata::DocumentMetadata;
use super::tags::TagSet;

/// Opaque document identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(Uuid);

impl DocumentId {
    /// Generate a fresh random identifier
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for DocumentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Processing status of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStatus {
    #[default]
    Uploaded,
    Parsing,
    Parsed,
    Processing,
    /// Terminal success
    Processed,
    /// Failure, may be re-entered and retried
    Failed,
    /// Terminal, only reachable through deletion
    Deleted,
}

impl DocumentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uploaded => "uploaded",
            Self::Parsing => "parsing",
            Self::Parsed => "parsed",
            Self::Processing => "processing",
            Self::Processed => "processed",
            Self::Failed => "failed",
            Self::Deleted => "deleted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Processed | Self::Deleted)
    }

    /// A document may (re)enter processing from these states
    pub fn can_be_processed(&self) -> bool {
        matches!(self, Self::Uploaded | Self::Parsed | Self::Failed)
    }

    /// Coarse completion estimate shown to callers polling a document
    pub fn progress_percentage(&self) -> u8 {
        match self {
            Self::Uploaded => 10,
            Self::Parsing => 30,
            Self::Parsed => 50,
            Self::Processing => 80,
            Self::Processed => 100,
            Self::Failed | Self::Deleted => 0,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Uploaded => "Document uploaded, waiting to be parsed",
            Self::Parsing => "Extracting content from the document",
            Self::Parsed => "Content extracted, waiting for processing",
            Self::Processing => "Processing document content",
            Self::Processed => "Document processed successfully",
            Self::Failed => "Document processing failed",
            Self::Deleted => "Document has been deleted",
        }
    }
}

impl fmt::Display for DocumentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Closed classification of ingested documents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentType {
    Pdf,
    Docx,
    Doc,
    Txt,
    Email,
    Html,
    #[serde(rename = "md")]
    Markdown,
    Pptx,
    Ppt,
    Xlsx,
    Xls,
    Csv,
    Unknown,
}

impl DocumentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Docx => "docx",
            Self::Doc => "doc",
            Self::Txt => "txt",
            Self::Email => "email",
            Self::Html => "html",
            Self::Markdown => "md",
            Self::Pptx => "pptx",
            Self::Ppt => "ppt",
            Self::Xlsx => "xlsx",
            Self::Xls => "xls",
            Self::Csv => "csv",
            Self::Unknown => "unknown",
        }
    }

    /// Map a lower-case extension (without the dot) to a document type
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Self::Pdf),
            "docx" | "doc" => Some(Self::Docx),
            "txt" | "md" => Some(Self::Txt),
            "eml" | "msg" => Some(Self::Email),
            "html" | "htm" => Some(Self::Html),
            "pptx" => Some(Self::Pptx),
            "ppt" => Some(Self::Ppt),
            "xlsx" => Some(Self::Xlsx),
            "xls" => Some(Self::Xls),
            "csv" => Some(Self::Csv),
            _ => None,
        }
    }

    /// Canonical MIME type for the type
    pub fn canonical_mime_type(&self) -> &'static str {
        match self {
            Self::Pdf => "application/pdf",
            Self::Docx => {
                "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
            }
            Self::Doc => "application/msword",
            Self::Txt => "text/plain",
            Self::Email => "message/rfc822",
            Self::Html => "text/html",
            Self::Markdown => "text/markdown",
            Self::Pptx => {
                "application/vnd.openxmlformats-officedocument.presentationml.presentation"
            }
            Self::Ppt => "application/vnd.ms-powerpoint",
            Self::Xlsx => "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
            Self::Xls => "application/vnd.ms-excel",
            Self::Csv => "text/csv",
            Self::Unknown => "application/octet-stream",
        }
    }

    /// Types stored inside a ZIP container
    pub fn is_ooxml(&self) -> bool {
        matches!(self, Self::Docx | Self::Pptx | Self::Xlsx)
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameters for [`Document::create`]
#[derive(Debug, Clone)]
pub struct NewDocument {
    pub owner_id: Uuid,
    pub filename: String,
    pub original_filename: String,
    pub storage_path: String,
    pub document_type: DocumentType,
    pub metadata: DocumentMetadata,
    pub tags: TagSet,
    pub source: Option<String>,
    pub parent_id: Option<DocumentId>,
}

/// A unit of ingested content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    id: DocumentId,
    owner_id: Uuid,
    filename: String,
    original_filename: String,
    storage_path: String,
    document_type: DocumentType,
    status: DocumentStatus,
    metadata: DocumentMetadata,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    processed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    error_message: Option<String>,
    #[serde(default)]
    tags: TagSet,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    parent_id: Option<DocumentId>,
}

impl Document {
    /// Create a new document in the `Uploaded` state
    pub fn create(new: NewDocument) -> Self {
        let now = Utc::now();

        Self {
            id: DocumentId::generate(),
            owner_id: new.owner_id,
            filename: new.filename,
            original_filename: new.original_filename,
            storage_path: new.storage_path,
            document_type: new.document_type,
            status: DocumentStatus::Uploaded,
            metadata: new.metadata,
            created_at: now,
            updated_at: now,
            processed_at: None,
            error_message: None,
            tags: new.tags,
            source: new.source,
            parent_id: new.parent_id,
        }
    }

    // Getters

    pub fn id(&self) -> DocumentId {
        self.id
    }

    pub fn owner_id(&self) -> Uuid {
        self.owner_id
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn original_filename(&self) -> &str {
        &self.original_filename
    }

    pub fn storage_path(&self) -> &str {
        &self.storage_path
    }

    pub fn document_type(&self) -> DocumentType {
        self.document_type
    }

    pub fn status(&self) -> DocumentStatus {
        self.status
    }

    pub fn metadata(&self) -> &DocumentMetadata {
        &self.metadata
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub fn processed_at(&self) -> Option<DateTime<Utc>> {
        self.processed_at
    }

    pub fn error_message(&self) -> Option<&str> {
        self.error_message.as_deref()
    }

    pub fn tags(&self) -> &TagSet {
        &self.tags
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    pub fn parent_id(&self) -> Option<DocumentId> {
        self.parent_id
    }

    pub fn is_processed(&self) -> bool {
        self.status == DocumentStatus::Processed
    }

    pub fn is_failed(&self) -> bool {
        self.status == DocumentStatus::Failed
    }

    pub fn can_be_processed(&self) -> bool {
        self.status.can_be_processed()
    }

    /// Move to a new non-deleted status.
    ///
    /// A supplied error message is stored; without one the message is kept only
    /// when the target is `Failed`. `processed_at` is stamped on every move to
    /// `Processed` and never cleared.
    pub fn transition_status(
        &mut self,
        status: DocumentStatus,
        error_message: Option<String>,
    ) -> Result<(), LifecycleError> {
        if self.status == DocumentStatus::Deleted {
            return Err(LifecycleError::DocumentDeleted { id: self.id });
        }

        if status == DocumentStatus::Deleted {
            return Err(LifecycleError::DeletionNotAllowed { id: self.id });
        }

        self.status = status;
        self.updated_at = Utc::now();

        if status == DocumentStatus::Processed {
            self.processed_at = Some(self.updated_at);
        }

        match error_message {
            Some(message) => self.error_message = Some(message),
            None if status != DocumentStatus::Failed => self.error_message = None,
            None => {}
        }

        Ok(())
    }

    /// Enter the terminal `Deleted` state
    pub fn mark_deleted(&mut self) {
        self.status = DocumentStatus::Deleted;
        self.updated_at = Utc::now();
    }

    /// Add a tag; returns false when it was already present
    pub fn add_tag(&mut self, tag: impl Into<String>) -> bool {
        let added = self.tags.insert(tag);
        if added {
            self.updated_at = Utc::now();
        }
        added
    }

    /// Remove a tag; returns false when it was absent
    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let removed = self.tags.remove(tag);
        if removed {
            self.updated_at = Utc::now();
        }
        removed
    }

    /// Replace the metadata value object
    pub fn update_metadata(&mut self, metadata: DocumentMetadata) {
        self.metadata = metadata;
        self.updated_at = Utc::now();
    }
}
