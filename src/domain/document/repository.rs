//! Document repository trait

use std::collections::HashMap;

use async_trait::async_trait;
use uuid::Uuid;

use super::{Document, DocumentId, DocumentStatus, DocumentType};
use crate::domain::error::DomainError;

#[cfg(test)]
use mockall::automock;

/// Filter for listing an owner's documents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentFilter {
    pub status: Option<DocumentStatus>,
    pub document_type: Option<DocumentType>,
}

impl DocumentFilter {
    pub fn with_status(mut self, status: DocumentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = Some(document_type);
        self
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.status.is_none_or(|s| document.status() == s)
            && self
                .document_type
                .is_none_or(|t| document.document_type() == t)
    }
}

/// Repository for document persistence
#[cfg_attr(test, automock)]
#[async_trait]
pub trait DocumentRepository: Send + Sync {
    /// Persists a new document; a duplicate id is a `Conflict`
    async fn save(&self, document: Document) -> Result<Document, DomainError>;

    /// Finds a document by ID
    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, DomainError>;

    /// Applies a status transition; returns false when the document is unknown
    async fn update_status(
        &self,
        id: DocumentId,
        status: DocumentStatus,
        error_message: Option<String>,
    ) -> Result<bool, DomainError>;

    /// Lists an owner's documents, newest first
    async fn find_by_owner(
        &self,
        owner_id: Uuid,
        filter: DocumentFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Document>, DomainError>;

    /// Counts an owner's documents matching the filter
    async fn count_by_owner(
        &self,
        owner_id: Uuid,
        filter: DocumentFilter,
    ) -> Result<usize, DomainError>;

    /// Counts an owner's documents per status; absent statuses are omitted
    async fn count_by_status(
        &self,
        owner_id: Uuid,
    ) -> Result<HashMap<DocumentStatus, usize>, DomainError>;

    /// Lists documents that reference the given parent, oldest first
    async fn find_by_parent_id(&self, parent_id: DocumentId)
        -> Result<Vec<Document>, DomainError>;

    /// Removes a document; returns false when it was absent
    async fn delete_by_id(&self, id: DocumentId) -> Result<bool, DomainError>;
}
