//! Document service - status queries, transitions and deletion

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::domain::DomainError;
use crate::domain::document::{
    Document, DocumentFilter, DocumentId, DocumentRepository, DocumentStatus, DocumentType,
};
use crate::domain::events::{DocumentProcessingFailed, EventPublisher};
use crate::domain::storage::BlobStorage;

pub const DEFAULT_PAGE_LIMIT: usize = 50;
pub const MAX_PAGE_LIMIT: usize = 1000;

const RECENT_DOCUMENTS_LIMIT: usize = 10;
const IN_FLIGHT_DOCUMENTS_LIMIT: usize = 50;
const FAILED_DOCUMENTS_LIMIT: usize = 20;

/// Paged listing of an owner's documents
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusQuery {
    pub owner_id: Uuid,
    pub status: Option<DocumentStatus>,
    pub document_type: Option<DocumentType>,
    pub limit: usize,
    pub offset: usize,
}

impl StatusQuery {
    pub fn new(owner_id: Uuid) -> Self {
        Self {
            owner_id,
            status: None,
            document_type: None,
            limit: DEFAULT_PAGE_LIMIT,
            offset: 0,
        }
    }

    pub fn with_status(mut self, status: DocumentStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_document_type(mut self, document_type: DocumentType) -> Self {
        self.document_type = Some(document_type);
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    fn filter(&self) -> DocumentFilter {
        DocumentFilter {
            status: self.status,
            document_type: self.document_type,
        }
    }
}

/// One page of documents
#[derive(Debug, Clone, Serialize)]
pub struct DocumentPage {
    pub documents: Vec<Document>,
    pub total: usize,
    pub has_more: bool,
}

/// Overview of an owner's documents grouped by lifecycle state
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub owner_id: Uuid,
    pub total_documents: usize,
    pub status_counts: HashMap<DocumentStatus, usize>,
    /// Newest documents first
    pub recent_documents: Vec<Document>,
    /// Documents currently parsing or processing
    pub processing_documents: Vec<Document>,
    /// Most recently failed first
    pub failed_documents: Vec<Document>,
}

/// Progress of a single document through the pipeline
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessingProgress {
    pub document_id: DocumentId,
    pub filename: String,
    pub status: DocumentStatus,
    pub progress_percentage: u8,
    pub status_message: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub processed_at: Option<DateTime<Utc>>,
    pub is_completed: bool,
    pub is_failed: bool,
    pub error_message: Option<String>,
}

impl From<&Document> for ProcessingProgress {
    fn from(document: &Document) -> Self {
        let status = document.status();
        Self {
            document_id: document.id(),
            filename: document.filename().to_string(),
            status,
            progress_percentage: status.progress_percentage(),
            status_message: status.description().to_string(),
            created_at: document.created_at(),
            updated_at: document.updated_at(),
            processed_at: document.processed_at(),
            is_completed: status == DocumentStatus::Processed,
            is_failed: status == DocumentStatus::Failed,
            error_message: document.error_message().map(str::to_string),
        }
    }
}

/// Read and lifecycle operations over stored documents
pub struct DocumentService {
    repository: Arc<dyn DocumentRepository>,
    storage: Arc<dyn BlobStorage>,
    events: Arc<dyn EventPublisher>,
}

impl std::fmt::Debug for DocumentService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DocumentService")
            .field("storage", &self.storage)
            .finish()
    }
}

impl DocumentService {
    pub fn new(
        repository: Arc<dyn DocumentRepository>,
        storage: Arc<dyn BlobStorage>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            repository,
            storage,
            events,
        }
    }

    pub async fn get_document(&self, id: DocumentId) -> Result<Option<Document>, DomainError> {
        self.repository.find_by_id(id).await
    }

    /// Get a document that must belong to the given owner
    ///
    /// Documents owned by someone else are reported as not found.
    pub async fn get_owned_document(
        &self,
        owner_id: Uuid,
        id: DocumentId,
    ) -> Result<Document, DomainError> {
        self.repository
            .find_by_id(id)
            .await?
            .filter(|d| d.owner_id() == owner_id)
            .ok_or_else(|| DomainError::not_found(format!("Document '{}' not found", id)))
    }

    /// Move a document to a new status; false when the document is unknown
    #[instrument(skip(self, error_message))]
    pub async fn transition_status(
        &self,
        id: DocumentId,
        status: DocumentStatus,
        error_message: Option<String>,
    ) -> Result<bool, DomainError> {
        let Some(document) = self.repository.find_by_id(id).await? else {
            debug!("Document not found");
            return Ok(false);
        };

        if !self
            .repository
            .update_status(id, status, error_message.clone())
            .await?
        {
            return Ok(false);
        }

        info!(from = %document.status(), to = %status, "Document status changed");

        if status == DocumentStatus::Failed {
            let message = error_message
                .or_else(|| document.error_message().map(str::to_string))
                .unwrap_or_else(|| "Processing failed".to_string());
            let event = DocumentProcessingFailed::new(id, document.owner_id(), message);

            if let Err(e) = self.events.publish_processing_failed(event).await {
                warn!(error = %e, "Failed to publish processing failure event");
            }
        }

        Ok(true)
    }

    #[instrument(skip(self), fields(owner_id = %query.owner_id))]
    pub async fn list_documents(&self, query: StatusQuery) -> Result<DocumentPage, DomainError> {
        if query.limit == 0 || query.limit > MAX_PAGE_LIMIT {
            return Err(DomainError::validation(format!(
                "Limit must be between 1 and {}, got {}",
                MAX_PAGE_LIMIT, query.limit
            )));
        }

        let filter = query.filter();
        let documents = self
            .repository
            .find_by_owner(query.owner_id, filter.clone(), query.limit, query.offset)
            .await?;
        let total = self.repository.count_by_owner(query.owner_id, filter).await?;
        let has_more = query.offset + documents.len() < total;

        Ok(DocumentPage {
            documents,
            total,
            has_more,
        })
    }

    #[instrument(skip(self))]
    pub async fn status_summary(&self, owner_id: Uuid) -> Result<StatusSummary, DomainError> {
        let status_counts = self.repository.count_by_status(owner_id).await?;
        let total_documents = status_counts.values().sum();

        let recent_documents = self
            .repository
            .find_by_owner(owner_id, DocumentFilter::default(), RECENT_DOCUMENTS_LIMIT, 0)
            .await?;

        let mut processing_documents = Vec::new();
        for status in [DocumentStatus::Parsing, DocumentStatus::Processing] {
            processing_documents.extend(
                self.repository
                    .find_by_owner(
                        owner_id,
                        DocumentFilter::default().with_status(status),
                        IN_FLIGHT_DOCUMENTS_LIMIT,
                        0,
                    )
                    .await?,
            );
        }
        processing_documents.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        processing_documents.truncate(IN_FLIGHT_DOCUMENTS_LIMIT);

        let failed_count = status_counts
            .get(&DocumentStatus::Failed)
            .copied()
            .unwrap_or(0);
        let mut failed_documents = if failed_count == 0 {
            Vec::new()
        } else {
            self.repository
                .find_by_owner(
                    owner_id,
                    DocumentFilter::default().with_status(DocumentStatus::Failed),
                    failed_count,
                    0,
                )
                .await?
        };
        failed_documents.sort_by(|a, b| b.updated_at().cmp(&a.updated_at()));
        failed_documents.truncate(FAILED_DOCUMENTS_LIMIT);

        debug!(total_documents, "Built status summary");

        Ok(StatusSummary {
            owner_id,
            total_documents,
            status_counts,
            recent_documents,
            processing_documents,
            failed_documents,
        })
    }

    /// Progress of one of the owner's documents
    pub async fn processing_progress(
        &self,
        owner_id: Uuid,
        id: DocumentId,
    ) -> Result<ProcessingProgress, DomainError> {
        let document = self.get_owned_document(owner_id, id).await?;
        Ok(ProcessingProgress::from(&document))
    }

    /// Documents created from the attachments of the given email body
    pub async fn list_attachments(
        &self,
        parent_id: DocumentId,
    ) -> Result<Vec<Document>, DomainError> {
        self.repository.find_by_parent_id(parent_id).await
    }

    /// Remove a document and its blob
    ///
    /// Returns the removed document in the `Deleted` state, or `None` when it
    /// was unknown.
    #[instrument(skip(self))]
    pub async fn delete_document(&self, id: DocumentId) -> Result<Option<Document>, DomainError> {
        let Some(mut document) = self.repository.find_by_id(id).await? else {
            return Ok(None);
        };

        match self.storage.delete(document.storage_path()).await {
            Ok(true) => {}
            Ok(false) => debug!(storage_path = %document.storage_path(), "Blob already gone"),
            Err(e) => warn!(
                storage_path = %document.storage_path(),
                error = %e,
                "Failed to delete blob"
            ),
        }

        if !self.repository.delete_by_id(document.id()).await? {
            return Ok(None);
        }
        document.mark_deleted();

        info!(owner_id = %document.owner_id(), "Document deleted");
        Ok(Some(document))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::document::{DocumentMetadata, NewDocument, TagSet};
    use crate::domain::events::MockEventPublisher;
    use crate::domain::storage::mock::MockBlobStorage;
    use crate::infrastructure::document::InMemoryDocumentRepository;
    use crate::infrastructure::events::InMemoryEventPublisher;

    struct Fixture {
        repository: Arc<InMemoryDocumentRepository>,
        storage: Arc<MockBlobStorage>,
        events: Arc<InMemoryEventPublisher>,
        service: DocumentService,
    }

    fn fixture() -> Fixture {
        let repository = Arc::new(InMemoryDocumentRepository::new());
        let storage = Arc::new(MockBlobStorage::new());
        let events = Arc::new(InMemoryEventPublisher::new());
        let service = DocumentService::new(repository.clone(), storage.clone(), events.clone());

        Fixture {
            repository,
            storage,
            events,
            service,
        }
    }

    async fn stored(f: &Fixture, owner_id: Uuid, parent_id: Option<DocumentId>) -> Document {
        let storage_path = f
            .storage
            .save("content".into(), "doc.txt", owner_id, None)
            .await
            .unwrap();

        let document = Document::create(NewDocument {
            owner_id,
            filename: "doc.txt".to_string(),
            original_filename: "doc.txt".to_string(),
            storage_path,
            document_type: DocumentType::Txt,
            metadata: DocumentMetadata::new(7, "text/plain"),
            tags: TagSet::new(),
            source: None,
            parent_id,
        });

        f.repository.save(document).await.unwrap()
    }

    #[tokio::test]
    async fn test_get_document() {
        let f = fixture();
        let document = stored(&f, Uuid::new_v4(), None).await;

        let found = f.service.get_document(document.id()).await.unwrap();
        assert_eq!(found, Some(document));

        let missing = f.service.get_document(DocumentId::generate()).await.unwrap();
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_get_owned_document_hides_other_owners() {
        let f = fixture();
        let owner_id = Uuid::new_v4();
        let document = stored(&f, owner_id, None).await;

        assert!(f.service.get_owned_document(owner_id, document.id()).await.is_ok());

        let err = f
            .service
            .get_owned_document(Uuid::new_v4(), document.id())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_transition_status() {
        let f = fixture();
        let document = stored(&f, Uuid::new_v4(), None).await;

        let changed = f
            .service
            .transition_status(document.id(), DocumentStatus::Processed, None)
            .await
            .unwrap();
        assert!(changed);

        let updated = f.service.get_document(document.id()).await.unwrap().unwrap();
        assert_eq!(updated.status(), DocumentStatus::Processed);
        assert!(updated.processed_at().is_some());
        assert!(f.events.processing_failed().is_empty());
    }

    #[tokio::test]
    async fn test_transition_unknown_document() {
        let f = fixture();

        let changed = f
            .service
            .transition_status(DocumentId::generate(), DocumentStatus::Parsing, None)
            .await
            .unwrap();

        assert!(!changed);
    }

    #[tokio::test]
    async fn test_transition_to_failed_publishes_event() {
        let f = fixture();
        let owner_id = Uuid::new_v4();
        let document = stored(&f, owner_id, None).await;

        f.service
            .transition_status(
                document.id(),
                DocumentStatus::Failed,
                Some("parser crashed".to_string()),
            )
            .await
            .unwrap();

        let failures = f.events.processing_failed();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].document_id, document.id());
        assert_eq!(failures[0].owner_id, owner_id);
        assert_eq!(failures[0].error_message, "parser crashed");
    }

    #[tokio::test]
    async fn test_transition_survives_publish_failure() {
        let repository = Arc::new(InMemoryDocumentRepository::new());
        let mut events = MockEventPublisher::new();
        events
            .expect_publish_processing_failed()
            .times(1)
            .returning(|_| Err(DomainError::event("broker down")));
        let service = DocumentService::new(
            repository.clone(),
            Arc::new(MockBlobStorage::new()),
            Arc::new(events),
        );
        let document = Document::create(NewDocument {
            owner_id: Uuid::new_v4(),
            filename: "a.txt".to_string(),
            original_filename: "a.txt".to_string(),
            storage_path: "a.txt".to_string(),
            document_type: DocumentType::Txt,
            metadata: DocumentMetadata::new(1, "text/plain"),
            tags: TagSet::new(),
            source: None,
            parent_id: None,
        });
        repository.save(document.clone()).await.unwrap();

        let changed = service
            .transition_status(document.id(), DocumentStatus::Failed, None)
            .await
            .unwrap();

        assert!(changed);
        let stored = repository.find_by_id(document.id()).await.unwrap().unwrap();
        assert!(stored.is_failed());
    }

    #[tokio::test]
    async fn test_list_documents_pages() {
        let f = fixture();
        let owner_id = Uuid::new_v4();
        for _ in 0..3 {
            stored(&f, owner_id, None).await;
        }
        stored(&f, Uuid::new_v4(), None).await;

        let first = f
            .service
            .list_documents(StatusQuery::new(owner_id).with_limit(2))
            .await
            .unwrap();
        assert_eq!(first.documents.len(), 2);
        assert_eq!(first.total, 3);
        assert!(first.has_more);

        let second = f
            .service
            .list_documents(StatusQuery::new(owner_id).with_limit(2).with_offset(2))
            .await
            .unwrap();
        assert_eq!(second.documents.len(), 1);
        assert!(!second.has_more);
    }

    #[tokio::test]
    async fn test_list_documents_filters_by_status() {
        let f = fixture();
        let owner_id = Uuid::new_v4();
        let failed = stored(&f, owner_id, None).await;
        stored(&f, owner_id, None).await;
        f.service
            .transition_status(failed.id(), DocumentStatus::Failed, None)
            .await
            .unwrap();

        let page = f
            .service
            .list_documents(StatusQuery::new(owner_id).with_status(DocumentStatus::Failed))
            .await
            .unwrap();

        assert_eq!(page.total, 1);
        assert_eq!(page.documents[0].id(), failed.id());
    }

    #[tokio::test]
    async fn test_list_documents_rejects_bad_limit() {
        let f = fixture();
        let owner_id = Uuid::new_v4();

        for limit in [0, MAX_PAGE_LIMIT + 1] {
            let err = f
                .service
                .list_documents(StatusQuery::new(owner_id).with_limit(limit))
                .await
                .unwrap_err();
            assert!(matches!(err, DomainError::Validation { .. }));
        }

        let ok = f
            .service
            .list_documents(StatusQuery::new(owner_id).with_limit(MAX_PAGE_LIMIT))
            .await;
        assert!(ok.is_ok());
    }

    #[tokio::test]
    async fn test_list_attachments() {
        let f = fixture();
        let owner_id = Uuid::new_v4();
        let parent = stored(&f, owner_id, None).await;
        let child = stored(&f, owner_id, Some(parent.id())).await;
        stored(&f, owner_id, None).await;

        let attachments = f.service.list_attachments(parent.id()).await.unwrap();

        assert_eq!(attachments.len(), 1);
        assert_eq!(attachments[0].id(), child.id());
    }

    #[tokio::test]
    async fn test_delete_document() {
        let f = fixture();
        let document = stored(&f, Uuid::new_v4(), None).await;

        let removed = f.service.delete_document(document.id()).await.unwrap().unwrap();
        assert_eq!(removed.id(), document.id());
        assert_eq!(removed.status(), DocumentStatus::Deleted);
        assert!(!removed.status().can_be_processed());

        assert!(f.service.get_document(document.id()).await.unwrap().is_none());
        assert!(f.storage.stored_paths().is_empty());
        assert_eq!(f.storage.deleted_paths(), vec![document.storage_path().to_string()]);
        assert!(f.service.delete_document(document.id()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_survives_blob_failure() {
        let repository = Arc::new(InMemoryDocumentRepository::new());
        let storage = Arc::new(MockBlobStorage::new().with_delete_error("read only"));
        let service = DocumentService::new(
            repository.clone(),
            storage.clone(),
            Arc::new(InMemoryEventPublisher::new()),
        );
        let document = Document::create(NewDocument {
            owner_id: Uuid::new_v4(),
            filename: "a.txt".to_string(),
            original_filename: "a.txt".to_string(),
            storage_path: "missing/a.txt".to_string(),
            document_type: DocumentType::Txt,
            metadata: DocumentMetadata::new(1, "text/plain"),
            tags: TagSet::new(),
            source: None,
            parent_id: None,
        });
        repository.save(document.clone()).await.unwrap();

        assert!(service.delete_document(document.id()).await.unwrap().is_some());
        assert!(repository.is_empty().await);
    }

    #[tokio::test]
    async fn test_status_summary_groups_documents() {
        let f = fixture();
        let owner_id = Uuid::new_v4();

        let failed = stored(&f, owner_id, None).await;
        let parsing = stored(&f, owner_id, None).await;
        let processing = stored(&f, owner_id, None).await;
        stored(&f, owner_id, None).await;
        stored(&f, Uuid::new_v4(), None).await;

        f.service
            .transition_status(failed.id(), DocumentStatus::Failed, Some("bad pdf".into()))
            .await
            .unwrap();
        f.service
            .transition_status(parsing.id(), DocumentStatus::Parsing, None)
            .await
            .unwrap();
        f.service
            .transition_status(processing.id(), DocumentStatus::Processing, None)
            .await
            .unwrap();

        let summary = f.service.status_summary(owner_id).await.unwrap();

        assert_eq!(summary.total_documents, 4);
        assert_eq!(summary.status_counts.get(&DocumentStatus::Uploaded), Some(&1));
        assert_eq!(summary.status_counts.get(&DocumentStatus::Failed), Some(&1));
        assert_eq!(summary.recent_documents.len(), 4);

        let mut in_flight: Vec<DocumentId> =
            summary.processing_documents.iter().map(|d| d.id()).collect();
        in_flight.sort();
        let mut expected = vec![parsing.id(), processing.id()];
        expected.sort();
        assert_eq!(in_flight, expected);

        assert_eq!(summary.failed_documents.len(), 1);
        assert_eq!(summary.failed_documents[0].error_message(), Some("bad pdf"));
    }

    #[tokio::test]
    async fn test_status_summary_caps_recent_documents() {
        let f = fixture();
        let owner_id = Uuid::new_v4();
        for _ in 0..(RECENT_DOCUMENTS_LIMIT + 2) {
            stored(&f, owner_id, None).await;
        }

        let summary = f.service.status_summary(owner_id).await.unwrap();

        assert_eq!(summary.total_documents, RECENT_DOCUMENTS_LIMIT + 2);
        assert_eq!(summary.recent_documents.len(), RECENT_DOCUMENTS_LIMIT);
        assert!(summary.processing_documents.is_empty());
        assert!(summary.failed_documents.is_empty());
    }

    #[tokio::test]
    async fn test_status_summary_for_unknown_owner_is_empty() {
        let f = fixture();

        let summary = f.service.status_summary(Uuid::new_v4()).await.unwrap();

        assert_eq!(summary.total_documents, 0);
        assert!(summary.status_counts.is_empty());
        assert!(summary.recent_documents.is_empty());
    }

    #[tokio::test]
    async fn test_processing_progress() {
        let f = fixture();
        let owner_id = Uuid::new_v4();
        let document = stored(&f, owner_id, None).await;

        let progress = f
            .service
            .processing_progress(owner_id, document.id())
            .await
            .unwrap();
        assert_eq!(progress.status, DocumentStatus::Uploaded);
        assert_eq!(progress.progress_percentage, 10);
        assert!(!progress.is_completed);

        f.service
            .transition_status(document.id(), DocumentStatus::Processed, None)
            .await
            .unwrap();
        let progress = f
            .service
            .processing_progress(owner_id, document.id())
            .await
            .unwrap();
        assert_eq!(progress.progress_percentage, 100);
        assert!(progress.is_completed);
        assert!(!progress.is_failed);
        assert!(progress.processed_at.is_some());
    }

    #[tokio::test]
    async fn test_processing_progress_reports_failure() {
        let f = fixture();
        let owner_id = Uuid::new_v4();
        let document = stored(&f, owner_id, None).await;
        f.service
            .transition_status(document.id(), DocumentStatus::Failed, Some("timeout".into()))
            .await
            .unwrap();

        let progress = f
            .service
            .processing_progress(owner_id, document.id())
            .await
            .unwrap();

        assert_eq!(progress.progress_percentage, 0);
        assert!(progress.is_failed);
        assert_eq!(progress.error_message.as_deref(), Some("timeout"));
        assert_eq!(progress.status_message, "Document processing failed");
    }

    #[tokio::test]
    async fn test_processing_progress_hides_other_owners() {
        let f = fixture();
        let document = stored(&f, Uuid::new_v4(), None).await;

        let err = f
            .service
            .processing_progress(Uuid::new_v4(), document.id())
            .await
            .unwrap_err();

        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
