//! In-memory document repository implementation

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::domain::document::{
    Document, DocumentFilter, DocumentId, DocumentRepository, DocumentStatus,
};
use crate::domain::error::DomainError;

/// In-memory implementation of DocumentRepository
#[derive(Debug, Clone, Default)]
pub struct InMemoryDocumentRepository {
    documents: Arc<RwLock<HashMap<DocumentId, Document>>>,
}

impl InMemoryDocumentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.documents.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.documents.read().await.is_empty()
    }
}

#[async_trait]
impl DocumentRepository for InMemoryDocumentRepository {
    async fn save(&self, document: Document) -> Result<Document, DomainError> {
        let mut documents = self.documents.write().await;

        if documents.contains_key(&document.id()) {
            return Err(DomainError::conflict(format!(
                "Document '{}' already exists",
                document.id()
            )));
        }

        documents.insert(document.id(), document.clone());
        Ok(document)
    }

    async fn find_by_id(&self, id: DocumentId) -> Result<Option<Document>, DomainError> {
        let documents = self.documents.read().await;
        Ok(documents.get(&id).cloned())
    }

    async fn update_status(
        &self,
        id: DocumentId,
        status: DocumentStatus,
        error_message: Option<String>,
    ) -> Result<bool, DomainError> {
        let mut documents = self.documents.write().await;

        let Some(document) = documents.get_mut(&id) else {
            return Ok(false);
        };

        document
            .transition_status(status, error_message)
            .map_err(|e| DomainError::validation(e.to_string()))?;
        Ok(true)
    }

    async fn find_by_owner(
        &self,
        owner_id: Uuid,
        filter: DocumentFilter,
        limit: usize,
        offset: usize,
    ) -> Result<Vec<Document>, DomainError> {
        let documents = self.documents.read().await;
        let mut owned: Vec<&Document> = documents
            .values()
            .filter(|d| d.owner_id() == owner_id && filter.matches(d))
            .collect();

        owned.sort_by(|a, b| {
            b.created_at()
                .cmp(&a.created_at())
                .then_with(|| b.id().cmp(&a.id()))
        });

        Ok(owned
            .into_iter()
            .skip(offset)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn count_by_owner(
        &self,
        owner_id: Uuid,
        filter: DocumentFilter,
    ) -> Result<usize, DomainError> {
        let documents = self.documents.read().await;
        Ok(documents
            .values()
            .filter(|d| d.owner_id() == owner_id && filter.matches(d))
            .count())
    }

    async fn count_by_status(
        &self,
        owner_id: Uuid,
    ) -> Result<HashMap<DocumentStatus, usize>, DomainError> {
        let documents = self.documents.read().await;
        let mut counts = HashMap::new();
        for document in documents.values().filter(|d| d.owner_id() == owner_id) {
            *counts.entry(document.status()).or_insert(0) += 1;
        }
        Ok(counts)
    }

    async fn find_by_parent_id(
        &self,
        parent_id: DocumentId,
    ) -> Result<Vec<Document>, DomainError> {
        let documents = self.documents.read().await;
        let mut children: Vec<Document> = documents
            .values()
            .filter(|d| d.parent_id() == Some(parent_id))
            .cloned()
            .collect();

        children.sort_by_key(|d| d.created_at());
        Ok(children)
    }

    async fn delete_by_id(&self, id: DocumentId) -> Result<bool, DomainError> {
        let mut documents = self.documents.write().await;
        Ok(documents.remove(&id).is_some())
    }
}
