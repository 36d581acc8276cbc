use async_trait::async_trait;

use super::{DocumentProcessingFailed, DocumentUploaded, EmailParsed};
use crate::domain::DomainError;

#[cfg(test)]
use mockall::automock;

/// Outbound sink for document events; callers treat failures as non-fatal
#[cfg_attr(test, automock)]
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish_uploaded(&self, event: DocumentUploaded) -> Result<(), DomainError>;

    async fn publish_email_parsed(&self, event: EmailParsed) -> Result<(), DomainError>;

    async fn publish_processing_failed(
        &self,
        event: DocumentProcessingFailed,
    ) -> Result<(), DomainError>;
}
