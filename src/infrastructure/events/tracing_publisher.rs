//! Event publisher that writes events to the tracing pipeline

use async_trait::async_trait;
use tracing::{info, warn};

use crate::domain::DomainError;
use crate::domain::events::{DocumentProcessingFailed, DocumentUploaded, EmailParsed, EventPublisher};

/// Logs every event as a structured record under the `document_events` target
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventPublisher;

impl TracingEventPublisher {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl EventPublisher for TracingEventPublisher {
    async fn publish_uploaded(&self, event: DocumentUploaded) -> Result<(), DomainError> {
        info!(
            target: "document_events",
            event = "document_uploaded",
            document_id = %event.document_id,
            owner_id = %event.owner_id,
            filename = %event.filename,
            document_type = %event.document_type,
            storage_path = %event.storage_path,
            file_size = event.details.file_size,
            "Document uploaded"
        );
        Ok(())
    }

    async fn publish_email_parsed(&self, event: EmailParsed) -> Result<(), DomainError> {
        info!(
            target: "document_events",
            event = "email_parsed",
            owner_id = %event.owner_id,
            main_document_id = %event.main_document_id,
            attachment_count = event.attachment_document_ids.len(),
            subject = %event.email_metadata.subject,
            "Email parsed"
        );
        Ok(())
    }

    async fn publish_processing_failed(
        &self,
        event: DocumentProcessingFailed,
    ) -> Result<(), DomainError> {
        warn!(
            target: "document_events",
            event = "document_processing_failed",
            document_id = %event.document_id,
            owner_id = %event.owner_id,
            error_message = %event.error_message,
            error_code = event.error_code.as_deref().unwrap_or("none"),
            "Document processing failed"
        );
        Ok(())
    }
}
