//! Recording event publisher

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::domain::DomainError;
use crate::domain::events::{DocumentProcessingFailed, DocumentUploaded, EmailParsed, EventPublisher};

/// Any event the publisher has accepted
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedEvent {
    Uploaded(DocumentUploaded),
    EmailParsed(EmailParsed),
    ProcessingFailed(DocumentProcessingFailed),
}

/// Keeps published events in memory, in publication order
#[derive(Debug, Clone, Default)]
pub struct InMemoryEventPublisher {
    events: Arc<Mutex<Vec<RecordedEvent>>>,
    error: Option<String>,
}

impl InMemoryEventPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every publish fails with the given message and records nothing
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }

    pub fn events(&self) -> Vec<RecordedEvent> {
        self.events.lock().map(|e| e.clone()).unwrap_or_default()
    }

    pub fn uploaded(&self) -> Vec<DocumentUploaded> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RecordedEvent::Uploaded(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn email_parsed(&self) -> Vec<EmailParsed> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RecordedEvent::EmailParsed(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    pub fn processing_failed(&self) -> Vec<DocumentProcessingFailed> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                RecordedEvent::ProcessingFailed(event) => Some(event),
                _ => None,
            })
            .collect()
    }

    fn record(&self, event: RecordedEvent) -> Result<(), DomainError> {
        if let Some(error) = &self.error {
            return Err(DomainError::event(error.clone()));
        }

        self.events
            .lock()
            .map_err(|e| DomainError::event(format!("Failed to acquire event lock: {}", e)))?
            .push(event);
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for InMemoryEventPublisher {
    async fn publish_uploaded(&self, event: DocumentUploaded) -> Result<(), DomainError> {
        self.record(RecordedEvent::Uploaded(event))
    }

    async fn publish_email_parsed(&self, event: EmailParsed) -> Result<(), DomainError> {
        self.record(RecordedEvent::EmailParsed(event))
    }

    async fn publish_processing_failed(
        &self,
        event: DocumentProcessingFailed,
    ) -> Result<(), DomainError> {
        self.record(RecordedEvent::ProcessingFailed(event))
    }
}
