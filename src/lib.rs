//! IACS ingest core
//!
//! Ingests standalone files and RFC 822 email messages:
//! - Format sniffing and classification into a closed document type set
//! - Size, extension, signature and encoding validation
//! - Filename safety checks and sanitization
//! - MIME parsing into a body document plus attachment documents
//! - An explicit document status lifecycle

pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::AppConfig;

use std::sync::Arc;

use tracing::info;

use infrastructure::document::InMemoryDocumentRepository;
use infrastructure::email::MimeEmailParser;
use infrastructure::events::TracingEventPublisher;
use infrastructure::services::{DocumentService, IngestionService};
use infrastructure::storage::BlobStorageFactory;

/// Services wired against the configured collaborators
#[derive(Debug)]
pub struct Services {
    pub ingestion: IngestionService,
    pub documents: DocumentService,
}

/// Build the services from configuration
///
/// Documents are kept in memory; blobs go to the configured storage backend.
pub fn create_services(config: &AppConfig) -> anyhow::Result<Services> {
    let ingestion_config = config.ingestion.to_ingestion_config()?;
    let blob_config = config.storage.to_blob_config()?;

    let storage = BlobStorageFactory::create(&blob_config);
    let repository = Arc::new(InMemoryDocumentRepository::new());
    let events = Arc::new(TracingEventPublisher::new());
    let parser = Arc::new(MimeEmailParser::new(ingestion_config.max_attachment_size));

    info!(
        storage = ?blob_config.storage_type(),
        max_file_size = ingestion_config.max_file_size,
        "Services initialized"
    );

    Ok(Services {
        documents: DocumentService::new(repository.clone(), storage.clone(), events.clone()),
        ingestion: IngestionService::new(ingestion_config, parser, storage, repository, events),
    })
}
