//! File and email ingestion service

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::domain::document::{
    Document, DocumentId, DocumentMetadata, DocumentRepository, NewDocument, TagSet,
};
use crate::domain::email::{
    AttachmentSkipReason, EmailMetadata, EmailParser, ParsedEmail, body_filename,
    render_body_text,
};
use crate::domain::events::{DocumentUploaded, EmailParsed, EventPublisher};
use crate::domain::ingestion::{
    FileValidator, FilenamePolicy, FilenameSanitizer, FormatSniffer, IngestError,
    IngestionConfig, ValidationFailure, extension_of,
};
use crate::domain::storage::BlobStorage;
use crate::infrastructure::observability::{
    Outcome, record_attachment_skipped, record_email, record_upload,
};

const DEFAULT_EMAIL_SOURCE: &str = "email";
const EMAIL_BODY_CONTENT_TYPE: &str = "text/plain";

/// Request to store a single file
#[derive(Debug, Clone)]
pub struct UploadFileCommand {
    pub owner_id: Uuid,
    pub filename: String,
    pub content: Bytes,
    pub content_type: Option<String>,
    pub tags: TagSet,
    pub source: Option<String>,
    pub parent_id: Option<DocumentId>,
}

impl UploadFileCommand {
    pub fn new(owner_id: Uuid, filename: impl Into<String>, content: impl Into<Bytes>) -> Self {
        Self {
            owner_id,
            filename: filename.into(),
            content: content.into(),
            content_type: None,
            tags: TagSet::new(),
            source: None,
            parent_id: None,
        }
    }

    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_parent_id(mut self, parent_id: DocumentId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }
}

/// Request to split an email into documents
#[derive(Debug, Clone)]
pub struct ParseEmailCommand {
    pub owner_id: Uuid,
    pub raw: Bytes,
    pub tags: TagSet,
    pub source: String,
}

impl ParseEmailCommand {
    pub fn new(owner_id: Uuid, raw: impl Into<Bytes>) -> Self {
        Self {
            owner_id,
            raw: raw.into(),
            tags: TagSet::new(),
            source: DEFAULT_EMAIL_SOURCE.to_string(),
        }
    }

    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// An attachment that did not become a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RejectedAttachment {
    pub filename: String,
    pub reason: String,
}

/// Documents created from one email
#[derive(Debug, Clone, Serialize)]
pub struct EmailIngestionResult {
    pub main_document: Document,
    pub attachment_documents: Vec<Document>,
    pub rejected_attachments: Vec<RejectedAttachment>,
    pub email_metadata: EmailMetadata,
}

/// Orchestrates validation, blob storage, persistence and events for uploads
/// and emails
pub struct IngestionService {
    config: IngestionConfig,
    validator: FileValidator,
    sniffer: FormatSniffer,
    parser: Arc<dyn EmailParser>,
    storage: Arc<dyn BlobStorage>,
    repository: Arc<dyn DocumentRepository>,
    events: Arc<dyn EventPublisher>,
}

impl std::fmt::Debug for IngestionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestionService")
            .field("config", &self.config)
            .field("storage", &self.storage)
            .finish()
    }
}

impl IngestionService {
    pub fn new(
        config: IngestionConfig,
        parser: Arc<dyn EmailParser>,
        storage: Arc<dyn BlobStorage>,
        repository: Arc<dyn DocumentRepository>,
        events: Arc<dyn EventPublisher>,
    ) -> Self {
        Self {
            validator: FileValidator::from_config(&config),
            sniffer: FormatSniffer::new(config.default_document_type),
            config,
            parser,
            storage,
            repository,
            events,
        }
    }

    pub fn config(&self) -> &IngestionConfig {
        &self.config
    }

    /// Validate, store and persist a single file
    #[instrument(skip(self, command), fields(owner_id = %command.owner_id, filename = %command.filename))]
    pub async fn upload_file(&self, command: UploadFileCommand) -> Result<Document, IngestError> {
        let started = Instant::now();
        let result = self.store_file(command).await;

        match &result {
            Ok(document) => record_upload(
                Outcome::Success,
                document.document_type().as_str(),
                started.elapsed(),
            ),
            Err(IngestError::Validation(_) | IngestError::BusinessRule(_)) => {
                record_upload(Outcome::Rejected, "unknown", started.elapsed())
            }
            Err(_) => record_upload(Outcome::Error, "unknown", started.elapsed()),
        }

        result
    }

    async fn store_file(&self, command: UploadFileCommand) -> Result<Document, IngestError> {
        let original_filename = command.filename.trim();
        if original_filename.is_empty() {
            return Err(ValidationFailure::EmptyFilename.into());
        }

        let stored_filename = self.resolve_filename(original_filename)?;
        let declared = command.content_type.as_deref();

        if let Err(failure) = self.validator.validate(original_filename, &command.content, declared)
        {
            warn!(reason = %failure, "File rejected");
            return Err(failure.into());
        }

        let (document_type, mime_type) =
            self.sniffer
                .classify(original_filename, declared, Some(command.content.as_ref()));
        let metadata = self.build_metadata(original_filename, &command.content, &mime_type);

        let storage_path = self
            .storage
            .save(
                command.content.clone(),
                &stored_filename,
                command.owner_id,
                Some(&mime_type),
            )
            .await
            .map_err(|e| {
                error!(error = %e, "Failed to store file");
                IngestError::processing(format!("Failed to store '{}'", original_filename), e)
            })?;

        let document = Document::create(NewDocument {
            owner_id: command.owner_id,
            filename: stored_filename,
            original_filename: original_filename.to_string(),
            storage_path: storage_path.clone(),
            document_type,
            metadata,
            tags: command.tags,
            source: command.source,
            parent_id: command.parent_id,
        });

        let document = match self.repository.save(document).await {
            Ok(saved) => saved,
            Err(e) => {
                error!(error = %e, storage_path = %storage_path, "Failed to persist document");
                self.discard_blob(&storage_path).await;
                return Err(IngestError::processing(
                    format!("Failed to persist '{}'", original_filename),
                    e,
                ));
            }
        };

        if let Err(e) = self
            .events
            .publish_uploaded(DocumentUploaded::from_document(&document))
            .await
        {
            warn!(document_id = %document.id(), error = %e, "Failed to publish upload event");
        }

        info!(
            document_id = %document.id(),
            document_type = %document.document_type(),
            file_size = document.metadata().file_size,
            "File uploaded"
        );

        Ok(document)
    }

    fn resolve_filename(&self, filename: &str) -> Result<String, IngestError> {
        if FilenameSanitizer::is_safe(filename) {
            return Ok(filename.to_string());
        }

        match self.config.filename_policy {
            FilenamePolicy::Sanitize => {
                let sanitized = FilenameSanitizer::sanitize(filename);
                debug!(sanitized = %sanitized, "Filename sanitized");
                Ok(sanitized)
            }
            FilenamePolicy::Reject => Err(ValidationFailure::UnsafeFilename {
                filename: filename.to_string(),
            }
            .into()),
        }
    }

    fn build_metadata(&self, filename: &str, content: &[u8], mime_type: &str) -> DocumentMetadata {
        let hash = hex::encode(Sha256::digest(content));
        let mut metadata = DocumentMetadata::new(content.len() as u64, mime_type)
            .with_custom_field("content_hash", serde_json::Value::String(hash));

        if FileValidator::is_text_file(filename) {
            if let Some(encoding) = self.validator.detect_text_encoding(content) {
                metadata = metadata.with_encoding(encoding.name().to_ascii_lowercase());
            }
        }

        metadata
    }

    async fn discard_blob(&self, storage_path: &str) {
        match self.storage.delete(storage_path).await {
            Ok(true) => debug!(storage_path = %storage_path, "Discarded orphaned blob"),
            Ok(false) => debug!(storage_path = %storage_path, "Orphaned blob already gone"),
            Err(e) => warn!(storage_path = %storage_path, error = %e, "Failed to discard orphaned blob"),
        }
    }

    /// Parse an email and store its body and allowed attachments as documents
    #[instrument(skip(self, command), fields(owner_id = %command.owner_id, email_size = command.raw.len()))]
    pub async fn parse_email(
        &self,
        command: ParseEmailCommand,
    ) -> Result<EmailIngestionResult, IngestError> {
        let result = self.ingest_email(command).await;

        match &result {
            Ok(r) => record_email(Outcome::Success, r.attachment_documents.len()),
            Err(IngestError::Validation(_) | IngestError::BusinessRule(_)) => {
                record_email(Outcome::Rejected, 0)
            }
            Err(_) => record_email(Outcome::Error, 0),
        }

        result
    }

    async fn ingest_email(
        &self,
        command: ParseEmailCommand,
    ) -> Result<EmailIngestionResult, IngestError> {
        let parsed = self.parser.parse(&command.raw).map_err(|source| {
            error!(error = %source, "Failed to parse email");
            IngestError::EmailProcessing {
                owner_id: command.owner_id,
                source,
            }
        })?;

        let mut rejected: Vec<RejectedAttachment> = parsed
            .skipped_attachments
            .iter()
            .map(|skipped| {
                warn!(
                    filename = %skipped.filename,
                    size = skipped.size,
                    reason = %skipped.reason,
                    "Attachment dropped by parser"
                );
                record_attachment_skipped(match skipped.reason {
                    AttachmentSkipReason::TooLarge { .. } => "too_large",
                    AttachmentSkipReason::Empty => "empty",
                    AttachmentSkipReason::Undecodable { .. } => "undecodable",
                });
                RejectedAttachment {
                    filename: skipped.filename.clone(),
                    reason: skipped.reason.to_string(),
                }
            })
            .collect();

        let main_document = self.store_email_body(&command, &parsed).await?;

        let (attachment_documents, failed) = self
            .store_attachments(&command, &parsed, main_document.id())
            .await;
        rejected.extend(failed);

        let email_metadata = parsed.metadata();
        let event = EmailParsed::new(
            command.owner_id,
            main_document.id(),
            attachment_documents.iter().map(Document::id).collect(),
            email_metadata.clone(),
        );
        if let Err(e) = self.events.publish_email_parsed(event).await {
            warn!(document_id = %main_document.id(), error = %e, "Failed to publish email event");
        }

        info!(
            main_document_id = %main_document.id(),
            attachment_count = attachment_documents.len(),
            rejected_count = rejected.len(),
            subject = %parsed.subject,
            "Email ingested"
        );

        Ok(EmailIngestionResult {
            main_document,
            attachment_documents,
            rejected_attachments: rejected,
            email_metadata,
        })
    }

    async fn store_email_body(
        &self,
        command: &ParseEmailCommand,
        parsed: &ParsedEmail,
    ) -> Result<Document, IngestError> {
        let mut tags = command.tags.with(["email", "main"]);
        if !parsed.sender.is_empty() {
            tags.insert(format!("from:{}", parsed.sender));
        }

        let body = UploadFileCommand::new(
            command.owner_id,
            body_filename(parsed),
            render_body_text(parsed).into_bytes(),
        )
        .with_content_type(EMAIL_BODY_CONTENT_TYPE)
        .with_tags(tags)
        .with_source(command.source.clone());

        self.upload_file(body).await
    }

    /// Upload allowed attachments; failures are collected, never propagated
    async fn store_attachments(
        &self,
        command: &ParseEmailCommand,
        parsed: &ParsedEmail,
        parent_id: DocumentId,
    ) -> (Vec<Document>, Vec<RejectedAttachment>) {
        let tags = command.tags.with([
            "email".to_string(),
            "attachment".to_string(),
            format!("parent:{}", parent_id),
        ]);

        let mut rejected = Vec::new();
        let mut uploads = Vec::new();

        for attachment in &parsed.attachments {
            let allowed = extension_of(&attachment.filename)
                .is_some_and(|ext| self.config.is_attachment_extension_allowed(&ext));

            if !allowed {
                info!(filename = %attachment.filename, "Attachment type not allowed, skipping");
                record_attachment_skipped("extension_not_allowed");
                rejected.push(RejectedAttachment {
                    filename: attachment.filename.clone(),
                    reason: "attachment type not allowed".to_string(),
                });
                continue;
            }

            uploads.push(
                UploadFileCommand::new(
                    command.owner_id,
                    attachment.filename.clone(),
                    attachment.content.clone(),
                )
                .with_content_type(attachment.content_type.clone())
                .with_tags(tags.clone())
                .with_source(command.source.clone())
                .with_parent_id(parent_id),
            );
        }

        let filenames: Vec<String> = uploads.iter().map(|u| u.filename.clone()).collect();
        let results: Vec<Result<Document, IngestError>> = stream::iter(uploads)
            .map(|upload| self.upload_file(upload))
            .buffered(self.config.attachment_concurrency.max(1))
            .collect()
            .await;

        let mut documents = Vec::new();
        for (filename, result) in filenames.into_iter().zip(results) {
            match result {
                Ok(document) => documents.push(document),
                Err(e) => {
                    warn!(filename = %filename, error = %e, "Failed to store attachment");
                    record_attachment_skipped(e.kind());
                    rejected.push(RejectedAttachment {
                        filename,
                        reason: e.to_string(),
                    });
                }
            }
        }

        (documents, rejected)
    }
}
