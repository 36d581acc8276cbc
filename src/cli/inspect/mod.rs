//! Inspect command - reports how a file would be classified and validated

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use serde::Serialize;

use super::{bootstrap, print_json};
use crate::domain::document::DocumentType;
use crate::domain::email::{EmailMetadata, EmailParser};
use crate::domain::ingestion::{FileValidator, FilenameSanitizer, FormatSniffer};
use crate::infrastructure::email::{MimeEmailParser, looks_like_email};

#[derive(Args, Debug, Clone)]
pub struct InspectArgs {
    /// File to inspect
    pub path: PathBuf,

    /// Declared content type
    #[arg(long)]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub filename: String,
    pub safe_filename: String,
    pub filename_is_safe: bool,
    pub size: u64,
    pub document_type: DocumentType,
    pub mime_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,
    pub valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<EmailMetadata>,
}

pub async fn run(args: InspectArgs) -> anyhow::Result<()> {
    let config = bootstrap()?;
    let ingestion = config.ingestion.to_ingestion_config()?;

    let content = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let filename = args
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let declared = args.content_type.as_deref();

    let validator = FileValidator::from_config(&ingestion);
    let sniffer = FormatSniffer::new(ingestion.default_document_type);
    let (document_type, mime_type) =
        sniffer.classify(&filename, declared, Some(content.as_slice()));
    let verdict = validator.validate(&filename, &content, declared);

    let encoding = FileValidator::is_text_file(&filename)
        .then(|| validator.detect_text_encoding(&content))
        .flatten()
        .map(|e| e.name().to_ascii_lowercase());

    let email = if document_type == DocumentType::Email && looks_like_email(&content) {
        MimeEmailParser::new(ingestion.max_attachment_size)
            .parse(&content)
            .ok()
            .map(|parsed| parsed.metadata())
    } else {
        None
    };

    print_json(&InspectReport {
        safe_filename: FilenameSanitizer::make_safe(&filename),
        filename_is_safe: FilenameSanitizer::is_safe(&filename),
        size: content.len() as u64,
        document_type,
        mime_type,
        encoding,
        valid: verdict.is_ok(),
        rejection: verdict.err().map(|failure| failure.to_string()),
        email,
        filename,
    })
}
