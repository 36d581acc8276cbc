//! Upload command - stores a single file as a document

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::info;

use super::{OwnershipArgs, bootstrap, print_json};
use crate::domain::document::TagSet;
use crate::infrastructure::services::UploadFileCommand;

#[derive(Args, Debug, Clone)]
pub struct UploadArgs {
    /// File to upload
    pub path: PathBuf,

    /// Declared content type
    #[arg(long)]
    pub content_type: Option<String>,

    #[command(flatten)]
    pub ownership: OwnershipArgs,
}

pub async fn run(args: UploadArgs) -> anyhow::Result<()> {
    let config = bootstrap()?;
    let services = crate::create_services(&config)?;

    let content = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("Failed to read {}", args.path.display()))?;
    let filename = args
        .path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut command = UploadFileCommand::new(args.ownership.owner_id(), filename, content)
        .with_tags(TagSet::from_iter(args.ownership.tags.iter().cloned()));
    if let Some(content_type) = args.content_type {
        command = command.with_content_type(content_type);
    }
    if let Some(source) = args.ownership.source {
        command = command.with_source(source);
    }

    let document = services.ingestion.upload_file(command).await?;
    info!(document_id = %document.id(), "Upload complete");

    print_json(&document)
}
