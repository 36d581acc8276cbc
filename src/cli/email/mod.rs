//! Email command - splits a message into a body document and attachment documents

use std::path::PathBuf;

use anyhow::Context;
use clap::Args;
use tracing::info;

use super::{OwnershipArgs, bootstrap, print_json};
use crate::domain::document::TagSet;
use crate::infrastructure::services::ParseEmailCommand;

#[derive(Args, Debug, Clone)]
pub struct EmailArgs {
    /// Raw RFC 822 message (.eml)
    pub path: PathBuf,

    #[command(flatten)]
    pub ownership: OwnershipArgs,
}

pub async fn run(args: EmailArgs) -> anyhow::Result<()> {
    let config = bootstrap()?;
    let services = crate::create_services(&config)?;

    let raw = tokio::fs::read(&args.path)
        .await
        .with_context(|| format!("Failed to read {}", args.path.display()))?;

    let mut command = ParseEmailCommand::new(args.ownership.owner_id(), raw)
        .with_tags(TagSet::from_iter(args.ownership.tags.iter().cloned()));
    if let Some(source) = args.ownership.source {
        command = command.with_source(source);
    }

    let result = services.ingestion.parse_email(command).await?;
    info!(
        main_document_id = %result.main_document.id(),
        attachments = result.attachment_documents.len(),
        "Email ingestion complete"
    );

    print_json(&result)
}
