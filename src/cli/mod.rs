//! CLI module for IACS ingest
//!
//! Subcommands:
//! - `upload`: validate and store a single file
//! - `email`: split an RFC 822 message into documents
//! - `inspect`: classify and validate a file without storing it

pub mod email;
pub mod inspect;
pub mod upload;

use clap::{Parser, Subcommand};
use serde::Serialize;
use uuid::Uuid;

use crate::config::AppConfig;
use crate::infrastructure::logging;

/// IACS ingest - file and email ingestion into typed documents
#[derive(Parser)]
#[command(name = "iacs-ingest")]
#[command(version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Validate and store a file
    Upload(upload::UploadArgs),

    /// Parse an email and store its body and attachments
    Email(email::EmailArgs),

    /// Classify and validate a file without storing anything
    Inspect(inspect::InspectArgs),
}

/// Options shared by commands that create documents
#[derive(clap::Args, Debug, Clone)]
pub struct OwnershipArgs {
    /// Owner of the created documents (random when omitted)
    #[arg(long)]
    pub owner: Option<Uuid>,

    /// Tag to attach; repeatable
    #[arg(long = "tag")]
    pub tags: Vec<String>,

    /// Source label recorded on the documents
    #[arg(long)]
    pub source: Option<String>,
}

impl OwnershipArgs {
    pub fn owner_id(&self) -> Uuid {
        self.owner.unwrap_or_else(Uuid::new_v4)
    }
}

/// Load `.env`, configuration files and environment, then start logging
pub fn bootstrap() -> anyhow::Result<AppConfig> {
    dotenvy::dotenv().ok();

    let config = AppConfig::load()?;
    logging::init_logging(&config.logging);

    Ok(config)
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
