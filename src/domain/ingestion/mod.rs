//! Ingestion rules: classification, validation and filename policy

mod config;
mod error;
mod filename;
mod sniffer;
mod validation;

pub use config::{FilenamePolicy, IngestionConfig};
pub use error::{IngestError, SignatureKind, ValidationFailure};
pub use filename::FilenameSanitizer;
pub use sniffer::{FormatSniffer, extension_of};
pub use validation::FileValidator;
