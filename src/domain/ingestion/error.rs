//! Ingestion error taxonomy

use std::fmt;

use thiserror::Error;
use uuid::Uuid;

use crate::domain::email::ParseFailure;
use crate::domain::error::DomainError;

/// Container format whose leading bytes are checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureKind {
    Pdf,
    ZipContainer,
}

impl fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pdf => write!(f, "PDF"),
            Self::ZipContainer => write!(f, "ZIP container (docx/xlsx/pptx)"),
        }
    }
}

/// Why a file was refused before anything was stored
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationFailure {
    #[error("Filename is required")]
    EmptyFilename,

    #[error("Filename '{filename}' is not safe")]
    UnsafeFilename { filename: String },

    #[error("File is empty")]
    EmptyContent,

    #[error("File size {actual} bytes exceeds maximum allowed size ({max} bytes)")]
    SizeExceeded { actual: u64, max: u64 },

    #[error("File type '.{ext}' is not allowed (allowed: {})", .allowed.join(", "))]
    ExtensionNotAllowed { ext: String, allowed: Vec<String> },

    #[error("Invalid {expected_kind} file format")]
    InvalidSignature { expected_kind: SignatureKind },

    #[error("Text file encoding is not supported (UTF-8 or the configured legacy encoding required)")]
    UnsupportedEncoding,
}

impl ValidationFailure {
    /// Policy rejections, as opposed to malformed input
    pub fn is_business_rule(&self) -> bool {
        matches!(
            self,
            Self::SizeExceeded { .. } | Self::ExtensionNotAllowed { .. }
        )
    }
}

/// Errors surfaced by the ingestion flows
#[derive(Debug, Error)]
pub enum IngestError {
    /// Malformed, empty or unsafe input
    #[error("Validation failed: {0}")]
    Validation(ValidationFailure),

    /// Input refused by size or type policy
    #[error("Business rule violation: {0}")]
    BusinessRule(ValidationFailure),

    /// The email could not be parsed
    #[error("Email processing failed for owner {owner_id}: {source}")]
    EmailProcessing {
        owner_id: Uuid,
        #[source]
        source: ParseFailure,
    },

    /// A collaborator failed during an ingestion attempt
    #[error("Processing failed: {message}: {source}")]
    Processing {
        message: String,
        #[source]
        source: DomainError,
    },
}

impl IngestError {
    pub fn processing(message: impl Into<String>, source: DomainError) -> Self {
        Self::Processing {
            message: message.into(),
            source,
        }
    }

    /// The validation failure behind a validation or business-rule error
    pub fn validation_failure(&self) -> Option<&ValidationFailure> {
        match self {
            Self::Validation(failure) | Self::BusinessRule(failure) => Some(failure),
            _ => None,
        }
    }

    /// Short label for logs and metrics
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::BusinessRule(_) => "business_rule",
            Self::EmailProcessing { .. } => "email_processing",
            Self::Processing { .. } => "processing",
        }
    }
}

impl From<ValidationFailure> for IngestError {
    fn from(failure: ValidationFailure) -> Self {
        if failure.is_business_rule() {
            Self::BusinessRule(failure)
        } else {
            Self::Validation(failure)
        }
    }
}
