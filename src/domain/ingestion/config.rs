//! Ingestion limits and policies

use encoding_rs::Encoding;
use serde::{Deserialize, Serialize};

use crate::domain::document::DocumentType;
use crate::domain::error::DomainError;

const MIB: u64 = 1024 * 1024;

/// What to do with a filename that fails the safety check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilenamePolicy {
    /// Store the sanitized form
    #[default]
    Sanitize,
    /// Refuse the upload
    Reject,
}

/// Limits and allow-lists applied by the ingestion flows
#[derive(Debug, Clone)]
pub struct IngestionConfig {
    /// Upper bound for a single uploaded file, in bytes
    pub max_file_size: u64,
    /// Lower-case extensions accepted by `upload_file`
    pub allowed_extensions: Vec<String>,
    /// Attachments larger than this are dropped by the parser
    pub max_attachment_size: u64,
    /// Lower-case extensions kept when splitting an email
    pub allowed_attachment_extensions: Vec<String>,
    /// Fallback encoding for text files that are not UTF-8
    pub legacy_encoding: &'static Encoding,
    /// Type given to files whose extension maps to nothing
    pub default_document_type: DocumentType,
    pub filename_policy: FilenamePolicy,
    /// Attachments uploaded concurrently per email
    pub attachment_concurrency: usize,
}

fn to_owned_list(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for IngestionConfig {
    fn default() -> Self {
        Self {
            max_file_size: 100 * MIB,
            allowed_extensions: to_owned_list(&[
                "pdf", "docx", "doc", "txt", "html", "htm", "md", "pptx", "ppt", "xlsx", "xls",
                "csv",
            ]),
            max_attachment_size: 50 * MIB,
            allowed_attachment_extensions: to_owned_list(&[
                "pdf", "docx", "doc", "txt", "html", "htm",
            ]),
            legacy_encoding: encoding_rs::EUC_KR,
            default_document_type: DocumentType::Txt,
            filename_policy: FilenamePolicy::default(),
            attachment_concurrency: 1,
        }
    }
}

impl IngestionConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_file_size(mut self, bytes: u64) -> Self {
        self.max_file_size = bytes;
        self
    }

    pub fn with_allowed_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_extensions = normalize_extensions(extensions);
        self
    }

    pub fn with_max_attachment_size(mut self, bytes: u64) -> Self {
        self.max_attachment_size = bytes;
        self
    }

    pub fn with_allowed_attachment_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.allowed_attachment_extensions = normalize_extensions(extensions);
        self
    }

    /// Set the legacy encoding by WHATWG label (e.g. `windows-949`)
    pub fn with_legacy_encoding_label(mut self, label: &str) -> Result<Self, DomainError> {
        self.legacy_encoding = Encoding::for_label(label.trim().as_bytes()).ok_or_else(|| {
            DomainError::configuration(format!("Unknown text encoding label '{}'", label))
        })?;
        Ok(self)
    }

    pub fn with_default_document_type(mut self, document_type: DocumentType) -> Self {
        self.default_document_type = document_type;
        self
    }

    pub fn with_filename_policy(mut self, policy: FilenamePolicy) -> Self {
        self.filename_policy = policy;
        self
    }

    /// Values below 1 are raised to 1
    pub fn with_attachment_concurrency(mut self, concurrency: usize) -> Self {
        self.attachment_concurrency = concurrency.max(1);
        self
    }

    pub fn is_attachment_extension_allowed(&self, ext: &str) -> bool {
        self.allowed_attachment_extensions.iter().any(|e| e == ext)
    }
}

/// Lower-case, strip leading dots, drop blanks
fn normalize_extensions<I, S>(extensions: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    extensions
        .into_iter()
        .map(|e| e.as_ref().trim().trim_start_matches('.').to_lowercase())
        .filter(|e| !e.is_empty())
        .collect()
}
