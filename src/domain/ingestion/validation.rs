//! Upload validation: size, extension allow-list and content signatures

use encoding_rs::Encoding;

use super::config::IngestionConfig;
use super::error::{SignatureKind, ValidationFailure};
use super::sniffer::extension_of;

const PDF_SIGNATURE: &[u8] = b"%PDF-";
const ZIP_SIGNATURES: &[&[u8]] = &[b"PK\x03\x04", b"PK\x05\x06", b"PK\x07\x08"];
const OOXML_MIME_PREFIX: &str = "application/vnd.openxmlformats-officedocument.";

/// Content family that decides which signature check applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FileFamily {
    Pdf,
    ZipContainer,
    Text,
}

impl FileFamily {
    fn from_extension(ext: &str) -> Option<Self> {
        match ext {
            "pdf" => Some(Self::Pdf),
            "docx" | "xlsx" | "pptx" => Some(Self::ZipContainer),
            "txt" | "md" | "html" | "htm" | "csv" => Some(Self::Text),
            _ => None,
        }
    }

    fn from_content_type(content_type: &str) -> Option<Self> {
        let essence = content_type
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_lowercase();

        if essence == "application/pdf" {
            Some(Self::Pdf)
        } else if essence.starts_with(OOXML_MIME_PREFIX) {
            Some(Self::ZipContainer)
        } else {
            None
        }
    }
}

/// Validates uploaded bytes against size, type and signature rules
#[derive(Debug, Clone)]
pub struct FileValidator {
    max_size: u64,
    allowed_extensions: Vec<String>,
    legacy_encoding: &'static Encoding,
}

impl FileValidator {
    pub fn new(
        max_size: u64,
        allowed_extensions: Vec<String>,
        legacy_encoding: &'static Encoding,
    ) -> Self {
        Self {
            max_size,
            allowed_extensions,
            legacy_encoding,
        }
    }

    pub fn from_config(config: &IngestionConfig) -> Self {
        Self::new(
            config.max_file_size,
            config.allowed_extensions.clone(),
            config.legacy_encoding,
        )
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Checks run in order and stop at the first failure
    pub fn validate(
        &self,
        filename: &str,
        content: &[u8],
        declared_content_type: Option<&str>,
    ) -> Result<(), ValidationFailure> {
        if content.is_empty() {
            return Err(ValidationFailure::EmptyContent);
        }

        let actual = content.len() as u64;
        if actual > self.max_size {
            return Err(ValidationFailure::SizeExceeded {
                actual,
                max: self.max_size,
            });
        }

        let ext = extension_of(filename).unwrap_or_default();
        if !self.allowed_extensions.contains(&ext) {
            return Err(ValidationFailure::ExtensionNotAllowed {
                ext,
                allowed: self.allowed_extensions.clone(),
            });
        }

        let family = FileFamily::from_extension(&ext)
            .or_else(|| declared_content_type.and_then(FileFamily::from_content_type));

        match family {
            Some(FileFamily::Pdf) if !content.starts_with(PDF_SIGNATURE) => {
                Err(ValidationFailure::InvalidSignature {
                    expected_kind: SignatureKind::Pdf,
                })
            }
            Some(FileFamily::ZipContainer)
                if !ZIP_SIGNATURES.iter().any(|sig| content.starts_with(sig)) =>
            {
                Err(ValidationFailure::InvalidSignature {
                    expected_kind: SignatureKind::ZipContainer,
                })
            }
            Some(FileFamily::Text) if self.detect_text_encoding(content).is_none() => {
                Err(ValidationFailure::UnsupportedEncoding)
            }
            _ => Ok(()),
        }
    }

    /// UTF-8 first, then the legacy encoding; `None` when neither decodes cleanly
    pub fn detect_text_encoding(&self, content: &[u8]) -> Option<&'static Encoding> {
        if std::str::from_utf8(content).is_ok() {
            return Some(encoding_rs::UTF_8);
        }

        self.legacy_encoding
            .decode_without_bom_handling_and_without_replacement(content)
            .map(|_| self.legacy_encoding)
    }

    /// Whether the filename's extension belongs to the text family
    pub fn is_text_file(filename: &str) -> bool {
        extension_of(filename)
            .and_then(|ext| FileFamily::from_extension(&ext))
            .is_some_and(|family| family == FileFamily::Text)
    }
}
