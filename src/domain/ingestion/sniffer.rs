//! Document type and MIME detection

use std::path::Path;

use crate::domain::document::DocumentType;

const OCTET_STREAM: &str = "application/octet-stream";
const PDF_MAGIC: &[u8] = b"%PDF-";
const ZIP_MAGIC: &[u8] = b"PK";

/// Lower-cased extension without the dot, if the filename has one
pub fn extension_of(filename: &str) -> Option<String> {
    Path::new(filename.trim())
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_lowercase())
        .filter(|ext| !ext.is_empty())
}

/// Classifies files by extension, declared content type and leading bytes
#[derive(Debug, Clone, Copy)]
pub struct FormatSniffer {
    default_type: DocumentType,
}

impl Default for FormatSniffer {
    fn default() -> Self {
        Self::new(DocumentType::Txt)
    }
}

impl FormatSniffer {
    /// `default_type` is used when the extension maps to no known type
    pub fn new(default_type: DocumentType) -> Self {
        Self { default_type }
    }

    pub fn document_type(&self, filename: &str) -> DocumentType {
        extension_of(filename)
            .and_then(|ext| DocumentType::from_extension(&ext))
            .unwrap_or(self.default_type)
    }

    /// Resolve the MIME type: declared, then extension guess, then magic bytes
    pub fn mime_type(
        &self,
        filename: &str,
        declared_content_type: Option<&str>,
        content: Option<&[u8]>,
    ) -> String {
        if let Some(declared) = declared_content_type.map(str::trim).filter(|d| !d.is_empty()) {
            return declared.to_string();
        }

        if let Some(guess) = mime_guess::from_path(filename.trim()).first_raw() {
            return guess.to_string();
        }

        content
            .and_then(|bytes| sniff_magic(bytes, extension_of(filename).as_deref()))
            .unwrap_or(OCTET_STREAM)
            .to_string()
    }

    pub fn classify(
        &self,
        filename: &str,
        declared_content_type: Option<&str>,
        content: Option<&[u8]>,
    ) -> (DocumentType, String) {
        (
            self.document_type(filename),
            self.mime_type(filename, declared_content_type, content),
        )
    }
}

fn sniff_magic(content: &[u8], ext: Option<&str>) -> Option<&'static str> {
    if content.starts_with(PDF_MAGIC) {
        return Some(DocumentType::Pdf.canonical_mime_type());
    }

    // Only reached for OOXML extensions missing from the guess table
    if content.starts_with(ZIP_MAGIC) {
        return match ext {
            Some("docx") => Some(DocumentType::Docx.canonical_mime_type()),
            Some("xlsx") => Some(DocumentType::Xlsx.canonical_mime_type()),
            Some("pptx") => Some(DocumentType::Pptx.canonical_mime_type()),
            _ => None,
        };
    }

    None
}
