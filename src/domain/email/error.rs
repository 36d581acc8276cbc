use thiserror::Error;

/// Why raw bytes could not be turned into a `ParsedEmail`
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseFailure {
    #[error("Content is not in email format")]
    NotEmailFormat,

    #[error("Malformed header: {message}")]
    MalformedHeader { message: String },

    #[error("Unsupported body encoding: {encoding}")]
    UnsupportedBodyEncoding { encoding: String },
}

impl ParseFailure {
    pub fn malformed_header(message: impl Into<String>) -> Self {
        Self::MalformedHeader {
            message: message.into(),
        }
    }

    pub fn unsupported_encoding(encoding: impl Into<String>) -> Self {
        Self::UnsupportedBodyEncoding {
            encoding: encoding.into(),
        }
    }
}
