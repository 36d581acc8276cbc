//! Parsed email value types

use std::collections::HashMap;
use std::fmt;

use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A file carried inside an email
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailAttachment {
    pub filename: String,
    pub content: Bytes,
    pub content_type: String,
    pub size: u64,
}

impl EmailAttachment {
    pub fn new(
        filename: impl Into<String>,
        content: impl Into<Bytes>,
        content_type: impl Into<String>,
    ) -> Self {
        let content = content.into();
        Self {
            filename: filename.into(),
            size: content.len() as u64,
            content,
            content_type: content_type.into(),
        }
    }
}

/// Why the parser dropped an attachment
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum AttachmentSkipReason {
    TooLarge { max: u64 },
    Empty,
    /// Content could not be decoded with its transfer encoding
    Undecodable { encoding: String },
}

impl fmt::Display for AttachmentSkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooLarge { max } => write!(f, "exceeds maximum attachment size ({} bytes)", max),
            Self::Empty => write!(f, "attachment is empty"),
            Self::Undecodable { encoding } => {
                write!(f, "attachment content is not valid {}", encoding)
            }
        }
    }
}

/// An attachment the parser saw but did not keep
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkippedAttachment {
    pub filename: String,
    pub size: u64,
    pub reason: AttachmentSkipReason,
}

/// Structured view of an RFC 822 message
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedEmail {
    pub subject: String,
    pub sender: String,
    /// To, Cc and Bcc in header order, duplicates kept
    pub recipients: Vec<String>,
    pub date: Option<DateTime<FixedOffset>>,
    pub body_text: String,
    pub body_html: Option<String>,
    pub message_id: String,
    pub attachments: Vec<EmailAttachment>,
    pub skipped_attachments: Vec<SkippedAttachment>,
    /// Top-level headers, unfolded; the last occurrence of a name wins
    pub headers: HashMap<String, String>,
}

impl ParsedEmail {
    pub fn has_html(&self) -> bool {
        self.body_html.is_some()
    }

    pub fn metadata(&self) -> EmailMetadata {
        EmailMetadata {
            subject: self.subject.clone(),
            sender: self.sender.clone(),
            recipients: self.recipients.clone(),
            date: self.date,
            message_id: self.message_id.clone(),
            attachment_count: self.attachments.len(),
            has_html: self.has_html(),
            body_length: self.body_text.chars().count(),
        }
    }
}

/// Summary published with the "email parsed" event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailMetadata {
    pub subject: String,
    pub sender: String,
    pub recipients: Vec<String>,
    pub date: Option<DateTime<FixedOffset>>,
    pub message_id: String,
    pub attachment_count: usize,
    pub has_html: bool,
    /// Plain body length in characters
    pub body_length: usize,
}
