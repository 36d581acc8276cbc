//! Ingestion metrics
//!
//! Counters go through the `metrics` facade; installing an exporter is left to the host.

use std::time::Duration;

use metrics::{counter, histogram};

/// Outcome label shared by upload and email metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Rejected,
    Error,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Rejected => "rejected",
            Self::Error => "error",
        }
    }
}

/// Record a single `upload_file` attempt
pub fn record_upload(outcome: Outcome, document_type: &str, duration: Duration) {
    let labels = [
        ("status", outcome.as_str().to_string()),
        ("document_type", document_type.to_string()),
    ];

    counter!("ingest_uploads_total", &labels).increment(1);
    histogram!("ingest_upload_duration_seconds", &labels).record(duration.as_secs_f64());
}

/// Record a single `parse_email` attempt
pub fn record_email(outcome: Outcome, attachments_stored: usize) {
    let labels = [("status", outcome.as_str().to_string())];

    counter!("ingest_emails_total", &labels).increment(1);
    if attachments_stored > 0 {
        counter!("ingest_attachments_stored_total").increment(attachments_stored as u64);
    }
}

/// Record an attachment that did not become a document
pub fn record_attachment_skipped(reason: &str) {
    counter!("ingest_attachments_skipped_total", "reason" => reason.to_string()).increment(1);
}
