//! Observability infrastructure - ingestion metrics

mod metrics;

pub use self::metrics::{Outcome, record_attachment_skipped, record_email, record_upload};
