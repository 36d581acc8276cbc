//! Events domain - document events and the publisher contract

mod event;
mod publisher;

pub use event::{DocumentProcessingFailed, DocumentUploaded, EmailParsed, UploadDetails};
pub use publisher::EventPublisher;

#[cfg(test)]
pub use publisher::MockEventPublisher;
