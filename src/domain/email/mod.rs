//! Email domain: parsed message model and parser contract

mod error;
mod model;
mod parser;
mod render;

pub use error::ParseFailure;
pub use model::{
    AttachmentSkipReason, EmailAttachment, EmailMetadata, ParsedEmail, SkippedAttachment,
};
pub use parser::EmailParser;
pub use render::{body_filename, render_body_text};

#[cfg(test)]
pub use parser::MockEmailParser;
