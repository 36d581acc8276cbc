//! Email parsing infrastructure

mod encoding;
mod headers;
mod mime_parser;

pub use mime_parser::{MimeEmailParser, looks_like_email};
