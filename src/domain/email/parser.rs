use super::{ParseFailure, ParsedEmail};

#[cfg(test)]
use mockall::automock;

/// Turns raw RFC 822 bytes into a `ParsedEmail`
#[cfg_attr(test, automock)]
pub trait EmailParser: Send + Sync {
    fn parse(&self, raw: &[u8]) -> Result<ParsedEmail, ParseFailure>;
}
