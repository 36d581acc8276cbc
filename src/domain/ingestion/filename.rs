//! Filename safety checks and sanitization

const MAX_FILENAME_CHARS: usize = 255;
const FALLBACK_NAME: &str = "unnamed_file";

const FORBIDDEN_SEQUENCES: &[&str] = &["..", "/", "\\"];
const FORBIDDEN_CHARS: &[char] = &['<', '>', ':', '"', '|', '?', '*'];

const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];

/// Stateless filename policy shared by uploads and attachments
#[derive(Debug, Clone, Copy, Default)]
pub struct FilenameSanitizer;

impl FilenameSanitizer {
    /// True when the name can be stored without rewriting
    pub fn is_safe(filename: &str) -> bool {
        if filename.is_empty() || filename.chars().count() > MAX_FILENAME_CHARS {
            return false;
        }

        if FORBIDDEN_SEQUENCES.iter().any(|seq| filename.contains(seq))
            || filename.contains(FORBIDDEN_CHARS)
        {
            return false;
        }

        // Device names are reserved regardless of extension
        let stem = filename.split('.').next().unwrap_or_default().to_uppercase();
        !RESERVED_NAMES.contains(&stem.as_str())
    }

    /// Replace anything outside `[alnum . - _ space]`, collapse `_` runs and trim
    pub fn sanitize(filename: &str) -> String {
        let mut sanitized = String::with_capacity(filename.len());

        for c in filename.chars() {
            let c = if c.is_alphanumeric() || matches!(c, '.' | '-' | '_' | ' ') {
                c
            } else {
                '_'
            };

            if c == '_' && sanitized.ends_with('_') {
                continue;
            }
            sanitized.push(c);
        }

        let trimmed = sanitized.trim_matches(|c| c == '.' || c == ' ');
        if trimmed.is_empty() {
            FALLBACK_NAME.to_string()
        } else {
            trimmed.to_string()
        }
    }

    /// Sanitize only when the name fails `is_safe`
    pub fn make_safe(filename: &str) -> String {
        if Self::is_safe(filename) {
            filename.to_string()
        } else {
            Self::sanitize(filename)
        }
    }
}
