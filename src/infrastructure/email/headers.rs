//! Header block parsing, RFC 2047 encoded words and RFC 2231 parameters

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::encoding::{
    decode_base64, decode_percent, decode_q_word, decode_text, decode_text_strict,
};
use crate::domain::email::ParseFailure;

static ENCODED_WORD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"=\?([^?\s]+)\?([bBqQ])\?([^?\s]*)\?=").unwrap());

/// Unfolded headers in the order they appeared
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderBlock {
    entries: Vec<(String, String)>,
}

impl HeaderBlock {
    /// First value for a case-insensitive header name
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Name to value; a repeated name keeps its last value
    pub fn to_map(&self) -> HashMap<String, String> {
        self.entries.iter().cloned().collect()
    }
}

fn is_header_name(name: &str) -> bool {
    !name.is_empty() && name.bytes().all(|b| (33..=126).contains(&b) && b != b':')
}

/// Parse a raw header block. The first line must be a header; later lines that
/// are neither headers nor continuations are ignored.
pub fn parse_header_block(block: &[u8]) -> Result<HeaderBlock, ParseFailure> {
    let text = String::from_utf8_lossy(block);
    let mut entries: Vec<(String, String)> = Vec::new();

    for line in text.split('\n') {
        let line = line.strip_suffix('\r').unwrap_or(line);
        if line.is_empty() {
            continue;
        }

        if line.starts_with([' ', '\t']) {
            let Some((_, value)) = entries.last_mut() else {
                return Err(ParseFailure::malformed_header(
                    "header block starts with a continuation line",
                ));
            };
            let continuation = line.trim();
            if !continuation.is_empty() {
                if !value.is_empty() {
                    value.push(' ');
                }
                value.push_str(continuation);
            }
            continue;
        }

        match line.split_once(':') {
            Some((name, value)) if is_header_name(name) => {
                entries.push((name.to_string(), value.trim().to_string()));
            }
            _ if entries.is_empty() => {
                return Err(ParseFailure::malformed_header(format!(
                    "expected a header line, found '{}'",
                    truncate(line, 40)
                )));
            }
            _ => {}
        }
    }

    Ok(HeaderBlock { entries })
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Decode RFC 2047 encoded words. Whitespace between adjacent encoded words is
/// dropped. If any word fails to decode the raw value is returned unchanged.
pub fn decode_encoded_words(value: &str) -> String {
    if !value.contains("=?") {
        return value.to_string();
    }

    let mut out = String::with_capacity(value.len());
    let mut last = 0;
    let mut previous_was_word = false;

    for caps in ENCODED_WORD.captures_iter(value) {
        let (Some(word), Some(charset), Some(kind), Some(text)) =
            (caps.get(0), caps.get(1), caps.get(2), caps.get(3))
        else {
            continue;
        };

        let between = &value[last..word.start()];
        if !(previous_was_word && between.trim().is_empty()) {
            out.push_str(between);
        }

        let bytes = match kind.as_str() {
            "b" | "B" => decode_base64(text.as_str().as_bytes()),
            _ => decode_q_word(text.as_str()),
        };
        match bytes.and_then(|b| decode_text_strict(&b, charset.as_str())) {
            Some(decoded) => out.push_str(&decoded),
            None => return value.to_string(),
        }

        last = word.end();
        previous_was_word = true;
    }

    out.push_str(&value[last..]);
    out
}

/// A structured header value such as `Content-Type` or `Content-Disposition`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterizedValue {
    /// Lower-cased main value, e.g. `text/plain` or `attachment`
    pub value: String,
    params: HashMap<String, String>,
}

impl ParameterizedValue {
    pub fn parse(raw: &str) -> Self {
        let mut segments = split_unquoted(raw, ';').into_iter();
        let value = segments
            .next()
            .map(|v| v.trim().to_ascii_lowercase())
            .unwrap_or_default();

        let params = segments
            .filter_map(|segment| {
                let (key, val) = segment.split_once('=')?;
                let key = key.trim().to_ascii_lowercase();
                (!key.is_empty()).then(|| (key, unquote(val.trim())))
            })
            .collect();

        Self { value, params }
    }

    /// Parameter lookup honouring RFC 2231 extended and continued forms
    pub fn param(&self, name: &str) -> Option<String> {
        if let Some(extended) = self.params.get(&format!("{}*", name)) {
            return Some(decode_extended_value(extended));
        }

        if self.params.contains_key(&format!("{}*0", name))
            || self.params.contains_key(&format!("{}*0*", name))
        {
            return Some(self.continued_param(name));
        }

        self.params.get(name).cloned()
    }

    fn continued_param(&self, name: &str) -> String {
        let mut bytes = Vec::new();
        let mut charset: Option<String> = None;

        for index in 0.. {
            if let Some(segment) = self.params.get(&format!("{}*{}*", name, index)) {
                let encoded = if index == 0 {
                    let (cs, rest) = split_charset_prefix(segment);
                    charset = cs;
                    rest
                } else {
                    segment.as_str()
                };
                bytes.extend(decode_percent(encoded));
            } else if let Some(segment) = self.params.get(&format!("{}*{}", name, index)) {
                bytes.extend_from_slice(segment.as_bytes());
            } else {
                break;
            }
        }

        decode_text(&bytes, charset.as_deref())
    }
}

/// `charset'language'percent-encoded`
fn decode_extended_value(raw: &str) -> String {
    let (charset, encoded) = split_charset_prefix(raw);
    decode_text(&decode_percent(encoded), charset.as_deref())
}

fn split_charset_prefix(raw: &str) -> (Option<String>, &str) {
    let mut parts = raw.splitn(3, '\'');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(charset), Some(_language), Some(rest)) => {
            let charset = (!charset.is_empty()).then(|| charset.to_string());
            (charset, rest)
        }
        _ => (None, raw),
    }
}

fn split_unquoted(raw: &str, separator: char) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut escaped = false;

    for c in raw.chars() {
        if escaped {
            current.push(c);
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => {
                current.push(c);
                escaped = true;
            }
            '"' => {
                in_quotes = !in_quotes;
                current.push(c);
            }
            c if c == separator && !in_quotes => segments.push(std::mem::take(&mut current)),
            c => current.push(c),
        }
    }
    segments.push(current);
    segments
}

fn unquote(value: &str) -> String {
    let Some(inner) = value
        .strip_prefix('"')
        .and_then(|v| v.strip_suffix('"'))
    else {
        return value.to_string();
    };

    let mut out = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(next) = chars.next() {
                out.push(next);
            }
        } else {
            out.push(c);
        }
    }
    out
}
