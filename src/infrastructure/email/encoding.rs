//! Transfer-encoding and charset decoding for MIME parts

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use encoding_rs::Encoding;

use crate::domain::email::ParseFailure;

/// Base64 engine that tolerates missing padding, as mail clients often emit it
const LENIENT_BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Decode a part body according to its `Content-Transfer-Encoding`
pub fn decode_transfer(body: &[u8], transfer_encoding: Option<&str>) -> Result<Vec<u8>, ParseFailure> {
    let encoding = transfer_encoding
        .map(|e| e.trim().to_ascii_lowercase())
        .unwrap_or_default();

    match encoding.as_str() {
        "" | "7bit" | "8bit" | "binary" => Ok(body.to_vec()),
        "quoted-printable" => Ok(decode_quoted_printable(body)),
        "base64" => decode_base64(body).ok_or_else(|| ParseFailure::unsupported_encoding("base64")),
        other => Err(ParseFailure::unsupported_encoding(other)),
    }
}

/// Base64 with embedded line breaks and whitespace
pub fn decode_base64(body: &[u8]) -> Option<Vec<u8>> {
    let compact: Vec<u8> = body
        .iter()
        .copied()
        .filter(|b| !b.is_ascii_whitespace())
        .collect();

    LENIENT_BASE64.decode(compact).ok()
}

/// Quoted-printable body decoding; malformed escapes are kept literally
pub fn decode_quoted_printable(body: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(body.len());
    let mut i = 0;

    while i < body.len() {
        if body[i] != b'=' {
            out.push(body[i]);
            i += 1;
            continue;
        }

        // Soft line break
        if body[i + 1..].starts_with(b"\r\n") {
            i += 3;
            continue;
        }
        if body[i + 1..].starts_with(b"\n") {
            i += 2;
            continue;
        }

        match body.get(i + 1..i + 3).and_then(hex_byte) {
            Some(byte) => {
                out.push(byte);
                i += 3;
            }
            None => {
                out.push(b'=');
                i += 1;
            }
        }
    }

    out
}

/// `Q` encoding from RFC 2047: like quoted-printable, with `_` for space
pub fn decode_q_word(text: &str) -> Option<Vec<u8>> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'_' => {
                out.push(b' ');
                i += 1;
            }
            b'=' => {
                out.push(bytes.get(i + 1..i + 3).and_then(hex_byte)?);
                i += 3;
            }
            b => {
                out.push(b);
                i += 1;
            }
        }
    }

    Some(out)
}

/// Decode `%XX` escapes, as used by RFC 2231 extended parameters
pub fn decode_percent(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;

    while i < bytes.len() {
        if bytes[i] == b'%' {
            if let Some(byte) = bytes.get(i + 1..i + 3).and_then(hex_byte) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }

    out
}

fn hex_byte(pair: &[u8]) -> Option<u8> {
    if pair.len() != 2 || !pair.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }
    let text = std::str::from_utf8(pair).ok()?;
    u8::from_str_radix(text, 16).ok()
}

/// Resolve a charset label, ignoring an RFC 2231 `*language` suffix
pub fn encoding_for_charset(charset: &str) -> Option<&'static Encoding> {
    let label = charset.split('*').next().unwrap_or_default().trim();
    Encoding::for_label(label.as_bytes())
}

/// Decode text in the given charset; unknown charsets fall back to UTF-8,
/// undecodable bytes become U+FFFD
pub fn decode_text(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = charset
        .and_then(encoding_for_charset)
        .unwrap_or(encoding_rs::UTF_8);

    let (text, _, _) = encoding.decode(bytes);
    text.into_owned()
}

/// Strict variant used for encoded words; `None` on any malformed byte
pub fn decode_text_strict(bytes: &[u8], charset: &str) -> Option<String> {
    encoding_for_charset(charset)?
        .decode_without_bom_handling_and_without_replacement(bytes)
        .map(|text| text.into_owned())
}
