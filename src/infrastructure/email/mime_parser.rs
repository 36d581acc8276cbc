//! RFC 822 / MIME email parser

use chrono::{DateTime, FixedOffset};

use super::encoding::{decode_text, decode_transfer};
use super::headers::{HeaderBlock, ParameterizedValue, decode_encoded_words, parse_header_block};
use crate::domain::email::{
    AttachmentSkipReason, EmailAttachment, EmailParser, ParseFailure, ParsedEmail,
    SkippedAttachment,
};

const MIN_EMAIL_BYTES: usize = 10;
const HEADER_PROBE_LINES: usize = 10;
const MAX_MULTIPART_DEPTH: usize = 32;
const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Parses raw messages into `ParsedEmail`, dropping oversized attachments
#[derive(Debug, Clone)]
pub struct MimeEmailParser {
    max_attachment_size: u64,
}

impl MimeEmailParser {
    pub fn new(max_attachment_size: u64) -> Self {
        Self {
            max_attachment_size,
        }
    }

    pub fn max_attachment_size(&self) -> u64 {
        self.max_attachment_size
    }

    fn walk(
        &self,
        headers: &HeaderBlock,
        body: &[u8],
        depth: usize,
        out: &mut Collected,
    ) -> Result<(), ParseFailure> {
        let content_type = headers
            .get("Content-Type")
            .map(ParameterizedValue::parse)
            .filter(|ct| !ct.value.is_empty())
            .unwrap_or_else(|| ParameterizedValue::parse(DEFAULT_CONTENT_TYPE));

        if content_type.value.starts_with("multipart/") {
            if depth >= MAX_MULTIPART_DEPTH {
                return Err(ParseFailure::malformed_header("multipart nesting too deep"));
            }

            let boundary = content_type.param("boundary").ok_or_else(|| {
                ParseFailure::malformed_header(format!(
                    "{} part without a boundary parameter",
                    content_type.value
                ))
            })?;

            for part in split_multipart(body, &boundary) {
                let (head, part_body) = split_head_body(part);
                let part_headers = parse_header_block(head)?;
                self.walk(&part_headers, part_body, depth + 1, out)?;
            }
            return Ok(());
        }

        let disposition = headers
            .get("Content-Disposition")
            .map(ParameterizedValue::parse)
            .unwrap_or_default();
        let transfer_encoding = headers.get("Content-Transfer-Encoding");

        if disposition.value == "attachment" {
            let Some(filename) = disposition
                .param("filename")
                .or_else(|| content_type.param("name"))
                .map(|name| decode_encoded_words(name.trim()))
                .filter(|name| !name.is_empty())
            else {
                return Ok(());
            };

            let content = match decode_transfer(body, transfer_encoding) {
                Ok(content) => content,
                Err(failure) => {
                    let encoding = match failure {
                        ParseFailure::UnsupportedBodyEncoding { encoding } => encoding,
                        other => return Err(other),
                    };
                    out.skipped.push(SkippedAttachment {
                        filename,
                        size: body.len() as u64,
                        reason: AttachmentSkipReason::Undecodable { encoding },
                    });
                    return Ok(());
                }
            };
            let size = content.len() as u64;

            if content.is_empty() {
                out.skipped.push(SkippedAttachment {
                    filename,
                    size,
                    reason: AttachmentSkipReason::Empty,
                });
            } else if size > self.max_attachment_size {
                out.skipped.push(SkippedAttachment {
                    filename,
                    size,
                    reason: AttachmentSkipReason::TooLarge {
                        max: self.max_attachment_size,
                    },
                });
            } else {
                out.attachments
                    .push(EmailAttachment::new(filename, content, content_type.value));
            }
            return Ok(());
        }

        match content_type.value.as_str() {
            "text/plain" => {
                let content = decode_transfer(body, transfer_encoding)?;
                let charset = content_type.param("charset");
                out.body_text
                    .push_str(&decode_text(&content, charset.as_deref()));
            }
            "text/html" if out.body_html.is_none() => {
                let content = decode_transfer(body, transfer_encoding)?;
                let charset = content_type.param("charset");
                out.body_html = Some(decode_text(&content, charset.as_deref()));
            }
            _ => {}
        }

        Ok(())
    }
}

impl EmailParser for MimeEmailParser {
    fn parse(&self, raw: &[u8]) -> Result<ParsedEmail, ParseFailure> {
        if !looks_like_email(raw) {
            return Err(ParseFailure::NotEmailFormat);
        }

        let (head, body) = split_head_body(strip_mbox_envelope(raw));
        let headers = parse_header_block(head)?;

        let mut collected = Collected::default();
        self.walk(&headers, body, 0, &mut collected)?;

        let header_text = |name: &str| {
            headers
                .get(name)
                .map(|v| decode_encoded_words(v).trim().to_string())
                .unwrap_or_default()
        };

        Ok(ParsedEmail {
            subject: header_text("Subject"),
            sender: header_text("From"),
            recipients: collect_recipients(&headers),
            date: headers.get("Date").and_then(parse_date),
            body_text: collected.body_text.trim().to_string(),
            body_html: collected.body_html,
            message_id: headers.get("Message-ID").unwrap_or_default().trim().to_string(),
            attachments: collected.attachments,
            skipped_attachments: collected.skipped,
            headers: headers.to_map(),
        })
    }
}

#[derive(Debug, Default)]
struct Collected {
    body_text: String,
    body_html: Option<String>,
    attachments: Vec<EmailAttachment>,
    skipped: Vec<SkippedAttachment>,
}

/// Cheap plausibility check run before any parsing
pub fn looks_like_email(raw: &[u8]) -> bool {
    if raw.len() < MIN_EMAIL_BYTES {
        return false;
    }

    let Ok(text) = std::str::from_utf8(raw) else {
        return false;
    };

    text.split('\n')
        .take(HEADER_PROBE_LINES)
        .any(is_header_like_line)
}

fn is_header_like_line(line: &str) -> bool {
    if line.starts_with([' ', '\t']) {
        return false;
    }

    let Some((key, _)) = line.split_once(':') else {
        return false;
    };

    let stripped: String = key.trim().chars().filter(|c| *c != '-' && *c != '_').collect();
    !stripped.is_empty() && stripped.chars().all(char::is_alphanumeric)
}

/// To, Cc and Bcc split on commas, in header order
fn collect_recipients(headers: &HeaderBlock) -> Vec<String> {
    ["To", "Cc", "Bcc"]
        .iter()
        .filter_map(|name| headers.get(name))
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|addr| !addr.is_empty())
        .map(str::to_string)
        .collect()
}

/// RFC 2822 date, ignoring trailing comments such as `(KST)`
fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let without_comment = match value.find('(') {
        Some(index) => &value[..index],
        None => value,
    };

    DateTime::parse_from_rfc2822(without_comment.trim()).ok()
}

/// Drop a leading mbox `From sender date` envelope line
fn strip_mbox_envelope(raw: &[u8]) -> &[u8] {
    if !raw.starts_with(b"From ") {
        return raw;
    }

    match raw.iter().position(|b| *b == b'\n') {
        Some(end) => &raw[end + 1..],
        None => raw,
    }
}

/// Split an entity at the first empty line
fn split_head_body(entity: &[u8]) -> (&[u8], &[u8]) {
    let mut pos = 0;

    while pos < entity.len() {
        let line_end = entity[pos..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|i| pos + i)
            .unwrap_or(entity.len());
        let line = &entity[pos..line_end];

        if line.is_empty() || line == b"\r" {
            let body_start = (line_end + 1).min(entity.len());
            return (&entity[..pos], &entity[body_start..]);
        }
        pos = line_end + 1;
    }

    (entity, &[])
}

/// Body parts between `--boundary` delimiters; preamble and epilogue are dropped
fn split_multipart<'a>(body: &'a [u8], boundary: &str) -> Vec<&'a [u8]> {
    let delimiter = format!("--{}", boundary);
    let delimiter = delimiter.as_bytes();

    let mut parts = Vec::new();
    let mut part_start: Option<usize> = None;
    let mut pos = 0;

    while pos < body.len() {
        let line_end = body[pos..]
            .iter()
            .position(|b| *b == b'\n')
            .map(|i| pos + i)
            .unwrap_or(body.len());
        let next = (line_end + 1).min(body.len());
        let line = body[pos..line_end].trim_ascii_end();

        if let Some(rest) = line.strip_prefix(delimiter) {
            let closing = rest == b"--";
            if rest.is_empty() || closing {
                if let Some(start) = part_start.take() {
                    parts.push(trim_trailing_newline(&body[start..pos]));
                }
                if closing {
                    return parts;
                }
                part_start = Some(next);
            }
        }

        pos = next;
    }

    if let Some(start) = part_start {
        parts.push(&body[start..]);
    }
    parts
}

fn trim_trailing_newline(part: &[u8]) -> &[u8] {
    let part = part.strip_suffix(b"\n").unwrap_or(part);
    part.strip_suffix(b"\r").unwrap_or(part)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn parser() -> MimeEmailParser {
        MimeEmailParser::new(1024)
    }

    const SIMPLE: &str = "From: Kim <kim@example.com>\r\n\
To: a@example.com, b@example.com\r\n\
Cc: c@example.com\r\n\
Bcc: a@example.com\r\n\
Subject: Quarterly numbers\r\n\
Date: Mon, 15 Jan 2024 10:30:00 +0900 (KST)\r\n\
Message-ID: <abc@example.com>\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
\r\n\
  Hello team,\r\nnumbers attached.\r\n\r\n";

    #[test]
    fn test_simple_message() {
        let email = parser().parse(SIMPLE.as_bytes()).unwrap();

        assert_eq!(email.subject, "Quarterly numbers");
        assert_eq!(email.sender, "Kim <kim@example.com>");
        assert_eq!(
            email.recipients,
            vec!["a@example.com", "b@example.com", "c@example.com", "a@example.com"]
        );
        assert_eq!(email.message_id, "<abc@example.com>");
        assert_eq!(email.body_text, "Hello team,\r\nnumbers attached.");
        assert!(email.body_html.is_none());
        assert!(email.attachments.is_empty());
        assert_eq!(email.headers.get("Subject").map(String::as_str), Some("Quarterly numbers"));

        let date = email.date.unwrap();
        assert_eq!((date.year(), date.month(), date.day()), (2024, 1, 15));
        assert_eq!(date.hour(), 10);
        assert_eq!(date.offset().local_minus_utc(), 9 * 3600);
    }

    #[test]
    fn test_invalid_date_is_absent() {
        let raw = "Subject: x\nDate: sometime last week\n\nbody";
        let email = parser().parse(raw.as_bytes()).unwrap();
        assert!(email.date.is_none());
    }

    #[test]
    fn test_not_email_format() {
        assert_eq!(parser().parse(b"short"), Err(ParseFailure::NotEmailFormat));
        assert_eq!(
            parser().parse(&[0xFF, 0xFE, 0x00, 0x01, 0x02, 0x03, 0x04, 0x05, 0x06, 0x07, 0x08]),
            Err(ParseFailure::NotEmailFormat)
        );
        assert_eq!(
            parser().parse(b"just some words without any header at all"),
            Err(ParseFailure::NotEmailFormat)
        );
    }

    #[test]
    fn test_header_check_only_reads_first_lines() {
        let mut raw = "no header here\n".repeat(10);
        raw.push_str("Subject: too late\n");
        assert!(!looks_like_email(raw.as_bytes()));
        assert!(looks_like_email(b"X-Custom_Header: 1\n"));
        assert!(!looks_like_email(b" Indented: value\n\n"));
    }

    #[test]
    fn test_encoded_subject_and_sender() {
        let raw = "Subject: =?UTF-8?B?7ZWc6riA?=\r\n\
From: =?utf-8?q?=ED=99=8D?= <hong@example.com>\r\n\
\r\n\
body";
        let email = parser().parse(raw.as_bytes()).unwrap();
        assert_eq!(email.subject, "한글");
        assert_eq!(email.sender, "홍 <hong@example.com>");
    }

    #[test]
    fn test_html_only_message() {
        let raw = "Subject: html\r\nContent-Type: text/html; charset=utf-8\r\n\r\n<p>Hi</p>";
        let email = parser().parse(raw.as_bytes()).unwrap();
        assert_eq!(email.body_text, "");
        assert_eq!(email.body_html.as_deref(), Some("<p>Hi</p>"));
    }

    const MULTIPART: &str = "From: kim@example.com\r\n\
To: lee@example.com\r\n\
Subject: Report\r\n\
MIME-Version: 1.0\r\n\
Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
\r\n\
This is the preamble.\r\n\
--outer\r\n\
Content-Type: multipart/alternative; boundary=inner\r\n\
\r\n\
--inner\r\n\
Content-Type: text/plain; charset=utf-8\r\n\
Content-Transfer-Encoding: quoted-printable\r\n\
\r\n\
Caf=C3=A9 summary\r\n\
--inner\r\n\
Content-Type: text/html; charset=utf-8\r\n\
\r\n\
<p>first</p>\r\n\
--inner\r\n\
Content-Type: text/html\r\n\
\r\n\
<p>second</p>\r\n\
--inner--\r\n\
--outer\r\n\
Content-Type: text/plain\r\n\
Content-Disposition: attachment; filename=\"notes.txt\"\r\n\
\r\n\
attached text must not reach the body\r\n\
--outer\r\n\
Content-Type: application/pdf; name=\"=?UTF-8?B?67O06rOg7ISc?=.pdf\"\r\n\
Content-Disposition: attachment\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0xLjQK\r\n\
--outer\r\n\
Content-Type: application/octet-stream\r\n\
Content-Disposition: attachment\r\n\
\r\n\
no filename anywhere\r\n\
--outer\r\n\
Content-Type: text/plain\r\n\
Content-Disposition: attachment; filename=\"empty.txt\"\r\n\
\r\n\
\r\n\
--outer--\r\n\
epilogue\r\n";

    #[test]
    fn test_multipart_bodies_and_attachments() {
        let email = parser().parse(MULTIPART.as_bytes()).unwrap();

        assert_eq!(email.body_text, "Café summary");
        assert_eq!(email.body_html.as_deref(), Some("<p>first</p>"));

        let names: Vec<&str> = email.attachments.iter().map(|a| a.filename.as_str()).collect();
        assert_eq!(names, vec!["notes.txt", "보고서.pdf"]);

        let pdf = &email.attachments[1];
        assert_eq!(pdf.content.as_ref(), b"%PDF-1.4\n");
        assert_eq!(pdf.content_type, "application/pdf");
        assert_eq!(pdf.size, 9);

        assert_eq!(
            email.skipped_attachments,
            vec![SkippedAttachment {
                filename: "empty.txt".to_string(),
                size: 0,
                reason: AttachmentSkipReason::Empty,
            }]
        );
    }

    #[test]
    fn test_oversized_attachment_is_skipped() {
        let raw = format!(
            "Subject: big\r\n\
Content-Type: multipart/mixed; boundary=b\r\n\
\r\n\
--b\r\n\
Content-Type: text/plain\r\n\
\r\n\
body\r\n\
--b\r\n\
Content-Type: application/pdf\r\n\
Content-Disposition: attachment; filename=big.pdf\r\n\
\r\n\
{}\r\n\
--b--\r\n",
            "x".repeat(2000)
        );

        let email = parser().parse(raw.as_bytes()).unwrap();

        assert!(email.attachments.is_empty());
        assert_eq!(email.skipped_attachments.len(), 1);
        assert_eq!(email.skipped_attachments[0].filename, "big.pdf");
        assert_eq!(
            email.skipped_attachments[0].reason,
            AttachmentSkipReason::TooLarge { max: 1024 }
        );
    }

    #[test]
    fn test_plain_parts_are_concatenated() {
        let raw = "Subject: two\r\n\
Content-Type: multipart/mixed; boundary=sep\r\n\
\r\n\
--sep\r\n\
Content-Type: text/plain\r\n\
\r\n\
one \r\n\
--sep\r\n\
\r\n\
two\r\n\
--sep--\r\n";

        let email = parser().parse(raw.as_bytes()).unwrap();
        assert_eq!(email.body_text, "one two");
    }

    #[test]
    fn test_multipart_without_boundary_is_malformed() {
        let raw = "Subject: x\r\nContent-Type: multipart/mixed\r\n\r\nbody";
        assert!(matches!(
            parser().parse(raw.as_bytes()),
            Err(ParseFailure::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_leading_continuation_is_malformed() {
        let raw = "\tcontinued: value\r\nSubject: x\r\n\r\nbody";
        assert!(matches!(
            parser().parse(raw.as_bytes()),
            Err(ParseFailure::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_unknown_transfer_encoding() {
        let raw = "Subject: x\r\nContent-Transfer-Encoding: x-uuencode\r\n\r\nbegin 644 a\r\n";
        assert_eq!(
            parser().parse(raw.as_bytes()),
            Err(ParseFailure::UnsupportedBodyEncoding {
                encoding: "x-uuencode".to_string()
            })
        );
    }

    #[test]
    fn test_undecodable_attachment_is_skipped() {
        let raw = "From: kim@example.com\r\n\
Subject: broken attachment\r\n\
Content-Type: multipart/mixed; boundary=b\r\n\
\r\n\
--b\r\n\
Content-Type: text/plain\r\n\
\r\n\
body survives\r\n\
--b\r\n\
Content-Type: application/pdf\r\n\
Content-Disposition: attachment; filename=bad.pdf\r\n\
Content-Transfer-Encoding: base64\r\n\
\r\n\
JVBERi0xLjQK!!\r\n\
--b\r\n\
Content-Type: text/plain\r\n\
Content-Disposition: attachment; filename=good.txt\r\n\
\r\n\
kept\r\n\
--b--\r\n";

        let email = parser().parse(raw.as_bytes()).unwrap();

        assert_eq!(email.body_text, "body survives");
        assert_eq!(email.attachments.len(), 1);
        assert_eq!(email.attachments[0].filename, "good.txt");
        assert_eq!(
            email.skipped_attachments,
            vec![SkippedAttachment {
                filename: "bad.pdf".to_string(),
                size: 14,
                reason: AttachmentSkipReason::Undecodable {
                    encoding: "base64".to_string()
                },
            }]
        );
    }

    #[test]
    fn test_mbox_envelope_line_is_ignored() {
        let raw = "From kim@example.com Mon Jan 15 10:30:00 2024\r\n\
From: kim@example.com\r\n\
Subject: archived\r\n\
\r\n\
hello\r\n";

        let email = parser().parse(raw.as_bytes()).unwrap();

        assert_eq!(email.subject, "archived");
        assert_eq!(email.sender, "kim@example.com");
        assert_eq!(email.body_text, "hello");
    }

    #[test]
    fn test_rfc2231_attachment_filename() {
        let raw = "Subject: x\r\n\
Content-Type: multipart/mixed; boundary=b\r\n\
\r\n\
--b\r\n\
Content-Type: text/plain\r\n\
Content-Disposition: attachment; filename*=UTF-8''%ED%9A%8C%EC%9D%98.txt\r\n\
\r\n\
minutes\r\n\
--b--\r\n";

        let email = parser().parse(raw.as_bytes()).unwrap();
        assert_eq!(email.attachments[0].filename, "회의.txt");
    }

    #[test]
    fn test_parse_is_repeatable() {
        let parser = parser();
        let first = parser.parse(MULTIPART.as_bytes()).unwrap();
        let second = parser.parse(MULTIPART.as_bytes()).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_split_multipart_without_closing_delimiter() {
        let parts = split_multipart(b"--b\r\nA: 1\r\n\r\none\r\n--b\r\n\r\ntwo", "b");
        assert_eq!(parts, vec![&b"A: 1\r\n\r\none"[..], &b"\r\ntwo"[..]]);
    }
}
