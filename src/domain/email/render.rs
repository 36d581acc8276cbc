//! Text rendering of a parsed email for the body document

use super::ParsedEmail;

const MAX_SUBJECT_CHARS: usize = 50;

/// Header summary, body and attachment manifest as one text document
pub fn render_body_text(email: &ParsedEmail) -> String {
    let mut lines = vec![
        format!("Subject: {}", email.subject),
        format!("From: {}", email.sender),
        format!("To: {}", email.recipients.join(", ")),
    ];

    if let Some(date) = email.date {
        lines.push(format!("Date: {}", date.to_rfc3339()));
    }
    if !email.message_id.is_empty() {
        lines.push(format!("Message-ID: {}", email.message_id));
    }

    lines.push(String::new());
    lines.push("--- Email Body ---".to_string());
    lines.push(String::new());

    if !email.body_text.is_empty() {
        lines.push(email.body_text.clone());
    } else if let Some(html) = &email.body_html {
        lines.push("--- HTML Content ---".to_string());
        lines.push(html.clone());
    }

    if !email.attachments.is_empty() {
        lines.push(String::new());
        lines.push("--- Attachments ---".to_string());
        lines.extend(
            email
                .attachments
                .iter()
                .map(|a| format!("- {} ({} bytes)", a.filename, a.size)),
        );
    }

    lines.join("\n")
}

/// `email_<subject>[_YYYYMMDD].txt`
pub fn body_filename(email: &ParsedEmail) -> String {
    let subject = if email.subject.is_empty() {
        "No Subject"
    } else {
        email.subject.as_str()
    };

    let filtered: String = subject
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let safe_subject: String = filtered.trim().chars().take(MAX_SUBJECT_CHARS).collect();

    let date_suffix = email
        .date
        .map(|d| format!("_{}", d.format("%Y%m%d")))
        .unwrap_or_default();

    format!("email_{}{}.txt", safe_subject, date_suffix)
}
