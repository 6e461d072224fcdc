//! Message encoding and content extraction
//!
//! Builds the RFC 822 text handed to the Gmail API and pulls bodies, headers
//! and attachment metadata out of the MIME tree Gmail returns.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};

use crate::error::{AdapterError, Result};
use crate::gmail::types::{AttachmentInfo, EmailContent, MessagePart};

/// Encode text for MIME header (RFC 2047)
pub fn encode_mime_header(text: &str) -> String {
    if text.is_ascii() {
        return text.to_string();
    }

    format!(
        "=?UTF-8?B?{}?=",
        base64::engine::general_purpose::STANDARD.encode(text.as_bytes())
    )
}

/// Header values never carry line breaks
fn header_value(text: &str) -> String {
    text.replace(['\r', '\n'], " ")
}

/// Encode a raw email message for Gmail API (base64url, no padding)
pub fn encode_raw_message(message: &str) -> String {
    URL_SAFE_NO_PAD.encode(message.as_bytes())
}

/// Decode base64url data from Gmail API.
/// Handles both padded and non-padded encodings.
pub fn decode_base64url(data: &str) -> Result<Vec<u8>> {
    URL_SAFE_NO_PAD
        .decode(data)
        .or_else(|_| base64::engine::general_purpose::URL_SAFE.decode(data))
        .or_else(|_| base64::engine::general_purpose::STANDARD.decode(data))
        .map_err(|e| AdapterError::unexpected_response(format!("invalid base64 data: {}", e)))
}

/// Decode base64url data to string
pub fn decode_base64url_string(data: &str) -> Result<String> {
    let bytes = decode_base64url(data)?;
    String::from_utf8(bytes)
        .map_err(|e| AdapterError::unexpected_response(format!("invalid UTF-8 content: {}", e)))
}

/// Recursively extract email body content from MIME message parts
pub fn extract_email_content(message_part: &MessagePart) -> EmailContent {
    let mut content = EmailContent::default();

    let mime_type = message_part.mime_type.as_deref().unwrap_or("");

    if let Some(data) = message_part.body.as_ref().and_then(|b| b.data.as_deref()) {
        // Binary attachments are skipped
        if mime_type.starts_with("text/") {
            match decode_base64url_string(data) {
                Ok(decoded) if mime_type == "text/html" => content.html = decoded,
                Ok(decoded) if mime_type == "text/plain" => content.text = decoded,
                Ok(_) => {}
                Err(e) => tracing::debug!("Failed to decode {} part: {}", mime_type, e),
            }
        }
    }

    for part in &message_part.parts {
        // Attached .txt files are not body text
        if part.filename.as_deref().map_or(false, |f| !f.is_empty()) {
            continue;
        }
        let nested = extract_email_content(part);
        content.text.push_str(&nested.text);
        content.html.push_str(&nested.html);
    }

    content
}

/// Best readable body: plain text, else HTML, else `fallback`
pub fn readable_body(part: Option<&MessagePart>, fallback: &str) -> String {
    let content = part.map(extract_email_content).unwrap_or_default();
    if !content.text.is_empty() {
        content.text
    } else if !content.html.is_empty() {
        content.html
    } else {
        fallback.to_string()
    }
}

/// Extract attachment information from message parts
pub fn extract_attachments(message_part: &MessagePart) -> Vec<AttachmentInfo> {
    let mut attachments = Vec::new();
    extract_attachments_recursive(message_part, &mut attachments);
    attachments
}

fn extract_attachments_recursive(part: &MessagePart, attachments: &mut Vec<AttachmentInfo>) {
    let filename = part.filename.as_deref().unwrap_or("");
    if let Some(body) = &part.body {
        if let (false, Some(attachment_id)) = (filename.is_empty(), &body.attachment_id) {
            attachments.push(AttachmentInfo {
                id: attachment_id.clone(),
                filename: filename.to_string(),
                mime_type: part.mime_type.clone().unwrap_or_default(),
                size: body.size,
            });
        }
    }

    for subpart in &part.parts {
        extract_attachments_recursive(subpart, attachments);
    }
}

/// Find header value by name (case-insensitive)
pub fn find_header<'a>(part: &'a MessagePart, name: &str) -> Option<&'a str> {
    part.headers
        .iter()
        .find(|h| h.name.eq_ignore_ascii_case(name))
        .map(|h| h.value.as_str())
}

/// Header lookup on an optional payload, empty when absent
pub fn header_or_empty(part: Option<&MessagePart>, name: &str) -> String {
    part.and_then(|p| find_header(p, name))
        .unwrap_or("")
        .to_string()
}

/// A plain-text message to send or save as a draft
#[derive(Debug, Clone, Default)]
pub struct OutgoingMessage {
    pub to: String,
    pub cc: Option<String>,
    pub subject: String,
    pub body: String,
    pub in_reply_to: Option<String>,
    pub references: Option<String>,
}

impl OutgoingMessage {
    pub fn new(to: impl Into<String>, subject: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            body: body.into(),
            ..Default::default()
        }
    }

    /// Render as RFC 822 text with CRLF line endings
    pub fn to_rfc822(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("To: {}", header_value(&self.to)));
        if let Some(cc) = self.cc.as_deref().filter(|c| !c.is_empty()) {
            lines.push(format!("Cc: {}", header_value(cc)));
        }
        lines.push(format!(
            "Subject: {}",
            encode_mime_header(&header_value(&self.subject))
        ));
        if let Some(in_reply_to) = &self.in_reply_to {
            lines.push(format!("In-Reply-To: {}", header_value(in_reply_to)));
        }
        if let Some(references) = &self.references {
            lines.push(format!("References: {}", header_value(references)));
        }
        lines.push("MIME-Version: 1.0".to_string());
        lines.push("Content-Type: text/plain; charset=UTF-8".to_string());
        lines.push(format!(
            "Content-Transfer-Encoding: {}",
            if self.body.is_ascii() { "7bit" } else { "8bit" }
        ));
        lines.push(String::new());
        lines.push(self.body.replace("\r\n", "\n").replace('\n', "\r\n"));

        lines.join("\r\n")
    }

    /// Base64url form expected in `raw`
    pub fn encode(&self) -> String {
        encode_raw_message(&self.to_rfc822())
    }
}

/// `Re: <subject>` unless already a reply
pub fn reply_subject(subject: &str) -> String {
    prefixed_subject("Re:", subject)
}

/// `Fwd: <subject>` unless already a forward
pub fn forward_subject(subject: &str) -> String {
    prefixed_subject("Fwd:", subject)
}

fn prefixed_subject(prefix: &str, subject: &str) -> String {
    let already = subject
        .get(..prefix.len())
        .map_or(false, |head| head.eq_ignore_ascii_case(prefix));
    if already {
        subject.to_string()
    } else {
        format!("{} {}", prefix, subject)
    }
}

/// References header continuing an existing chain
pub fn reply_references(existing: &str, message_id: &str) -> String {
    if existing.trim().is_empty() {
        message_id.to_string()
    } else {
        format!("{} {}", existing.trim(), message_id)
    }
}

/// Cc line for reply-all: the original To and Cc recipients
pub fn reply_all_cc(original_to: &str, original_cc: &str) -> Option<String> {
    let recipients: Vec<&str> = [original_to, original_cc]
        .into_iter()
        .filter(|r| !r.trim().is_empty())
        .collect();
    if recipients.is_empty() {
        None
    } else {
        Some(recipients.join(", "))
    }
}

/// Body of a forward: optional note, then the forwarded-message block
pub fn forward_body(original: Option<&MessagePart>, original_body: &str, note: &str) -> String {
    let mut body = String::new();
    if !note.is_empty() {
        body.push_str(note);
        body.push('\n');
    }
    body.push_str("\n---------- Forwarded message ---------\n");
    body.push_str(&format!("From: {}\n", header_or_empty(original, "From")));
    body.push_str(&format!("Date: {}\n", header_or_empty(original, "Date")));
    body.push_str(&format!("Subject: {}\n", header_or_empty(original, "Subject")));
    body.push_str(&format!("To: {}\n", header_or_empty(original, "To")));
    body.push('\n');
    body.push_str(original_body);
    body
}
