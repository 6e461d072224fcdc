//! Gmail API type definitions
//!
//! Wire types mirror the Gmail API responses. Result types are what the
//! tools hand back to the agent.

use serde::{Deserialize, Serialize};

/// A Gmail message part (MIME part)
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePart {
    /// Part ID
    #[serde(skip_serializing_if = "Option::is_none")]
    pub part_id: Option<String>,

    /// MIME type of this part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Filename for attachments
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    /// Headers for this part
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub headers: Vec<Header>,

    /// Body of this part
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<MessagePartBody>,

    /// Nested parts (for multipart messages)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
}

/// Header in a message part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub name: String,
    pub value: String,
}

/// Body of a message part
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessagePartBody {
    /// Attachment ID (if this is an attachment)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment_id: Option<String>,

    /// Size in bytes
    #[serde(default)]
    pub size: i64,

    /// Base64url-encoded data
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A Gmail message
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Message ID
    pub id: String,

    /// Thread ID
    #[serde(default)]
    pub thread_id: String,

    /// Label IDs
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub label_ids: Vec<String>,

    /// Snippet (preview text)
    #[serde(default)]
    pub snippet: String,

    /// Message payload (MIME structure)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payload: Option<MessagePart>,

    /// Internal date (epoch millis)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub internal_date: Option<String>,
}

/// How much of a message to fetch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageFormat {
    /// Headers only
    Metadata,
    /// Headers and decoded MIME tree
    Full,
}

impl MessageFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageFormat::Metadata => "metadata",
            MessageFormat::Full => "full",
        }
    }
}

/// List of messages response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct MessageList {
    /// Messages in this page
    #[serde(default)]
    pub messages: Vec<MessageRef>,

    /// Next page token
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

/// Reference to a message (id and thread_id only)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRef {
    pub id: String,

    #[serde(default)]
    pub thread_id: String,
}

/// A Gmail label
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    /// Label ID
    pub id: String,

    /// Label name
    pub name: String,

    /// Label type (system or user)
    #[serde(rename = "type", default)]
    pub label_type: String,
}

/// List of labels response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct LabelList {
    #[serde(default)]
    pub labels: Vec<Label>,
}

/// Request to modify message labels
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct ModifyMessageRequest {
    /// Label IDs to add
    #[serde(default)]
    pub add_label_ids: Vec<String>,

    /// Label IDs to remove
    #[serde(default)]
    pub remove_label_ids: Vec<String>,
}

/// Gmail draft
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Draft {
    /// Draft ID
    pub id: String,

    /// The message
    #[serde(default)]
    pub message: Message,
}

/// List of drafts response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct DraftList {
    #[serde(default)]
    pub drafts: Vec<DraftRef>,
}

/// Reference to a draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftRef {
    pub id: String,
}

/// A conversation thread
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Thread {
    pub id: String,

    #[serde(default)]
    pub messages: Vec<Message>,
}

/// Request to send or create a message
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    /// Raw RFC822 message (base64url encoded)
    pub raw: String,

    /// Thread ID (for replies)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Request to create a draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateDraftRequest {
    pub message: SendMessageRequest,
}

/// Attachment data response
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AttachmentData {
    /// Size in bytes
    #[serde(default)]
    pub size: i64,

    /// Base64url-encoded data
    #[serde(default)]
    pub data: String,
}

/// Mailbox profile
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default)]
    pub email_address: String,
}

/// Extracted email content
#[derive(Debug, Clone, Default)]
pub struct EmailContent {
    /// Plain text content
    pub text: String,

    /// HTML content
    pub html: String,
}

// ==================== Tool Results ====================

/// One message in a listing
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MessageSummary {
    pub id: String,
    pub thread_id: String,
    pub snippet: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
}

/// Full message content
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageDetail {
    pub id: String,
    pub thread_id: String,
    pub from: String,
    pub to: String,
    pub cc: String,
    pub subject: String,
    pub date: String,
    pub body: String,
    pub labels: Vec<String>,
    pub attachments: Vec<AttachmentInfo>,
}

/// Message accepted by the provider
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    pub id: String,
    pub thread_id: String,
}

/// Draft created by the provider
#[derive(Debug, Clone, Serialize)]
pub struct DraftCreated {
    pub id: String,
    pub message_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

/// Label as shown to the agent
#[derive(Debug, Clone, Serialize)]
pub struct LabelSummary {
    pub id: String,
    pub name: String,
    #[serde(rename = "type")]
    pub label_type: String,
}

/// Labels of a message after a change
#[derive(Debug, Clone, Serialize)]
pub struct LabelsChanged {
    pub id: String,
    pub labels: Vec<String>,
}

/// One message inside a thread
#[derive(Debug, Clone, Serialize)]
pub struct ThreadMessage {
    pub id: String,
    pub snippet: String,
    pub from: String,
    pub to: String,
    pub subject: String,
    pub date: String,
    pub labels: Vec<String>,
}

/// Conversation thread
#[derive(Debug, Clone, Serialize)]
pub struct ThreadSummary {
    pub id: String,
    pub message_count: usize,
    pub messages: Vec<ThreadMessage>,
}

/// One draft in a listing
#[derive(Debug, Clone, Serialize)]
pub struct DraftSummary {
    pub id: String,
    pub message_id: String,
    pub to: String,
    pub subject: String,
    pub snippet: String,
}

/// Email attachment info
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInfo {
    /// Attachment ID
    pub id: String,

    /// Filename
    pub filename: String,

    /// MIME type
    pub mime_type: String,

    /// Size in bytes
    pub size: i64,
}

/// Attachment payload
#[derive(Debug, Clone, Serialize)]
pub struct AttachmentContent {
    pub size: i64,
    /// Standard base64 (padded)
    pub data_base64: String,
}

/// A configured (or known) account
#[derive(Debug, Clone, Serialize)]
pub struct AccountStatus {
    pub name: String,
    pub configured: bool,
    pub active: bool,
    pub email: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_deserialize() {
        let json = r#"{"id":"123","threadId":"456","labelIds":["INBOX"]}"#;
        let msg: Message = serde_json::from_str(json).unwrap();
        assert_eq!(msg.id, "123");
        assert_eq!(msg.thread_id, "456");
        assert!(msg.snippet.is_empty());
    }

    #[test]
    fn test_label_deserialize() {
        let json = r#"{"id":"Label_1","name":"Test","type":"user"}"#;
        let label: Label = serde_json::from_str(json).unwrap();
        assert_eq!(label.id, "Label_1");
        assert_eq!(label.label_type, "user");
    }

    #[test]
    fn test_empty_listings_default() {
        let list: MessageList = serde_json::from_str(r#"{"resultSizeEstimate":0}"#).unwrap();
        assert!(list.messages.is_empty());
        let drafts: DraftList = serde_json::from_str("{}").unwrap();
        assert!(drafts.drafts.is_empty());
    }

    #[test]
    fn test_modify_request_serialize() {
        let req = ModifyMessageRequest {
            add_label_ids: vec![],
            remove_label_ids: vec!["INBOX".to_string()],
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["removeLabelIds"][0], "INBOX");
        assert_eq!(json["addLabelIds"], serde_json::json!([]));
    }
}
