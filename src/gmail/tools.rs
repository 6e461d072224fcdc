//! Gmail tools
//!
//! Declares the `gmail_*` tools and maps each one onto [`GmailApi`] calls.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use base64::Engine;
use serde::Deserialize;
use serde_json::Value;

use crate::config::google::labels::{INBOX, UNREAD};
use crate::config::token_file_name;
use crate::error::{AdapterError, Result};
use crate::gmail::client::GmailApi;
use crate::gmail::mime::{
    decode_base64url, extract_attachments, forward_body, forward_subject, header_or_empty,
    readable_body, reply_all_cc, reply_references, reply_subject, OutgoingMessage,
};
use crate::gmail::types::*;
use crate::mcp::registry::{page_size, parse_args, FieldType, ToolDescriptor, ToolRegistry};
use crate::mcp::ToolHandler;

const DEFAULT_LIST_RESULTS: i64 = 10;
const DEFAULT_SEARCH_RESULTS: i64 = 20;
const MAX_RESULTS_LIMIT: i64 = 500;

/// Accounts known by name, besides any `token_<name>.json` found on disk
const KNOWN_ACCOUNTS: &[&str] = &["primary", "secondary"];

/// Where account credential files live and which one this process serves
#[derive(Debug, Clone)]
pub struct AccountDirectory {
    config_dir: PathBuf,
    active: String,
}

impl AccountDirectory {
    pub fn new(config_dir: PathBuf, active: impl Into<String>) -> Self {
        Self {
            config_dir,
            active: active.into(),
        }
    }

    /// Known account names plus any named token files, in a stable order
    fn account_names(&self) -> Vec<String> {
        let mut names: Vec<String> = KNOWN_ACCOUNTS.iter().map(|s| s.to_string()).collect();

        let mut discovered: Vec<String> = std::fs::read_dir(&self.config_dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter_map(|e| {
                        let file_name = e.file_name().to_string_lossy().to_string();
                        file_name
                            .strip_prefix("token_")
                            .and_then(|rest| rest.strip_suffix(".json"))
                            .map(str::to_string)
                    })
                    .collect()
            })
            .unwrap_or_default();
        discovered.sort();

        for name in discovered {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        if !names.contains(&self.active) {
            names.push(self.active.clone());
        }
        names
    }

    fn is_configured(&self, name: &str) -> bool {
        self.config_dir.join(token_file_name(Some(name))).exists()
    }
}

/// The Gmail tool set
pub struct GmailTools {
    api: Arc<dyn GmailApi>,
    accounts: AccountDirectory,
    registry: ToolRegistry,
}

impl GmailTools {
    pub fn new(api: Arc<dyn GmailApi>, accounts: AccountDirectory) -> Self {
        Self {
            api,
            accounts,
            registry: registry(),
        }
    }

    // ==================== Tool Handlers ====================

    async fn handle_list_accounts(&self) -> Result<Value> {
        let mut accounts = Vec::new();
        for name in self.accounts.account_names() {
            let configured = self.accounts.is_configured(&name);
            let active = name == self.accounts.active;

            let email = if active && configured {
                match self.api.get_profile().await {
                    Ok(profile) => profile.email_address,
                    Err(e) => {
                        tracing::debug!(account = %name, "Profile lookup failed: {}", e);
                        String::new()
                    }
                }
            } else {
                String::new()
            };

            accounts.push(AccountStatus {
                name,
                configured,
                active,
                email,
            });
        }
        Ok(serde_json::to_value(accounts)?)
    }

    async fn handle_list(&self, tool: &str, args: Value, default_max: i64) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            query: Option<String>,
            max_results: Option<i64>,
        }

        let args: Args = parse_args(tool, args)?;
        let max_results = page_size(
            tool,
            "max_results",
            args.max_results,
            default_max,
            MAX_RESULTS_LIMIT,
        )?;

        let refs = self
            .api
            .list_messages(args.query.as_deref(), max_results)
            .await?;

        let mut summaries = Vec::with_capacity(refs.len());
        for msg_ref in refs {
            let message = self
                .api
                .get_message(&msg_ref.id, MessageFormat::Metadata)
                .await?;
            summaries.push(summarize(message, &msg_ref.thread_id));
        }

        Ok(serde_json::to_value(summaries)?)
    }

    async fn handle_get(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            message_id: String,
        }

        let args: Args = parse_args(tool, args)?;
        let message = self
            .api
            .get_message(&args.message_id, MessageFormat::Full)
            .await?;
        let payload = message.payload.as_ref();

        let detail = MessageDetail {
            from: header_or_empty(payload, "From"),
            to: header_or_empty(payload, "To"),
            cc: header_or_empty(payload, "Cc"),
            subject: header_or_empty(payload, "Subject"),
            date: header_or_empty(payload, "Date"),
            body: readable_body(payload, &message.snippet),
            attachments: payload.map(extract_attachments).unwrap_or_default(),
            labels: message.label_ids,
            id: message.id,
            thread_id: message.thread_id,
        };

        Ok(serde_json::to_value(detail)?)
    }

    async fn handle_send(&self, tool: &str, args: Value, draft: bool) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            to: String,
            subject: String,
            body: String,
            cc: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let mut message = OutgoingMessage::new(args.to, args.subject, args.body);
        message.cc = args.cc;

        if draft {
            self.save_draft(&message, None).await
        } else {
            self.send(&message).await
        }
    }

    async fn handle_list_labels(&self) -> Result<Value> {
        let labels: Vec<LabelSummary> = self
            .api
            .list_labels()
            .await?
            .into_iter()
            .map(|l| LabelSummary {
                id: l.id,
                name: l.name,
                label_type: l.label_type,
            })
            .collect();
        Ok(serde_json::to_value(labels)?)
    }

    async fn handle_modify(
        &self,
        tool: &str,
        args: Value,
        add: &[&str],
        remove: &[&str],
    ) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            message_id: String,
            #[serde(default)]
            add_labels: Option<Vec<String>>,
            #[serde(default)]
            remove_labels: Option<Vec<String>>,
        }

        let args: Args = parse_args(tool, args)?;
        let mut request = ModifyMessageRequest {
            add_label_ids: args.add_labels.unwrap_or_default(),
            remove_label_ids: args.remove_labels.unwrap_or_default(),
        };
        request.add_label_ids.extend(add.iter().map(|s| s.to_string()));
        request
            .remove_label_ids
            .extend(remove.iter().map(|s| s.to_string()));

        let message = self.api.modify_message(&args.message_id, &request).await?;
        Ok(serde_json::to_value(LabelsChanged {
            id: message.id,
            labels: message.label_ids,
        })?)
    }

    async fn handle_draft_reply(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            message_id: String,
            body: String,
            #[serde(default)]
            reply_all: Option<bool>,
        }

        let args: Args = parse_args(tool, args)?;
        let original = self
            .api
            .get_message(&args.message_id, MessageFormat::Metadata)
            .await?;
        let headers = original.payload.as_ref();

        let mut reply = OutgoingMessage::new(
            header_or_empty(headers, "From"),
            reply_subject(&header_or_empty(headers, "Subject")),
            args.body,
        );
        if args.reply_all.unwrap_or(false) {
            reply.cc = reply_all_cc(
                &header_or_empty(headers, "To"),
                &header_or_empty(headers, "Cc"),
            );
        }

        let message_id_header = header_or_empty(headers, "Message-ID");
        if !message_id_header.is_empty() {
            reply.references = Some(reply_references(
                &header_or_empty(headers, "References"),
                &message_id_header,
            ));
            reply.in_reply_to = Some(message_id_header);
        }

        self.save_draft(&reply, Some(original.thread_id)).await
    }

    async fn handle_forward(&self, tool: &str, args: Value, draft: bool) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            message_id: String,
            to: String,
            #[serde(default)]
            body: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let original = self
            .api
            .get_message(&args.message_id, MessageFormat::Full)
            .await?;
        let payload = original.payload.as_ref();

        let original_body = readable_body(payload, "");
        let message = OutgoingMessage::new(
            args.to,
            forward_subject(&header_or_empty(payload, "Subject")),
            forward_body(payload, &original_body, args.body.as_deref().unwrap_or("")),
        );

        if draft {
            self.save_draft(&message, None).await
        } else {
            self.send(&message).await
        }
    }

    async fn handle_get_thread(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            thread_id: String,
        }

        let args: Args = parse_args(tool, args)?;
        let thread = self.api.get_thread(&args.thread_id).await?;

        let messages: Vec<ThreadMessage> = thread
            .messages
            .into_iter()
            .map(|m| {
                let payload = m.payload.as_ref();
                ThreadMessage {
                    from: header_or_empty(payload, "From"),
                    to: header_or_empty(payload, "To"),
                    subject: header_or_empty(payload, "Subject"),
                    date: header_or_empty(payload, "Date"),
                    id: m.id,
                    snippet: m.snippet,
                    labels: m.label_ids,
                }
            })
            .collect();

        Ok(serde_json::to_value(ThreadSummary {
            id: thread.id,
            message_count: messages.len(),
            messages,
        })?)
    }

    async fn handle_list_drafts(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            max_results: Option<i64>,
        }

        let args: Args = parse_args(tool, args)?;
        let max_results = page_size(
            tool,
            "max_results",
            args.max_results,
            DEFAULT_LIST_RESULTS,
            MAX_RESULTS_LIMIT,
        )?;

        let mut drafts = Vec::new();
        for draft_ref in self.api.list_drafts(max_results).await? {
            let draft = self.api.get_draft(&draft_ref.id).await?;
            let payload = draft.message.payload.as_ref();
            drafts.push(DraftSummary {
                to: header_or_empty(payload, "To"),
                subject: header_or_empty(payload, "Subject"),
                id: draft.id,
                message_id: draft.message.id,
                snippet: draft.message.snippet,
            });
        }

        Ok(serde_json::to_value(drafts)?)
    }

    async fn handle_list_attachments(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            message_id: String,
        }

        let args: Args = parse_args(tool, args)?;
        let message = self
            .api
            .get_message(&args.message_id, MessageFormat::Full)
            .await?;
        let attachments = message
            .payload
            .as_ref()
            .map(extract_attachments)
            .unwrap_or_default();

        Ok(serde_json::to_value(attachments)?)
    }

    async fn handle_get_attachment(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            message_id: String,
            attachment_id: String,
        }

        let args: Args = parse_args(tool, args)?;
        let attachment = self
            .api
            .get_attachment(&args.message_id, &args.attachment_id)
            .await?;

        // Re-encode as standard base64 so callers need no URL-safe decoder
        let bytes = decode_base64url(&attachment.data)?;
        Ok(serde_json::to_value(AttachmentContent {
            size: attachment.size,
            data_base64: base64::engine::general_purpose::STANDARD.encode(bytes),
        })?)
    }

    // ==================== Helpers ====================

    async fn send(&self, message: &OutgoingMessage) -> Result<Value> {
        let request = SendMessageRequest {
            raw: message.encode(),
            thread_id: None,
        };
        let sent = self.api.send_message(&request).await?;
        tracing::info!(message_id = %sent.id, "Message sent");
        Ok(serde_json::to_value(SentMessage {
            id: sent.id,
            thread_id: sent.thread_id,
        })?)
    }

    async fn save_draft(&self, message: &OutgoingMessage, thread_id: Option<String>) -> Result<Value> {
        let request = CreateDraftRequest {
            message: SendMessageRequest {
                raw: message.encode(),
                thread_id: thread_id.clone(),
            },
        };
        let draft = self.api.create_draft(&request).await?;
        Ok(serde_json::to_value(DraftCreated {
            id: draft.id,
            message_id: draft.message.id,
            thread_id,
        })?)
    }
}

fn summarize(message: Message, fallback_thread_id: &str) -> MessageSummary {
    let payload = message.payload.as_ref();
    MessageSummary {
        from: header_or_empty(payload, "From"),
        to: header_or_empty(payload, "To"),
        subject: header_or_empty(payload, "Subject"),
        date: header_or_empty(payload, "Date"),
        thread_id: if message.thread_id.is_empty() {
            fallback_thread_id.to_string()
        } else {
            message.thread_id
        },
        id: message.id,
        snippet: message.snippet,
    }
}

#[async_trait]
impl ToolHandler for GmailTools {
    fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    async fn call(&self, tool: &str, args: Value) -> Result<Value> {
        match tool {
            "gmail_list_accounts" => self.handle_list_accounts().await,
            "gmail_list" => self.handle_list(tool, args, DEFAULT_LIST_RESULTS).await,
            "gmail_get" => self.handle_get(tool, args).await,
            "gmail_search" => self.handle_list(tool, args, DEFAULT_SEARCH_RESULTS).await,
            "gmail_send" => self.handle_send(tool, args, false).await,
            "gmail_create_draft" => self.handle_send(tool, args, true).await,
            "gmail_list_labels" => self.handle_list_labels().await,
            "gmail_archive" => self.handle_modify(tool, args, &[], &[INBOX]).await,
            "gmail_mark_read" => self.handle_modify(tool, args, &[], &[UNREAD]).await,
            "gmail_mark_unread" => self.handle_modify(tool, args, &[UNREAD], &[]).await,
            "gmail_modify_labels" => self.handle_modify(tool, args, &[], &[]).await,
            "gmail_create_draft_reply" => self.handle_draft_reply(tool, args).await,
            "gmail_create_draft_forward" => self.handle_forward(tool, args, true).await,
            "gmail_forward" => self.handle_forward(tool, args, false).await,
            "gmail_get_thread" => self.handle_get_thread(tool, args).await,
            "gmail_list_drafts" => self.handle_list_drafts(tool, args).await,
            "gmail_list_attachments" => self.handle_list_attachments(tool, args).await,
            "gmail_get_attachment" => self.handle_get_attachment(tool, args).await,
            other => Err(AdapterError::Mcp(crate::error::McpError::UnknownTool {
                name: other.to_string(),
            })),
        }
    }
}

fn message_id_tool(name: &'static str, description: &'static str) -> ToolDescriptor {
    ToolDescriptor::new(name, description).required(
        "message_id",
        FieldType::String,
        "The Gmail message ID",
    )
}

fn registry() -> ToolRegistry {
    use FieldType::*;

    ToolRegistry::new(vec![
        ToolDescriptor::new(
            "gmail_list_accounts",
            "List Gmail accounts with stored credentials and which one this server uses.",
        ),
        ToolDescriptor::new(
            "gmail_list",
            "List recent emails. Optionally filter with a Gmail search query.",
        )
        .optional("query", String, "Gmail search query (e.g., 'from:someone@example.com', 'is:unread')")
        .optional("max_results", Integer, "Maximum number of messages to return (default: 10)"),
        message_id_tool("gmail_get", "Get the full content of a specific email by its ID."),
        ToolDescriptor::new("gmail_search", "Search emails using Gmail search syntax.")
            .required("query", String, "Gmail search query")
            .optional("max_results", Integer, "Max results (default: 20)"),
        ToolDescriptor::new("gmail_send", "Send an email.")
            .required("to", String, "Recipient email address")
            .required("subject", String, "Email subject")
            .required("body", String, "Email body (plain text)")
            .optional("cc", String, "Cc recipients, comma separated"),
        ToolDescriptor::new("gmail_create_draft", "Create a draft email without sending it.")
            .required("to", String, "Recipient email address")
            .required("subject", String, "Email subject")
            .required("body", String, "Email body (plain text)")
            .optional("cc", String, "Cc recipients, comma separated"),
        ToolDescriptor::new("gmail_list_labels", "List all available Gmail labels."),
        message_id_tool(
            "gmail_archive",
            "Archive an email (removes from inbox, keeps in All Mail).",
        ),
        message_id_tool("gmail_mark_read", "Mark an email as read."),
        message_id_tool("gmail_mark_unread", "Mark an email as unread."),
        message_id_tool("gmail_modify_labels", "Add or remove labels from an email.")
            .optional("add_labels", StringArray, "Label IDs to add")
            .optional("remove_labels", StringArray, "Label IDs to remove"),
        ToolDescriptor::new(
            "gmail_create_draft_reply",
            "Create a draft reply to an existing email, threaded with the original.",
        )
        .required("message_id", String, "The Gmail message ID to reply to")
        .required("body", String, "Reply body (plain text)")
        .optional("reply_all", Boolean, "Reply to all recipients (default: false)"),
        ToolDescriptor::new(
            "gmail_create_draft_forward",
            "Create a draft forwarding an existing email.",
        )
        .required("message_id", String, "The Gmail message ID to forward")
        .required("to", String, "Recipient email address")
        .optional("body", String, "Optional message above forwarded content"),
        ToolDescriptor::new("gmail_forward", "Forward an email immediately.")
            .required("message_id", String, "The Gmail message ID to forward")
            .required("to", String, "Recipient email address")
            .optional("body", String, "Optional message above forwarded content"),
        ToolDescriptor::new("gmail_get_thread", "Get all messages in a conversation thread.")
            .required("thread_id", String, "The Gmail thread ID"),
        ToolDescriptor::new("gmail_list_drafts", "List draft emails.")
            .optional("max_results", Integer, "Max drafts to return (default: 10)"),
        message_id_tool("gmail_list_attachments", "List attachments in an email."),
        message_id_tool(
            "gmail_get_attachment",
            "Download attachment content (base64-encoded).",
        )
        .required("attachment_id", String, "The attachment ID"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    #[test]
    fn test_registry_names_are_unique() {
        let registry = registry();
        let mut names: Vec<&str> = registry.descriptors().iter().map(|d| d.name).collect();
        let count = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), count);
        assert_eq!(count, 18);
    }

    #[test]
    fn test_account_names_include_discovered_files() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("token.json"), "{}").unwrap();
        std::fs::write(dir.path().join("token_work.json"), "{}").unwrap();

        let accounts = AccountDirectory::new(dir.path().to_path_buf(), "work");
        assert_eq!(accounts.account_names(), vec!["primary", "secondary", "work"]);
        assert!(accounts.is_configured("primary"));
        assert!(!accounts.is_configured("secondary"));
        assert!(accounts.is_configured("work"));
    }
}
