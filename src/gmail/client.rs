//! Gmail API client
//!
//! [`GmailApi`] is the provider seam the tools are written against;
//! [`GmailClient`] implements it over HTTPS.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;

use crate::config::google::GMAIL_API_BASE_URL;
use crate::error::Result;
use crate::gmail::types::*;
use crate::http::ApiClient;

/// Headers requested with metadata-format fetches
pub const METADATA_HEADERS: &[&str] = &[
    "From",
    "To",
    "Cc",
    "Subject",
    "Date",
    "Message-ID",
    "References",
];

/// Gmail operations used by the tools
#[async_trait]
pub trait GmailApi: Send + Sync {
    /// Mailbox profile of the authorized account
    async fn get_profile(&self) -> Result<Profile>;

    /// Message references matching `query`, newest first
    async fn list_messages(&self, query: Option<&str>, max_results: u32) -> Result<Vec<MessageRef>>;

    async fn get_message(&self, message_id: &str, format: MessageFormat) -> Result<Message>;

    async fn send_message(&self, request: &SendMessageRequest) -> Result<Message>;

    async fn create_draft(&self, request: &CreateDraftRequest) -> Result<Draft>;

    async fn list_labels(&self) -> Result<Vec<Label>>;

    async fn modify_message(&self, message_id: &str, request: &ModifyMessageRequest) -> Result<Message>;

    /// Thread with metadata-format messages
    async fn get_thread(&self, thread_id: &str) -> Result<Thread>;

    async fn list_drafts(&self, max_results: u32) -> Result<Vec<DraftRef>>;

    /// Draft with a metadata-format message
    async fn get_draft(&self, draft_id: &str) -> Result<Draft>;

    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<AttachmentData>;
}

/// Gmail API client
pub struct GmailClient {
    api: Arc<ApiClient>,
    base_url: String,
}

impl GmailClient {
    /// Create a new Gmail client
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self::with_base_url(api, GMAIL_API_BASE_URL)
    }

    pub fn with_base_url(api: Arc<ApiClient>, base_url: impl Into<String>) -> Self {
        Self {
            api,
            base_url: base_url.into(),
        }
    }

    /// Base URL for messages
    fn messages_url(&self) -> String {
        format!("{}/messages", self.base_url)
    }

    /// Base URL for drafts
    fn drafts_url(&self) -> String {
        format!("{}/drafts", self.base_url)
    }
}

fn metadata_query() -> Vec<(&'static str, String)> {
    let mut query = vec![("format", MessageFormat::Metadata.as_str().to_string())];
    query.extend(METADATA_HEADERS.iter().map(|h| ("metadataHeaders", h.to_string())));
    query
}

#[async_trait]
impl GmailApi for GmailClient {
    async fn get_profile(&self) -> Result<Profile> {
        let url = format!("{}/profile", self.base_url);
        self.api.get_json(&url, &[], "profile").await
    }

    async fn list_messages(&self, query: Option<&str>, max_results: u32) -> Result<Vec<MessageRef>> {
        let mut params = vec![("maxResults", max_results.to_string())];
        if let Some(q) = query.filter(|q| !q.is_empty()) {
            params.push(("q", q.to_string()));
        }

        let list: MessageList = self
            .api
            .get_json(&self.messages_url(), &params, "messages")
            .await?;
        Ok(list.messages)
    }

    async fn get_message(&self, message_id: &str, format: MessageFormat) -> Result<Message> {
        let url = format!("{}/{}", self.messages_url(), urlencoding::encode(message_id));
        let query = match format {
            MessageFormat::Metadata => metadata_query(),
            MessageFormat::Full => vec![("format", format.as_str().to_string())],
        };
        self.api
            .get_json(&url, &query, &format!("message {}", message_id))
            .await
    }

    async fn send_message(&self, request: &SendMessageRequest) -> Result<Message> {
        let url = format!("{}/send", self.messages_url());
        self.api
            .send_json(Method::POST, &url, &[], request, "send")
            .await
    }

    async fn create_draft(&self, request: &CreateDraftRequest) -> Result<Draft> {
        self.api
            .send_json(Method::POST, &self.drafts_url(), &[], request, "drafts")
            .await
    }

    async fn list_labels(&self) -> Result<Vec<Label>> {
        let url = format!("{}/labels", self.base_url);
        let list: LabelList = self.api.get_json(&url, &[], "labels").await?;
        Ok(list.labels)
    }

    async fn modify_message(&self, message_id: &str, request: &ModifyMessageRequest) -> Result<Message> {
        let url = format!(
            "{}/{}/modify",
            self.messages_url(),
            urlencoding::encode(message_id)
        );
        self.api
            .send_json(Method::POST, &url, &[], request, &format!("message {}", message_id))
            .await
    }

    async fn get_thread(&self, thread_id: &str) -> Result<Thread> {
        let url = format!("{}/threads/{}", self.base_url, urlencoding::encode(thread_id));
        self.api
            .get_json(&url, &metadata_query(), &format!("thread {}", thread_id))
            .await
    }

    async fn list_drafts(&self, max_results: u32) -> Result<Vec<DraftRef>> {
        let params = [("maxResults", max_results.to_string())];
        let list: DraftList = self
            .api
            .get_json(&self.drafts_url(), &params, "drafts")
            .await?;
        Ok(list.drafts)
    }

    async fn get_draft(&self, draft_id: &str) -> Result<Draft> {
        let url = format!("{}/{}", self.drafts_url(), urlencoding::encode(draft_id));
        let params = [("format", MessageFormat::Metadata.as_str().to_string())];
        self.api
            .get_json(&url, &params, &format!("draft {}", draft_id))
            .await
    }

    async fn get_attachment(&self, message_id: &str, attachment_id: &str) -> Result<AttachmentData> {
        let url = format!(
            "{}/{}/attachments/{}",
            self.messages_url(),
            urlencoding::encode(message_id),
            urlencoding::encode(attachment_id)
        );
        self.api
            .get_json(
                &url,
                &[],
                &format!("attachment {} of message {}", attachment_id, message_id),
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_query_lists_headers() {
        let query = metadata_query();
        assert_eq!(query[0], ("format", "metadata".to_string()));
        assert!(query.contains(&("metadataHeaders", "Message-ID".to_string())));
        assert_eq!(query.len(), METADATA_HEADERS.len() + 1);
    }
}
