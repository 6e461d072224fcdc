//! Google Drive and Sheets API client
//!
//! Drive v3 for files, permissions and comments; Sheets v4 for spreadsheet
//! values. Both go through the same [`ApiClient`] and therefore the same
//! authorization session.

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Method;
use serde_json::json;

use crate::config::google::{DRIVE_API_BASE_URL, DRIVE_UPLOAD_BASE_URL, SHEETS_API_BASE_URL};
use crate::error::Result;
use crate::gdrive::types::*;
use crate::http::ApiClient;

const LIST_FIELDS: &str = "files(id, name, mimeType, size, modifiedTime, parents, webViewLink)";
const DETAIL_FIELDS: &str =
    "id, name, mimeType, size, modifiedTime, createdTime, parents, webViewLink, owners, shared";
const WRITTEN_FIELDS: &str = "id, name, mimeType, modifiedTime, parents, webViewLink";
const COMMENT_FIELDS: &str = "comments(id, content, resolved, author, createdTime, modifiedTime, \
     quotedFileContent, replies(id, content, author, createdTime, action)), nextPageToken";
const REPLY_FIELDS: &str = "id, content, author, createdTime, action";

/// Comments fetched per page
const COMMENT_PAGE_SIZE: u32 = 100;

/// Drive and Sheets operations used by the tools
#[async_trait]
pub trait DriveApi: Send + Sync {
    async fn list_files(&self, query: &FileQuery) -> Result<Vec<DriveFile>>;

    async fn get_file(&self, file_id: &str) -> Result<DriveFile>;

    /// Export a native Google file in `mime_type`
    async fn export_file(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>>;

    /// Raw content of a stored file
    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>>;

    /// Create a file, uploading `content` when given
    async fn create_file(&self, metadata: &FileMetadata, content: Option<&Upload>) -> Result<DriveFile>;

    /// Replace a file's content
    async fn update_content(&self, file_id: &str, content: &Upload) -> Result<DriveFile>;

    /// Move a file to the trash
    async fn trash_file(&self, file_id: &str) -> Result<()>;

    async fn move_file(&self, file_id: &str, add_parent: &str, remove_parents: &[String]) -> Result<DriveFile>;

    async fn copy_file(&self, file_id: &str, metadata: &FileMetadata) -> Result<DriveFile>;

    async fn share_file(&self, file_id: &str, permission: &PermissionRequest) -> Result<Permission>;

    /// One page of non-deleted comments
    async fn list_comments(&self, file_id: &str, page_token: Option<&str>) -> Result<CommentPage>;

    async fn create_comment(&self, file_id: &str, comment: &NewComment) -> Result<Comment>;

    async fn create_reply(&self, file_id: &str, comment_id: &str, reply: &NewReply) -> Result<Reply>;

    async fn get_spreadsheet(&self, spreadsheet_id: &str) -> Result<Spreadsheet>;

    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange>;

    async fn batch_get_values(&self, spreadsheet_id: &str, ranges: &[String]) -> Result<BatchValueRanges>;
}

/// Drive API client
pub struct DriveClient {
    api: Arc<ApiClient>,
}

impl DriveClient {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self { api }
    }

    fn file_url(file_id: &str) -> String {
        format!("{}/files/{}", DRIVE_API_BASE_URL, urlencoding::encode(file_id))
    }

    fn spreadsheet_url(spreadsheet_id: &str) -> String {
        format!(
            "{}/spreadsheets/{}",
            SHEETS_API_BASE_URL,
            urlencoding::encode(spreadsheet_id)
        )
    }
}

fn fields(value: &str) -> (&'static str, String) {
    ("fields", value.to_string())
}

fn file_resource(file_id: &str) -> String {
    format!("file {}", file_id)
}

#[async_trait]
impl DriveApi for DriveClient {
    async fn list_files(&self, query: &FileQuery) -> Result<Vec<DriveFile>> {
        let mut params = vec![
            ("pageSize", query.page_size.to_string()),
            fields(LIST_FIELDS),
            ("orderBy", query.order_by.clone()),
        ];
        if let Some(q) = &query.q {
            params.push(("q", q.clone()));
        }

        let url = format!("{}/files", DRIVE_API_BASE_URL);
        let list: FileList = self.api.get_json(&url, &params, "files").await?;
        Ok(list.files)
    }

    async fn get_file(&self, file_id: &str) -> Result<DriveFile> {
        self.api
            .get_json(
                &Self::file_url(file_id),
                &[fields(DETAIL_FIELDS)],
                &file_resource(file_id),
            )
            .await
    }

    async fn export_file(&self, file_id: &str, mime_type: &str) -> Result<Vec<u8>> {
        let url = format!("{}/export", Self::file_url(file_id));
        self.api
            .get_bytes(
                &url,
                &[("mimeType", mime_type.to_string())],
                &file_resource(file_id),
            )
            .await
    }

    async fn download_file(&self, file_id: &str) -> Result<Vec<u8>> {
        self.api
            .get_bytes(
                &Self::file_url(file_id),
                &[("alt", "media".to_string())],
                &file_resource(file_id),
            )
            .await
    }

    async fn create_file(&self, metadata: &FileMetadata, content: Option<&Upload>) -> Result<DriveFile> {
        let query = [fields(WRITTEN_FIELDS)];
        match content {
            None => {
                let url = format!("{}/files", DRIVE_API_BASE_URL);
                self.api
                    .send_json(Method::POST, &url, &query, metadata, "files")
                    .await
            }
            Some(upload) => {
                let (content_type, body) = multipart_related(&serde_json::to_vec(metadata)?, upload);
                let url = format!("{}/files", DRIVE_UPLOAD_BASE_URL);
                let query = [fields(WRITTEN_FIELDS), ("uploadType", "multipart".to_string())];
                self.api
                    .send_raw(Method::POST, &url, &query, &content_type, body, "files")
                    .await
            }
        }
    }

    async fn update_content(&self, file_id: &str, content: &Upload) -> Result<DriveFile> {
        let url = format!(
            "{}/files/{}",
            DRIVE_UPLOAD_BASE_URL,
            urlencoding::encode(file_id)
        );
        let query = [fields(WRITTEN_FIELDS), ("uploadType", "media".to_string())];
        self.api
            .send_raw(
                Method::PATCH,
                &url,
                &query,
                &content.mime_type,
                content.data.clone(),
                &file_resource(file_id),
            )
            .await
    }

    async fn trash_file(&self, file_id: &str) -> Result<()> {
        let _: DriveFile = self
            .api
            .send_json(
                Method::PATCH,
                &Self::file_url(file_id),
                &[fields("id")],
                &json!({ "trashed": true }),
                &file_resource(file_id),
            )
            .await?;
        Ok(())
    }

    async fn move_file(&self, file_id: &str, add_parent: &str, remove_parents: &[String]) -> Result<DriveFile> {
        let query = [
            fields(WRITTEN_FIELDS),
            ("addParents", add_parent.to_string()),
            ("removeParents", remove_parents.join(",")),
        ];
        self.api
            .send_json(
                Method::PATCH,
                &Self::file_url(file_id),
                &query,
                &json!({}),
                &file_resource(file_id),
            )
            .await
    }

    async fn copy_file(&self, file_id: &str, metadata: &FileMetadata) -> Result<DriveFile> {
        let url = format!("{}/copy", Self::file_url(file_id));
        self.api
            .send_json(
                Method::POST,
                &url,
                &[fields(WRITTEN_FIELDS)],
                metadata,
                &file_resource(file_id),
            )
            .await
    }

    async fn share_file(&self, file_id: &str, permission: &PermissionRequest) -> Result<Permission> {
        let url = format!("{}/permissions", Self::file_url(file_id));
        let query = [
            fields("id, role, emailAddress"),
            ("sendNotificationEmail", "true".to_string()),
        ];
        self.api
            .send_json(Method::POST, &url, &query, permission, &file_resource(file_id))
            .await
    }

    async fn list_comments(&self, file_id: &str, page_token: Option<&str>) -> Result<CommentPage> {
        let url = format!("{}/comments", Self::file_url(file_id));
        let mut query = vec![
            fields(COMMENT_FIELDS),
            ("pageSize", COMMENT_PAGE_SIZE.to_string()),
            ("includeDeleted", "false".to_string()),
        ];
        if let Some(token) = page_token {
            query.push(("pageToken", token.to_string()));
        }
        self.api
            .get_json(&url, &query, &file_resource(file_id))
            .await
    }

    async fn create_comment(&self, file_id: &str, comment: &NewComment) -> Result<Comment> {
        let url = format!("{}/comments", Self::file_url(file_id));
        self.api
            .send_json(
                Method::POST,
                &url,
                &[fields("id, content, author, createdTime")],
                comment,
                &file_resource(file_id),
            )
            .await
    }

    async fn create_reply(&self, file_id: &str, comment_id: &str, reply: &NewReply) -> Result<Reply> {
        let url = format!(
            "{}/comments/{}/replies",
            Self::file_url(file_id),
            urlencoding::encode(comment_id)
        );
        self.api
            .send_json(
                Method::POST,
                &url,
                &[fields(REPLY_FIELDS)],
                reply,
                &format!("comment {}", comment_id),
            )
            .await
    }

    async fn get_spreadsheet(&self, spreadsheet_id: &str) -> Result<Spreadsheet> {
        self.api
            .get_json(
                &Self::spreadsheet_url(spreadsheet_id),
                &[fields("properties.title,sheets.properties")],
                &format!("spreadsheet {}", spreadsheet_id),
            )
            .await
    }

    async fn get_values(&self, spreadsheet_id: &str, range: &str) -> Result<ValueRange> {
        let url = format!(
            "{}/values/{}",
            Self::spreadsheet_url(spreadsheet_id),
            urlencoding::encode(range)
        );
        self.api
            .get_json(&url, &[], &format!("sheet {}", range))
            .await
    }

    async fn batch_get_values(&self, spreadsheet_id: &str, ranges: &[String]) -> Result<BatchValueRanges> {
        let url = format!("{}/values:batchGet", Self::spreadsheet_url(spreadsheet_id));
        let query: Vec<(&str, String)> = ranges.iter().map(|r| ("ranges", r.clone())).collect();
        self.api
            .get_json(&url, &query, &format!("spreadsheet {}", spreadsheet_id))
            .await
    }
}

/// Build a `multipart/related` body of JSON metadata followed by the media.
///
/// Returns the content type (with boundary) and the body.
pub fn multipart_related(metadata: &[u8], upload: &Upload) -> (String, Vec<u8>) {
    let mut boundary = String::from("adapter_upload_boundary");
    while contains(&upload.data, boundary.as_bytes()) || contains(metadata, boundary.as_bytes()) {
        boundary.push('x');
    }

    let mut body = Vec::with_capacity(metadata.len() + upload.data.len() + 256);
    body.extend_from_slice(format!("--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(b"Content-Type: application/json; charset=UTF-8\r\n\r\n");
    body.extend_from_slice(metadata);
    body.extend_from_slice(format!("\r\n--{}\r\n", boundary).as_bytes());
    body.extend_from_slice(format!("Content-Type: {}\r\n\r\n", upload.mime_type).as_bytes());
    body.extend_from_slice(&upload.data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", boundary).as_bytes());

    (format!("multipart/related; boundary={}", boundary), body)
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}
