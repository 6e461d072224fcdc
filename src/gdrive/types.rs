//! Google Drive and Sheets API type definitions

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// MIME type of Drive folders
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// MIME type of native Google Docs
pub const DOCUMENT_MIME_TYPE: &str = "application/vnd.google-apps.document";

/// Export format for native Google files that have no raw content
pub fn export_mime_type(mime_type: &str) -> Option<&'static str> {
    match mime_type {
        DOCUMENT_MIME_TYPE => Some("text/plain"),
        "application/vnd.google-apps.spreadsheet" => Some("text/csv"),
        "application/vnd.google-apps.presentation" => Some("text/plain"),
        _ => None,
    }
}

/// Drive file resource
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct DriveFile {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub mime_type: String,

    /// Byte size as a decimal string; absent for native Google files
    #[serde(default)]
    pub size: Option<String>,

    #[serde(default)]
    pub modified_time: Option<String>,

    #[serde(default)]
    pub created_time: Option<String>,

    #[serde(default)]
    pub parents: Vec<String>,

    #[serde(default)]
    pub web_view_link: Option<String>,

    #[serde(default)]
    pub owners: Vec<Value>,

    #[serde(default)]
    pub shared: bool,
}

/// Files list response
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FileList {
    #[serde(default)]
    pub files: Vec<DriveFile>,
}

/// File listing parameters
#[derive(Debug, Clone, Default)]
pub struct FileQuery {
    /// Drive query language expression
    pub q: Option<String>,
    pub page_size: u32,
    pub order_by: String,
}

/// Metadata sent when creating or copying a file
#[derive(Debug, Clone, Serialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct FileMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parents: Vec<String>,
}

/// File content to upload
#[derive(Debug, Clone)]
pub struct Upload {
    pub mime_type: String,
    pub data: Vec<u8>,
}

impl Upload {
    pub fn text(mime_type: impl Into<String>, content: &str) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: content.as_bytes().to_vec(),
        }
    }
}

/// Permission grant body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionRequest {
    #[serde(rename = "type")]
    pub grantee_type: String,
    pub role: String,
    pub email_address: String,
}

/// Permission resource
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub role: String,

    #[serde(default)]
    pub email_address: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(default)]
    pub display_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct QuotedFileContent {
    #[serde(default)]
    pub value: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Comment resource
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub resolved: bool,

    #[serde(default)]
    pub author: User,

    #[serde(default)]
    pub created_time: String,

    #[serde(default)]
    pub modified_time: String,

    #[serde(default)]
    pub quoted_file_content: Option<QuotedFileContent>,

    #[serde(default)]
    pub replies: Vec<Reply>,
}

/// Comment reply resource
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct Reply {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub author: User,

    #[serde(default)]
    pub created_time: String,

    #[serde(default)]
    pub action: String,
}

/// One page of comments
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct CommentPage {
    #[serde(default)]
    pub comments: Vec<Comment>,

    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// New comment body
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub content: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_file_content: Option<QuotedFileContent>,
}

/// New reply body. `action` is `resolve` or `reopen`.
#[derive(Debug, Clone, Serialize)]
pub struct NewReply {
    pub content: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,
}

// ==================== Sheets ====================

/// Spreadsheet metadata
#[derive(Debug, Clone, Deserialize, Default)]
pub struct Spreadsheet {
    #[serde(default)]
    pub properties: SpreadsheetProperties,

    #[serde(default)]
    pub sheets: Vec<Sheet>,
}

impl Spreadsheet {
    pub fn sheet_titles(&self) -> Vec<String> {
        self.sheets
            .iter()
            .map(|s| s.properties.title.clone())
            .filter(|t| !t.is_empty())
            .collect()
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct SpreadsheetProperties {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Sheet {
    #[serde(default)]
    pub properties: SheetProperties,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SheetProperties {
    #[serde(default)]
    pub sheet_id: Option<i64>,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub index: Option<i64>,

    #[serde(default)]
    pub grid_properties: GridProperties,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct GridProperties {
    #[serde(default)]
    pub row_count: Option<i64>,

    #[serde(default)]
    pub column_count: Option<i64>,
}

/// Cell values of one range
#[derive(Debug, Clone, Deserialize, Default)]
pub struct ValueRange {
    #[serde(default)]
    pub range: String,

    #[serde(default)]
    pub values: Vec<Vec<Value>>,
}

impl ValueRange {
    /// Sheet name from an A1 range such as `'Q1 Plan'!A1:Z100`
    pub fn sheet_name(&self) -> String {
        let name = self.range.split('!').next().unwrap_or_default();
        match name.strip_prefix('\'').and_then(|n| n.strip_suffix('\'')) {
            Some(quoted) => quoted.replace("''", "'"),
            None => name.to_string(),
        }
    }
}

/// Batch values response
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct BatchValueRanges {
    #[serde(default)]
    pub value_ranges: Vec<ValueRange>,
}

// ==================== Tool Results ====================

/// File in a listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: String,
    pub modified_time: String,
    pub parents: Vec<String>,
    pub web_view_link: String,
}

impl From<DriveFile> for FileSummary {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            size: file.size.unwrap_or_default(),
            modified_time: file.modified_time.unwrap_or_default(),
            parents: file.parents,
            web_view_link: file.web_view_link.unwrap_or_default(),
        }
    }
}

/// Full file metadata
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileDetail {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub size: String,
    pub modified_time: String,
    pub created_time: String,
    pub parents: Vec<String>,
    pub web_view_link: String,
    pub owners: Vec<Value>,
    pub shared: bool,
}

impl From<DriveFile> for FileDetail {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            size: file.size.unwrap_or_default(),
            modified_time: file.modified_time.unwrap_or_default(),
            created_time: file.created_time.unwrap_or_default(),
            parents: file.parents,
            web_view_link: file.web_view_link.unwrap_or_default(),
            owners: file.owners,
            shared: file.shared,
        }
    }
}

/// Text content of a file
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileContent {
    pub id: String,
    pub name: String,
    pub mime_type: String,
    pub content: String,

    /// Byte count, present when the content is not text
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
}

impl FileContent {
    /// Decode downloaded bytes, substituting a placeholder for non-UTF-8 data
    pub fn from_bytes(file: DriveFile, bytes: Vec<u8>) -> Self {
        let (content, size) = match String::from_utf8(bytes) {
            Ok(text) => (text, None),
            Err(e) => {
                let len = e.as_bytes().len();
                (format!("[Binary file, {} bytes]", len), Some(len))
            }
        };
        Self {
            id: file.id,
            name: file.name,
            mime_type: file.mime_type,
            content,
            size,
        }
    }
}

/// File after a create, copy, update or move
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileWritten {
    pub id: String,
    pub name: String,
    pub web_view_link: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub modified_time: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub parents: Option<Vec<String>>,
}

impl From<DriveFile> for FileWritten {
    fn from(file: DriveFile) -> Self {
        Self {
            id: file.id,
            name: file.name,
            web_view_link: file.web_view_link.unwrap_or_default(),
            modified_time: None,
            parents: None,
        }
    }
}

/// Trash acknowledgement
#[derive(Debug, Clone, Serialize)]
pub struct FileDeleted {
    pub deleted: bool,
    pub file_id: String,
}

/// Result of sharing a file
#[derive(Debug, Clone, Serialize)]
pub struct PermissionGranted {
    pub permission_id: String,
    pub role: String,
    pub email: String,
    pub file_id: String,
}

/// Comment as shown to the agent
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentSummary {
    pub id: String,
    pub content: String,
    pub resolved: bool,
    pub author: String,
    pub created_time: String,
    pub modified_time: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub quoted_text: Option<String>,

    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub replies: Vec<ReplySummary>,
}

impl From<Comment> for CommentSummary {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            content: comment.content,
            resolved: comment.resolved,
            author: comment.author.display_name,
            created_time: comment.created_time,
            modified_time: comment.modified_time,
            quoted_text: comment.quoted_file_content.map(|q| q.value),
            replies: comment.replies.into_iter().map(ReplySummary::from).collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplySummary {
    pub id: String,
    pub content: String,
    pub author: String,
    pub created_time: String,
    pub action: String,
}

impl From<Reply> for ReplySummary {
    fn from(reply: Reply) -> Self {
        Self {
            id: reply.id,
            content: reply.content,
            author: reply.author.display_name,
            created_time: reply.created_time,
            action: reply.action,
        }
    }
}

/// New comment or reply
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentWritten {
    pub id: String,
    pub content: String,
    pub author: String,
    pub created_time: String,
}

impl From<Comment> for CommentWritten {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            content: comment.content,
            author: comment.author.display_name,
            created_time: comment.created_time,
        }
    }
}

impl From<Reply> for CommentWritten {
    fn from(reply: Reply) -> Self {
        Self {
            id: reply.id,
            content: reply.content,
            author: reply.author.display_name,
            created_time: reply.created_time,
        }
    }
}

/// Resolve or reopen acknowledgement
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentResolution {
    pub id: String,
    pub action: String,
    pub created_time: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSummary {
    pub sheet_id: Option<i64>,
    pub title: String,
    pub index: Option<i64>,
    pub row_count: Option<i64>,
    pub column_count: Option<i64>,
}

impl From<Sheet> for SheetSummary {
    fn from(sheet: Sheet) -> Self {
        let props = sheet.properties;
        Self {
            sheet_id: props.sheet_id,
            title: props.title,
            index: props.index,
            row_count: props.grid_properties.row_count,
            column_count: props.grid_properties.column_count,
        }
    }
}

/// Sheets of a spreadsheet
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetList {
    pub spreadsheet_id: String,
    pub title: String,
    pub sheets: Vec<SheetSummary>,
}

/// Values of one sheet
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetValues {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spreadsheet_id: Option<String>,
    pub sheet_name: String,
    pub range: String,
    pub row_count: usize,
    pub values: Vec<Vec<Value>>,
}

impl SheetValues {
    pub fn new(sheet_name: String, range: ValueRange) -> Self {
        Self {
            spreadsheet_id: None,
            sheet_name,
            row_count: range.values.len(),
            range: range.range,
            values: range.values,
        }
    }
}

/// Values of every sheet
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AllSheetValues {
    pub spreadsheet_id: String,
    pub title: String,
    pub sheet_count: usize,
    pub sheets: Vec<SheetValues>,
}
