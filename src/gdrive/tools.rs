//! Google Drive tools

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AdapterError, McpError, Result};
use crate::gdrive::client::DriveApi;
use crate::gdrive::types::*;
use crate::mcp::registry::{page_size, parse_args, FieldType, ToolDescriptor, ToolRegistry};
use crate::mcp::ToolHandler;

const DEFAULT_PAGE_SIZE: i64 = 20;
const MAX_PAGE_SIZE: i64 = 1000;
const DEFAULT_ORDER_BY: &str = "modifiedTime desc";
const DEFAULT_MIME_TYPE: &str = "text/plain";
const FALLBACK_SHEET: &str = "Sheet1";

/// Escape a value for a single-quoted Drive query string
pub fn escape_query_value(value: &str) -> String {
    value.replace('\\', "\\\\").replace('\'', "\\'")
}

/// Quote a sheet name for use as an A1 range
fn sheet_range(name: &str) -> String {
    format!("'{}'", name.replace('\'', "''"))
}

/// The Drive tool set
pub struct DriveTools {
    api: Arc<dyn DriveApi>,
    registry: ToolRegistry,
}

impl DriveTools {
    pub fn new(api: Arc<dyn DriveApi>) -> Self {
        Self {
            api,
            registry: registry(),
        }
    }

    async fn list(&self, tool: &str, q: Option<String>, size: Option<i64>, order_by: Option<String>) -> Result<Value> {
        let query = FileQuery {
            q,
            page_size: page_size(tool, "page_size", size, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE)?,
            order_by: order_by
                .filter(|o| !o.is_empty())
                .unwrap_or_else(|| DEFAULT_ORDER_BY.to_string()),
        };
        let files: Vec<FileSummary> = self
            .api
            .list_files(&query)
            .await?
            .into_iter()
            .map(FileSummary::from)
            .collect();
        Ok(serde_json::to_value(files)?)
    }

    async fn handle_list_files(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            query: Option<String>,
            folder_id: Option<String>,
            page_size: Option<i64>,
            order_by: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let query = args.query.filter(|q| !q.is_empty());
        let folder = args
            .folder_id
            .filter(|f| !f.is_empty())
            .map(|f| format!("'{}' in parents", escape_query_value(&f)));

        let q = match (query, folder) {
            (Some(query), Some(folder)) => Some(format!("({}) and {}", query, folder)),
            (query, folder) => query.or(folder),
        };
        self.list(tool, q, args.page_size, args.order_by).await
    }

    async fn handle_search(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            query: String,
            page_size: Option<i64>,
        }

        let args: Args = parse_args(tool, args)?;
        let term = escape_query_value(&args.query);
        let q = format!("name contains '{term}' or fullText contains '{term}'");
        self.list(tool, Some(q), args.page_size, None).await
    }

    async fn handle_get_file(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            file_id: String,
        }

        let args: Args = parse_args(tool, args)?;
        let file = self.api.get_file(&args.file_id).await?;
        Ok(serde_json::to_value(FileDetail::from(file))?)
    }

    async fn handle_read_file(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            file_id: String,
        }

        let args: Args = parse_args(tool, args)?;
        let file = self.api.get_file(&args.file_id).await?;
        let bytes = match export_mime_type(&file.mime_type) {
            Some(export) => self.api.export_file(&args.file_id, export).await?,
            None => self.api.download_file(&args.file_id).await?,
        };
        Ok(serde_json::to_value(FileContent::from_bytes(file, bytes))?)
    }

    async fn handle_create_file(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            name: String,
            content: String,
            mime_type: Option<String>,
            folder_id: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let metadata = FileMetadata {
            name: Some(args.name),
            mime_type: None,
            parents: args.folder_id.into_iter().filter(|f| !f.is_empty()).collect(),
        };
        let upload = Upload::text(
            args.mime_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE),
            &args.content,
        );
        let file = self.api.create_file(&metadata, Some(&upload)).await?;
        tracing::info!(file_id = %file.id, "File created");
        Ok(serde_json::to_value(FileWritten::from(file))?)
    }

    async fn handle_update_file(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            file_id: String,
            content: String,
            mime_type: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let upload = Upload::text(
            args.mime_type.as_deref().unwrap_or(DEFAULT_MIME_TYPE),
            &args.content,
        );
        let file = self.api.update_content(&args.file_id, &upload).await?;
        let modified_time = file.modified_time.clone().unwrap_or_default();
        Ok(serde_json::to_value(FileWritten {
            modified_time: Some(modified_time),
            ..FileWritten::from(file)
        })?)
    }

    async fn handle_delete_file(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            file_id: String,
        }

        let args: Args = parse_args(tool, args)?;
        self.api.trash_file(&args.file_id).await?;
        Ok(serde_json::to_value(FileDeleted {
            deleted: true,
            file_id: args.file_id,
        })?)
    }

    async fn handle_create_folder(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            name: String,
            parent_id: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let metadata = FileMetadata {
            name: Some(args.name),
            mime_type: Some(FOLDER_MIME_TYPE.to_string()),
            parents: args.parent_id.into_iter().filter(|p| !p.is_empty()).collect(),
        };
        let folder = self.api.create_file(&metadata, None).await?;
        Ok(serde_json::to_value(FileWritten::from(folder))?)
    }

    async fn handle_move_file(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            file_id: String,
            new_folder_id: String,
        }

        let args: Args = parse_args(tool, args)?;
        let current = self.api.get_file(&args.file_id).await?;
        let moved = self
            .api
            .move_file(&args.file_id, &args.new_folder_id, &current.parents)
            .await?;
        let parents = moved.parents.clone();
        Ok(serde_json::to_value(FileWritten {
            parents: Some(parents),
            ..FileWritten::from(moved)
        })?)
    }

    async fn handle_share_file(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            file_id: String,
            email: String,
            role: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let request = PermissionRequest {
            grantee_type: "user".to_string(),
            role: args.role.unwrap_or_else(|| "reader".to_string()),
            email_address: args.email.clone(),
        };
        let permission = self.api.share_file(&args.file_id, &request).await?;
        Ok(serde_json::to_value(PermissionGranted {
            permission_id: permission.id,
            role: permission.role,
            email: permission.email_address.unwrap_or(args.email),
            file_id: args.file_id,
        })?)
    }

    async fn handle_copy_file(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            file_id: String,
            new_name: Option<String>,
            folder_id: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let metadata = FileMetadata {
            name: args.new_name.filter(|n| !n.is_empty()),
            mime_type: None,
            parents: args.folder_id.into_iter().filter(|f| !f.is_empty()).collect(),
        };
        let copy = self.api.copy_file(&args.file_id, &metadata).await?;
        Ok(serde_json::to_value(FileWritten::from(copy))?)
    }

    async fn handle_create_google_doc(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            name: String,
            content: String,
            content_type: Option<String>,
            folder_id: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let upload_type = match args.content_type.as_deref() {
            Some("text") => "text/plain",
            _ => "text/html",
        };
        let metadata = FileMetadata {
            name: Some(args.name),
            mime_type: Some(DOCUMENT_MIME_TYPE.to_string()),
            parents: args.folder_id.into_iter().filter(|f| !f.is_empty()).collect(),
        };
        let upload = Upload::text(upload_type, &args.content);
        let doc = self.api.create_file(&metadata, Some(&upload)).await?;
        Ok(serde_json::to_value(FileWritten::from(doc))?)
    }

    async fn handle_list_comments(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            file_id: String,
            #[serde(default)]
            include_resolved: bool,
        }

        let args: Args = parse_args(tool, args)?;
        let mut comments = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let page = self
                .api
                .list_comments(&args.file_id, page_token.as_deref())
                .await?;
            comments.extend(
                page.comments
                    .into_iter()
                    .filter(|c| args.include_resolved || !c.resolved)
                    .map(CommentSummary::from),
            );

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(next) => page_token = Some(next),
                None => break,
            }
        }

        Ok(serde_json::to_value(comments)?)
    }

    async fn handle_create_comment(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            file_id: String,
            content: String,
            quoted_text: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let comment = NewComment {
            content: args.content,
            quoted_file_content: args
                .quoted_text
                .filter(|q| !q.is_empty())
                .map(|value| QuotedFileContent {
                    value,
                    mime_type: Some("text/plain".to_string()),
                }),
        };
        let created = self.api.create_comment(&args.file_id, &comment).await?;
        Ok(serde_json::to_value(CommentWritten::from(created))?)
    }

    async fn handle_reply_to_comment(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            file_id: String,
            comment_id: String,
            content: String,
        }

        let args: Args = parse_args(tool, args)?;
        let reply = NewReply {
            content: args.content,
            action: None,
        };
        let created = self
            .api
            .create_reply(&args.file_id, &args.comment_id, &reply)
            .await?;
        Ok(serde_json::to_value(CommentWritten::from(created))?)
    }

    async fn handle_resolve_comment(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            file_id: String,
            comment_id: String,
            resolved: Option<bool>,
        }

        let args: Args = parse_args(tool, args)?;
        let action = if args.resolved.unwrap_or(true) {
            "resolve"
        } else {
            "reopen"
        };
        let reply = NewReply {
            content: String::new(),
            action: Some(action.to_string()),
        };
        let created = self
            .api
            .create_reply(&args.file_id, &args.comment_id, &reply)
            .await?;
        Ok(serde_json::to_value(CommentResolution {
            id: created.id,
            action: created.action,
            created_time: created.created_time,
        })?)
    }

    async fn handle_list_sheets(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            file_id: String,
        }

        let args: Args = parse_args(tool, args)?;
        let spreadsheet = self.api.get_spreadsheet(&args.file_id).await?;
        Ok(serde_json::to_value(SheetList {
            spreadsheet_id: args.file_id,
            title: spreadsheet.properties.title,
            sheets: spreadsheet
                .sheets
                .into_iter()
                .map(SheetSummary::from)
                .collect(),
        })?)
    }

    async fn handle_read_sheet(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            file_id: String,
            sheet_name: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let sheet_name = match args.sheet_name.filter(|s| !s.is_empty()) {
            Some(name) => name,
            None => self
                .api
                .get_spreadsheet(&args.file_id)
                .await?
                .sheet_titles()
                .into_iter()
                .next()
                .unwrap_or_else(|| FALLBACK_SHEET.to_string()),
        };

        let values = self
            .api
            .get_values(&args.file_id, &sheet_range(&sheet_name))
            .await?;
        Ok(serde_json::to_value(SheetValues {
            spreadsheet_id: Some(args.file_id),
            ..SheetValues::new(sheet_name, values)
        })?)
    }

    async fn handle_read_all_sheets(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            file_id: String,
        }

        let args: Args = parse_args(tool, args)?;
        let spreadsheet = self.api.get_spreadsheet(&args.file_id).await?;
        let ranges: Vec<String> = spreadsheet
            .sheet_titles()
            .iter()
            .map(|t| sheet_range(t))
            .collect();

        let sheets: Vec<SheetValues> = if ranges.is_empty() {
            Vec::new()
        } else {
            self.api
                .batch_get_values(&args.file_id, &ranges)
                .await?
                .value_ranges
                .into_iter()
                .map(|range| SheetValues::new(range.sheet_name(), range))
                .collect()
        };

        Ok(serde_json::to_value(AllSheetValues {
            spreadsheet_id: args.file_id,
            title: spreadsheet.properties.title,
            sheet_count: sheets.len(),
            sheets,
        })?)
    }
}

#[async_trait]
impl ToolHandler for DriveTools {
    fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    async fn call(&self, tool: &str, args: Value) -> Result<Value> {
        match tool {
            "gdrive_list_files" => self.handle_list_files(tool, args).await,
            "gdrive_search" => self.handle_search(tool, args).await,
            "gdrive_get_file" => self.handle_get_file(tool, args).await,
            "gdrive_read_file" => self.handle_read_file(tool, args).await,
            "gdrive_create_file" => self.handle_create_file(tool, args).await,
            "gdrive_update_file" => self.handle_update_file(tool, args).await,
            "gdrive_delete_file" => self.handle_delete_file(tool, args).await,
            "gdrive_create_folder" => self.handle_create_folder(tool, args).await,
            "gdrive_move_file" => self.handle_move_file(tool, args).await,
            "gdrive_share_file" => self.handle_share_file(tool, args).await,
            "gdrive_copy_file" => self.handle_copy_file(tool, args).await,
            "gdrive_create_google_doc" => self.handle_create_google_doc(tool, args).await,
            "gdrive_list_comments" => self.handle_list_comments(tool, args).await,
            "gdrive_create_comment" => self.handle_create_comment(tool, args).await,
            "gdrive_reply_to_comment" => self.handle_reply_to_comment(tool, args).await,
            "gdrive_resolve_comment" => self.handle_resolve_comment(tool, args).await,
            "gdrive_list_sheets" => self.handle_list_sheets(tool, args).await,
            "gdrive_read_sheet" => self.handle_read_sheet(tool, args).await,
            "gdrive_read_all_sheets" => self.handle_read_all_sheets(tool, args).await,
            other => Err(AdapterError::Mcp(McpError::UnknownTool {
                name: other.to_string(),
            })),
        }
    }
}

fn registry() -> ToolRegistry {
    use FieldType::*;

    ToolRegistry::new(vec![
        ToolDescriptor::new(
            "gdrive_list_files",
            "List files in Google Drive. Can filter by folder or custom query.",
        )
        .optional("query", String, "Drive API query (e.g., \"mimeType='application/pdf'\")")
        .optional("folder_id", String, "List files in a specific folder")
        .optional("page_size", Integer, "Max files to return (default: 20)")
        .optional("order_by", String, "Sort order (default: 'modifiedTime desc')"),
        ToolDescriptor::new("gdrive_search", "Search files by name or content.")
            .required("query", String, "Search query")
            .optional("page_size", Integer, "Max results (default: 20)"),
        ToolDescriptor::new("gdrive_get_file", "Get metadata for a specific file.")
            .required("file_id", String, "The file ID"),
        ToolDescriptor::new(
            "gdrive_read_file",
            "Read content of a file. Works with text files, Google Docs, Sheets (as CSV), etc.",
        )
        .required("file_id", String, "The file ID to read"),
        ToolDescriptor::new("gdrive_create_file", "Create a new file in Drive.")
            .required("name", String, "File name")
            .required("content", String, "File content")
            .optional("mime_type", String, "MIME type (default: 'text/plain')")
            .optional("folder_id", String, "Parent folder ID"),
        ToolDescriptor::new("gdrive_update_file", "Update content of an existing file.")
            .required("file_id", String, "The file ID to update")
            .required("content", String, "New file content")
            .optional("mime_type", String, "MIME type (default: 'text/plain')"),
        ToolDescriptor::new("gdrive_delete_file", "Delete a file (moves to trash).")
            .required("file_id", String, "The file ID to delete"),
        ToolDescriptor::new("gdrive_create_folder", "Create a new folder in Drive.")
            .required("name", String, "Folder name")
            .optional("parent_id", String, "Parent folder ID"),
        ToolDescriptor::new("gdrive_move_file", "Move a file to a different folder.")
            .required("file_id", String, "The file ID to move")
            .required("new_folder_id", String, "Destination folder ID"),
        ToolDescriptor::new("gdrive_share_file", "Share a file with someone.")
            .required("file_id", String, "The file ID to share")
            .required("email", String, "Email address to share with")
            .optional("role", String, "Permission role (default: 'reader')")
            .one_of(&["reader", "writer", "commenter"]),
        ToolDescriptor::new("gdrive_copy_file", "Make a copy of a file.")
            .required("file_id", String, "The file ID to copy")
            .optional("new_name", String, "Name for the copy")
            .optional("folder_id", String, "Destination folder ID"),
        ToolDescriptor::new(
            "gdrive_create_google_doc",
            "Create a native Google Doc by converting from HTML or plain text content.",
        )
        .required("name", String, "Document name")
        .required("content", String, "HTML or plain text content to convert to Google Doc")
        .optional("content_type", String, "Format of input content (default: 'html')")
        .one_of(&["html", "text"])
        .optional("folder_id", String, "Parent folder ID"),
        ToolDescriptor::new(
            "gdrive_list_comments",
            "List comments on a file with author, quoted text, replies and resolved status.",
        )
        .required("file_id", String, "The file ID")
        .optional("include_resolved", Boolean, "Include resolved comments (default: false)"),
        ToolDescriptor::new("gdrive_create_comment", "Add a comment to a Google Drive file.")
            .required("file_id", String, "The file ID")
            .required("content", String, "The comment text")
            .optional("quoted_text", String, "Text from the document to anchor the comment to"),
        ToolDescriptor::new(
            "gdrive_reply_to_comment",
            "Reply to an existing comment on a Google Drive file.",
        )
        .required("file_id", String, "The file ID")
        .required("comment_id", String, "The comment ID to reply to")
        .required("content", String, "The reply text"),
        ToolDescriptor::new("gdrive_resolve_comment", "Resolve or reopen a comment.")
            .required("file_id", String, "The file ID")
            .required("comment_id", String, "The comment ID")
            .optional("resolved", Boolean, "true to resolve, false to reopen (default: true)"),
        ToolDescriptor::new("gdrive_list_sheets", "List all sheets in a Google Spreadsheet.")
            .required("file_id", String, "The spreadsheet ID"),
        ToolDescriptor::new(
            "gdrive_read_sheet",
            "Read one sheet of a Google Spreadsheet. Reads the first sheet when no name is given.",
        )
        .required("file_id", String, "The spreadsheet ID")
        .optional("sheet_name", String, "Name of the sheet to read"),
        ToolDescriptor::new(
            "gdrive_read_all_sheets",
            "Read every sheet of a Google Spreadsheet.",
        )
        .required("file_id", String, "The spreadsheet ID"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Mutex;

    /// Drive double recording queries and serving canned comments and files
    #[derive(Default)]
    struct FakeDrive {
        queries: Mutex<Vec<FileQuery>>,
        file: DriveFile,
        content: Vec<u8>,
        exports: Mutex<Vec<String>>,
        comment_pages: Vec<CommentPage>,
    }

    #[async_trait]
    impl DriveApi for FakeDrive {
        async fn list_files(&self, query: &FileQuery) -> Result<Vec<DriveFile>> {
            self.queries.lock().unwrap().push(query.clone());
            Ok(vec![])
        }

        async fn get_file(&self, _file_id: &str) -> Result<DriveFile> {
            Ok(self.file.clone())
        }

        async fn export_file(&self, _file_id: &str, mime_type: &str) -> Result<Vec<u8>> {
            self.exports.lock().unwrap().push(mime_type.to_string());
            Ok(self.content.clone())
        }

        async fn download_file(&self, _file_id: &str) -> Result<Vec<u8>> {
            Ok(self.content.clone())
        }

        async fn create_file(&self, _metadata: &FileMetadata, _content: Option<&Upload>) -> Result<DriveFile> {
            Ok(self.file.clone())
        }

        async fn update_content(&self, _file_id: &str, _content: &Upload) -> Result<DriveFile> {
            Ok(self.file.clone())
        }

        async fn trash_file(&self, _file_id: &str) -> Result<()> {
            Ok(())
        }

        async fn move_file(&self, _file_id: &str, _add: &str, _remove: &[String]) -> Result<DriveFile> {
            Ok(self.file.clone())
        }

        async fn copy_file(&self, _file_id: &str, _metadata: &FileMetadata) -> Result<DriveFile> {
            Ok(self.file.clone())
        }

        async fn share_file(&self, _file_id: &str, permission: &PermissionRequest) -> Result<Permission> {
            Ok(Permission {
                id: "p1".into(),
                role: permission.role.clone(),
                email_address: None,
            })
        }

        async fn list_comments(&self, _file_id: &str, page_token: Option<&str>) -> Result<CommentPage> {
            let index = page_token.map(|t| t.parse::<usize>().unwrap()).unwrap_or(0);
            Ok(self.comment_pages[index].clone())
        }

        async fn create_comment(&self, _file_id: &str, comment: &NewComment) -> Result<Comment> {
            Ok(Comment {
                id: "c9".into(),
                content: comment.content.clone(),
                ..Default::default()
            })
        }

        async fn create_reply(&self, _file_id: &str, _comment_id: &str, reply: &NewReply) -> Result<Reply> {
            Ok(Reply {
                id: "r9".into(),
                action: reply.action.clone().unwrap_or_default(),
                ..Default::default()
            })
        }

        async fn get_spreadsheet(&self, _id: &str) -> Result<Spreadsheet> {
            Ok(Spreadsheet::default())
        }

        async fn get_values(&self, _id: &str, range: &str) -> Result<ValueRange> {
            Ok(ValueRange {
                range: format!("{}!A1:B2", range),
                values: vec![vec![json!("a"), json!("b")]],
            })
        }

        async fn batch_get_values(&self, _id: &str, _ranges: &[String]) -> Result<BatchValueRanges> {
            Ok(BatchValueRanges::default())
        }
    }

    fn comment(id: &str, resolved: bool) -> Comment {
        Comment {
            id: id.into(),
            resolved,
            ..Default::default()
        }
    }

    #[test]
    fn test_escape_query_value() {
        assert_eq!(escape_query_value("Bob's notes"), "Bob\\'s notes");
        assert_eq!(escape_query_value("a\\b"), "a\\\\b");
    }

    #[tokio::test]
    async fn test_search_escapes_quotes() {
        let fake = Arc::new(FakeDrive::default());
        let tools = DriveTools::new(fake.clone());

        tools
            .call("gdrive_search", json!({"query": "Bob's plan"}))
            .await
            .unwrap();

        let queries = fake.queries.lock().unwrap();
        assert_eq!(
            queries[0].q.as_deref(),
            Some("name contains 'Bob\\'s plan' or fullText contains 'Bob\\'s plan'")
        );
        assert_eq!(queries[0].page_size, 20);
        assert_eq!(queries[0].order_by, "modifiedTime desc");
    }

    #[tokio::test]
    async fn test_list_files_combines_query_and_folder() {
        let fake = Arc::new(FakeDrive::default());
        let tools = DriveTools::new(fake.clone());

        tools
            .call(
                "gdrive_list_files",
                json!({"query": "mimeType='application/pdf'", "folder_id": "f1", "page_size": 5000}),
            )
            .await
            .unwrap();

        let queries = fake.queries.lock().unwrap();
        assert_eq!(
            queries[0].q.as_deref(),
            Some("(mimeType='application/pdf') and 'f1' in parents")
        );
        assert_eq!(queries[0].page_size, 1000);
    }

    #[tokio::test]
    async fn test_list_comments_pages_and_filters_resolved() {
        let fake = Arc::new(FakeDrive {
            comment_pages: vec![
                CommentPage {
                    comments: vec![comment("c1", false), comment("c2", true)],
                    next_page_token: Some("1".into()),
                },
                CommentPage {
                    comments: vec![comment("c3", false)],
                    next_page_token: None,
                },
            ],
            ..Default::default()
        });
        let tools = DriveTools::new(fake);

        let open = tools
            .call("gdrive_list_comments", json!({"file_id": "doc"}))
            .await
            .unwrap();
        let ids: Vec<&str> = open
            .as_array()
            .unwrap()
            .iter()
            .map(|c| c["id"].as_str().unwrap())
            .collect();
        assert_eq!(ids, vec!["c1", "c3"]);

        let all = tools
            .call(
                "gdrive_list_comments",
                json!({"file_id": "doc", "include_resolved": true}),
            )
            .await
            .unwrap();
        assert_eq!(all.as_array().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_read_file_exports_google_docs() {
        let fake = Arc::new(FakeDrive {
            file: DriveFile {
                id: "d1".into(),
                name: "Notes".into(),
                mime_type: DOCUMENT_MIME_TYPE.into(),
                ..Default::default()
            },
            content: b"exported text".to_vec(),
            ..Default::default()
        });
        let tools = DriveTools::new(fake.clone());

        let result = tools
            .call("gdrive_read_file", json!({"file_id": "d1"}))
            .await
            .unwrap();
        assert_eq!(result["content"], "exported text");
        assert_eq!(fake.exports.lock().unwrap()[0], "text/plain");
    }

    #[tokio::test]
    async fn test_resolve_comment_actions() {
        let tools = DriveTools::new(Arc::new(FakeDrive::default()));

        let resolved = tools
            .call(
                "gdrive_resolve_comment",
                json!({"file_id": "doc", "comment_id": "c1"}),
            )
            .await
            .unwrap();
        assert_eq!(resolved["action"], "resolve");

        let reopened = tools
            .call(
                "gdrive_resolve_comment",
                json!({"file_id": "doc", "comment_id": "c1", "resolved": false}),
            )
            .await
            .unwrap();
        assert_eq!(reopened["action"], "reopen");
    }

    #[tokio::test]
    async fn test_read_sheet_defaults_to_first_sheet_name() {
        let tools = DriveTools::new(Arc::new(FakeDrive::default()));

        let result = tools
            .call("gdrive_read_sheet", json!({"file_id": "s1"}))
            .await
            .unwrap();
        assert_eq!(result["sheetName"], "Sheet1");
        assert_eq!(result["spreadsheetId"], "s1");
        assert_eq!(result["rowCount"], 1);
    }

    #[test]
    fn test_registry_names() {
        let registry = registry();
        assert_eq!(registry.descriptors().len(), 19);
        assert!(registry
            .descriptors()
            .iter()
            .all(|d| d.name.starts_with("gdrive_")));
    }
}
