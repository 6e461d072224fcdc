//! Apple Notes tools

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;

use crate::error::{AdapterError, McpError, Result};
use crate::mcp::registry::{page_size, parse_args, FieldType, ToolDescriptor, ToolRegistry};
use crate::mcp::ToolHandler;
use crate::notes::client::NotesApi;
use crate::notes::types::*;

const DEFAULT_LIST_RESULTS: i64 = 50;
const DEFAULT_SEARCH_RESULTS: i64 = 20;
const MAX_RESULTS_LIMIT: i64 = 1000;

const RECOVERY_NOTE: &str = "Note moved to Recently Deleted folder. Recoverable for 30 days.";

#[derive(Deserialize)]
struct NoteIdArgs {
    note_id: String,
}

/// The Apple Notes tool set
pub struct NotesTools {
    api: Arc<dyn NotesApi>,
    registry: ToolRegistry,
}

impl NotesTools {
    pub fn new(api: Arc<dyn NotesApi>) -> Self {
        Self {
            api,
            registry: registry(),
        }
    }

    async fn handle_list_folders(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            account_name: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let account = args.account_name.as_deref().filter(|a| !a.is_empty());
        Ok(serde_json::to_value(self.api.list_folders(account).await?)?)
    }

    async fn handle_list(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            folder_name: Option<String>,
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
        let folder = args.folder_name.as_deref().filter(|f| !f.is_empty());
        Ok(serde_json::to_value(
            self.api.list_notes(folder, max_results).await?,
        )?)
    }

    async fn handle_create(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            name: String,
            body: String,
            folder_name: Option<String>,
            account_name: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        let note = NewNote {
            name: args.name,
            body: args.body,
            folder: args
                .folder_name
                .filter(|f| !f.is_empty())
                .unwrap_or_else(|| DEFAULT_FOLDER.to_string()),
            account: args.account_name.filter(|a| !a.is_empty()),
        };
        let id = self.api.create_note(&note).await?;
        tracing::info!(note_id = %id, "Note created");
        Ok(serde_json::to_value(NoteCreated {
            id,
            name: note.name,
            folder: note.folder,
        })?)
    }

    async fn handle_update(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            note_id: String,
            body: Option<String>,
            name: Option<String>,
        }

        let args: Args = parse_args(tool, args)?;
        if args.body.is_none() && args.name.is_none() {
            return Err(AdapterError::invalid_arguments(
                tool,
                "Must provide body or name to update",
            ));
        }

        let id = self
            .api
            .update_note(&args.note_id, args.body.as_deref(), args.name.as_deref())
            .await?;
        Ok(serde_json::to_value(NoteUpdated { id, updated: true })?)
    }

    async fn handle_search(&self, tool: &str, args: Value) -> Result<Value> {
        #[derive(Deserialize)]
        struct Args {
            query: String,
            max_results: Option<i64>,
        }

        let args: Args = parse_args(tool, args)?;
        let max_results = page_size(
            tool,
            "max_results",
            args.max_results,
            DEFAULT_SEARCH_RESULTS,
            MAX_RESULTS_LIMIT,
        )?;
        Ok(serde_json::to_value(
            self.api.search_notes(&args.query, max_results).await?,
        )?)
    }

    async fn handle_delete(&self, tool: &str, args: Value) -> Result<Value> {
        let args: NoteIdArgs = parse_args(tool, args)?;
        let note_name = self.api.delete_note(&args.note_id).await?;
        Ok(serde_json::to_value(NoteDeleted {
            deleted: true,
            note_id: args.note_id,
            note_name,
            recovery: RECOVERY_NOTE.to_string(),
        })?)
    }
}

#[async_trait]
impl ToolHandler for NotesTools {
    fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    async fn call(&self, tool: &str, args: Value) -> Result<Value> {
        match tool {
            "notes_list_accounts" => Ok(serde_json::to_value(self.api.list_accounts().await?)?),
            "notes_list_folders" => self.handle_list_folders(tool, args).await,
            "notes_list" => self.handle_list(tool, args).await,
            "notes_get" => {
                let args: NoteIdArgs = parse_args(tool, args)?;
                Ok(serde_json::to_value(self.api.get_note(&args.note_id).await?)?)
            }
            "notes_get_html" => {
                let args: NoteIdArgs = parse_args(tool, args)?;
                Ok(serde_json::to_value(
                    self.api.get_note_html(&args.note_id).await?,
                )?)
            }
            "notes_create" => self.handle_create(tool, args).await,
            "notes_update" => self.handle_update(tool, args).await,
            "notes_search" => self.handle_search(tool, args).await,
            "notes_delete" => self.handle_delete(tool, args).await,
            "notes_show" => {
                let args: NoteIdArgs = parse_args(tool, args)?;
                self.api.show_note(&args.note_id).await?;
                Ok(serde_json::to_value(NoteShown {
                    shown: true,
                    note_id: args.note_id,
                })?)
            }
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
            "notes_list_accounts",
            "List all Apple Notes accounts (iCloud, On My Mac, etc.).",
        ),
        ToolDescriptor::new("notes_list_folders", "List all folders in Apple Notes.")
            .optional("account_name", String, "Filter folders by account name"),
        ToolDescriptor::new("notes_list", "List notes, optionally filtered by folder.")
            .optional("folder_name", String, "Filter notes by folder name")
            .optional("max_results", Integer, "Maximum notes to return (default: 50)"),
        ToolDescriptor::new(
            "notes_get",
            "Get a note's content by its ID. Returns plaintext content.",
        )
        .required("note_id", String, "The note ID"),
        ToolDescriptor::new("notes_get_html", "Get a note's HTML content by its ID.")
            .required("note_id", String, "The note ID"),
        ToolDescriptor::new("notes_create", "Create a new note.")
            .required("name", String, "Note title")
            .required("body", String, "Note content (plain text)")
            .optional("folder_name", String, "Folder to create note in (default: 'Notes')")
            .optional("account_name", String, "Account to create note in"),
        ToolDescriptor::new(
            "notes_update",
            "Update an existing note's content and/or title.",
        )
        .required("note_id", String, "The note ID to update")
        .optional("body", String, "New note content (plain text)")
        .optional("name", String, "New note title"),
        ToolDescriptor::new("notes_search", "Search notes by title, ignoring case.")
            .required("query", String, "Text to look for in note titles")
            .optional("max_results", Integer, "Maximum results (default: 20)"),
        ToolDescriptor::new(
            "notes_delete",
            "Delete a note (moves to Recently Deleted, recoverable for 30 days).",
        )
        .required("note_id", String, "The note ID to delete"),
        ToolDescriptor::new("notes_show", "Show a note in the Notes app UI.")
            .required("note_id", String, "The note ID to show"),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Notes double that counts script-level calls
    #[derive(Default)]
    struct FakeNotes {
        calls: AtomicUsize,
    }

    impl FakeNotes {
        fn touch(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl NotesApi for FakeNotes {
        async fn list_accounts(&self) -> Result<Vec<NotesAccount>> {
            self.touch();
            Ok(vec![NotesAccount {
                id: "a1".into(),
                name: "iCloud".into(),
            }])
        }

        async fn list_folders(&self, _account: Option<&str>) -> Result<Vec<NotesFolder>> {
            self.touch();
            Ok(vec![])
        }

        async fn list_notes(&self, _folder: Option<&str>, _max: u32) -> Result<Vec<NoteSummary>> {
            self.touch();
            Ok(vec![])
        }

        async fn get_note(&self, note_id: &str) -> Result<NoteDetail> {
            self.touch();
            Err(AdapterError::not_found(format!("note {}", note_id)))
        }

        async fn get_note_html(&self, _note_id: &str) -> Result<NoteHtml> {
            self.touch();
            Ok(NoteHtml {
                id: "n1".into(),
                name: "Title".into(),
                html: "<div>x</div>".into(),
            })
        }

        async fn create_note(&self, _note: &NewNote) -> Result<String> {
            self.touch();
            Ok("x-coredata://new".into())
        }

        async fn update_note(&self, note_id: &str, _body: Option<&str>, _name: Option<&str>) -> Result<String> {
            self.touch();
            Ok(note_id.to_string())
        }

        async fn search_notes(&self, _query: &str, _max: u32) -> Result<Vec<NoteSummary>> {
            self.touch();
            Ok(vec![])
        }

        async fn delete_note(&self, _note_id: &str) -> Result<String> {
            self.touch();
            Ok("Old list".into())
        }

        async fn show_note(&self, _note_id: &str) -> Result<()> {
            self.touch();
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_update_requires_body_or_name() {
        let fake = Arc::new(FakeNotes::default());
        let tools = NotesTools::new(fake.clone());

        let err = tools
            .call("notes_update", json!({"note_id": "n1"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgumentsError);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_create_defaults_folder() {
        let tools = NotesTools::new(Arc::new(FakeNotes::default()));
        let created = tools
            .call("notes_create", json!({"name": "Ideas", "body": "one\ntwo"}))
            .await
            .unwrap();
        assert_eq!(created["folder"], "Notes");
        assert_eq!(created["id"], "x-coredata://new");
    }

    #[tokio::test]
    async fn test_delete_reports_title() {
        let tools = NotesTools::new(Arc::new(FakeNotes::default()));
        let deleted = tools
            .call("notes_delete", json!({"note_id": "n7"}))
            .await
            .unwrap();
        assert_eq!(deleted["deleted"], true);
        assert_eq!(deleted["note_name"], "Old list");
    }

    #[tokio::test]
    async fn test_missing_note_is_not_found() {
        let tools = NotesTools::new(Arc::new(FakeNotes::default()));
        let err = tools
            .call("notes_get", json!({"note_id": "gone"}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFoundError);
    }

    #[tokio::test]
    async fn test_list_rejects_zero_results() {
        let fake = Arc::new(FakeNotes::default());
        let tools = NotesTools::new(fake.clone());
        let err = tools
            .call("notes_list", json!({"max_results": 0}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidArgumentsError);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 0);
    }
}
