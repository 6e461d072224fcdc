//! Apple Notes client
//!
//! Builds AppleScript for each operation and parses the separator-delimited
//! output. No OAuth is involved; macOS Automation permission is the only gate.

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::notes::script::{escape, parse_records, ScriptRunner, PROLOGUE};
use crate::notes::types::*;

/// Notes operations used by the tools
#[async_trait]
pub trait NotesApi: Send + Sync {
    async fn list_accounts(&self) -> Result<Vec<NotesAccount>>;

    /// Folders of one account, or of every account
    async fn list_folders(&self, account: Option<&str>) -> Result<Vec<NotesFolder>>;

    /// Up to `max_results` notes, optionally limited to folders named `folder`
    async fn list_notes(&self, folder: Option<&str>, max_results: u32) -> Result<Vec<NoteSummary>>;

    async fn get_note(&self, note_id: &str) -> Result<NoteDetail>;

    async fn get_note_html(&self, note_id: &str) -> Result<NoteHtml>;

    /// Returns the new note's id
    async fn create_note(&self, note: &NewNote) -> Result<String>;

    /// Replace the body and/or rename. Returns the note id.
    async fn update_note(&self, note_id: &str, body: Option<&str>, name: Option<&str>) -> Result<String>;

    /// Notes whose title contains `query`, ignoring case
    async fn search_notes(&self, query: &str, max_results: u32) -> Result<Vec<NoteSummary>>;

    /// Move a note to Recently Deleted. Returns its title.
    async fn delete_note(&self, note_id: &str) -> Result<String>;

    /// Reveal a note in the Notes app
    async fn show_note(&self, note_id: &str) -> Result<()>;
}

/// [`NotesApi`] over a [`ScriptRunner`]
pub struct NotesClient {
    runner: Arc<dyn ScriptRunner>,
}

impl NotesClient {
    pub fn new(runner: Arc<dyn ScriptRunner>) -> Self {
        Self { runner }
    }

    async fn tell(&self, body: &str) -> Result<String> {
        let script = format!(
            "{}tell application \"Notes\"\n{}\nend tell\n",
            PROLOGUE, body
        );
        self.runner.run(&script).await
    }

    async fn records(&self, body: &str) -> Result<Vec<Vec<String>>> {
        Ok(parse_records(&self.tell(body).await?))
    }

    async fn single_record(&self, body: &str) -> Result<Vec<String>> {
        Ok(self.records(body).await?.into_iter().next().unwrap_or_default())
    }
}

/// Script listing notes as `id, name, modified, folder` records
fn note_listing_script(folder: Option<&str>, limit: Option<u32>) -> String {
    let filter = match folder {
        Some(name) => format!("folderName is \"{}\"", escape(name)),
        None => "true".to_string(),
    };
    let stop = match limit {
        Some(n) => format!("if noteCount >= {} then exit repeat", n),
        None => String::new(),
    };

    format!(
        r#"    set output to ""
    set noteCount to 0
    repeat with acc in accounts
        repeat with f in folders of acc
            set folderName to name of f
            if {filter} then
                repeat with n in notes of f
                    {stop}
                    set output to output & (id of n) & fs & (name of n) & fs & my isoDate(modification date of n) & fs & folderName & rs
                    set noteCount to noteCount + 1
                end repeat
            end if
            {stop}
        end repeat
        {stop}
    end repeat
    return output"#
    )
}

fn note_ref(note_id: &str) -> String {
    format!("note id \"{}\"", escape(note_id))
}

#[async_trait]
impl NotesApi for NotesClient {
    async fn list_accounts(&self) -> Result<Vec<NotesAccount>> {
        let records = self
            .records(
                r#"    set output to ""
    repeat with acc in accounts
        set output to output & (id of acc) & fs & (name of acc) & rs
    end repeat
    return output"#,
            )
            .await?;
        Ok(records.iter().map(|r| NotesAccount::from_record(r)).collect())
    }

    async fn list_folders(&self, account: Option<&str>) -> Result<Vec<NotesFolder>> {
        let accounts = match account {
            Some(name) => format!("{{account \"{}\"}}", escape(name)),
            None => "accounts".to_string(),
        };
        let body = format!(
            r#"    set output to ""
    repeat with acc in {accounts}
        set accName to name of acc
        repeat with f in folders of acc
            set output to output & (id of f) & fs & (name of f) & fs & accName & fs & ((count of notes of f) as string) & rs
        end repeat
    end repeat
    return output"#
        );
        let records = self.records(&body).await?;
        Ok(records.iter().map(|r| NotesFolder::from_record(r)).collect())
    }

    async fn list_notes(&self, folder: Option<&str>, max_results: u32) -> Result<Vec<NoteSummary>> {
        let records = self
            .records(&note_listing_script(folder, Some(max_results)))
            .await?;
        Ok(records.iter().map(|r| NoteSummary::from_record(r)).collect())
    }

    async fn get_note(&self, note_id: &str) -> Result<NoteDetail> {
        let body = format!(
            r#"    set n to {note}
    return (id of n) & fs & (name of n) & fs & (plaintext of n) & fs & my isoDate(creation date of n) & fs & my isoDate(modification date of n) & fs & ((password protected of n) as string)"#,
            note = note_ref(note_id)
        );
        Ok(NoteDetail::from_record(&self.single_record(&body).await?))
    }

    async fn get_note_html(&self, note_id: &str) -> Result<NoteHtml> {
        let body = format!(
            r#"    set n to {note}
    return (id of n) & fs & (name of n) & fs & (body of n)"#,
            note = note_ref(note_id)
        );
        Ok(NoteHtml::from_record(&self.single_record(&body).await?))
    }

    async fn create_note(&self, note: &NewNote) -> Result<String> {
        let mut folder = format!("folder \"{}\"", escape(&note.folder));
        if let Some(account) = &note.account {
            folder.push_str(&format!(" of account \"{}\"", escape(account)));
        }
        let body = format!(
            r#"    set n to make new note at {folder} with properties {{body:"{html}"}}
    return id of n"#,
            html = escape(&note_html(&note.name, &note.body))
        );
        Ok(self.tell(&body).await?.trim().to_string())
    }

    async fn update_note(&self, note_id: &str, body: Option<&str>, name: Option<&str>) -> Result<String> {
        let note = note_ref(note_id);
        let script = match (body, name) {
            (Some(text), _) => {
                let title = match name {
                    Some(name) => name.to_string(),
                    None => self.tell(&format!("    return name of {}", note)).await?,
                };
                format!(
                    "    set n to {}\n    set body of n to \"{}\"\n    return id of n",
                    note,
                    escape(&note_html(&title, text))
                )
            }
            (None, Some(name)) => format!(
                "    set n to {}\n    set name of n to \"{}\"\n    return id of n",
                note,
                escape(name)
            ),
            (None, None) => return Ok(note_id.to_string()),
        };
        Ok(self.tell(&script).await?.trim().to_string())
    }

    async fn search_notes(&self, query: &str, max_results: u32) -> Result<Vec<NoteSummary>> {
        let needle = query.to_lowercase();
        let records = self.records(&note_listing_script(None, None)).await?;
        Ok(records
            .iter()
            .map(|r| NoteSummary::from_record(r))
            .filter(|note| note.name.to_lowercase().contains(&needle))
            .take(max_results as usize)
            .collect())
    }

    async fn delete_note(&self, note_id: &str) -> Result<String> {
        let body = format!(
            "    set n to {}\n    set noteName to name of n\n    delete n\n    return noteName",
            note_ref(note_id)
        );
        self.tell(&body).await
    }

    async fn show_note(&self, note_id: &str) -> Result<()> {
        let body = format!(
            "    show {}\n    activate\n    return \"shown\"",
            note_ref(note_id)
        );
        self.tell(&body).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Runner returning queued outputs and keeping every script it was given
    #[derive(Default)]
    struct QueuedRunner {
        outputs: Mutex<VecDeque<String>>,
        scripts: Mutex<Vec<String>>,
    }

    impl QueuedRunner {
        fn with_outputs(outputs: &[&str]) -> Arc<Self> {
            Arc::new(Self {
                outputs: Mutex::new(outputs.iter().map(|s| s.to_string()).collect()),
                scripts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ScriptRunner for QueuedRunner {
        async fn run(&self, script: &str) -> Result<String> {
            self.scripts.lock().unwrap().push(script.to_string());
            Ok(self.outputs.lock().unwrap().pop_front().unwrap_or_default())
        }
    }

    #[tokio::test]
    async fn test_search_is_case_insensitive_and_bounded() {
        let runner = QueuedRunner::with_outputs(&[
            "n1\u{1f}Grocery List\u{1f}2024-01-01T10:00:00\u{1f}Notes\u{1e}\
             n2\u{1f}Trip plan\u{1f}2024-01-02T10:00:00\u{1f}Travel\u{1e}\
             n3\u{1f}GROCERY run\u{1f}2024-01-03T10:00:00\u{1f}Notes\u{1e}\
             n4\u{1f}groceries 2\u{1f}2024-01-04T10:00:00\u{1f}Notes\u{1e}",
        ]);
        let client = NotesClient::new(runner.clone());

        let found = client.search_notes("grocer", 2).await.unwrap();
        let ids: Vec<&str> = found.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids, vec!["n1", "n3"]);
        assert_eq!(found[1].folder, "Notes");
    }

    #[tokio::test]
    async fn test_note_id_is_escaped() {
        let runner = QueuedRunner::with_outputs(&["x"]);
        let client = NotesClient::new(runner.clone());

        client.show_note(r#"abc" & do shell script "rm"#).await.unwrap();

        let scripts = runner.scripts.lock().unwrap();
        assert!(scripts[0].contains(r#"show note id "abc\" & do shell script \"rm""#));
        assert!(scripts[0].starts_with(PROLOGUE));
    }

    #[tokio::test]
    async fn test_update_body_keeps_current_title() {
        let runner = QueuedRunner::with_outputs(&["Weekly", "n1"]);
        let client = NotesClient::new(runner.clone());

        let id = client.update_note("n1", Some("new text"), None).await.unwrap();
        assert_eq!(id, "n1");

        let scripts = runner.scripts.lock().unwrap();
        assert_eq!(scripts.len(), 2);
        assert!(scripts[1].contains("<h1>Weekly</h1>"));
        assert!(scripts[1].contains("new text"));
    }

    #[tokio::test]
    async fn test_list_notes_filters_folder() {
        let runner = QueuedRunner::with_outputs(&[""]);
        let client = NotesClient::new(runner.clone());

        let notes = client.list_notes(Some("Work"), 5).await.unwrap();
        assert!(notes.is_empty());

        let scripts = runner.scripts.lock().unwrap();
        assert!(scripts[0].contains("if folderName is \"Work\" then"));
        assert!(scripts[0].contains("if noteCount >= 5 then exit repeat"));
    }
}
